//! Wiring shared by every command.

use anyhow::{Context, Result};
use async_trait::async_trait;
use batch_sync::SyncOptions;
use bridge_config::{Config, Paths};
use bridge_store::{KvStore, SqliteStore};
use event_outbox::{BentoClient, ClientConfig, DeliveryResult, EventSender};
use mapping_rules::{FieldResolver, ResolvedEvent, SettingsRepository, UserDirectory};
use std::sync::Arc;
use tracing::{info, warn};

pub struct App {
    pub config: Config,
    pub store: Arc<dyn KvStore>,
    dry_run: bool,
}

impl App {
    pub fn open(paths: Paths, config: Config, dry_run: bool) -> Result<Self> {
        paths.ensure_dirs()?;
        let database = paths.database_file();
        let store = SqliteStore::open(&database)
            .with_context(|| format!("Failed to open database {}", database.display()))?;

        info!(database = %database.display(), dry_run, "Store opened");
        Ok(Self {
            config,
            store: Arc::new(store),
            dry_run,
        })
    }

    pub fn settings(&self) -> SettingsRepository {
        SettingsRepository::new(self.store.clone())
    }

    pub fn resolver(&self, users: Arc<dyn UserDirectory>) -> FieldResolver {
        FieldResolver::new(Arc::new(self.settings()), users)
    }

    pub fn client(&self) -> Result<BentoClient> {
        Ok(BentoClient::new(ClientConfig::from(&self.config.bento))?)
    }

    /// The API client, or a printer when `--dry-run` is set.
    pub fn sender(&self) -> Result<Arc<dyn EventSender>> {
        if self.dry_run {
            return Ok(Arc::new(DryRunSender));
        }
        if !self.config.bento.has_credentials() {
            warn!("Bento credentials are not configured; deliveries will fail");
        }
        Ok(Arc::new(self.client()?))
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            page_size: self.config.sync.page_size,
            pace: if self.dry_run {
                std::time::Duration::ZERO
            } else {
                self.config.sync.pace()
            },
        }
    }
}

/// Prints each event as one JSON line instead of sending it.
struct DryRunSender;

#[async_trait]
impl EventSender for DryRunSender {
    async fn send_event(&self, event: &ResolvedEvent) -> DeliveryResult<()> {
        println!("{}", serde_json::to_string(event)?);
        Ok(())
    }
}
