use crate::model::{EventTypeConfig, IntegrationSettings};
use crate::resolver::RuleSource;
use crate::sanitize::sanitize_settings;
use crate::RulesResult;
use bridge_store::{KvStore, KvStoreExt, INTEGRATION_SETTINGS_KEY};
use std::sync::Arc;
use tracing::info;

/// Integration settings persisted in a [`KvStore`].
#[derive(Clone)]
pub struct SettingsRepository {
    store: Arc<dyn KvStore>,
}

impl SettingsRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Saved settings, empty if nothing was saved yet.
    pub fn load(&self) -> RulesResult<IntegrationSettings> {
        Ok(self
            .store
            .get_json::<IntegrationSettings>(INTEGRATION_SETTINGS_KEY)?
            .unwrap_or_default())
    }

    pub fn save(&self, settings: &IntegrationSettings) -> RulesResult<()> {
        self.store.set_json(INTEGRATION_SETTINGS_KEY, settings)?;
        Ok(())
    }

    /// Sanitise a raw submission and persist the result.
    pub fn import(&self, raw: &serde_json::Value) -> RulesResult<IntegrationSettings> {
        let settings = sanitize_settings(raw);
        self.save(&settings)?;
        info!(
            enabled = settings.enabled_keys().count(),
            "Integration settings saved"
        );
        Ok(settings)
    }
}

impl RuleSource for SettingsRepository {
    fn event_config(&self, event_key: &str) -> RulesResult<Option<EventTypeConfig>> {
        Ok(self.load()?.get(event_key).cloned())
    }
}
