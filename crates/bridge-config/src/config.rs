//! Configuration management.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://app.bentonow.com/api/v1";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_PAGE_SIZE: usize = 25;
pub const DEFAULT_PACE_MS: u64 = 250;

/// Top-level bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub bento: BentoSettings,
    #[serde(default)]
    pub sync: SyncSettings,
}

/// Credentials and endpoint for the marketing platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BentoSettings {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub site_uuid: String,
    #[serde(default)]
    pub publishable_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Batch sync pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Pause after each record, in milliseconds.
    #[serde(default = "default_pace_ms")]
    pub pace_ms: u64,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_pace_ms() -> u64 {
    DEFAULT_PACE_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            bento: BentoSettings::default(),
            sync: SyncSettings::default(),
        }
    }
}

impl Default for BentoSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            site_uuid: String::new(),
            publishable_key: String::new(),
            secret_key: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            pace_ms: DEFAULT_PACE_MS,
        }
    }
}

impl BentoSettings {
    /// True when site uuid and both keys are present.
    pub fn has_credentials(&self) -> bool {
        !self.site_uuid.trim().is_empty()
            && !self.publishable_key.trim().is_empty()
            && !self.secret_key.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SyncSettings {
    pub fn pace(&self) -> Duration {
        Duration::from_millis(self.pace_ms)
    }
}

impl Config {
    /// Defaults overridden from the process environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load from `paths.config_file()`, falling back to defaults when the
    /// file is missing. Environment variables win over file values.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply `BENTO_*` overrides from an arbitrary lookup. Empty values are
    /// ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(level) = get("BENTO_BRIDGE_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(uuid) = get("BENTO_SITE_UUID") {
            self.bento.site_uuid = uuid;
        }
        if let Some(key) = get("BENTO_PUBLISHABLE_KEY") {
            self.bento.publishable_key = key;
        }
        if let Some(key) = get("BENTO_SECRET_KEY") {
            self.bento.secret_key = key;
        }
        if let Some(url) = get("BENTO_API_URL") {
            self.bento.api_url = url;
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.sync.page_size == 0 {
            return Err(CoreError::Config("sync.page_size must be positive".into()));
        }
        self.api_url()?;
        Ok(())
    }

    /// The API base URL, parsed.
    pub fn api_url(&self) -> CoreResult<Url> {
        Url::parse(&self.bento.api_url).map_err(CoreError::from)
    }
}
