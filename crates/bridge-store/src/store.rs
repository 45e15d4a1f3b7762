use crate::StoreResult;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Map of event key to per-event configuration.
pub const INTEGRATION_SETTINGS_KEY: &str = "integration_settings";

/// Map of sync type to batch progress.
pub const SYNC_STATUS_KEY: &str = "sync_status";

/// String key/value storage shared by every component.
///
/// Writes are last-writer-wins; no compare-and-swap is offered.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Returns whether a value was removed.
    fn delete(&self, key: &str) -> StoreResult<bool>;
}

/// JSON helpers available on every [`KvStore`].
pub trait KvStoreExt: KvStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        match self.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StoreResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw)
    }
}

impl<S: KvStore + ?Sized> KvStoreExt for S {}
