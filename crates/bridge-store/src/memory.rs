use crate::{KvStore, StoreResult};
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory [`KvStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.values
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.values.write().remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KvStoreExt;
    use std::collections::BTreeMap;

    #[test]
    fn test_set_get_delete() {
        let store = MemoryStore::new();
        assert!(store.get("missing").unwrap().is_none());

        store.set("a", "1").unwrap();
        store.set("a", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));
        assert_eq!(store.len(), 1);

        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_json_helpers_through_dyn() {
        let store: Box<dyn KvStore> = Box::new(MemoryStore::new());
        let mut value = BTreeMap::new();
        value.insert("pmpro".to_string(), 3u32);

        store.set_json("sync_status", &value).unwrap();
        let loaded: BTreeMap<String, u32> = store.get_json("sync_status").unwrap().unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn test_get_json_rejects_garbage() {
        let store = MemoryStore::new();
        store.set("k", "not json").unwrap();
        assert!(store.get_json::<Vec<u8>>("k").is_err());
    }
}
