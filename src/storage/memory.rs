use super::KeyValueStore;
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Process-local store, used by tests and `--ephemeral` runs
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.values.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_delete() {
        let store = MemoryStore::new();
        tokio_test::block_on(async {
            assert_eq!(store.get("cursor").await.unwrap(), None);
            store.set("cursor", "41").await.unwrap();
            store.set("cursor", "42").await.unwrap();
            assert_eq!(store.get("cursor").await.unwrap().as_deref(), Some("42"));
            store.delete("cursor").await.unwrap();
            store.delete("cursor").await.unwrap();
            assert_eq!(store.get("cursor").await.unwrap(), None);
        });
    }
}
