use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::ObjectStore;
use crate::errors::TierError;
use crate::storage::area::AreaResult;
use crate::storage::types::serialized_len;

/// Object store kept in memory. Stands in for IndexedDB in tests and
/// environments without one.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<String, String>>,
    disabled: AtomicBool,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every operation fail with [`TierError::Unavailable`] while `true`.
    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::SeqCst);
    }

    fn check(&self) -> AreaResult<()> {
        if self.disabled.load(Ordering::SeqCst) {
            return Err(TierError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, key: &str) -> AreaResult<Option<String>> {
        self.check()?;
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> AreaResult<()> {
        self.check()?;
        self.objects
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> AreaResult<()> {
        self.check()?;
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> AreaResult<Vec<String>> {
        self.check()?;
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort_unstable();
        Ok(keys)
    }

    async fn usage_bytes(&self, prefix: &str) -> Option<u64> {
        if self.check().is_err() {
            return None;
        }
        let objects = self.objects.read().await;
        let units: usize = objects
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| serialized_len(k) + serialized_len(v))
            .sum();
        Some(units as u64 * 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn object_store_contract() {
        let store = InMemoryObjectStore::new();
        assert!(store.get("blob").await.unwrap().is_none());

        store.put("b", "2").await.unwrap();
        store.put("a", "1").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.keys().await.unwrap(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(store.usage_bytes("").await, Some(8));
        assert_eq!(store.usage_bytes("a").await, Some(4));

        // code units, not UTF-8 bytes
        store.put("é", "€").await.unwrap();
        assert_eq!(store.usage_bytes("é").await, Some(4));

        store.delete("a").await.unwrap();
        store.delete("a").await.unwrap();
        assert!(store.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn disabled_store_is_unavailable() {
        let store = InMemoryObjectStore::new();
        store.set_disabled(true);
        assert!(matches!(store.put("k", "v").await, Err(TierError::Unavailable)));
        assert!(matches!(store.get("k").await, Err(TierError::Unavailable)));
        assert_eq!(store.usage_bytes("").await, None);
    }
}
