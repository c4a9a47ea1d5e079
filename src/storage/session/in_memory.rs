use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::storage::area::{AreaResult, StorageArea};
use crate::storage::types::serialized_len;

// In memory storage, lives as long as the browsing session
#[derive(Default)]
pub struct InMemorySessionStore {
    data: RwLock<HashMap<String, String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops everything; the next session starts empty.
    pub fn end_session(&self) {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        log::debug!("session ended, dropping {} items", guard.len());
        guard.clear();
    }
}

impl StorageArea for InMemorySessionStore {
    fn get_item(&self, k: &str) -> AreaResult<Option<String>> {
        Ok(self.data.read().unwrap_or_else(PoisonError::into_inner)
            .get(k)
            .cloned())
    }

    fn set_item(&self, k: &str, v: &str) -> AreaResult<()> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
            .insert(k.to_string(), v.to_string());
        Ok(())
    }

    fn remove_item(&self, k: &str) -> AreaResult<()> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
            .remove(k);
        Ok(())
    }

    fn clear(&self) -> AreaResult<()> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn keys(&self) -> AreaResult<Vec<String>> {
        Ok(self.data.read().unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect())
    }

    fn usage_bytes(&self, prefix: &str) -> Option<u64> {
        let guard = self.data.read().unwrap_or_else(PoisonError::into_inner);
        let units: usize = guard
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

    #[test]
    fn end_session_drops_everything() {
        let store = InMemorySessionStore::new();
        store.set_item("a", "1").unwrap();
        store.set_item("b", "2").unwrap();
        store.set_item("ns:x", "10").unwrap();
        assert_eq!(store.usage_bytes(""), Some(20));
        assert_eq!(store.usage_bytes("ns:"), Some(12));

        store.end_session();
        assert_eq!(store.len(), 0);
        assert!(store.get_item("a").unwrap().is_none());
    }
}
