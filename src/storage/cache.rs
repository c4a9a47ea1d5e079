use std::sync::{PoisonError, RwLock};

use hashbrown::HashMap;
use serde_json::Value;

struct CachedValue {
    value: Value,
    /// Serialized length in UTF-16 code units
    units: usize,
}

/// Memory mirror of the authoritative tiers.
///
/// Never authoritative on its own: every entry was either read from a tier or
/// written through to one before being inserted here.
pub(crate) struct MemoryCache {
    enabled: bool,
    entries: RwLock<HashMap<String, CachedValue>>,
}

impl MemoryCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        if !self.enabled {
            return None;
        }
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|c| c.value.clone())
    }

    pub fn insert(&self, key: &str, value: Value, units: usize) {
        if !self.enabled {
            return;
        }
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), CachedValue { value, units });
    }

    pub fn remove(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Approximate footprint in bytes (two per UTF-16 code unit).
    pub fn usage_bytes(&self) -> u64 {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .map(|(k, c)| (k.encode_utf16().count() + c.units) as u64 * 2)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mirrors_inserted_values() {
        let cache = MemoryCache::new(true);
        assert!(cache.get("k").is_none());

        cache.insert("k", json!({"a": 1}), 7);
        assert_eq!(cache.get("k"), Some(json!({"a": 1})));
        assert_eq!(cache.usage_bytes(), (1 + 7) * 2);

        cache.remove("k");
        assert!(cache.get("k").is_none());
        assert_eq!(cache.usage_bytes(), 0);
    }

    #[test]
    fn disabled_cache_never_holds_values() {
        let cache = MemoryCache::new(false);
        cache.insert("k", json!(1), 1);
        assert!(cache.get("k").is_none());
        assert_eq!(cache.usage_bytes(), 0);
    }
}
