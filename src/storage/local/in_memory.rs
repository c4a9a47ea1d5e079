use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::errors::TierError;
use crate::storage::area::{AreaResult, StorageArea};
use crate::storage::types::serialized_len;

/// In‑memory local storage (no persistence).
///
/// Used as a default when no durable backend is configured, and in tests. A
/// quota, counted in UTF-16 code units over keys and values like browser
/// local storage, makes writes fail with [`TierError::QuotaExceeded`] once
/// exceeded. The area can also be switched off to behave like storage that is
/// disabled in the current context.
#[derive(Default)]
pub struct InMemoryLocalStore {
    map: Mutex<BTreeMap<String, String>>,
    quota: Option<usize>,
    disabled: AtomicBool,
}

impl InMemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an area that rejects writes growing it past `units` code units.
    pub fn with_quota(units: usize) -> Self {
        Self {
            quota: Some(units),
            ..Self::default()
        }
    }

    /// Makes every operation fail with [`TierError::Unavailable`] while `true`.
    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::SeqCst);
    }

    fn map(&self) -> AreaResult<MutexGuard<'_, BTreeMap<String, String>>> {
        if self.disabled.load(Ordering::SeqCst) {
            return Err(TierError::Unavailable);
        }
        Ok(self.map.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn used_units(map: &BTreeMap<String, String>) -> usize {
        map.iter()
            .map(|(k, v)| serialized_len(k) + serialized_len(v))
            .sum()
    }
}

impl StorageArea for InMemoryLocalStore {
    fn get_item(&self, key: &str) -> AreaResult<Option<String>> {
        Ok(self.map()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> AreaResult<()> {
        let mut map = self.map()?;
        if let Some(quota) = self.quota {
            let replaced = map
                .get(key)
                .map(|old| serialized_len(key) + serialized_len(old))
                .unwrap_or(0);
            let after = Self::used_units(&map) - replaced + serialized_len(key) + serialized_len(value);
            if after > quota {
                return Err(TierError::QuotaExceeded);
            }
        }
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> AreaResult<()> {
        self.map()?.remove(key);
        Ok(())
    }

    fn clear(&self) -> AreaResult<()> {
        self.map()?.clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.map().map(|m| m.len()).unwrap_or(0)
    }

    fn keys(&self) -> AreaResult<Vec<String>> {
        // BTreeMap keeps them sorted, so tests are deterministic
        Ok(self.map()?.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_contract() {
        let area = InMemoryLocalStore::new();

        assert_eq!(area.len(), 0);
        assert!(area.get_item("missing").unwrap().is_none());

        area.set_item("b", "2").unwrap();
        area.set_item("a", "1").unwrap();
        assert_eq!(area.len(), 2);
        assert_eq!(area.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);

        area.remove_item("b").unwrap();
        assert!(area.get_item("b").unwrap().is_none());

        area.clear().unwrap();
        assert!(area.keys().unwrap().is_empty());
    }

    #[test]
    fn quota_rejects_growth_but_allows_shrinking_overwrites() {
        let area = InMemoryLocalStore::with_quota(10);
        area.set_item("k", "123456").unwrap(); // 7 units

        let err = area.set_item("k2", "1234").unwrap_err(); // would be 13
        assert!(matches!(err, TierError::QuotaExceeded));
        assert!(area.get_item("k2").unwrap().is_none());

        // replacing an entry only counts the difference
        area.set_item("k", "123456789").unwrap(); // 10 units
        assert_eq!(area.get_item("k").unwrap().as_deref(), Some("123456789"));
        assert!(matches!(area.set_item("k", "1234567890"), Err(TierError::QuotaExceeded)));
    }

    #[test]
    fn disabled_area_is_unavailable() {
        let area = InMemoryLocalStore::new();
        area.set_item("k", "v").unwrap();
        area.set_disabled(true);

        assert!(matches!(area.get_item("k"), Err(TierError::Unavailable)));
        assert!(matches!(area.set_item("k", "w"), Err(TierError::Unavailable)));
        assert_eq!(area.len(), 0);

        area.set_disabled(false);
        assert_eq!(area.get_item("k").unwrap().as_deref(), Some("v"));
    }
}
