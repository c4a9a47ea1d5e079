use crate::errors::TierError;

pub type AreaResult<T> = Result<T, TierError>;

/// Object-safe key/value storage area (DOM's Storage).
///
/// Backs the durable and session tiers. Keys are physical keys: the facade
/// prefixes them with its namespace and tier, so an area may be shared with
/// data that does not belong to the facade.
pub trait StorageArea: Send + Sync {
    /// Retrieves the value associated with the given key, or `None` if not found.
    fn get_item(&self, key: &str) -> AreaResult<Option<String>>;

    /// Sets the value for the given key, overwriting any existing value.
    fn set_item(&self, key: &str, value: &str) -> AreaResult<()>;

    /// Removes the item with the given key. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> AreaResult<()>;

    /// Clears all items in the storage area.
    fn clear(&self) -> AreaResult<()>;

    /// Returns the number of items in the storage area.
    fn len(&self) -> usize;

    /// Returns true when the area holds no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a vector of all keys in the storage area.
    fn keys(&self) -> AreaResult<Vec<String>>;

    /// Native usage in bytes of the entries whose key starts with `prefix`,
    /// counted as two bytes per UTF-16 code unit of key and value. `None`
    /// when the backend cannot report it cheaply.
    fn usage_bytes(&self, _prefix: &str) -> Option<u64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemorySessionStore;
    use std::sync::Arc;

    fn set(area: &Arc<dyn StorageArea>, k: &str, v: &str) {
        area.set_item(k, v).unwrap();
    }

    #[test]
    fn storagearea_basic_contract() {
        let area: Arc<dyn StorageArea> = Arc::new(InMemorySessionStore::new());

        // starts empty
        assert!(area.is_empty());
        assert!(area.get_item("missing").unwrap().is_none());

        // set + get
        set(&area, "a", "1");
        set(&area, "b", "2");
        assert_eq!(area.len(), 2);
        assert_eq!(area.get_item("a").unwrap().as_deref(), Some("1"));
        assert_eq!(area.get_item("b").unwrap().as_deref(), Some("2"));

        // overwrite keeps len()
        set(&area, "a", "ONE");
        assert_eq!(area.len(), 2);
        assert_eq!(area.get_item("a").unwrap().as_deref(), Some("ONE"));

        // remove, twice
        area.remove_item("b").unwrap();
        area.remove_item("b").unwrap();
        assert_eq!(area.len(), 1);
        assert!(area.get_item("b").unwrap().is_none());

        // clear
        area.clear().unwrap();
        assert_eq!(area.len(), 0);
        assert_eq!(area.usage_bytes(""), Some(0));
    }
}
