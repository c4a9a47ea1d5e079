//! Large-object tier.
//!
//! Values whose serialized form reaches the configured threshold do not fit
//! comfortably in the durable tier. They go to an [`ObjectStore`], an
//! asynchronous keyed store modelled on IndexedDB object stores.

use async_trait::async_trait;

use crate::storage::area::AreaResult;

/// In-memory object store implementation.
pub mod in_memory;

pub use in_memory::InMemoryObjectStore;

/// Asynchronous keyed store for oversized payloads.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Retrieves the payload stored under `key`.
    async fn get(&self, key: &str) -> AreaResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous payload.
    async fn put(&self, key: &str, value: &str) -> AreaResult<()>;

    /// Deletes `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> AreaResult<()>;

    /// Lists every key in the store.
    async fn keys(&self) -> AreaResult<Vec<String>>;

    /// Native usage in bytes of the entries whose key starts with `prefix`,
    /// counted as two bytes per UTF-16 code unit of key and value. `None`
    /// when the backend cannot report it cheaply.
    async fn usage_bytes(&self, _prefix: &str) -> Option<u64> {
        None
    }
}
