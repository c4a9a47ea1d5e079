//! Tiered storage.
//!
//! This module defines the traits, types, and implementations behind the
//! [`StorageFacade`]: one asynchronous key/value API over several physical
//! tiers, with change notification and operational metrics.
//!
//! # Concepts
//!
//! - **Memory cache**: read-through/write-through mirror of the tiers below.
//!   Never authoritative on its own.
//! - **Session tier**: data bounded to the browsing session. Written when a
//!   value is stored with [`SetOptions::temporary`]. Backed by a [`StorageArea`].
//! - **Durable tier**: persistent key/value data surviving restarts. Receives
//!   every non-temporary value below the large-object threshold. Backed by a
//!   [`StorageArea`].
//! - **Large-object tier**: asynchronous [`ObjectStore`] for values whose
//!   serialized form reaches the threshold.
//!
//! At most one tier holds the authoritative value of a key. Lookups go
//! cache → session → durable → large-object, and a tier that fails to read is
//! skipped. Writes go to exactly one tier and fail rather than land elsewhere.
//!
//! # Available types
//!
//! - [`StorageFacade`] / [`StorageFacadeBuilder`]: the unified API.
//! - [`StorageArea`]: trait for synchronous (session/durable) backends.
//! - [`ObjectStore`]: trait for the asynchronous large-object backend.
//! - [`Subscription`]: disposer returned by [`StorageFacade::subscribe`].
//! - [`StorageEvent`]: change feed entry, see [`StorageFacade::changes`].
//! - [`MetricsSnapshot`], [`StorageInfo`]: observability.
//!
//! # Choosing a backend
//!
//! - For a persistent durable tier, use [`SqliteLocalStore`] (feature `sqlite_store`).
//! - For the session tier, use [`InMemorySessionStore`].
//! - For tests or private sessions, [`StorageFacade::in_memory`] keeps everything in memory.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use airprompts_storage::config::StorageConfig;
//! use airprompts_storage::storage::{
//!     GetOptions, InMemoryObjectStore, InMemorySessionStore, SetOptions, SqliteLocalStore,
//!     StorageFacade,
//! };
//!
//! # async fn run() -> anyhow::Result<()> {
//! let storage = Arc::new(
//!     StorageFacade::builder()
//!         .config(StorageConfig::default())
//!         .durable(Arc::new(SqliteLocalStore::new("local.db", "durable")?))
//!         .session(Arc::new(InMemorySessionStore::new()))
//!         .large_objects(Arc::new(InMemoryObjectStore::new()))
//!         .build(),
//! );
//!
//! storage.set("draft", &"hello", SetOptions::temporary()).await?;
//! let draft = storage.get("draft", GetOptions::default()).await;
//! # Ok(()) }
//! ```

/// Storage area module, defining the synchronous key/value tier interface.
pub mod area;
/// Memory cache mirroring the tiers.
mod cache;
/// Change feed for observers of the whole facade.
pub mod event;
/// Operational counters.
pub mod metrics;
/// Large-object tier interface and implementations.
pub mod object;
/// The facade itself.
pub mod service;
/// Per-key observer registry.
pub mod subscription;
/// Storage types
pub mod types;

/// Local storage module, providing durable storage areas.
pub mod local {
    /// In-memory local storage implementation.
    pub mod in_memory;
    /// SQLite-backed local storage implementation.
    #[cfg(feature = "sqlite_store")]
    pub mod sqlite_store;
}

/// Session storage module, providing in-memory session storage.
pub mod session {
    /// In-memory session storage implementation.
    pub mod in_memory;
}

pub use area::StorageArea;
pub use event::{ChangeFeed, StorageEvent};
pub use local::in_memory::InMemoryLocalStore;
#[cfg(feature = "sqlite_store")]
pub use local::sqlite_store::SqliteLocalStore;
pub use metrics::{HitCounts, MetricsSnapshot};
pub use object::{InMemoryObjectStore, ObjectStore};
pub use service::{StorageFacade, StorageFacadeBuilder};
pub use session::in_memory::InMemorySessionStore;
pub use subscription::{SubscriberId, Subscription};
pub use types::{GetOptions, SetOptions, SizeClass, StorageInfo, Tier};
