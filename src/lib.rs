//! Client-side storage for prompt templates, workflows, snippets and folders.
//!
//! - [`storage`]: the tiered [`StorageFacade`](storage::StorageFacade).
//! - [`migration`]: the [`LegacyDataAdapter`](migration::LegacyDataAdapter) that
//!   brings older data shapes up to date.

pub mod config;
pub mod errors;
pub mod migration;
pub mod storage;

pub use config::StorageConfig;
pub use errors::{MigrationError, StorageError, TierError};
pub use migration::LegacyDataAdapter;
pub use storage::StorageFacade;
