//! Legacy data migration.
//!
//! Older releases stored data under other key names (`airprompts_templates`,
//! `ap_snippets`, `ui-prefs`, ...) and with snake_case fields (`folder_id`,
//! `is_favorite`, `view_mode`, ...). The [`LegacyDataAdapter`] sits in front of
//! the [`StorageFacade`](crate::storage::StorageFacade) and moves such data to
//! the current keys and shapes exactly once:
//!
//! - [`LegacyDataAdapter::get`] migrates a key on first read,
//! - [`LegacyDataAdapter::migrate_all`] migrates everything, isolating failures per key,
//! - [`LegacyDataAdapter::check_migration_status`] reports what is pending.
//!
//! The managed datasets and their aliases are listed by [`ManagedKey`].

mod adapter;
mod keys;
pub mod records;
mod transform;

pub use adapter::{LegacyDataAdapter, MigrationFailure, MigrationReport, MigrationStatus};
pub use keys::ManagedKey;
pub use transform::{is_meaningful, transform};
