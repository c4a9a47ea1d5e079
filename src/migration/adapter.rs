use std::fmt::Debug;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::keys::ManagedKey;
use super::transform::{is_meaningful, transform};
use crate::errors::{MigrationError, StorageError};
use crate::storage::{GetOptions, SetOptions, StorageArea, StorageFacade, Tier};

/// Result of probing raw storage for legacy data.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub needed: bool,
    /// Every alias that currently holds non-empty legacy data.
    pub keys: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MigrationFailure {
    pub key: String,
    pub error: String,
}

/// Outcome of [`LegacyDataAdapter::migrate_all`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub migrated: Vec<String>,
    pub failed: Vec<MigrationFailure>,
}

/// Migrates pre-current data on first read, in front of a [`StorageFacade`].
///
/// Legacy data lives under fixed alias keys in a raw storage area, outside the
/// facade's namespace. The first read of a managed key that finds no
/// canonical value transforms the legacy data, writes it through the facade,
/// and deletes every alias. From then on reads take the fast path.
///
/// The canonical write happens before the aliases are removed. If the process
/// dies in between, both copies exist; reads still return the canonical one
/// and the next [`migrate_all`](Self::migrate_all) removes the leftovers.
pub struct LegacyDataAdapter {
    storage: Arc<StorageFacade>,
    legacy: Arc<dyn StorageArea>,
}

impl Debug for LegacyDataAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyDataAdapter")
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

impl LegacyDataAdapter {
    pub fn new(storage: Arc<StorageFacade>, legacy: Arc<dyn StorageArea>) -> Self {
        Self { storage, legacy }
    }

    /// Adapter reading legacy aliases from the facade's own durable area,
    /// which is where older releases wrote them.
    pub fn over_durable(storage: Arc<StorageFacade>) -> Result<Self, StorageError> {
        let legacy = storage
            .durable_area()
            .ok_or(StorageError::TierUnavailable { tier: Tier::Durable })?;
        Ok(Self::new(storage, legacy))
    }

    pub fn storage(&self) -> &Arc<StorageFacade> {
        &self.storage
    }

    /// Returns the current value of `key`, migrating legacy data first when
    /// no migrated value exists yet.
    ///
    /// Keys that are not managed are read straight from the facade. Managed
    /// keys with no data at all yield their empty value (`[]` for
    /// collections, `null` otherwise).
    pub async fn get(&self, key: &str) -> Result<Value, StorageError> {
        match ManagedKey::from_canonical(key) {
            Some(managed) => self.get_managed(managed).await,
            None => Ok(self
                .storage
                .get(key, GetOptions::default())
                .await
                .unwrap_or(Value::Null)),
        }
    }

    pub async fn get_managed(&self, key: ManagedKey) -> Result<Value, StorageError> {
        if let Some(value) = self.storage.get(key.canonical(), GetOptions::default()).await {
            return Ok(value);
        }
        match self.migrate_key(key).await? {
            Some(value) => Ok(value),
            None => Ok(key.empty_value()),
        }
    }

    /// Writes go straight through the facade.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        self.storage.set(key, value, SetOptions::default()).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.storage.delete(key).await
    }

    /// Lists every alias holding legacy data. Changes nothing.
    pub fn check_migration_status(&self) -> MigrationStatus {
        let keys: Vec<String> = ManagedKey::ALL
            .into_iter()
            .flat_map(|key| key.aliases().iter())
            .filter(|alias| self.read_alias(alias).is_some())
            .map(|alias| alias.to_string())
            .collect();

        MigrationStatus {
            needed: !keys.is_empty(),
            keys,
        }
    }

    /// Migrates every managed key that still has legacy data.
    ///
    /// A failure on one key is recorded and does not stop the others. Keys
    /// whose canonical value already exists only get stale aliases removed.
    pub async fn migrate_all(&self) -> MigrationReport {
        let mut report = MigrationReport::default();

        for key in ManagedKey::ALL {
            let migrated = self.storage.get(key.canonical(), GetOptions::default()).await.is_some();
            let outcome = if migrated {
                self.remove_stale_aliases(key).map(|_| None)
            } else {
                self.migrate_key(key).await
            };

            match outcome {
                Ok(Some(_)) => report.migrated.push(key.canonical().to_string()),
                Ok(None) => {}
                Err(e) => {
                    log::error!("migration of '{key}' failed: {e}");
                    report.failed.push(MigrationFailure {
                        key: key.canonical().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        log::info!(
            "legacy migration finished: {} migrated, {} failed",
            report.migrated.len(),
            report.failed.len()
        );
        report
    }

    /// Transform, write, clean up. `None` when there was nothing to migrate.
    async fn migrate_key(&self, key: ManagedKey) -> Result<Option<Value>, MigrationError> {
        let Some((alias, raw)) = self.find_legacy(key) else {
            return Ok(None);
        };

        let value = transform(key, &raw)?;
        self.storage
            .set(key.canonical(), &value, SetOptions::default())
            .await
            .map_err(|e| MigrationError::storage(key.canonical(), e))?;
        self.remove_aliases(key)?;

        log::info!("migrated legacy '{alias}' to '{key}'");
        Ok(Some(value))
    }

    fn find_legacy(&self, key: ManagedKey) -> Option<(&'static str, String)> {
        key.aliases()
            .iter()
            .find_map(|alias| self.read_alias(alias).map(|raw| (*alias, raw)))
    }

    /// Reads an alias, treating unreadable and empty payloads as absent.
    fn read_alias(&self, alias: &str) -> Option<String> {
        match self.legacy.get_item(alias) {
            Ok(Some(raw)) if is_meaningful(&raw) => Some(raw),
            Ok(_) => None,
            Err(e) => {
                log::warn!("cannot read legacy key '{alias}': {e}");
                None
            }
        }
    }

    fn remove_stale_aliases(&self, key: ManagedKey) -> Result<(), MigrationError> {
        if self.find_legacy(key).is_some() {
            log::info!("removing stale legacy copies of already migrated '{key}'");
            self.remove_aliases(key)?;
        }
        Ok(())
    }

    /// Removes every alias, backup and temp variants included. Tries them all
    /// and reports the first failure.
    fn remove_aliases(&self, key: ManagedKey) -> Result<(), MigrationError> {
        let mut first_err = None;
        for alias in key.aliases() {
            if let Err(e) = self.legacy.remove_item(alias) {
                log::warn!("cannot remove legacy key '{alias}': {e}");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(MigrationError::storage(
                key.canonical(),
                StorageError::from_tier(Tier::Durable, e),
            )),
            None => Ok(()),
        }
    }
}
