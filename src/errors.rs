use crate::storage::Tier;

/// Failure reported by a single physical tier.
///
/// Tier implementations only know about themselves, so these errors carry no
/// tier name. The facade attaches the tier when it converts them into a
/// [`StorageError`].
#[derive(Debug, thiserror::Error)]
pub enum TierError {
    #[error("quota exceeded")]
    QuotaExceeded,

    #[error("storage is unavailable in this context")]
    Unavailable,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Quota exceeded in {tier} tier")]
    QuotaExceeded { tier: Tier },

    #[error("{tier} tier is unavailable")]
    TierUnavailable { tier: Tier },

    #[error("{tier} tier error: {source}")]
    Tier {
        tier: Tier,
        #[source]
        source: anyhow::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error("Storage has been destroyed")]
    Destroyed,
}

impl StorageError {
    /// Attaches the tier name to a tier-local error.
    pub fn from_tier(tier: Tier, err: TierError) -> Self {
        match err {
            TierError::QuotaExceeded => StorageError::QuotaExceeded { tier },
            TierError::Unavailable => StorageError::TierUnavailable { tier },
            TierError::Backend(source) => StorageError::Tier { tier, source },
        }
    }

    /// Returns true for failures caused by a write that did not land.
    pub fn is_write_failure(&self) -> bool {
        matches!(
            self,
            StorageError::QuotaExceeded { .. }
                | StorageError::TierUnavailable { .. }
                | StorageError::Tier { .. }
                | StorageError::Serialization(_)
        )
    }

    /// Text suitable for showing to the user. Write failures must never be silent.
    pub fn user_message(&self) -> String {
        match self {
            StorageError::QuotaExceeded { .. } => {
                "Could not save: storage is full. Try removing unused items.".to_string()
            }
            e if e.is_write_failure() => format!("Could not save: {e}"),
            e => e.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Cannot migrate '{key}': {reason}")]
    Transform { key: String, reason: String },

    #[error("Storage error while migrating '{key}': {source}")]
    Storage {
        key: String,
        #[source]
        source: Box<StorageError>,
    },
}

impl MigrationError {
    pub fn transform(key: &str, reason: impl Into<String>) -> Self {
        MigrationError::Transform {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn storage(key: &str, source: StorageError) -> Self {
        MigrationError::Storage {
            key: key.to_string(),
            source: Box::new(source),
        }
    }

    /// The managed key the failure belongs to.
    pub fn key(&self) -> &str {
        match self {
            MigrationError::Transform { key, .. } | MigrationError::Storage { key, .. } => key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_errors_carry_the_tier_name() {
        let err = StorageError::from_tier(Tier::Durable, TierError::QuotaExceeded);
        assert!(matches!(err, StorageError::QuotaExceeded { tier: Tier::Durable }));
        assert_eq!(err.to_string(), "Quota exceeded in durable tier");

        let err = StorageError::from_tier(Tier::Session, TierError::Unavailable);
        assert_eq!(err.to_string(), "session tier is unavailable");

        let err = StorageError::from_tier(Tier::LargeObject, anyhow::anyhow!("disk gone").into());
        assert_eq!(err.to_string(), "large-object tier error: disk gone");
    }

    #[test]
    fn write_failures_read_as_could_not_save() {
        let err = StorageError::QuotaExceeded { tier: Tier::Durable };
        assert!(err.user_message().starts_with("Could not save"));

        let err = StorageError::TierUnavailable { tier: Tier::Session };
        assert!(err.user_message().starts_with("Could not save"));

        assert!(!StorageError::Destroyed.user_message().starts_with("Could not save"));
    }

    #[test]
    fn migration_error_exposes_key() {
        let err = MigrationError::transform("templates", "expected an array");
        assert_eq!(err.key(), "templates");
        assert_eq!(err.to_string(), "Cannot migrate 'templates': expected an array");

        let err = MigrationError::storage("folders", StorageError::Destroyed);
        assert_eq!(err.key(), "folders");
    }
}
