//! Storage configuration.
//!
//! `StorageConfig` controls how a [`StorageFacade`](crate::storage::StorageFacade)
//! names and places its data. It provides sensible defaults via [`Default`] and a
//! fluent [`StorageConfig::builder()`] for customization with validation.
//!
//! # Examples
//!
//! ## Use defaults
//! ```rust
//! use airprompts_storage::config::StorageConfig;
//! let cfg = StorageConfig::default();
//! assert_eq!(cfg.namespace, "airprompts");
//! ```
//!
//! ## Customize with the builder
//! ```rust
//! use airprompts_storage::config::StorageConfig;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = StorageConfig::builder()
//!     .namespace("prompts-dev")
//!     .large_object_threshold(256 * 1024)
//!     .cache_enabled(false)
//!     .build()?; // returns Result<StorageConfig, ConfigError>
//! # Ok(()) }
//! ```
//!
//! # Fields (summary)
//! - `namespace`: Application namespace prefixed to every physical key (default: `airprompts`).
//! - `large_object_threshold`: Serialized length, in UTF-16 code units, at or above which a
//!   value is routed to the large-object tier (default: 1 MiB).
//! - `cache_enabled`: Mirror reads and writes in the memory cache (default: `true`).
//! - `event_channel_capacity`: Buffer of the broadcast change feed (default: 64).

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_NAMESPACE: &str = "airprompts";
pub const DEFAULT_LARGE_OBJECT_THRESHOLD: usize = 1024 * 1024;
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

/// Missing fields fall back to their defaults when deserialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub namespace: String,
    pub large_object_threshold: usize,
    pub cache_enabled: bool,
    pub event_channel_capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            large_object_threshold: DEFAULT_LARGE_OBJECT_THRESHOLD,
            cache_enabled: true,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl StorageConfig {
    pub fn builder() -> StorageConfigBuilder {
        StorageConfigBuilder::default()
    }
}

/// Builder for [`StorageConfig`].
#[derive(Debug, Clone, Default)]
pub struct StorageConfigBuilder {
    inner: StorageConfig,
}

impl StorageConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut StorageConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn namespace<S: Into<String>>(self, ns: S) -> Self { self.map(|c| c.namespace = ns.into()) }
    pub fn large_object_threshold(self, units: usize) -> Self { self.map(|c| c.large_object_threshold = units) }
    pub fn cache_enabled(self, on: bool) -> Self { self.map(|c| c.cache_enabled = on) }
    pub fn event_channel_capacity(self, n: usize) -> Self { self.map(|c| c.event_channel_capacity = n) }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut StorageConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<StorageConfig, ConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyNamespace,
    InvalidNamespace(String),
    ZeroThreshold,
    ZeroChannelCapacity,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyNamespace => write!(f, "namespace must not be empty"),
            ConfigError::InvalidNamespace(ns) => {
                write!(f, "namespace '{ns}' must not contain ':' or whitespace")
            }
            ConfigError::ZeroThreshold => write!(f, "large_object_threshold must be at least 1"),
            ConfigError::ZeroChannelCapacity => write!(f, "event_channel_capacity must be at least 1"),
        }
    }
}
impl std::error::Error for ConfigError {}

fn validate(c: &StorageConfig) -> Result<(), ConfigError> {
    if c.namespace.is_empty() {
        return Err(ConfigError::EmptyNamespace);
    }
    // ':' separates namespace, tier and key in physical keys.
    if c.namespace.contains(':') || c.namespace.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidNamespace(c.namespace.clone()));
    }
    if c.large_object_threshold == 0 {
        return Err(ConfigError::ZeroThreshold);
    }
    if c.event_channel_capacity == 0 {
        return Err(ConfigError::ZeroChannelCapacity);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = StorageConfig::builder().build().unwrap();
        assert_eq!(cfg.namespace, DEFAULT_NAMESPACE);
        assert_eq!(cfg.large_object_threshold, 1024 * 1024);
        assert!(cfg.cache_enabled);
    }

    #[test]
    fn builder_overrides_fields() {
        let cfg = StorageConfig::builder()
            .namespace("dev")
            .large_object_threshold(10)
            .with(|c| c.event_channel_capacity = 8)
            .build()
            .unwrap();
        assert_eq!(cfg.namespace, "dev");
        assert_eq!(cfg.large_object_threshold, 10);
        assert_eq!(cfg.event_channel_capacity, 8);
    }

    #[test]
    fn rejects_invalid_values() {
        assert_eq!(
            StorageConfig::builder().namespace("").build().unwrap_err(),
            ConfigError::EmptyNamespace
        );
        assert_eq!(
            StorageConfig::builder().namespace("a:b").build().unwrap_err(),
            ConfigError::InvalidNamespace("a:b".into())
        );
        assert_eq!(
            StorageConfig::builder().large_object_threshold(0).build().unwrap_err(),
            ConfigError::ZeroThreshold
        );
        assert_eq!(
            StorageConfig::builder().event_channel_capacity(0).build().unwrap_err(),
            ConfigError::ZeroChannelCapacity
        );
    }

    #[test]
    fn serializes_and_fills_missing_fields_with_defaults() {
        let cfg = StorageConfig::builder().namespace("dev").build().unwrap();
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["namespace"], "dev");
        assert_eq!(json["large_object_threshold"], DEFAULT_LARGE_OBJECT_THRESHOLD);

        let partial: StorageConfig =
            serde_json::from_str(r#"{"namespace":"dev","cache_enabled":false}"#).unwrap();
        assert_eq!(partial.namespace, "dev");
        assert!(!partial.cache_enabled);
        assert_eq!(partial.event_channel_capacity, DEFAULT_EVENT_CHANNEL_CAPACITY);
    }
}
