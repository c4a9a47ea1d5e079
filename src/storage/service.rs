use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::area::StorageArea;
use super::cache::MemoryCache;
use super::event::{ChangeFeed, StorageBus, StorageEvent};
use super::metrics::{HitSource, Metrics, MetricsSnapshot};
use super::object::{InMemoryObjectStore, ObjectStore};
use super::subscription::{Callback, SubscriberRegistry, Subscription};
use super::types::{
    physical_key, placement, serialized_len, tier_prefix, GetOptions, SetOptions, SizeClass,
    StorageInfo, Tier,
};
use super::{InMemoryLocalStore, InMemorySessionStore};
use crate::config::StorageConfig;
use crate::errors::{StorageError, TierError};

/// Unified key-value store over the session, durable and large-object tiers,
/// mirrored by a memory cache.
///
/// One facade is created at startup and shared (usually behind an `Arc`) with
/// every consumer. Cache, metrics and subscribers belong to the instance: two
/// facades over the same areas do not share them and may observe different
/// staleness windows for the same physical key.
pub struct StorageFacade {
    config: StorageConfig,
    durable: Option<Arc<dyn StorageArea>>,
    session: Option<Arc<dyn StorageArea>>,
    large_objects: Option<Arc<dyn ObjectStore>>,
    fallback: Option<Arc<dyn StorageArea>>,
    cache: MemoryCache,
    metrics: Metrics,
    subscribers: Arc<SubscriberRegistry>,
    bus: RwLock<Option<StorageBus>>,
    destroyed: AtomicBool,
}

impl Debug for StorageFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageFacade")
            .field("namespace", &self.config.namespace)
            .field("durable", &self.durable.is_some())
            .field("session", &self.session.is_some())
            .field("large_objects", &self.large_objects.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`StorageFacade`]. Tiers that are not supplied are treated as
/// missing from the execution context.
#[derive(Default)]
pub struct StorageFacadeBuilder {
    config: StorageConfig,
    durable: Option<Arc<dyn StorageArea>>,
    session: Option<Arc<dyn StorageArea>>,
    large_objects: Option<Arc<dyn ObjectStore>>,
    fallback: Option<Arc<dyn StorageArea>>,
}

impl StorageFacadeBuilder {
    pub fn config(mut self, config: StorageConfig) -> Self {
        self.config = config;
        self
    }

    pub fn durable(mut self, area: Arc<dyn StorageArea>) -> Self {
        self.durable = Some(area);
        self
    }

    pub fn session(mut self, area: Arc<dyn StorageArea>) -> Self {
        self.session = Some(area);
        self
    }

    pub fn large_objects(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.large_objects = Some(store);
        self
    }

    /// Alternate read path consulted by `get` with `fallback` set. Entries are
    /// looked up under the durable tier's physical key.
    pub fn fallback(mut self, area: Arc<dyn StorageArea>) -> Self {
        self.fallback = Some(area);
        self
    }

    pub fn build(self) -> StorageFacade {
        log::debug!(
            "storage facade '{}' created (durable: {}, session: {}, large objects: {})",
            self.config.namespace,
            self.durable.is_some(),
            self.session.is_some(),
            self.large_objects.is_some(),
        );

        StorageFacade {
            cache: MemoryCache::new(self.config.cache_enabled),
            bus: RwLock::new(Some(StorageBus::new(self.config.event_channel_capacity))),
            config: self.config,
            durable: self.durable,
            session: self.session,
            large_objects: self.large_objects,
            fallback: self.fallback,
            metrics: Metrics::default(),
            subscribers: Arc::new(SubscriberRegistry::default()),
            destroyed: AtomicBool::new(false),
        }
    }
}

impl StorageFacade {
    pub fn builder() -> StorageFacadeBuilder {
        StorageFacadeBuilder::default()
    }

    /// Facade with every tier kept in memory. Suits tests and private sessions.
    pub fn in_memory(config: StorageConfig) -> Self {
        Self::builder()
            .config(config)
            .durable(Arc::new(InMemoryLocalStore::new()))
            .session(Arc::new(InMemorySessionStore::new()))
            .large_objects(Arc::new(InMemoryObjectStore::new()))
            .build()
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// The raw durable area, shared with collaborators that read data written
    /// outside the facade's namespace.
    pub fn durable_area(&self) -> Option<Arc<dyn StorageArea>> {
        self.durable.clone()
    }

    /// Returns the stored value for `key`.
    ///
    /// Looks in the memory cache, then the session, durable and large-object
    /// tiers. The first hit is copied into the cache. A tier that fails to
    /// read counts as a miss for that tier. With `options.fallback`, the
    /// fallback area is consulted when nothing was found and some tier failed
    /// or is not configured. Never fails: when nothing is found
    /// `options.default_value` is returned, uncached.
    pub async fn get(&self, key: &str, options: GetOptions) -> Option<Value> {
        if self.is_destroyed() {
            log::warn!("get('{key}') on a destroyed storage facade");
            return options.default_value;
        }

        if let Some(value) = self.cache.get(key) {
            self.metrics.record_hit(HitSource::Cache);
            return Some(value);
        }

        let mut unavailable = false;
        for tier in Tier::LOOKUP_ORDER {
            // a tier missing from the context is as unavailable as a failing one
            if !self.has_tier(tier) {
                unavailable = true;
                continue;
            }
            let pkey = self.physical_key(tier, key);
            let raw = match self.read_tier(tier, &pkey).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("{tier} tier read of '{key}' failed, treating as miss: {e}");
                    unavailable = true;
                    continue;
                }
            };

            match serde_json::from_str::<Value>(&raw) {
                Ok(value) => {
                    self.cache.insert(key, value.clone(), serialized_len(&raw));
                    self.metrics.record_hit(HitSource::Tier(tier));
                    return Some(value);
                }
                Err(e) => {
                    log::warn!("{tier} tier holds unreadable data for '{key}': {e}");
                }
            }
        }

        if options.fallback && unavailable {
            if let Some(value) = self.read_fallback(key) {
                self.metrics.record_hit(HitSource::Fallback);
                return Some(value);
            }
        }

        self.metrics.record_miss();
        options.default_value
    }

    /// Typed variant of [`get`](Self::get).
    pub async fn get_as<T: DeserializeOwned>(
        &self,
        key: &str,
        options: GetOptions,
    ) -> Result<Option<T>, StorageError> {
        match self.get(key, options).await {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Stores `value` under `key`.
    ///
    /// The tier is picked from the serialized size, or the session tier when
    /// `options.temporary` is set. The authoritative tier is written first,
    /// then copies in other tiers are dropped, the cache is updated and the
    /// subscribers of `key` are notified. A failing tier write is returned as
    /// is: the value is never redirected to another tier. A copy that cannot
    /// be dropped from a tier looked up earlier, and still reads back, would
    /// shadow the new value, so the write is undone and that tier's error
    /// returned.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        options: SetOptions,
    ) -> Result<(), StorageError> {
        self.ensure_alive()?;

        let value = serde_json::to_value(value)?;
        let payload = serde_json::to_string(&value)?;
        let units = serialized_len(&payload);
        let size = SizeClass::classify(&payload, self.config.large_object_threshold);
        let tier = placement(size, options.temporary);

        let pkey = self.physical_key(tier, key);
        if let Err(e) = self.write_tier(tier, &pkey, &payload).await {
            let err = StorageError::from_tier(tier, e);
            log::error!("could not store '{key}' ({units} units): {err}");
            return Err(err);
        }

        for other in Tier::LOOKUP_ORDER.into_iter().filter(|t| *t != tier) {
            let other_key = self.physical_key(other, key);
            let Err(e) = self.remove_tier(other, &other_key).await else {
                continue;
            };
            // only a readable copy earlier in lookup order shadows the new value
            let shadows = other.precedes(tier)
                && matches!(self.read_tier(other, &other_key).await, Ok(Some(_)));
            if !shadows {
                log::warn!("could not drop the {other} copy of '{key}': {e}");
                continue;
            }

            let err = StorageError::from_tier(other, e);
            log::error!("could not drop the {other} copy of '{key}', undoing the write: {err}");
            if let Err(e) = self.remove_tier(tier, &pkey).await {
                log::error!("could not undo the {tier} write of '{key}': {e}");
            }
            return Err(err);
        }

        self.cache.insert(key, value.clone(), units);
        self.metrics.record_set();
        log::debug!("stored '{key}' in {tier} tier ({units} units)");

        self.subscribers.notify(key, &value);
        self.publish(StorageEvent::Set {
            key: key.to_string(),
            tier,
            size: units,
        });
        Ok(())
    }

    /// Removes `key` from every tier and the cache. Missing keys are not an
    /// error. Per-key subscribers are not notified.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.ensure_alive()?;
        self.cache.remove(key);

        let mut first_err = None;
        for tier in Tier::LOOKUP_ORDER {
            let pkey = self.physical_key(tier, key);
            if let Err(e) = self.remove_tier(tier, &pkey).await {
                log::warn!("could not remove '{key}' from {tier} tier: {e}");
                first_err.get_or_insert(StorageError::from_tier(tier, e));
            }
        }
        if let Some(err) = first_err {
            return Err(err);
        }

        self.publish(StorageEvent::Removed { key: key.to_string() });
        Ok(())
    }

    /// Removes every key of this facade's namespace from every tier. Keys
    /// outside the namespace are left alone.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.ensure_alive()?;
        self.cache.clear();

        let mut removed = 0;
        for tier in Tier::LOOKUP_ORDER {
            let prefix = tier_prefix(&self.config.namespace, tier);
            let keys = match self.list_tier(tier).await {
                Ok(keys) => keys,
                Err(TierError::Unavailable) if !self.has_tier(tier) => continue,
                Err(e) => return Err(StorageError::from_tier(tier, e)),
            };
            let owned: Vec<String> = keys.into_iter().filter(|k| k.starts_with(&prefix)).collect();

            match tier {
                Tier::LargeObject => {
                    if let Some(store) = &self.large_objects {
                        let results =
                            futures::future::join_all(owned.iter().map(|k| store.delete(k))).await;
                        for r in results {
                            r.map_err(|e| StorageError::from_tier(tier, e))?;
                        }
                    }
                }
                _ => {
                    for k in &owned {
                        self.remove_tier(tier, k)
                            .await
                            .map_err(|e| StorageError::from_tier(tier, e))?;
                    }
                }
            }
            removed += owned.len();
        }

        log::debug!("cleared {removed} keys of namespace '{}'", self.config.namespace);
        self.publish(StorageEvent::Cleared);
        Ok(())
    }

    /// Registers `callback` for writes to exactly `key`.
    pub fn subscribe<F>(&self, key: &str, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        self.subscribers.register(key, callback)
    }

    /// Broadcast feed of every change made through this facade.
    pub fn changes(&self) -> Result<ChangeFeed, StorageError> {
        self.bus
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(StorageBus::subscribe)
            .ok_or(StorageError::Destroyed)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Approximate byte usage per tier, limited to this namespace. Native
    /// figures are used when a tier reports them; otherwise the namespace's
    /// keys and values are summed.
    pub async fn storage_info(&self) -> StorageInfo {
        let durable = match &self.durable {
            Some(area) => {
                let prefix = tier_prefix(&self.config.namespace, Tier::Durable);
                match area.usage_bytes(&prefix) {
                    Some(bytes) => bytes,
                    None => self.estimate_area(Tier::Durable, area.as_ref()),
                }
            }
            None => 0,
        };
        let session = match &self.session {
            Some(area) => {
                let prefix = tier_prefix(&self.config.namespace, Tier::Session);
                match area.usage_bytes(&prefix) {
                    Some(bytes) => bytes,
                    None => self.estimate_area(Tier::Session, area.as_ref()),
                }
            }
            None => 0,
        };
        let large_object = match &self.large_objects {
            Some(store) => {
                let prefix = tier_prefix(&self.config.namespace, Tier::LargeObject);
                match store.usage_bytes(&prefix).await {
                    Some(bytes) => bytes,
                    None => self.estimate_objects(store.as_ref()).await,
                }
            }
            None => 0,
        };
        let memory_cache = self.cache.usage_bytes();

        StorageInfo {
            durable,
            session,
            large_object,
            memory_cache,
            total: durable + session + large_object + memory_cache,
        }
    }

    /// Drops subscribers, cached values and the change feed. Later calls
    /// fail with [`StorageError::Destroyed`].
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.subscribers.clear();
        self.cache.clear();
        self.bus.write().unwrap_or_else(PoisonError::into_inner).take();
        log::debug!("storage facade '{}' destroyed", self.config.namespace);
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    fn ensure_alive(&self) -> Result<(), StorageError> {
        if self.is_destroyed() {
            return Err(StorageError::Destroyed);
        }
        Ok(())
    }

    fn physical_key(&self, tier: Tier, key: &str) -> String {
        physical_key(&self.config.namespace, tier, key)
    }

    fn has_tier(&self, tier: Tier) -> bool {
        match tier {
            Tier::Session => self.session.is_some(),
            Tier::Durable => self.durable.is_some(),
            Tier::LargeObject => self.large_objects.is_some(),
        }
    }

    fn area(&self, tier: Tier) -> Option<&Arc<dyn StorageArea>> {
        match tier {
            Tier::Session => self.session.as_ref(),
            Tier::Durable => self.durable.as_ref(),
            Tier::LargeObject => None,
        }
    }

    /// Missing tiers read as empty.
    async fn read_tier(&self, tier: Tier, pkey: &str) -> Result<Option<String>, TierError> {
        match tier {
            Tier::LargeObject => match &self.large_objects {
                Some(store) => store.get(pkey).await,
                None => Ok(None),
            },
            _ => match self.area(tier) {
                Some(area) => area.get_item(pkey),
                None => Ok(None),
            },
        }
    }

    async fn write_tier(&self, tier: Tier, pkey: &str, payload: &str) -> Result<(), TierError> {
        match tier {
            Tier::LargeObject => match &self.large_objects {
                Some(store) => store.put(pkey, payload).await,
                None => Err(TierError::Unavailable),
            },
            _ => match self.area(tier) {
                Some(area) => area.set_item(pkey, payload),
                None => Err(TierError::Unavailable),
            },
        }
    }

    /// Removing from a missing tier is a no-op.
    async fn remove_tier(&self, tier: Tier, pkey: &str) -> Result<(), TierError> {
        match tier {
            Tier::LargeObject => match &self.large_objects {
                Some(store) => store.delete(pkey).await,
                None => Ok(()),
            },
            _ => match self.area(tier) {
                Some(area) => area.remove_item(pkey),
                None => Ok(()),
            },
        }
    }

    async fn list_tier(&self, tier: Tier) -> Result<Vec<String>, TierError> {
        match tier {
            Tier::LargeObject => match &self.large_objects {
                Some(store) => store.keys().await,
                None => Err(TierError::Unavailable),
            },
            _ => match self.area(tier) {
                Some(area) => area.keys(),
                None => Err(TierError::Unavailable),
            },
        }
    }

    fn read_fallback(&self, key: &str) -> Option<Value> {
        let area = self.fallback.as_ref()?;
        let pkey = self.physical_key(Tier::Durable, key);
        match area.get_item(&pkey) {
            Ok(Some(raw)) => serde_json::from_str(&raw)
                .map_err(|e| log::warn!("fallback holds unreadable data for '{key}': {e}"))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                log::warn!("fallback read of '{key}' failed: {e}");
                None
            }
        }
    }

    fn estimate_area(&self, tier: Tier, area: &dyn StorageArea) -> u64 {
        let prefix = tier_prefix(&self.config.namespace, tier);
        let keys = area.keys().unwrap_or_default();
        keys.iter()
            .filter(|k| k.starts_with(&prefix))
            .filter_map(|k| {
                let value = area.get_item(k).ok()??;
                Some((serialized_len(k) + serialized_len(&value)) as u64 * 2)
            })
            .sum()
    }

    async fn estimate_objects(&self, store: &dyn ObjectStore) -> u64 {
        let prefix = tier_prefix(&self.config.namespace, Tier::LargeObject);
        let keys = store.keys().await.unwrap_or_default();
        let mut bytes = 0;
        for k in keys.iter().filter(|k| k.starts_with(&prefix)) {
            if let Ok(Some(value)) = store.get(k).await {
                bytes += (serialized_len(k) + serialized_len(&value)) as u64 * 2;
            }
        }
        bytes
    }

    fn publish(&self, ev: StorageEvent) {
        if let Some(bus) = self.bus.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
            bus.publish(ev);
        }
    }
}
