use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::types::Tier;

/// Where a `get` was answered from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum HitSource {
    Cache,
    Tier(Tier),
    Fallback,
}

/// Process-wide counters of one facade. Only ever incremented.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
    sets: AtomicU64,
    hits_cache: AtomicU64,
    hits_session: AtomicU64,
    hits_durable: AtomicU64,
    hits_large_object: AtomicU64,
    hits_fallback: AtomicU64,
    misses: AtomicU64,
}

impl Metrics {
    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hit(&self, source: HitSource) {
        let counter = match source {
            HitSource::Cache => &self.hits_cache,
            HitSource::Tier(Tier::Session) => &self.hits_session,
            HitSource::Tier(Tier::Durable) => &self.hits_durable,
            HitSource::Tier(Tier::LargeObject) => &self.hits_large_object,
            HitSource::Fallback => &self.hits_fallback,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sets: self.sets.load(Ordering::Relaxed),
            hits: HitCounts {
                cache: self.hits_cache.load(Ordering::Relaxed),
                session: self.hits_session.load(Ordering::Relaxed),
                durable: self.hits_durable.load(Ordering::Relaxed),
                large_object: self.hits_large_object.load(Ordering::Relaxed),
                fallback: self.hits_fallback.load(Ordering::Relaxed),
            },
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Read-only copy of the counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub sets: u64,
    pub hits: HitCounts,
    pub misses: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HitCounts {
    pub cache: u64,
    pub session: u64,
    pub durable: u64,
    pub large_object: u64,
    pub fallback: u64,
}

impl HitCounts {
    pub fn total(&self) -> u64 {
        self.cache + self.session + self.durable + self.large_object + self.fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_land_in_their_bucket() {
        let m = Metrics::default();
        m.record_set();
        m.record_hit(HitSource::Cache);
        m.record_hit(HitSource::Tier(Tier::LargeObject));
        m.record_hit(HitSource::Tier(Tier::LargeObject));
        m.record_miss();

        let s = m.snapshot();
        assert_eq!(s.sets, 1);
        assert_eq!(s.hits.cache, 1);
        assert_eq!(s.hits.large_object, 2);
        assert_eq!(s.hits.total(), 3);
        assert_eq!(s.misses, 1);
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let s = Metrics::default().snapshot();
        let json = serde_json::to_value(s).unwrap();
        assert_eq!(json["hits"]["largeObject"], 0);
        assert_eq!(json["misses"], 0);
    }
}
