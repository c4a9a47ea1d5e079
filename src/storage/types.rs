use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Physical tier that can hold the authoritative value of a key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Tier {
    Session,
    Durable,
    LargeObject,
}

impl Tier {
    /// Lookup order after the memory cache.
    pub const LOOKUP_ORDER: [Tier; 3] = [Tier::Session, Tier::Durable, Tier::LargeObject];

    /// Whether lookups reach `self` before `other`.
    pub fn precedes(self, other: Tier) -> bool {
        let rank = |t: Tier| Tier::LOOKUP_ORDER.iter().position(|o| *o == t);
        rank(self) < rank(other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Session => "session",
            Tier::Durable => "durable",
            Tier::LargeObject => "large-object",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Size class derived from the serialized length of a value.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SizeClass {
    Small,
    Large,
}

impl SizeClass {
    pub fn classify(serialized: &str, threshold: usize) -> Self {
        if serialized_len(serialized) >= threshold {
            SizeClass::Large
        } else {
            SizeClass::Small
        }
    }
}

/// Length in UTF-16 code units, the unit browser storage quotas are counted in.
pub fn serialized_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Picks the tier that becomes authoritative for a write.
pub fn placement(size: SizeClass, temporary: bool) -> Tier {
    if temporary {
        return Tier::Session;
    }
    match size {
        SizeClass::Small => Tier::Durable,
        SizeClass::Large => Tier::LargeObject,
    }
}

/// Physical key for a logical key: `{namespace}:{tier}:{key}`.
pub fn physical_key(namespace: &str, tier: Tier, key: &str) -> String {
    format!("{namespace}:{tier}:{key}")
}

/// Prefix shared by every physical key of a namespace in a tier.
pub fn tier_prefix(namespace: &str, tier: Tier) -> String {
    format!("{namespace}:{tier}:")
}

/// Options for [`StorageFacade::get`](super::StorageFacade::get).
#[derive(Clone, Debug, Default)]
pub struct GetOptions {
    /// Returned (and not cached) when nothing is stored under the key.
    pub default_value: Option<Value>,
    /// Consult the fallback area when a tier was unavailable during lookup.
    pub fallback: bool,
}

impl GetOptions {
    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_fallback(mut self) -> Self {
        self.fallback = true;
        self
    }
}

/// Options for [`StorageFacade::set`](super::StorageFacade::set).
#[derive(Clone, Copy, Debug, Default)]
pub struct SetOptions {
    /// Bound the value's lifetime to the session, regardless of its size.
    pub temporary: bool,
}

impl SetOptions {
    pub fn temporary() -> Self {
        Self { temporary: true }
    }
}

/// Approximate byte usage per tier, covering only the facade's namespace.
///
/// Every figure counts two bytes per UTF-16 code unit of keys and values,
/// whether the tier reports it natively or the facade estimates it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub durable: u64,
    pub session: u64,
    pub large_object: u64,
    pub memory_cache: u64,
    pub total: u64,
}
