use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde_json::Value;
use uuid::Uuid;

/// Callback invoked with the new value after a successful `set`.
pub type Callback = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Observers keyed by exact key, kept in registration order.
#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    observers: Mutex<HashMap<String, Vec<(SubscriberId, Callback)>>>,
}

impl SubscriberRegistry {
    pub fn register(self: &Arc<Self>, key: &str, callback: Callback) -> Subscription {
        let id = SubscriberId::new();
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.to_string())
            .or_default()
            .push((id, callback));

        Subscription {
            registry: Arc::downgrade(self),
            key: key.to_string(),
            id,
        }
    }

    fn remove(&self, key: &str, id: SubscriberId) {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(list) = observers.get_mut(key) {
            list.retain(|(sid, _)| *sid != id);
            if list.is_empty() {
                observers.remove(key);
            }
        }
    }

    /// Calls every observer of `key` with `value`.
    ///
    /// The lock is released before the callbacks run, so a callback may
    /// subscribe or unsubscribe without deadlocking.
    pub fn notify(&self, key: &str, value: &Value) {
        let callbacks: Vec<Callback> = {
            let observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
            match observers.get(key) {
                Some(list) => list.iter().map(|(_, cb)| cb.clone()).collect(),
                None => return,
            }
        };
        for cb in callbacks {
            cb(value);
        }
    }

    pub fn count(&self, key: &str) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map_or(0, Vec::len)
    }

    pub fn clear(&self) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Disposer handle returned by `subscribe`.
///
/// Dropping the handle keeps the subscription alive; call
/// [`unsubscribe`](Subscription::unsubscribe) to stop notifications.
#[must_use = "keep the handle to be able to unsubscribe"]
pub struct Subscription {
    registry: Weak<SubscriberRegistry>,
    key: String,
    id: SubscriberId,
}

impl Subscription {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Removes the callback; no later `set` will reach it.
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.key, self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
