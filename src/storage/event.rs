use serde::Serialize;
use tokio::sync::broadcast;

use super::types::Tier;

/// A handle for receiving storage change notifications.
pub type ChangeFeed = broadcast::Receiver<StorageEvent>;

/// Change to the contents of a facade's tiers.
///
/// Unlike per-key subscriptions, which only see new values, the feed also
/// reports removals so that a sync layer can mirror tier contents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StorageEvent {
    Set { key: String, tier: Tier, size: usize },
    Removed { key: String },
    Cleared,
}

impl StorageEvent {
    pub fn key(&self) -> Option<&str> {
        match self {
            StorageEvent::Set { key, .. } | StorageEvent::Removed { key } => Some(key),
            StorageEvent::Cleared => None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct StorageBus {
    tx: broadcast::Sender<StorageEvent>,
}

impl StorageBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> ChangeFeed {
        self.tx.subscribe()
    }

    pub fn publish(&self, ev: StorageEvent) {
        // send() fails only when there are no receivers, which is fine
        let _ = self.tx.send(ev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn receivers_see_events_published_after_subscribing() {
        let bus = StorageBus::new(8);
        bus.publish(StorageEvent::Cleared); // nobody listening

        let mut rx = bus.subscribe();
        bus.publish(StorageEvent::Set {
            key: "k".into(),
            tier: Tier::Durable,
            size: 3,
        });
        bus.publish(StorageEvent::Removed { key: "k".into() });

        let first = rx.recv().await.unwrap();
        assert_eq!(first.key(), Some("k"));
        assert!(matches!(first, StorageEvent::Set { tier: Tier::Durable, .. }));
        assert_eq!(rx.recv().await.unwrap(), StorageEvent::Removed { key: "k".into() });
    }

    #[test]
    fn serializes_with_type_tag() {
        let ev = StorageEvent::Set {
            key: "templates".into(),
            tier: Tier::LargeObject,
            size: 10,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "set");
        assert_eq!(json["tier"], "largeObject");
        assert_eq!(StorageEvent::Cleared.key(), None);
    }
}
