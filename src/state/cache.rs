use moka::future::Cache;
use std::hash::Hash;
use std::time::Duration;

/// Bounded TTL cache for lookups against the chat platform
#[derive(Clone)]
pub struct TtlCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    cache: Cache<K, V>,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: K, value: V) {
        self.cache.insert(key, value).await;
    }
}

/// Remembers platform event ids so redelivered events are dropped
#[derive(Clone)]
pub struct DeliveryTracker {
    seen: Cache<String, ()>,
}

impl DeliveryTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// True the first time an event id is offered within the TTL
    pub async fn first_delivery(&self, event_id: &str) -> bool {
        self.seen
            .entry(event_id.to_string())
            .or_insert(())
            .await
            .is_fresh()
    }
}
