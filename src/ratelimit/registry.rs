use std::collections::HashMap;
use std::sync::Arc;

use crate::ratelimit::{DestinationKey, ThrottleConfig, ThrottleConfigs, TokenBucket};

/// Maps destination keys to their rate limiters.
///
/// The registry is populated once at session construction and its key set is
/// immutable afterwards, so lookups need no locking. Each bucket within it
/// carries its own mutable state.
///
/// Unknown keys resolve to `None`; the dispatch layer treats those as
/// pass-through, so only destinations that explicitly registered a throttle
/// are ever gated.
#[derive(Debug, Default)]
pub struct LimiterRegistry {
    limiters: HashMap<DestinationKey, Arc<TokenBucket>>,
}

impl LimiterRegistry {
    /// Build a registry from per-destination throttle settings.
    ///
    /// Destinations configured as unlimited (capacity `0`) still get a
    /// bucket; it is permanently open.
    #[must_use]
    pub fn new(configs: ThrottleConfigs) -> Self {
        let limiters = configs
            .into_iter()
            .map(|(key, config)| {
                let bucket = TokenBucket::labeled(key.clone(), config.capacity, config.fill_rate);
                (key, Arc::new(bucket))
            })
            .collect();
        Self { limiters }
    }

    /// Look up the limiter for a destination, if one was registered
    #[must_use]
    pub fn resolve(&self, key: &DestinationKey) -> Option<Arc<TokenBucket>> {
        self.limiters.get(key).cloned()
    }

    /// Number of registered destinations
    #[must_use]
    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    /// `true` if no destination registered a throttle
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }

    /// Iterate over the registered destination keys
    pub fn destinations(&self) -> impl Iterator<Item = &DestinationKey> {
        self.limiters.keys()
    }
}

impl From<ThrottleConfigs> for LimiterRegistry {
    fn from(configs: ThrottleConfigs) -> Self {
        Self::new(configs)
    }
}

impl FromIterator<(DestinationKey, ThrottleConfig)> for LimiterRegistry {
    fn from_iter<I: IntoIterator<Item = (DestinationKey, ThrottleConfig)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> LimiterRegistry {
        [
            (DestinationKey::from("site-x"), ThrottleConfig::per_second(5.0)),
            (DestinationKey::from("site-y"), ThrottleConfig::unlimited()),
        ]
        .into_iter()
        .collect()
    }

    #[tokio::test]
    async fn test_resolve_registered_destination() {
        let registry = registry();
        let bucket = registry.resolve(&DestinationKey::from("site-x")).unwrap();
        assert!((bucket.capacity() - 5.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_resolve_unknown_destination() {
        let registry = registry();
        assert!(registry.resolve(&DestinationKey::from("elsewhere")).is_none());
    }

    #[tokio::test]
    async fn test_unlimited_destination_gets_open_bucket() {
        let registry = registry();
        let bucket = registry.resolve(&DestinationKey::from("site-y")).unwrap();
        assert!(bucket.is_disabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolved_buckets_share_state() {
        let registry = registry();
        let key = DestinationKey::from("site-x");
        let first = registry.resolve(&key).unwrap();
        let second = registry.resolve(&key).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        first.acquire(2.0).await.unwrap();
        assert!((second.balance() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_len_and_destinations() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
        assert_eq!(registry.destinations().count(), 2);
    }
}
