use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use super::{CacheKey, ResponseStore, StoredResponse};

/// A cached response plus its expiry deadline
#[derive(Debug, Clone)]
struct CacheEntry {
    response: StoredResponse,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory response store backed by a concurrent map.
///
/// Expired entries are dropped on lookup; long-running processes can also
/// call [`InMemoryStore::purge_expired`] periodically to reclaim memory for
/// keys that are never requested again.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: DashMap<CacheKey, CacheEntry>,
}

impl InMemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, including not-yet-purged expired ones
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the store holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry
    pub fn purge_expired(&self) {
        self.entries.retain(|_, entry| !entry.is_expired());
    }
}

impl ResponseStore for InMemoryStore {
    fn get(&self, key: &CacheKey) -> Option<StoredResponse> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                return Some(entry.response.clone());
            }
        }
        // Dead entry, reclaim it
        self.entries.remove_if(key, |_, entry| entry.is_expired());
        None
    }

    fn put(&self, key: CacheKey, response: StoredResponse, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        self.entries.insert(
            key,
            CacheEntry {
                response,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}
