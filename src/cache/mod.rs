//! Response caching for the transport session.
//!
//! The cache is an opaque key-value service: the session computes a
//! [`CacheKey`] from request identity, looks it up before consuming any
//! rate-limit token, and stores successful raw responses after the fact.
//! Entry expiry is owned by the store implementation, not by the session.

mod memory;

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, StatusCode, header};
use url::Url;

pub use memory::InMemoryStore;

use crate::types::RequestContext;

/// Canonical identity of a request for caching purposes.
///
/// Built from the method, the full URL, and the request headers that change
/// what a host would answer (`Accept` and `Range`). The destination hint is
/// deliberately *not* part of the key: it selects a limiter, not a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Compute the cache key for a request
    #[must_use]
    pub fn from_context(ctx: &RequestContext) -> Self {
        let mut key = format!("{} {}", ctx.method, ctx.url);
        for name in [header::ACCEPT, header::RANGE] {
            if let Some(value) = ctx.headers.get(&name) {
                if let Ok(value) = value.to_str() {
                    key.push_str(&format!(" {name}:{value}"));
                }
            }
        }
        CacheKey(key)
    }

    /// The canonical key string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A raw response snapshot that can live in the cache.
///
/// This abstraction exists because [`reqwest::Response`] cannot be cached
/// directly, since it does not implement [`Clone`]. The body is kept as
/// bytes; envelope construction decodes it per call.
#[derive(Debug, Clone)]
pub struct StoredResponse {
    /// Status code of the response
    pub status: StatusCode,
    /// Final URL, after redirects
    pub url: Url,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw response body
    pub body: Bytes,
}

impl StoredResponse {
    /// Snapshot a live response, consuming its body.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ErrorKind::ReadResponseBody`] if the body cannot be
    /// read off the wire.
    pub async fn from_response(response: reqwest::Response) -> crate::Result<Self> {
        let status = response.status();
        let url = response.url().clone();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(crate::ErrorKind::ReadResponseBody)?;

        Ok(Self {
            status,
            url,
            headers,
            body,
        })
    }

    /// The `Content-Type` header, lowercased, or an empty string
    #[must_use]
    pub fn content_type(&self) -> String {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_lowercase()
    }
}

/// Contract for the cache store backing a session.
///
/// Implementations must be safe for concurrent lookup and insert; the
/// session calls them from many in-flight requests without extra locking.
/// Expiry is evaluated by the store: `get` must never return a dead entry.
pub trait ResponseStore: fmt::Debug + Send + Sync {
    /// Look up a live entry
    fn get(&self, key: &CacheKey) -> Option<StoredResponse>;

    /// Store an entry for at most `ttl`. A zero `ttl` disables storage and
    /// must be a no-op.
    fn put(&self, key: CacheKey, response: StoredResponse, ttl: Duration);
}
