//! The cached transport session.
//!
//! This module defines two structs, [`FetchClient`] and [`ClientBuilder`].
//! `FetchClient` is the single HTTP client every site crawler issues its
//! requests through; `ClientBuilder` exposes a finer level of granularity
//! for building one.
//!
//! The client is an explicit composition of three layers, checked in this
//! order: the response cache, the per-destination rate limiter, and the
//! network transport. A cache hit returns the stored response without
//! consuming a rate-limit token or touching the network.
use std::sync::Arc;
use std::time::Duration;

use http::header::{self, HeaderMap, HeaderValue};
use typed_builder::TypedBuilder;

use crate::cache::{CacheKey, InMemoryStore, ResponseStore, StoredResponse};
use crate::ratelimit::{GatedTransport, LimiterRegistry, ThrottleConfig, ThrottleConfigs, TokenBucket};
use crate::types::{BodyFormat, ErrorKind, RequestContext, ResponseEnvelope, Result};

/// Default number of redirects before a request is deemed as failed, 5.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;
/// Default user agent, `fetchgate-<PKG_VERSION>`.
pub const DEFAULT_USER_AGENT: &str = concat!("fetchgate/", env!("CARGO_PKG_VERSION"));

// Constants currently not configurable by the user.
/// A timeout for only the connect phase of a request.
const CONNECT_TIMEOUT: u64 = 10;
/// TCP keepalive
/// See <https://tldp.org/HOWTO/TCP-Keepalive-HOWTO/overview.html> for more info
const TCP_KEEPALIVE: u64 = 60;

/// Builder for [`FetchClient`].
///
/// See crate-level documentation for usage example.
#[derive(TypedBuilder, Debug)]
#[builder(field_defaults(default, setter(into)))]
#[builder(builder_method(doc = "
Create a builder for building `ClientBuilder`.

On the builder call, call methods with same name as its fields to set their values.

Finally, call `.build()` to create the instance of `ClientBuilder`.
"))]
pub struct ClientBuilder {
    /// User-agent used for all requests
    #[builder(default_code = "String::from(DEFAULT_USER_AGENT)")]
    user_agent: String,

    /// Sets the default headers for every request.
    ///
    /// This allows working around validation issues on some websites.
    custom_headers: HeaderMap,

    /// Response timeout per request
    timeout: Option<Duration>,

    /// Maximum number of redirects per request before returning an error
    #[builder(default = DEFAULT_MAX_REDIRECTS)]
    max_redirects: usize,

    /// When `true`, accept invalid SSL certificates.
    ///
    /// ## Warning
    ///
    /// You should think very carefully before using this method. If
    /// invalid certificates are trusted, any certificate for any site
    /// will be trusted for use. This includes expired certificates.
    allow_insecure: bool,

    /// Per-destination throttle settings.
    ///
    /// The registry built from this map is fixed for the client's lifetime;
    /// destinations not listed here are never throttled.
    throttles: ThrottleConfigs,

    /// An additional throttle shared by *all* destinations, acquired before
    /// any per-destination limiter. `None` disables it.
    global_throttle: Option<ThrottleConfig>,

    /// How long stored responses stay valid. The default of zero disables
    /// caching entirely.
    cache_ttl: Duration,

    /// The cache store backing the session. Defaults to a fresh
    /// [`InMemoryStore`]; pass a shared store to reuse responses across
    /// clients.
    store: Option<Arc<dyn ResponseStore>>,
}

impl Default for ClientBuilder {
    #[inline]
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClientBuilder {
    /// Instantiates a [`FetchClient`].
    ///
    /// # Errors
    ///
    /// Returns an `Err` if:
    /// - The user-agent is invalid.
    /// - The request client cannot be created.
    ///   See [here](https://docs.rs/reqwest/latest/reqwest/struct.ClientBuilder.html#errors).
    pub fn client(self) -> Result<FetchClient> {
        let Self {
            user_agent,
            custom_headers: mut headers,
            timeout,
            max_redirects,
            allow_insecure,
            throttles,
            global_throttle,
            cache_ttl,
            store,
        } = self;

        headers.insert(header::USER_AGENT, HeaderValue::from_str(&user_agent)?);

        let builder = reqwest::ClientBuilder::new()
            .gzip(true)
            .default_headers(headers)
            .danger_accept_invalid_certs(allow_insecure)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT))
            .tcp_keepalive(Duration::from_secs(TCP_KEEPALIVE))
            .redirect(reqwest::redirect::Policy::limited(max_redirects));

        let reqwest_client = (match timeout {
            Some(t) => builder.timeout(t),
            None => builder,
        })
        .build()
        .map_err(ErrorKind::BuildRequestClient)?;

        let registry = Arc::new(LimiterRegistry::new(throttles));
        let global = global_throttle
            .filter(|config| !config.is_unlimited())
            .map(|config| Arc::new(TokenBucket::new(config.capacity, config.fill_rate)));

        let store = store.unwrap_or_else(|| Arc::new(InMemoryStore::new()));

        Ok(FetchClient {
            transport: GatedTransport::new(reqwest_client, registry, global),
            store,
            cache_ttl,
        })
    }
}

/// The shared HTTP access layer beneath a catalogue of site crawlers.
///
/// Cloning is cheap; clones share the limiter registry and the cache store,
/// so every crawler in the process sees the same throttles and the same
/// cached responses.
///
/// See [`ClientBuilder`] which contains sane defaults for all configuration
/// options.
#[derive(Debug, Clone)]
pub struct FetchClient {
    /// Rate-limiting transport every network call goes through
    transport: GatedTransport,

    /// Response cache, consulted before any token is spent
    store: Arc<dyn ResponseStore>,

    /// Validity window for stored responses; zero disables caching
    cache_ttl: Duration,
}

impl FetchClient {
    /// Fetch a response envelope, going through cache and rate limiter.
    ///
    /// On a cache hit the stored response is returned without consuming a
    /// rate-limit token and without network I/O. On a miss the request is
    /// gated on its destination's limiter, executed, stored (success only)
    /// and decoded into the variant declared by `format`.
    ///
    /// # Errors
    ///
    /// Transport errors (network failure, non-success status) propagate
    /// unmodified and are never cached. Decode errors are reported
    /// distinctly, see [`ErrorKind::is_decode`].
    pub async fn fetch(
        &self,
        ctx: RequestContext,
        format: BodyFormat,
    ) -> Result<ResponseEnvelope> {
        let key = CacheKey::from_context(&ctx);
        if let Some(stored) = self.store.get(&key) {
            log::debug!("Cache hit for {key}");
            return ResponseEnvelope::from_stored(&stored, format);
        }

        let stored = self.execute_and_snapshot(ctx).await?;
        self.store.put(key, stored.clone(), self.cache_ttl);
        ResponseEnvelope::from_stored(&stored, format)
    }

    /// Like [`FetchClient::fetch`], but bypassing the cache for this call:
    /// no lookup, no store. The rate limiter still applies.
    ///
    /// # Errors
    ///
    /// Same as [`FetchClient::fetch`].
    pub async fn fetch_uncached(
        &self,
        ctx: RequestContext,
        format: BodyFormat,
    ) -> Result<ResponseEnvelope> {
        let stored = self.execute_and_snapshot(ctx).await?;
        ResponseEnvelope::from_stored(&stored, format)
    }

    /// Fetch the live response without caching, for callers that stream
    /// large bodies. The dispatch gate still applies; only cache lookup and
    /// store are skipped.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the request fails or the host answers
    /// with a non-success status.
    pub async fn fetch_raw(&self, ctx: RequestContext) -> Result<reqwest::Response> {
        let response = self.transport.execute(ctx).await?;
        Self::check_status(&response)?;
        Ok(response)
    }

    /// Gate, execute, verify and snapshot a request. Failed requests are
    /// returned as errors before anything could be written to the cache.
    async fn execute_and_snapshot(&self, ctx: RequestContext) -> Result<StoredResponse> {
        let response = self.transport.execute(ctx).await?;
        Self::check_status(&response)?;
        StoredResponse::from_response(response).await
    }

    /// Reject non-success responses. Redirects are followed by the
    /// underlying client, so a redirection status here means the redirect
    /// limit was exhausted; it still counts as reachable.
    fn check_status(response: &reqwest::Response) -> Result<()> {
        let status = response.status();
        if status.is_success() || status.is_redirection() {
            return Ok(());
        }
        Err(ErrorKind::RejectedStatusCode {
            status,
            url: response.url().clone(),
        })
    }
}
