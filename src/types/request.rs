use bytes::Bytes;
use http::{HeaderMap, Method};
use url::Url;

use crate::ratelimit::DestinationKey;

/// Per-call request data handed to the client.
///
/// The destination hint travels as an explicit field rather than inside the
/// headers, so it can never leak to the remote host. It only selects which
/// rate limiter gates the dispatch; requests without a hint (or with one no
/// limiter is registered for) are never throttled.
///
/// A `RequestContext` is transient: it is consumed by the call and never
/// persisted.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// HTTP method
    pub method: Method,
    /// Target URL
    pub url: Url,
    /// Additional request headers, merged over the client's defaults
    pub headers: HeaderMap,
    /// Optional request body
    pub body: Option<Bytes>,
    /// Which limiter gates this request, if any
    pub destination: Option<DestinationKey>,
}

impl RequestContext {
    /// A `GET` request for the given URL
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// A `POST` request for the given URL
    #[must_use]
    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    /// A request with the given method and URL
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            destination: None,
        }
    }

    /// Route this request through the limiter registered for `destination`
    #[must_use]
    pub fn with_destination<K: Into<DestinationKey>>(mut self, destination: K) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Add a request header
    #[must_use]
    pub fn with_header(mut self, name: http::HeaderName, value: http::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach a request body
    #[must_use]
    pub fn with_body<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.body = Some(body.into());
        self
    }
}
