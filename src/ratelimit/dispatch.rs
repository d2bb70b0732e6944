use std::sync::Arc;

use reqwest::{Request, Response};

use crate::ratelimit::{DestinationKey, LimiterRegistry, TokenBucket};
use crate::types::{ErrorKind, RequestContext, Result};

/// Reserved header carrying the destination hint for callers that cannot
/// pass it out-of-band. It selects a limiter and nothing else; the dispatch
/// layer removes it unconditionally before the request leaves the process.
pub const DESTINATION_HEADER: &str = "x-destination-key";

/// The limiting decorator around the raw HTTP transport.
///
/// Every outgoing request passes through here: the destination hint is
/// extracted (and the reserved header stripped), the matching limiter is
/// resolved, and dispatch is gated on token acquisition. Requests without a
/// recognized hint pass through a permanently-open gate.
///
/// Acquisition order is global bucket first, then the destination bucket,
/// then the network call.
#[derive(Debug, Clone)]
pub struct GatedTransport {
    client: reqwest::Client,
    registry: Arc<LimiterRegistry>,
    global: Option<Arc<TokenBucket>>,
}

impl GatedTransport {
    /// Create a transport gating requests on the given registry.
    ///
    /// `global` is an additional bucket shared by *all* destinations,
    /// applied before any per-destination limiter; `None` disables it.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        registry: Arc<LimiterRegistry>,
        global: Option<Arc<TokenBucket>>,
    ) -> Self {
        Self {
            client,
            registry,
            global,
        }
    }

    /// Gate and execute a request.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ExceedsCapacity`] if the limiter can never cover
    /// a single acquisition, or [`ErrorKind::NetworkRequest`] if the
    /// underlying transport fails.
    pub async fn execute(&self, ctx: RequestContext) -> Result<Response> {
        let (request, destination) = self.prepare(ctx)?;

        if let Some(global) = &self.global {
            global.acquire(1.0).await?;
        }

        match destination.as_ref().and_then(|key| self.registry.resolve(key)) {
            Some(limiter) => limiter.acquire(1.0).await?,
            None => {
                if let Some(key) = &destination {
                    log::debug!("No limiter registered for `{key}`, passing through");
                }
            }
        }

        self.client
            .execute(request)
            .await
            .map_err(ErrorKind::NetworkRequest)
    }

    /// Build the wire request and extract the destination hint.
    ///
    /// The explicit context field wins over the reserved header; the header
    /// is removed in every case so it can never reach the remote host.
    fn prepare(&self, ctx: RequestContext) -> Result<(Request, Option<DestinationKey>)> {
        let RequestContext {
            method,
            url,
            mut headers,
            body,
            destination,
        } = ctx;

        let header_hint = headers.remove(DESTINATION_HEADER).and_then(|value| {
            match value.to_str() {
                Ok(key) => Some(DestinationKey::from(key)),
                Err(_) => {
                    log::warn!("Ignoring non-ASCII destination hint header");
                    None
                }
            }
        });
        let destination = destination.or(header_hint);

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let request = builder.build().map_err(ErrorKind::NetworkRequest)?;

        Ok((request, destination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::ThrottleConfig;
    use http::{HeaderName, HeaderValue};
    use url::Url;

    fn transport() -> GatedTransport {
        let registry = LimiterRegistry::new(
            [(DestinationKey::from("site-x"), ThrottleConfig::per_second(1.0))].into(),
        );
        GatedTransport::new(reqwest::Client::new(), Arc::new(registry), None)
    }

    #[tokio::test]
    async fn test_prepare_strips_hint_header() {
        let ctx = RequestContext::get(Url::parse("https://example.com/a").unwrap()).with_header(
            HeaderName::from_static(DESTINATION_HEADER),
            HeaderValue::from_static("site-x"),
        );

        let (request, destination) = transport().prepare(ctx).unwrap();
        assert!(request.headers().get(DESTINATION_HEADER).is_none());
        assert_eq!(destination, Some(DestinationKey::from("site-x")));
    }

    #[tokio::test]
    async fn test_prepare_prefers_explicit_field_over_header() {
        let ctx = RequestContext::get(Url::parse("https://example.com/a").unwrap())
            .with_destination("site-y")
            .with_header(
                HeaderName::from_static(DESTINATION_HEADER),
                HeaderValue::from_static("site-x"),
            );

        let (request, destination) = transport().prepare(ctx).unwrap();
        assert!(request.headers().get(DESTINATION_HEADER).is_none());
        assert_eq!(destination, Some(DestinationKey::from("site-y")));
    }

    #[tokio::test]
    async fn test_prepare_keeps_other_headers() {
        let ctx = RequestContext::get(Url::parse("https://example.com/a").unwrap()).with_header(
            http::header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );

        let (request, destination) = transport().prepare(ctx).unwrap();
        assert_eq!(
            request.headers().get(http::header::ACCEPT).unwrap(),
            "application/json"
        );
        assert_eq!(destination, None);
    }
}
