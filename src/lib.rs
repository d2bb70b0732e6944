//! `fetchgate` is the shared HTTP access layer beneath a multi-site content
//! downloader. Site crawlers issue every request through one
//! [`FetchClient`], which enforces a per-destination request-rate quota,
//! transparently reuses previously-fetched responses, and returns immutable
//! typed response envelopes.
//!
//! ```no_run
//! use fetchgate::{
//!     BodyFormat, ClientBuilder, DestinationKey, RequestContext, Result, ThrottleConfig,
//! };
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = ClientBuilder::builder()
//!         .throttles([(DestinationKey::from("site-x"), ThrottleConfig::per_second(5.0))])
//!         .cache_ttl(Duration::from_secs(300))
//!         .build()
//!         .client()?;
//!
//!     let ctx = RequestContext::get("https://example.com/gallery/1".parse().unwrap())
//!         .with_destination("site-x");
//!     let envelope = client.fetch(ctx, BodyFormat::Document).await?;
//!     println!("fetched {}", envelope.url());
//!     Ok(())
//! }
//! ```
#![warn(missing_docs)]

mod client;
mod types;

pub mod cache;
pub mod ratelimit;

pub use client::{ClientBuilder, DEFAULT_MAX_REDIRECTS, DEFAULT_USER_AGENT, FetchClient};
pub use ratelimit::{
    DESTINATION_HEADER, DestinationKey, LimiterRegistry, ThrottleConfig, ThrottleConfigs,
    TokenBucket,
};
pub use types::{
    BodyFormat, DocumentEnvelope, ErrorKind, JsonEnvelope, RawJsonEnvelope, RequestContext,
    ResponseEnvelope, Result,
};
