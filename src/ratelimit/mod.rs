//! Per-destination rate limiting and request dispatch.
//!
//! Every request to a throttled site passes through a token bucket selected
//! by a logical destination key, so the downloader as a whole never exceeds
//! a host's tolerance no matter how many crawlers target it concurrently.
//!
//! # Architecture
//!
//! - [`TokenBucket`]: the atomic unit of throttling, one per destination
//! - [`DestinationKey`]: logical identifier a crawler registers its throttle under
//! - [`LimiterRegistry`]: destination key → bucket, fixed at construction
//! - [`GatedTransport`]: gates each outgoing request on token acquisition
//! - [`ThrottleConfig`]: capacity and fill rate for one destination

mod bucket;
mod config;
mod dispatch;
mod key;
mod registry;

pub use bucket::TokenBucket;
pub use config::{ThrottleConfig, ThrottleConfigs};
pub use dispatch::{DESTINATION_HEADER, GatedTransport};
pub use key::DestinationKey;
pub use registry::LimiterRegistry;
