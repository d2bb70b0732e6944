//! Core types used across the crate

mod envelope;
mod error;
mod request;

pub use envelope::{BodyFormat, DocumentEnvelope, JsonEnvelope, RawJsonEnvelope, ResponseEnvelope};
pub use error::ErrorKind;
pub use request::RequestContext;

/// The result type of this crate
pub type Result<T> = std::result::Result<T, ErrorKind>;
