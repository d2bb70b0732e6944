use http::StatusCode;
use thiserror::Error;
use url::Url;

use crate::ratelimit::DestinationKey;

/// Possible errors when interacting with `fetchgate`
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Network error while sending the request or awaiting the response head
    #[error("Network error while trying to connect to an endpoint")]
    NetworkRequest(#[source] reqwest::Error),

    /// Error while reading the response body off the wire
    #[error("Error while reading the response body")]
    ReadResponseBody(#[source] reqwest::Error),

    /// Error while building the underlying request client
    #[error("Error while building the request client")]
    BuildRequestClient(#[source] reqwest::Error),

    /// The remote host answered with a non-success status code.
    ///
    /// Responses with such codes are propagated to the caller and are never
    /// written to the cache.
    #[error("Rejected status code {status} for {url}")]
    RejectedStatusCode {
        /// The status code the host answered with
        status: StatusCode,
        /// The final URL of the response, after redirects
        url: Url,
    },

    /// A single acquisition asked for more tokens than the limiter can ever
    /// hold. Waiting would spin forever, so this fails immediately.
    #[error("Requested {requested} tokens but limiter{} holds at most {capacity}",
        .destination.as_ref().map_or(String::new(), |d| format!(" for `{d}`")))]
    ExceedsCapacity {
        /// Number of tokens the caller asked for
        requested: f64,
        /// Maximum number of tokens the bucket can hold
        capacity: f64,
        /// Destination the limiter belongs to, if known
        destination: Option<DestinationKey>,
    },

    /// The response body does not carry the content type the caller declared
    #[error("Received content type `{received}`, was expecting {expected}")]
    UnexpectedContentType {
        /// Content type family the caller asked for
        expected: &'static str,
        /// `Content-Type` header the host actually sent
        received: String,
    },

    /// The response body could not be decoded as JSON
    #[error("Response body is not valid JSON")]
    JsonDecode(#[from] serde_json::Error),

    /// The response body is not valid UTF-8
    #[error("Response body is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A configured header name or value could not be parsed
    #[error("Header could not be parsed")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),
}

impl ErrorKind {
    /// `true` if the destination was reached but its *content* was not what
    /// the caller declared. Distinct from transport failures so callers can
    /// tell "host unreachable" from "host answered something unexpected".
    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedContentType { .. } | Self::JsonDecode(_) | Self::InvalidUtf8(_)
        )
    }

    /// `true` if the request failed on the way to or from the remote host
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::NetworkRequest(_)
                | Self::ReadResponseBody(_)
                | Self::RejectedStatusCode { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exceeds_capacity_display() {
        let err = ErrorKind::ExceedsCapacity {
            requested: 5.0,
            capacity: 3.0,
            destination: Some(DestinationKey::from("site-x")),
        };
        assert_eq!(
            err.to_string(),
            "Requested 5 tokens but limiter for `site-x` holds at most 3"
        );
    }

    #[test]
    fn test_classification() {
        let decode = ErrorKind::UnexpectedContentType {
            expected: "JSON",
            received: "text/html".to_string(),
        };
        assert!(decode.is_decode());
        assert!(!decode.is_transport());

        let transport = ErrorKind::RejectedStatusCode {
            status: StatusCode::IM_A_TEAPOT,
            url: Url::parse("https://example.com").unwrap(),
        };
        assert!(transport.is_transport());
        assert!(!transport.is_decode());
    }
}
