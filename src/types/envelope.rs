use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use scraper::Html;
use serde_json::Value;
use url::Url;

use crate::cache::StoredResponse;
use crate::types::{ErrorKind, Result};

/// Which derived representation the caller expects from a response body.
///
/// Declared at the call site; the session builds the matching
/// [`ResponseEnvelope`] variant and fails with a decode error if the body
/// does not fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    /// An HTML (or plain text) page to be queried as a tag tree
    Document,
    /// A JSON body, decoded into a structured value
    Json,
    /// A JSON body plus the original bytes, for callers needing both
    JsonWithRaw,
}

/// The base shape every envelope variant shares
#[derive(Debug, Clone)]
struct EnvelopeParts {
    /// Final URL, after redirects
    url: Url,
    /// Response status code
    status: StatusCode,
    /// Response headers
    headers: HeaderMap,
}

impl EnvelopeParts {
    fn from_stored(stored: &StoredResponse) -> Self {
        Self {
            url: stored.url.clone(),
            status: stored.status,
            headers: stored.headers.clone(),
        }
    }
}

/// An immutable, typed wrapper around a raw transport response.
///
/// Envelopes are frozen after construction: no field is ever mutated, so
/// they are safe to share across concurrent readers without synchronization.
/// Construction is pure and synchronous; all I/O happened before.
#[derive(Debug, Clone)]
pub enum ResponseEnvelope {
    /// An HTML page (the *Get* envelope)
    Document(DocumentEnvelope),
    /// A decoded JSON body (the *Json* envelope)
    Json(JsonEnvelope),
    /// A decoded JSON body plus the raw bytes (the *Post* envelope)
    JsonWithRaw(RawJsonEnvelope),
}

impl ResponseEnvelope {
    /// Build the envelope variant the caller declared from a raw response.
    ///
    /// # Errors
    ///
    /// Returns a decode error ([`ErrorKind::UnexpectedContentType`],
    /// [`ErrorKind::JsonDecode`] or [`ErrorKind::InvalidUtf8`]) if the body
    /// does not carry the declared representation. Decode errors are
    /// distinct from transport errors: the host answered, but with content
    /// the caller did not expect.
    pub fn from_stored(stored: &StoredResponse, format: BodyFormat) -> Result<Self> {
        match format {
            BodyFormat::Document => Ok(Self::Document(DocumentEnvelope::from_stored(stored)?)),
            BodyFormat::Json => Ok(Self::Json(JsonEnvelope::from_stored(stored)?)),
            BodyFormat::JsonWithRaw => {
                Ok(Self::JsonWithRaw(RawJsonEnvelope::from_stored(stored)?))
            }
        }
    }

    /// Final URL of the response, after redirects
    #[must_use]
    pub fn url(&self) -> &Url {
        match self {
            Self::Document(e) => &e.parts.url,
            Self::Json(e) => &e.parts.url,
            Self::JsonWithRaw(e) => &e.json.parts.url,
        }
    }

    /// Response status code
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Document(e) => e.parts.status,
            Self::Json(e) => e.parts.status,
            Self::JsonWithRaw(e) => e.json.parts.status,
        }
    }

    /// Response headers
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        match self {
            Self::Document(e) => &e.parts.headers,
            Self::Json(e) => &e.parts.headers,
            Self::JsonWithRaw(e) => &e.json.parts.headers,
        }
    }

    /// The document envelope, if that is what was built
    #[must_use]
    pub fn as_document(&self) -> Option<&DocumentEnvelope> {
        match self {
            Self::Document(e) => Some(e),
            _ => None,
        }
    }

    /// The decoded JSON value, for the `Json` and `JsonWithRaw` variants
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(e) => Some(&e.value),
            Self::JsonWithRaw(e) => Some(&e.json.value),
            Self::Document(_) => None,
        }
    }
}

/// An HTML response with its source text.
///
/// The tag tree is parsed on demand rather than stored, which keeps the
/// envelope shareable across tasks; parsing is pure, synchronous and
/// error-tolerant (malformed markup still yields a tree).
#[derive(Debug, Clone)]
pub struct DocumentEnvelope {
    parts: EnvelopeParts,
    text: String,
}

impl DocumentEnvelope {
    fn from_stored(stored: &StoredResponse) -> Result<Self> {
        let content_type = stored.content_type();
        if !content_type.contains("html") && !content_type.contains("text") {
            return Err(ErrorKind::UnexpectedContentType {
                expected: "a document",
                received: content_type,
            });
        }
        let text = String::from_utf8(stored.body.to_vec())?;
        Ok(Self {
            parts: EnvelopeParts::from_stored(stored),
            text,
        })
    }

    /// The raw page source
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parse the page into a queryable tag tree
    #[must_use]
    pub fn document(&self) -> Html {
        Html::parse_document(&self.text)
    }
}

/// A response with a decoded JSON body
#[derive(Debug, Clone)]
pub struct JsonEnvelope {
    parts: EnvelopeParts,
    value: Value,
}

impl JsonEnvelope {
    fn from_stored(stored: &StoredResponse) -> Result<Self> {
        if stored.status == StatusCode::NO_CONTENT {
            return Err(ErrorKind::UnexpectedContentType {
                expected: "JSON",
                received: "no content (204)".to_string(),
            });
        }
        let content_type = stored.content_type();
        if !content_type.contains("json") && !content_type.contains("text/plain") {
            return Err(ErrorKind::UnexpectedContentType {
                expected: "JSON",
                received: content_type,
            });
        }
        let value = serde_json::from_slice(&stored.body)?;
        Ok(Self {
            parts: EnvelopeParts::from_stored(stored),
            value,
        })
    }

    /// The decoded body
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// A JSON response that also keeps the original payload bytes
#[derive(Debug, Clone)]
pub struct RawJsonEnvelope {
    json: JsonEnvelope,
    raw: Bytes,
}

impl RawJsonEnvelope {
    fn from_stored(stored: &StoredResponse) -> Result<Self> {
        Ok(Self {
            json: JsonEnvelope::from_stored(stored)?,
            raw: stored.body.clone(),
        })
    }

    /// The decoded body
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.json.value
    }

    /// The original, undecoded payload
    #[must_use]
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderValue, header};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn stored(content_type: &'static str, body: &'static str) -> StoredResponse {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(content_type),
        );
        StoredResponse {
            status: StatusCode::OK,
            url: Url::parse("https://example.com/page").unwrap(),
            headers,
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[test]
    fn test_envelopes_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ResponseEnvelope>();
    }

    #[test]
    fn test_document_envelope() {
        let stored = stored(
            "text/html; charset=utf-8",
            "<html><body><a href=\"/next\">next</a></body></html>",
        );
        let envelope = ResponseEnvelope::from_stored(&stored, BodyFormat::Document).unwrap();

        assert_eq!(envelope.status(), StatusCode::OK);
        assert_eq!(envelope.url().as_str(), "https://example.com/page");

        let document = envelope.as_document().unwrap().document();
        let selector = scraper::Selector::parse("a").unwrap();
        let link = document.select(&selector).next().unwrap();
        assert_eq!(link.value().attr("href"), Some("/next"));
    }

    #[test]
    fn test_document_rejects_wrong_content_type() {
        let stored = stored("application/octet-stream", "binary");
        let err = ResponseEnvelope::from_stored(&stored, BodyFormat::Document).unwrap_err();
        assert!(err.is_decode());
        assert!(matches!(err, ErrorKind::UnexpectedContentType { .. }));
    }

    #[test]
    fn test_json_envelope() {
        let stored = stored("application/json", r#"{"files": ["a.jpg", "b.jpg"]}"#);
        let envelope = ResponseEnvelope::from_stored(&stored, BodyFormat::Json).unwrap();
        assert_eq!(
            envelope.as_json().unwrap(),
            &json!({"files": ["a.jpg", "b.jpg"]})
        );
    }

    #[test]
    fn test_json_accepts_text_plain() {
        let stored = stored("text/plain", r#"{"ok": true}"#);
        assert!(ResponseEnvelope::from_stored(&stored, BodyFormat::Json).is_ok());
    }

    #[test]
    fn test_json_rejects_no_content() {
        let mut stored = stored("application/json", "");
        stored.status = StatusCode::NO_CONTENT;
        let err = ResponseEnvelope::from_stored(&stored, BodyFormat::Json).unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn test_malformed_json_is_a_decode_error() {
        let stored = stored("application/json", "{not json");
        let err = ResponseEnvelope::from_stored(&stored, BodyFormat::Json).unwrap_err();
        assert!(err.is_decode());
        assert!(!err.is_transport());
        assert!(matches!(err, ErrorKind::JsonDecode(_)));
    }

    #[test]
    fn test_json_with_raw_keeps_both() {
        let body = r#"{"token": "abc"}"#;
        let stored = stored("application/json", body);
        let envelope = ResponseEnvelope::from_stored(&stored, BodyFormat::JsonWithRaw).unwrap();

        let ResponseEnvelope::JsonWithRaw(raw) = &envelope else {
            panic!("expected raw+json envelope");
        };
        assert_eq!(raw.value(), &json!({"token": "abc"}));
        assert_eq!(raw.raw(), &Bytes::from_static(body.as_bytes()));
    }
}
