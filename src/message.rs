//! Request and response value objects exchanged with the host and with generators.
//!
//! Headers are kept in a [`HeaderVec`] so that the common case of a handful of
//! request headers stays on the stack during dispatch.

use std::borrow::Cow;
use std::sync::Arc;

use http::Method;
use serde_json::{json, Value};
use smallvec::SmallVec;

use crate::ids::{RequestId, REQUEST_ID_HEADER};

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage.
///
/// Names are `Arc<str>` because the same few names (`accept`, `content-type`)
/// repeat on every request.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Status text attached to responses whose status was coerced to 200.
pub const OVERRIDE_STATUS_TEXT: &str = "OK (negotiator override)";

/// Inbound request handed over by the host.
///
/// Generators receive exactly this value. The URL is only used for diagnostics.
#[derive(Debug, Clone)]
pub struct NegotiationRequest {
    /// Correlation id for log lines
    pub request_id: RequestId,
    /// HTTP method of the intercepted request
    pub method: Method,
    /// Identifying URL of the intercepted request
    pub url: String,
    /// Request headers (case-insensitive lookup)
    pub headers: HeaderVec,
    /// Request body parsed as JSON, if the host supplied one
    pub body: Option<Value>,
}

impl NegotiationRequest {
    /// A `GET` request for `url` with no headers.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            url: url.into(),
            headers: HeaderVec::new(),
            body: None,
        }
    }

    /// Builder-style header insertion (appends; duplicates are allowed).
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((Arc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Get a header by name (case-insensitive per RFC 7230).
    ///
    /// With duplicates the first occurrence wins.
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Copy method, URI and headers out of an `http::Request`.
    ///
    /// Header values that are not valid UTF-8 are skipped. The body is not read;
    /// hosts that want generators to see it attach it with [`Self::with_body`].
    #[must_use]
    pub fn from_http<B>(req: &http::Request<B>) -> Self {
        let mut headers = HeaderVec::new();
        for (name, value) in req.headers() {
            if let Ok(v) = value.to_str() {
                headers.push((Arc::from(name.as_str()), v.to_string()));
            }
        }
        let request_id = RequestId::from_header_or_new(
            req.headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok()),
        );
        Self {
            request_id,
            method: req.method().clone(),
            url: req.uri().to_string(),
            headers,
            body: None,
        }
    }
}

/// Status text carried in `http::Response` extensions by [`NegotiationResponse::into_http`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusText(pub Cow<'static, str>);

/// Outbound response produced by a generator or by the dispatcher itself.
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiationResponse {
    /// HTTP status code
    pub status: u16,
    /// Optional reason phrase; set when the dispatcher overrides the status
    pub status_text: Option<Cow<'static, str>>,
    /// HTTP response headers
    pub headers: HeaderVec,
    /// Response body. `Value::String` is written raw by [`Self::into_http`].
    pub body: Value,
}

impl NegotiationResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            status_text: None,
            headers,
            body,
        }
    }

    /// JSON response with `content-type: application/json`.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self::new(status, headers, body)
    }

    /// Textual response (HTML, plain text, CSV, ...) with the given content type.
    #[must_use]
    pub fn text(status: u16, content_type: &str, body: impl Into<String>) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), content_type.to_string()));
        Self::new(status, headers, Value::String(body.into()))
    }

    /// JSON error response `{"error": message}`.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, json!({ "error": message }))
    }

    /// Whether this value is usable as a response at all.
    ///
    /// Generators may hand back garbage statuses; those are treated like a
    /// declined generation.
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (100..=599).contains(&self.status)
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header (case-insensitive on the name).
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// Same headers and body, status forced to 200 with the override marker.
    #[must_use]
    pub fn into_forced_ok(self) -> Self {
        Self {
            status: 200,
            status_text: Some(Cow::Borrowed(OVERRIDE_STATUS_TEXT)),
            headers: self.headers,
            body: self.body,
        }
    }

    /// Convert into an `http::Response` for hosts built on the `http` crate.
    ///
    /// String bodies are written as raw bytes, anything else is serialized JSON.
    /// A JSON body without a content type gets `application/json`.
    pub fn into_http(self) -> anyhow::Result<http::Response<Vec<u8>>> {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(&**name, value.as_str());
        }
        let has_content_type = self.get_header("content-type").is_some();
        let bytes = match self.body {
            Value::String(s) => s.into_bytes(),
            other => {
                if !has_content_type {
                    builder = builder.header(http::header::CONTENT_TYPE, "application/json");
                }
                serde_json::to_vec(&other)?
            }
        };
        if let Some(text) = self.status_text {
            builder = builder.extension(StatusText(text));
        }
        Ok(builder.body(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_header_lookup_is_case_insensitive() {
        let req = NegotiationRequest::get("/a").with_header("Accept", "text/html");
        assert_eq!(req.get_header("accept"), Some("text/html"));
        assert_eq!(req.get_header("ACCEPT"), Some("text/html"));
        assert_eq!(req.get_header("content-type"), None);
    }

    #[test]
    fn test_validity_bounds() {
        assert!(NegotiationResponse::json(100, Value::Null).is_valid());
        assert!(NegotiationResponse::json(599, Value::Null).is_valid());
        assert!(!NegotiationResponse::json(0, Value::Null).is_valid());
        assert!(!NegotiationResponse::json(600, Value::Null).is_valid());
    }

    #[test]
    fn test_set_header_replaces() {
        let mut res = NegotiationResponse::json(200, Value::Null);
        res.set_header("Content-Type", "text/csv".into());
        assert_eq!(res.headers.len(), 1);
        assert_eq!(res.get_header("content-type"), Some("text/csv"));
    }

    #[test]
    fn test_into_forced_ok_keeps_body_and_headers() {
        let res = NegotiationResponse::text(404, "text/html", "<p>gone</p>").into_forced_ok();
        assert_eq!(res.status, 200);
        assert_eq!(res.status_text.as_deref(), Some(OVERRIDE_STATUS_TEXT));
        assert_eq!(res.get_header("content-type"), Some("text/html"));
        assert_eq!(res.body, Value::String("<p>gone</p>".into()));
    }
}
