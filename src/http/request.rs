//! Decoded request representation.
//!
//! # Responsibilities
//! - Hold the fields produced by the decoder for one connection
//! - Offer read-only accessors to handlers
//! - Re-encode a request into wire form (used by clients and tests)
//!
//! # Design Decisions
//! - Immutable after decode: handlers only ever see `&Request`
//! - Header names and values are lowercase and trimmed; last value wins
//! - The path is used for routing only and is not exposed outside the crate

use std::collections::HashMap;

/// Name of the header that carries the body length.
pub const CONTENT_LENGTH: &str = "content-length";

/// A request decoded from a single connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    /// Request method as sent (e.g. "GET", "POST").
    pub method: String,

    /// Protocol version from the start line (e.g. "HTTP/1.1").
    pub protocol_version: String,

    /// Lowercase, trimmed header names mapped to lowercase, trimmed values.
    pub headers: HashMap<String, String>,

    /// Declared body length, 0 when absent or unparseable.
    pub content_length: usize,

    /// Exactly `content_length` bytes, empty when no body was declared.
    pub payload: Vec<u8>,

    pub(crate) path: String,
}

impl Request {
    /// Look up a header value. The name is matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(String::as_str)
    }

    /// Serialize the request back into wire form.
    ///
    /// Headers are emitted in their normalized (lowercase) form; order is unspecified.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64 + self.payload.len());
        buf.extend_from_slice(self.method.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.path.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.protocol_version.as_bytes());
        buf.extend_from_slice(b"\r\n");

        for (name, value) in &self.headers {
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }

        buf.extend_from_slice(b"\r\n");
        buf.extend_from_slice(&self.payload);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let mut request = Request::default();
        request
            .headers
            .insert("content-type".into(), "application/json".into());

        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(request.header("accept"), None);
    }

    #[test]
    fn header_lookup_folds_non_ascii_names() {
        let mut request = Request::default();
        request.headers.insert("äx".into(), "v".into());

        assert_eq!(request.header("ÄX"), Some("v"));
    }

    #[test]
    fn encode_writes_start_line_first() {
        let request = Request {
            method: "GET".into(),
            protocol_version: "HTTP/1.1".into(),
            path: "/test".into(),
            ..Default::default()
        };

        assert_eq!(request.encode(), b"GET /test HTTP/1.1\r\n\r\n");
    }
}
