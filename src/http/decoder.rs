//! Request decoding from a raw byte stream.
//!
//! # Grammar
//! ```text
//! METHOD SP PATH SP VERSION CRLF
//! *(NAME ":" SP* VALUE CRLF)
//! CRLF
//! [BODY of content-length bytes]
//! ```
//!
//! # Design Decisions
//! - Header lines without a colon are dropped, not rejected
//! - End of input while reading headers ends the header block
//! - The body is read only when `content-length` is a positive integer
//! - No deadline handling here; read timeouts belong to the transport

use std::collections::HashMap;
use std::io;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::http::request::{Request, CONTENT_LENGTH};

/// Upper bound on the body buffer allocated up front; larger bodies grow as they arrive.
const MAX_PREALLOCATED_BODY: usize = 64 * 1024;

/// Error type for request decoding.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The stream ended before a complete start line was read.
    #[error("no start line received")]
    NoStartLine,

    /// Reading the start line failed at the transport level.
    #[error("error scanning start line: {0}")]
    StartLineRead(#[source] io::Error),

    /// The start line did not contain method, path and version.
    #[error("malformed start line: {0:?}")]
    MalformedStartLine(String),

    /// Reading a header line failed at the transport level.
    #[error("error reading headers: {0}")]
    Headers(#[source] io::Error),

    /// The body was shorter than declared or could not be read.
    #[error("error parsing content: expected {expected} bytes: {source}")]
    Content {
        expected: usize,
        #[source]
        source: io::Error,
    },
}

impl DecodeError {
    /// Whether the failure happened while reading or parsing the start line.
    pub fn is_start_line(&self) -> bool {
        matches!(
            self,
            DecodeError::NoStartLine
                | DecodeError::StartLineRead(_)
                | DecodeError::MalformedStartLine(_)
        )
    }
}

#[derive(Debug, PartialEq, Eq)]
struct StartLine {
    method: String,
    path: String,
    protocol_version: String,
}

fn parse_start_line(line: &[u8]) -> Result<StartLine, DecodeError> {
    let mut fields = line.split(|&b| b == b' ');
    let (Some(method), Some(path), Some(version)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(DecodeError::MalformedStartLine(
            String::from_utf8_lossy(line.trim_ascii()).into_owned(),
        ));
    };

    Ok(StartLine {
        method: lossy_trimmed(method),
        path: lossy_trimmed(path),
        protocol_version: lossy_trimmed(version),
    })
}

fn lossy_trimmed(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes.trim_ascii()).into_owned()
}

/// Split a header line on its first colon. Lines without one yield `None`.
fn parse_header_line(line: &[u8]) -> Option<(String, String)> {
    let colon = line.iter().position(|&b| b == b':')?;
    let (name, value) = (&line[..colon], &line[colon + 1..]);
    Some((
        lossy_trimmed(name).to_lowercase(),
        lossy_trimmed(value).to_lowercase(),
    ))
}

fn content_length(headers: &HashMap<String, String>) -> usize {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

/// Decode one request from `reader`.
pub async fn decode<R>(reader: &mut R) -> Result<Request, DecodeError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();

    let read = reader
        .read_until(b'\n', &mut line)
        .await
        .map_err(DecodeError::StartLineRead)?;
    if read == 0 || line.last() != Some(&b'\n') {
        return Err(DecodeError::NoStartLine);
    }
    let start_line = parse_start_line(&line)?;

    let mut headers = HashMap::new();
    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .await
            .map_err(DecodeError::Headers)?;
        if read == 0 {
            break;
        }

        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            break;
        }

        if let Some((name, value)) = parse_header_line(trimmed) {
            headers.insert(name, value);
        }
    }

    let content_length = content_length(&headers);
    let mut payload = Vec::new();
    if content_length > 0 {
        payload.reserve(content_length.min(MAX_PREALLOCATED_BODY));
        let read = reader
            .take(content_length as u64)
            .read_to_end(&mut payload)
            .await
            .map_err(|source| DecodeError::Content {
                expected: content_length,
                source,
            })?;
        if read < content_length {
            return Err(DecodeError::Content {
                expected: content_length,
                source: io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("stream ended after {read} bytes"),
                ),
            });
        }
    }

    Ok(Request {
        method: start_line.method,
        protocol_version: start_line.protocol_version,
        headers,
        content_length,
        payload,
        path: start_line.path,
    })
}
