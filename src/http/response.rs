//! Response writer handed to handlers.
//!
//! # Wire Format
//! ```text
//! HTTP/1.1 <code> <reason>\r\n          (written by set_status, eagerly)
//! Content-Length: <n>\r\n               (buffered by write ...)
//! Content-Type: application/x-www-form-urlencoded\r\n
//! Connection: Keep-Alive\r\n
//! Server: <name>\r\n
//! \r\n
//! <body>                                (... and flushed in one write)
//! ```
//!
//! # Design Decisions
//! - The status line goes out as soon as it is set, so a handler can commit a
//!   status before it knows the body
//! - Headers depend on the body length, so they are buffered and flushed together
//!   with the body
//! - Only one fixed header set is supported; callers cannot add headers
//! - Calling `set_status` or `write` more than once emits more than one status line
//!   or header block. Handlers are expected to call each at most once.

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Content type sent with every body.
pub const CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Reason phrase for a status code. Unknown codes map to `"UNKNOWN"`.
pub fn reason_phrase(code: u16) -> &'static str {
    match code {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        418 => "I'm a teapot",
        500 => "Internal Server Error",
        _ => "UNKNOWN",
    }
}

type BoxedWrite = Box<dyn AsyncWrite + Send + Unpin>;

/// Writes one response onto a connection.
pub struct ResponseWriter {
    conn: BoxedWrite,
    status: Option<u16>,
    server_name: Arc<str>,
    buffer: Vec<u8>,
}

impl ResponseWriter {
    /// Create a writer over the write side of a connection.
    pub fn new<W>(conn: W, server_name: Arc<str>) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            conn: Box::new(conn),
            status: None,
            server_name,
            buffer: Vec::new(),
        }
    }

    /// The last status set on this response, if any.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Write the status line to the connection immediately.
    pub async fn set_status(&mut self, code: u16) -> io::Result<()> {
        self.status = Some(code);

        let line = format!("HTTP/1.1 {} {}\r\n", code, reason_phrase(code));
        self.conn.write_all(line.as_bytes()).await?;
        self.conn.flush().await
    }

    /// Frame `body` with the fixed header set and write it in one shot.
    ///
    /// Sets status 200 first if no status was set.
    ///
    /// Returns `body.len()` on success. The status line and header bytes are not
    /// counted, so the value is not the number of bytes put on the wire.
    pub async fn write(&mut self, body: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.set_status(200).await?;
        }

        self.buffer.clear();
        self.push_header("Content-Length", &body.len().to_string());
        self.push_header("Content-Type", CONTENT_TYPE);
        self.push_header("Connection", "Keep-Alive");
        let server_name = Arc::clone(&self.server_name);
        self.push_header("Server", &server_name);
        self.buffer.extend_from_slice(b"\r\n");
        self.buffer.extend_from_slice(body);

        self.conn.write_all(&self.buffer).await?;
        self.conn.flush().await?;
        Ok(body.len())
    }

    fn push_header(&mut self, name: &str, value: &str) {
        self.buffer.extend_from_slice(name.as_bytes());
        self.buffer.extend_from_slice(b": ");
        self.buffer.extend_from_slice(value.as_bytes());
        self.buffer.extend_from_slice(b"\r\n");
    }

    /// Shut down the write side of the connection.
    pub(crate) async fn close(mut self) -> io::Result<()> {
        self.conn.shutdown().await
    }
}

impl std::fmt::Debug for ResponseWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseWriter")
            .field("status", &self.status)
            .field("server_name", &self.server_name)
            .finish_non_exhaustive()
    }
}
