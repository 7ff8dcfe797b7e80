//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted connection
//!     → server.rs (spawn one worker per connection)
//!     → decoder.rs (start line, headers, fixed-length body → Request)
//!     → routing::Registry lookup (exact method + path, else 404)
//!     → handler runs behind a panic boundary (panic → 500)
//!     → response.rs (status line, fixed headers, body)
//!     → connection closed
//! ```

pub mod decoder;
pub mod request;
pub mod response;
pub mod server;

pub use decoder::{decode, DecodeError};
pub use request::Request;
pub use response::{reason_phrase, ResponseWriter};
pub use server::HttpServer;
