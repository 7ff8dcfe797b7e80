//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Listener::accept (TCP in production, any byte stream in tests)
//!     → listener.rs (accept loop, error backoff, cancellation check)
//!     → handoff channel (capacity 1) → server loop
//!     → connection.rs (connection ID, in-flight tracking)
//!     → Hand off to HTTP layer (one worker per connection)
//! ```
//!
//! # Design Decisions
//! - Accept errors are logged and retried, never fatal
//! - The accept loop waits for each handoff before accepting again
//! - Each worker holds a guard so shutdown can drain when configured

pub mod connection;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{accept_loop, bind, Accepted, Listener, ListenerError};
