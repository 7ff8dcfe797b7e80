//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → accept loop stops between accepts
//!               → server loop returns (optionally after draining workers)
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger()
//! ```
//!
//! # Design Decisions
//! - One run-scoped cancellation signal, shared by the accept loop and the server loop
//! - Cancellation stops new work; it never aborts an in-flight worker

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::wait_for_signal;
