//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Accept error:
//!     → backoff.rs (exponential delay with jitter, capped)
//!     → accept loop sleeps, then retries
//!     → first successful accept resets the attempt count
//! ```
//!
//! # Design Decisions
//! - Accept errors are never fatal; backoff only keeps the loop from spinning
//! - Jitter spreads retries when many listeners fail at once

pub mod backoff;
