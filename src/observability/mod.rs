//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events inside `server` / `connection` spans)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Context travels in explicit spans attached to each task, not in a global logger
//! - Metrics calls are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
