//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     register(method, path, handler) → Registry (duplicates rejected)
//!     → frozen into Arc<Registry> when the server starts
//!
//! Per request:
//!     (request.method, request.path)
//!     → registry.rs (exact lookup)
//!     → Return: handler or None (caller falls back to 404)
//! ```
//!
//! # Design Decisions
//! - Exact, case-sensitive match on method and path; no wildcards or prefixes
//! - Registry is immutable once the server runs (shared without locks)
//! - Duplicate registration is an error value, never a silent overwrite

pub mod registry;

pub use registry::{BoxedHandler, HandlerFn, HandlerId, Registry, RegistryError};
