//! Minimal single-request HTTP server library.
//!
//! Accepts byte-stream connections, decodes one request per connection, routes it
//! by exact method and path, and writes the handler's reply back.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod routing;

pub use config::ServerConfig;
pub use http::{HttpServer, Request, ResponseWriter};
pub use lifecycle::{Shutdown, ShutdownSignal};
pub use net::Listener;
pub use routing::{Registry, RegistryError};
