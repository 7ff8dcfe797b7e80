//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: {value:?} is not a socket address")]
    InvalidAddress { field: &'static str, value: String },
    #[error("http.server_name must be non-empty visible ASCII, got {0:?}")]
    InvalidServerName(String),
    #[error("listener.accept_backoff_base_ms ({base}) exceeds accept_backoff_max_ms ({max})")]
    BackoffRange { base: u64, max: u64 },
    #[error("observability.log_level: unknown level {0:?}")]
    UnknownLogLevel(String),
}

fn check_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

/// Check every semantic constraint, collecting all failures.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address("listener.bind_address", &config.listener.bind_address, &mut errors);

    let listener = &config.listener;
    if listener.accept_backoff_base_ms > listener.accept_backoff_max_ms {
        errors.push(ValidationError::BackoffRange {
            base: listener.accept_backoff_base_ms,
            max: listener.accept_backoff_max_ms,
        });
    }

    // Written verbatim into a header line.
    let name = &config.http.server_name;
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_graphic() || b == b' ') {
        errors.push(ValidationError::InvalidServerName(name.clone()));
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::UnknownLogLevel(observability.log_level.clone()));
    }
    if observability.metrics_enabled {
        check_address("observability.metrics_address", &observability.metrics_address, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
