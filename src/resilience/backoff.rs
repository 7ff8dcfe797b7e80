//! Exponential backoff with jitter.

use std::time::Duration;
use rand::Rng;

use crate::config::ListenerConfig;

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 || base_ms == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

/// Delay policy for consecutive accept failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptBackoff {
    pub base_ms: u64,
    pub max_ms: u64,
}

impl AcceptBackoff {
    /// Retry immediately.
    pub fn disabled() -> Self {
        Self { base_ms: 0, max_ms: 0 }
    }

    pub fn from_config(config: &ListenerConfig) -> Self {
        Self {
            base_ms: config.accept_backoff_base_ms,
            max_ms: config.accept_backoff_max_ms,
        }
    }

    /// Delay before retrying after `failures` consecutive errors.
    pub fn delay(&self, failures: u32) -> Duration {
        calculate_backoff(failures, self.base_ms, self.max_ms)
    }
}
