//! Channel configuration
//!
//! Every field has a default so partial TOML/JSON files and empty
//! environments are valid. Durations are stored as integer milliseconds or
//! seconds to keep config files readable.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BASE_RECONNECT_DELAY_MS, DEFAULT_BASE_RETRY_DELAY_MS,
    DEFAULT_CREDENTIAL_EXPIRY_LEEWAY_SECS, DEFAULT_ERROR_LOG_CAPACITY,
    DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_MAX_RECONNECT_DELAY_MS, DEFAULT_MAX_REQUEST_RETRIES,
    DEFAULT_REQUEST_TIMEOUT_MS,
};
use crate::errors::{Result, WavelinkError};

/// Tuning for reconnects, request retries and credential handling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// First reconnect delay; doubles per attempt
    pub base_reconnect_delay_ms: u64,
    /// Upper bound for a single reconnect delay
    pub max_reconnect_delay_ms: u64,
    /// Reconnect attempts before giving up
    pub max_reconnect_attempts: u32,
    /// Retries of a failed request, not counting the first send
    pub max_request_retries: u32,
    /// First request retry delay; doubles per retry
    pub base_retry_delay_ms: u64,
    /// Deadline for a single request send
    pub request_timeout_ms: u64,
    /// Credentials expiring within this window are refreshed early
    pub credential_expiry_leeway_secs: u64,
    /// Entries kept in the in-memory error log
    pub error_log_capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            base_reconnect_delay_ms: DEFAULT_BASE_RECONNECT_DELAY_MS,
            max_reconnect_delay_ms: DEFAULT_MAX_RECONNECT_DELAY_MS,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            max_request_retries: DEFAULT_MAX_REQUEST_RETRIES,
            base_retry_delay_ms: DEFAULT_BASE_RETRY_DELAY_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            credential_expiry_leeway_secs: DEFAULT_CREDENTIAL_EXPIRY_LEEWAY_SECS,
            error_log_capacity: DEFAULT_ERROR_LOG_CAPACITY,
        }
    }
}

impl ChannelConfig {
    pub fn base_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.base_reconnect_delay_ms)
    }

    pub fn max_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.max_reconnect_delay_ms)
    }

    pub fn base_retry_delay(&self) -> Duration {
        Duration::from_millis(self.base_retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn credential_expiry_leeway(&self) -> Duration {
        Duration::from_secs(self.credential_expiry_leeway_secs)
    }

    /// Reject values that would disable reconnects, retries or timeouts.
    ///
    /// `max_request_retries` may be zero (no retries).
    pub fn validate(&self) -> Result<()> {
        let non_zero: [(&str, u64); 5] = [
            ("base_reconnect_delay_ms", self.base_reconnect_delay_ms),
            ("max_reconnect_delay_ms", self.max_reconnect_delay_ms),
            ("max_reconnect_attempts", u64::from(self.max_reconnect_attempts)),
            ("base_retry_delay_ms", self.base_retry_delay_ms),
            ("request_timeout_ms", self.request_timeout_ms),
        ];
        if let Some((field, _)) = non_zero.iter().find(|(_, value)| *value == 0) {
            return Err(WavelinkError::Config(format!("{field} must be greater than 0")));
        }

        if self.error_log_capacity == 0 {
            return Err(WavelinkError::Config(
                "error_log_capacity must be greater than 0".to_string(),
            ));
        }

        if self.max_reconnect_delay_ms < self.base_reconnect_delay_ms {
            return Err(WavelinkError::Config(format!(
                "max_reconnect_delay_ms ({}) must not be lower than base_reconnect_delay_ms ({})",
                self.max_reconnect_delay_ms, self.base_reconnect_delay_ms
            )));
        }

        Ok(())
    }
}
