//! Channel error taxonomy
//!
//! `ChannelError` is what every component returns. It is `Clone` so a
//! single refresh outcome can be delivered to every waiter.
//!
//! Recovery by kind:
//! - `AuthExpired`: one refresh-and-retry inside the retry engine
//! - `NetworkUnavailable`, `ServerError`, `Timeout`, `Transport`: bounded
//!   backoff
//! - `NonRetryableClient`, `RefreshFailed`, `ReconnectExhausted`: surfaced to
//!   the caller with a user-facing message, never retried automatically

use std::convert::Infallible;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;
use wavelink_common::error::{CommonError, ErrorClassification, ErrorSeverity};
use wavelink_common::impl_error_classification;
use wavelink_domain::{HttpMethod, NetworkStatus, RequestFailure, WavelinkError};

use crate::error_log::ErrorRecord;

pub type ChannelResult<T> = Result<T, ChannelError>;

const MSG_CONNECTIVITY: &str =
    "Unable to connect to the server. Please check your internet connection.";
const MSG_INVALID_REQUEST: &str = "The request was invalid. Please check your input and try again.";
const MSG_SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";
const MSG_FORBIDDEN: &str = "You do not have permission to perform this action.";
const MSG_NOT_FOUND: &str = "The requested resource was not found.";
const MSG_RATE_LIMITED: &str = "Too many requests. Please try again later.";
const MSG_SERVER: &str = "An unexpected error occurred. Our team has been notified.";
const MSG_LIVE_UPDATES: &str =
    "Live updates are unavailable. Please check your connection and try again.";
const MSG_GENERIC: &str = "Something went wrong. Please try again later.";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChannelError {
    #[error("Network unavailable")]
    NetworkUnavailable,

    #[error("Authentication expired")]
    AuthExpired,

    #[error("Server error (status {0})")]
    ServerError(u16),

    #[error("Request timed out")]
    Timeout,

    #[error("Request rejected (status {0})")]
    NonRetryableClient(u16),

    #[error("Credential refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Reconnect attempts exhausted after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    /// Connection reset or other transport-level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// No credential could be obtained
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Channel is shutting down")]
    ShuttingDown,

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl_error_classification!(ChannelError, Common,
    Self::NetworkUnavailable => {
        retryable: true,
        severity: ErrorSeverity::Warning,
        critical: false,
    },
    Self::AuthExpired => {
        retryable: false,
        severity: ErrorSeverity::Warning,
        critical: false,
    },
    Self::ServerError(_) => {
        retryable: true,
        severity: ErrorSeverity::Error,
        critical: false,
    },
    Self::Timeout => {
        retryable: true,
        severity: ErrorSeverity::Warning,
        critical: false,
    },
    Self::NonRetryableClient(_) => {
        retryable: false,
        severity: ErrorSeverity::Info,
        critical: false,
    },
    Self::RefreshFailed(_) => {
        retryable: false,
        severity: ErrorSeverity::Error,
        critical: false,
    },
    Self::ReconnectExhausted { .. } => {
        retryable: false,
        severity: ErrorSeverity::Error,
        critical: false,
    },
    Self::Transport(_) => {
        retryable: true,
        severity: ErrorSeverity::Warning,
        critical: false,
    },
    Self::NotAuthenticated => {
        retryable: false,
        severity: ErrorSeverity::Warning,
        critical: false,
    },
    Self::ShuttingDown => {
        retryable: false,
        severity: ErrorSeverity::Info,
        critical: false,
    },
);

impl ChannelError {
    /// Text suitable for showing to the end user
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NetworkUnavailable | Self::Timeout | Self::Transport(_) => MSG_CONNECTIVITY,
            Self::AuthExpired | Self::RefreshFailed(_) | Self::NotAuthenticated => {
                MSG_SESSION_EXPIRED
            }
            Self::ReconnectExhausted { .. } => MSG_LIVE_UPDATES,
            Self::ServerError(500) => MSG_SERVER,
            Self::NonRetryableClient(status) => match status {
                400 => MSG_INVALID_REQUEST,
                403 => MSG_FORBIDDEN,
                404 => MSG_NOT_FOUND,
                429 => MSG_RATE_LIMITED,
                _ => MSG_GENERIC,
            },
            _ => MSG_GENERIC,
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::AuthExpired => Some(401),
            Self::ServerError(status) | Self::NonRetryableClient(status) => Some(*status),
            _ => None,
        }
    }

    /// Stable snake_case name used in logs and error records
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NetworkUnavailable => "network_unavailable",
            Self::AuthExpired => "auth_expired",
            Self::ServerError(_) => "server_error",
            Self::Timeout => "timeout",
            Self::NonRetryableClient(_) => "non_retryable_client",
            Self::RefreshFailed(_) => "refresh_failed",
            Self::ReconnectExhausted { .. } => "reconnect_exhausted",
            Self::Transport(_) => "transport",
            Self::NotAuthenticated => "not_authenticated",
            Self::ShuttingDown => "shutting_down",
            Self::Common(_) => "internal",
        }
    }
}

impl From<&RequestFailure> for ChannelError {
    fn from(failure: &RequestFailure) -> Self {
        match failure {
            RequestFailure::Status { status, .. } => match *status {
                401 => Self::AuthExpired,
                408 => Self::Timeout,
                status if status >= 500 => Self::ServerError(status),
                status => Self::NonRetryableClient(status),
            },
            RequestFailure::Timeout => Self::Timeout,
            RequestFailure::ConnectionReset => Self::Transport("connection reset".to_string()),
            RequestFailure::Network(message) => Self::Transport(message.clone()),
        }
    }
}

impl From<Infallible> for ChannelError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

impl From<WavelinkError> for ChannelError {
    fn from(err: WavelinkError) -> Self {
        let common = match err {
            WavelinkError::Config(message) => CommonError::config(message),
            WavelinkError::Serialization(message) => {
                CommonError::serialization_format("JSON", message)
            }
            WavelinkError::InvalidInput(message) => CommonError::validation("input", message),
            WavelinkError::Internal(message) => CommonError::internal(message),
        };
        Self::Common(common)
    }
}

/// Terminal failure of a request issued through the retry engine
#[derive(Debug, Clone, Error)]
#[error("{method} {path} failed after {retry_attempts} retries: {error}")]
pub struct RequestError {
    #[source]
    pub error: ChannelError,
    pub user_message: String,
    pub retry_attempts: u32,
    pub timestamp: DateTime<Utc>,
    /// Connectivity when the failure was surfaced
    pub network: NetworkStatus,
    pub request_id: Uuid,
    pub method: HttpMethod,
    pub path: String,
}

impl RequestError {
    pub fn status(&self) -> Option<u16> {
        self.error.status()
    }

    /// Serializable form kept in the error log and sent to reporters
    pub fn to_record(&self) -> ErrorRecord {
        ErrorRecord {
            timestamp: self.timestamp,
            kind: self.error.kind().to_string(),
            message: self.error.to_string(),
            user_message: self.user_message.clone(),
            status: self.status(),
            retry_attempts: self.retry_attempts,
            network: self.network,
            request_id: self.request_id,
            method: self.method,
            path: self.path.clone(),
        }
    }
}
