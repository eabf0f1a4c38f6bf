//! Common error types shared by the wavelink crates
//!
//! # Error Handling Architecture
//!
//! 1. **`CommonError`**: error patterns that show up in more than one
//!    component (configuration, serialization, backend failures, rejected
//!    input, cancelled background tasks).
//!
//! 2. **`ErrorClassification`**: a standard interface for deciding how an
//!    error is handled (retryability, severity, criticality, suggested
//!    delay). The retry engine and the connection manager only ever look at
//!    errors through this trait.
//!
//! 3. **`ErrorSeverity`**: a unified severity scale used when logging.
//!
//! Module-specific errors **compose** with `CommonError` instead of
//! duplicating its variants:
//!
//! ```rust,ignore
//! #[derive(Debug, Clone, Error)]
//! pub enum ChannelError {
//!     #[error("Authentication expired")]
//!     AuthExpired,
//!
//!     #[error(transparent)]
//!     Common(#[from] CommonError),
//! }
//!
//! impl_error_classification!(ChannelError, Common,
//!     Self::AuthExpired => {
//!         retryable: false,
//!         severity: ErrorSeverity::Warning,
//!         critical: false,
//!     }
//! );
//! ```
//!
//! | Level | Use Case | Examples |
//! |-------|----------|----------|
//! | **Info** | Expected conditions | Resource not found, cancelled task |
//! | **Warning** | Degraded but operational | Transient backend failures |
//! | **Error** | Failure requiring attention | Invalid configuration, bad payloads |
//! | **Critical** | Invariant broken | Internal errors |

use std::fmt;
use std::time::Duration;

/// Standard result type using CommonError
pub type CommonResult<T> = Result<T, CommonError>;

/// Common error variants embedded by module-specific error enums.
///
/// `Clone` so a single failure can be handed to several waiters.
#[derive(Debug, Clone, PartialEq)]
pub enum CommonError {
    /// Configuration-related errors
    Config { message: String, field: Option<String> },

    /// Serialization or deserialization errors
    Serialization { message: String, format: Option<String> },

    /// Network or backend connectivity errors
    Backend { service: String, message: String, is_retryable: bool },

    /// Input rejected before it reached a collaborator
    Validation { field: String, message: String },

    /// Internal errors that shouldn't normally occur
    Internal { message: String },

    /// A background task ended before producing a result
    TaskCancelled { task_id: String, reason: Option<String> },
}

impl fmt::Display for CommonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { message, field } => match field {
                Some(field) => write!(f, "Configuration error in field '{field}': {message}"),
                None => write!(f, "Configuration error: {message}"),
            },
            Self::Serialization { message, format } => match format {
                Some(format) => write!(f, "Serialization error ({format}): {message}"),
                None => write!(f, "Serialization error: {message}"),
            },
            Self::Backend { service, message, .. } => {
                write!(f, "Backend error from '{service}': {message}")
            }
            Self::Validation { field, message } => {
                write!(f, "Validation error for field '{field}': {message}")
            }
            Self::Internal { message } => write!(f, "Internal error: {message}"),
            Self::TaskCancelled { task_id, reason } => match reason {
                Some(reason) => write!(f, "Task '{task_id}' cancelled: {reason}"),
                None => write!(f, "Task '{task_id}' cancelled"),
            },
        }
    }
}

impl std::error::Error for CommonError {}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Backend { is_retryable, .. } => *is_retryable,
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Config { .. } => ErrorSeverity::Error,
            Self::Serialization { .. } => ErrorSeverity::Error,
            Self::Backend { .. } => ErrorSeverity::Error,
            Self::Validation { .. } => ErrorSeverity::Error,
            Self::Internal { .. } => ErrorSeverity::Critical,
            Self::TaskCancelled { .. } => ErrorSeverity::Info,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl CommonError {
    /// Create a simple configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), field: None }
    }

    /// Create a configuration error for a specific field
    pub fn config_field<S: Into<String>, F: Into<String>>(field: F, message: S) -> Self {
        Self::Config { message: message.into(), field: Some(field.into()) }
    }

    /// Create a serialization error with format information
    pub fn serialization_format<S: Into<String>, F: Into<String>>(format: F, message: S) -> Self {
        Self::Serialization { message: message.into(), format: Some(format.into()) }
    }

    /// Create a backend error
    pub fn backend<S: Into<String>, M: Into<String>>(
        service: S,
        message: M,
        is_retryable: bool,
    ) -> Self {
        Self::Backend { service: service.into(), message: message.into(), is_retryable }
    }

    /// Create a validation error
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Create a task cancellation error with a reason
    pub fn task_cancelled<S: Into<String>, R: Into<String>>(task_id: S, reason: R) -> Self {
        Self::TaskCancelled { task_id: task_id.into(), reason: Some(reason.into()) }
    }
}

/// Standard interface for classifying errors
///
/// Every error that crosses a component boundary implements this trait so
/// retry and reconnect decisions are made the same way everywhere.
pub trait ErrorClassification {
    /// Transient failure that may succeed if attempted again.
    fn is_retryable(&self) -> bool;

    /// Severity used for logging and alerting decisions.
    fn severity(&self) -> ErrorSeverity;

    /// Broken invariant requiring immediate attention.
    fn is_critical(&self) -> bool;

    /// Suggested delay before retrying, when the failure carries one.
    fn retry_after(&self) -> Option<Duration>;
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl From<serde_json::Error> for CommonError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization_format("JSON", err.to_string())
    }
}

impl From<toml::de::Error> for CommonError {
    fn from(err: toml::de::Error) -> Self {
        Self::serialization_format("TOML", err.to_string())
    }
}

/// Implement `ErrorClassification` for a module error, delegating the
/// embedded `CommonError` variant and listing the rest explicitly.
///
/// ```rust,ignore
/// impl_error_classification!(ChannelError, Common,
///     Self::AuthExpired => {
///         retryable: false,
///         severity: ErrorSeverity::Warning,
///         critical: false,
///     }
/// );
/// ```
#[macro_export]
macro_rules! impl_error_classification {
    (
        $error_type:ty,
        $common_variant:ident
        $(,
            $variant:pat => {
                retryable: $retryable:expr,
                severity: $severity:expr,
                critical: $critical:expr
                $(, retry_after: $retry_after:expr)?
                $(,)?
            }
        )*
        $(,)?
    ) => {
        impl $crate::error::ErrorClassification for $error_type {
            fn is_retryable(&self) -> bool {
                match self {
                    Self::$common_variant(e) => e.is_retryable(),
                    $(
                        $variant => $retryable,
                    )*
                }
            }

            fn severity(&self) -> $crate::error::ErrorSeverity {
                match self {
                    Self::$common_variant(e) => e.severity(),
                    $(
                        $variant => $severity,
                    )*
                }
            }

            fn is_critical(&self) -> bool {
                match self {
                    Self::$common_variant(e) => e.is_critical(),
                    $(
                        $variant => $critical,
                    )*
                }
            }

            fn retry_after(&self) -> Option<std::time::Duration> {
                match self {
                    Self::$common_variant(e) => e.retry_after(),
                    $(
                        $(
                            $variant => $retry_after,
                        )?
                    )*
                    #[allow(unreachable_patterns)]
                    _ => None,
                }
            }
        }
    };
}
