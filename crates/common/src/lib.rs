//! Foundation utilities shared across the wavelink crates.
//!
//! # Modules
//!
//! - [`error`]: `CommonError`, the `ErrorClassification` trait and severity
//!   levels used by every module-specific error
//! - [`resilience`]: backoff schedules for retry/reconnect loops
//! - [`lifecycle`]: status and health types for long-lived services
//! - [`utils`]: serde helpers

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod error;
pub mod lifecycle;
pub mod resilience;
pub mod utils;

// Re-export commonly used types and traits for convenience
// ------------------------
pub use error::{CommonError, CommonResult, ErrorClassification, ErrorSeverity};
pub use lifecycle::{ComponentHealth, ManagerHealth, ManagerStatus};
pub use resilience::BackoffStrategy;
pub use utils::serde::duration_millis;
