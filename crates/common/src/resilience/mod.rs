//! Resilience primitives
//!
//! - **[`backoff`]**: exact doubling delay schedules for retries and
//!   reconnects

pub mod backoff;

pub use backoff::BackoffStrategy;
