//! Retrying request execution

pub mod engine;

pub use engine::{RetryPolicyEngine, RetrySettings};
