//! Infrastructure error conversions

mod conversions;

pub use conversions::{request_failure, InfraError};
