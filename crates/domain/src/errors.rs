//! Error types for domain-level validation and parsing

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Domain error for configuration and message handling
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum WavelinkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for WavelinkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for domain operations
pub type Result<T> = std::result::Result<T, WavelinkError>;
