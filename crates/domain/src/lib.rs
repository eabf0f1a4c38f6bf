//! # Wavelink Domain
//!
//! Data types shared by the real-time update channel.
//!
//! This crate contains:
//! - Channel configuration (`ChannelConfig`) and its validation
//! - Connection, network and credential value types
//! - Wire messages exchanged over the duplex channel
//! - Request/response types for the retrying request path
//! - Domain error types and Result definitions
//!
//! ## Architecture
//! - No dependencies on other wavelink crates
//! - Only external dependencies allowed
//! - No I/O, no async

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
