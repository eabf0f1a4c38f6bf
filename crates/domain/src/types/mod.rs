//! Domain value types
//!
//! - [`connection`]: connection lifecycle state
//! - [`network`]: connectivity snapshots
//! - [`credential`]: access credentials and refresh tokens
//! - [`message`]: topics and duplex channel frames
//! - [`request`]: requests issued through the retry engine

pub mod connection;
pub mod credential;
pub mod message;
pub mod network;
pub mod request;

pub use connection::ConnectionState;
pub use credential::{Credential, RefreshedCredential, StoredCredentials};
pub use message::{ControlMessage, InboundMessage, Topic};
pub use network::{NetworkStatus, NetworkType};
pub use request::{ApiRequest, ApiResponse, HttpMethod, RequestFailure};
