//! # Wavelink Infrastructure
//!
//! Infrastructure implementations of the `wavelink-core` ports.
//!
//! This crate contains:
//! - Configuration loading (env overrides + TOML/JSON files)
//! - Tracing subscriber setup
//! - reqwest-backed request sender and credential refresher
//! - tokio-tungstenite WebSocket transport for the update channel
//! - In-memory credential store
//!
//! ## Architecture
//! - Implements traits defined in `wavelink-core`
//! - Contains all "impure" code (I/O, environment, HTTP, sockets)

pub mod config;
pub mod errors;
pub mod http;
pub mod observability;
pub mod storage;
pub mod ws;

// Re-export commonly used items
pub use config::{load, load_from_file, probe_config_paths};
pub use errors::InfraError;
pub use http::{HttpCredentialRefresher, HttpRequestSender, HttpRequestSenderBuilder};
pub use observability::{init_tracing, LogFormat};
pub use storage::InMemoryCredentialStore;
pub use ws::WebSocketTransport;
