//! # Wavelink Core
//!
//! The resilient real-time update channel.
//!
//! This crate contains:
//! - Port interfaces (traits) for the transport, credential refresh,
//!   credential storage, request sending and error reporting
//! - The channel components: network observer, credential refresh
//!   coordinator, retry engine, connection manager, subscription registry
//!   and event dispatcher
//! - `RealtimeService`, which wires the components together and owns their
//!   lifecycle
//!
//! ## Architecture Principles
//! - Depends only on `wavelink-common` and `wavelink-domain`
//! - No sockets, HTTP or storage code; all I/O goes through ports
//! - Connection state is owned by a single actor task

pub mod auth;
pub mod connection;
pub mod error;
pub mod error_log;
pub mod events;
pub mod network;
pub mod ports;
pub mod retry;
pub mod service;
pub mod subscription;

pub use auth::CredentialRefreshCoordinator;
pub use connection::ConnectionManager;
pub use error::{ChannelError, ChannelResult, RequestError};
pub use error_log::{ErrorLog, ErrorRecord};
pub use events::{EventDispatcher, HandlerError, HandlerId};
pub use network::NetworkObserver;
pub use ports::{
    CredentialRefresher, CredentialStore, DuplexChannel, DuplexTransport, ErrorReporter,
    RequestSender, TransportError, TransportErrorKind,
};
pub use retry::RetryPolicyEngine;
pub use service::{RealtimeService, RealtimeServiceBuilder};
pub use subscription::SubscriptionRegistry;
