//! Port interfaces for the update channel
//!
//! These traits define the boundaries between the channel logic and the
//! infrastructure that moves bytes, stores secrets and talks to the
//! authentication backend.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use wavelink_common::CommonResult;
use wavelink_domain::{
    ApiRequest, ApiResponse, Credential, RefreshedCredential, RequestFailure, StoredCredentials,
};

use crate::error_log::ErrorRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The server rejected the credential
    Unauthorized,
    /// The server could not be reached
    Unreachable,
    /// The channel was closed by the peer
    Closed,
    Timeout,
    Protocol,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unauthorized => "unauthorized",
            Self::Unreachable => "unreachable",
            Self::Closed => "closed",
            Self::Timeout => "timeout",
            Self::Protocol => "protocol",
        };
        f.write_str(name)
    }
}

/// Failure reported by a duplex transport or channel
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new<S: Into<String>>(kind: TransportErrorKind, message: S) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn unauthorized<S: Into<String>>(message: S) -> Self {
        Self::new(TransportErrorKind::Unauthorized, message)
    }

    pub fn unreachable<S: Into<String>>(message: S) -> Self {
        Self::new(TransportErrorKind::Unreachable, message)
    }

    pub fn closed<S: Into<String>>(message: S) -> Self {
        Self::new(TransportErrorKind::Closed, message)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == TransportErrorKind::Unauthorized
    }
}

/// Opens the long-lived duplex channel
#[async_trait]
pub trait DuplexTransport: Send + Sync {
    async fn open(&self, credential: &Credential) -> Result<Box<dyn DuplexChannel>, TransportError>;
}

/// An open duplex channel carrying text frames
///
/// `next_frame` must be cancel-safe: the connection actor polls it inside
/// `tokio::select!` and drops the future whenever another branch wins.
#[async_trait]
pub trait DuplexChannel: Send {
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Next inbound frame; `None` once the peer has closed the channel
    async fn next_frame(&mut self) -> Option<Result<String, TransportError>>;

    async fn close(&mut self);
}

/// Exchanges a refresh token for a new credential
#[async_trait]
pub trait CredentialRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> CommonResult<RefreshedCredential>;
}

/// Persists credentials between sessions
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> CommonResult<StoredCredentials>;

    async fn save(&self, credentials: &StoredCredentials) -> CommonResult<()>;

    async fn clear(&self) -> CommonResult<()>;
}

/// Issues a single request; non-2xx statuses are reported as
/// `RequestFailure::Status`
#[async_trait]
pub trait RequestSender: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, RequestFailure>;
}

/// Forwards server-side failures to a remote collector
#[async_trait]
pub trait ErrorReporter: Send + Sync {
    async fn report(&self, record: &ErrorRecord) -> CommonResult<()>;
}
