//! Credential management for the channel and the request path

pub mod coordinator;

pub use coordinator::CredentialRefreshCoordinator;
