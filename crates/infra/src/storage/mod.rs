//! Credential storage adapters

mod memory;

pub use memory::InMemoryCredentialStore;
