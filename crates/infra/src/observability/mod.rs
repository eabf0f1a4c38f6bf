//! Observability infrastructure
//!
//! Installs the process-wide `tracing` subscriber. Library crates only emit
//! events; binaries and test harnesses call [`init_tracing`] once at start.

pub mod logging;

pub use logging::{init_tracing, LogFormat};
