//! Connection lifecycle
//!
//! [`ConnectionManager`] is a cheap handle; all state lives in a background
//! actor task that owns the duplex channel, the reconnect timer and the
//! subscription registry. Every transition happens on that task.
//!
//! ```text
//! Disconnected --connect()--> Connecting --open ok--> Connected
//! Connected --channel lost--> ReconnectWaiting --timer--> Connecting
//! Connecting --open failed--> ReconnectWaiting | Disconnected (exhausted)
//! * --disconnect()--> Disconnected
//! ```

mod actor;
pub mod manager;

pub use manager::{ConnectionManager, ConnectionSettings};
