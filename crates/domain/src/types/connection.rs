use serde::{Deserialize, Serialize};

use crate::impl_status_conversions;

/// Lifecycle state of the single duplex connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Involuntarily disconnected, waiting for the reconnect timer
    ReconnectWaiting,
}

impl_status_conversions!(ConnectionState {
    Disconnected => "disconnected",
    Connecting => "connecting",
    Connected => "connected",
    ReconnectWaiting => "reconnect_waiting",
});

impl ConnectionState {
    /// `connect()` is a no-op in these states
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}
