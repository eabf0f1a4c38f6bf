use serde::{Deserialize, Serialize};

use crate::impl_status_conversions;

/// Kind of link reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkType {
    Wifi,
    Cellular,
    Ethernet,
    None,
    #[default]
    Unknown,
}

impl_status_conversions!(NetworkType {
    Wifi => "wifi",
    Cellular => "cellular",
    Ethernet => "ethernet",
    None => "none",
    Unknown => "unknown",
});

/// Connectivity snapshot, last writer wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStatus {
    pub is_connected: bool,
    #[serde(rename = "type")]
    pub network_type: NetworkType,
}

impl NetworkStatus {
    pub const fn online(network_type: NetworkType) -> Self {
        Self { is_connected: true, network_type }
    }

    pub const fn offline() -> Self {
        Self { is_connected: false, network_type: NetworkType::None }
    }
}

impl Default for NetworkStatus {
    /// Assume connectivity until the platform reports otherwise.
    fn default() -> Self {
        Self::online(NetworkType::Unknown)
    }
}
