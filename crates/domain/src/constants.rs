//! Channel constants
//!
//! Default tuning values and the event names published through the
//! dispatcher.

// Reconnect defaults
pub const DEFAULT_BASE_RECONNECT_DELAY_MS: u64 = 1000;
pub const DEFAULT_MAX_RECONNECT_DELAY_MS: u64 = 30_000;
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

// Request retry defaults
pub const DEFAULT_MAX_REQUEST_RETRIES: u32 = 3;
pub const DEFAULT_BASE_RETRY_DELAY_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

// Credentials are treated as expired this long before their deadline
pub const DEFAULT_CREDENTIAL_EXPIRY_LEEWAY_SECS: u64 = 30;

pub const DEFAULT_ERROR_LOG_CAPACITY: usize = 50;

// Prefix for environment overrides
pub const ENV_PREFIX: &str = "WAVELINK_";

// Event names emitted by the connection manager
pub const EVENT_CONNECTED: &str = "connected";
pub const EVENT_DISCONNECTED: &str = "disconnected";
pub const EVENT_RECONNECTING: &str = "reconnecting";
pub const EVENT_RECONNECT_EXHAUSTED: &str = "reconnect_exhausted";
pub const EVENT_CONNECT_FAILED: &str = "connect_failed";

// Inbound message type carrying topic payloads
pub const EVENT_UPDATE: &str = "update";
