//! Serde helpers for wire payloads and configuration
//!
//! Connection events and error records expose delays as integer
//! milliseconds so host applications written in other languages can read
//! them without parsing `Duration` debug output.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// Serialize a [`Duration`] as whole milliseconds (`u64`).
///
/// # Usage
/// ```rust
/// use std::time::Duration;
///
/// use serde::{Deserialize, Serialize};
/// use wavelink_common::duration_millis;
///
/// #[derive(Serialize, Deserialize)]
/// struct Reconnecting {
///     attempt: u32,
///     #[serde(with = "duration_millis")]
///     delay: Duration,
/// }
/// ```
pub mod duration_millis {
    use super::*;

    type SerializeResult<S> = Result<<S as Serializer>::Ok, <S as Serializer>::Error>;

    /// Serialize a Duration as milliseconds, saturating at `u64::MAX`.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    /// Deserialize milliseconds into a Duration
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
