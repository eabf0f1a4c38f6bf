//! Backoff schedules for retry and reconnect loops
//!
//! The exponential schedule works in integer milliseconds so the delays are
//! exact (`1000, 2000, 4000, ...`) and saturate instead of overflowing.
//!
//! ```rust
//! use std::time::Duration;
//! use wavelink_common::BackoffStrategy;
//!
//! let backoff = BackoffStrategy::exponential(
//!     Duration::from_millis(1000),
//!     Duration::from_millis(30_000),
//! );
//! assert_eq!(backoff.delay_for(0), Duration::from_millis(1000));
//! assert_eq!(backoff.delay_for(4), Duration::from_millis(16_000));
//! assert_eq!(backoff.delay_for(9), Duration::from_millis(30_000));
//! ```

use std::time::Duration;

/// Doubling delay schedule indexed by a zero-based attempt counter:
/// `initial_delay * 2^attempt`, capped at `max_delay`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffStrategy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl BackoffStrategy {
    pub fn exponential(initial_delay: Duration, max_delay: Duration) -> Self {
        Self { initial_delay, max_delay }
    }

    /// Delay before the attempt with zero-based index `attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = u64::try_from(self.initial_delay.as_millis()).unwrap_or(u64::MAX);
        let cap_ms = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        let factor = 2_u64.checked_pow(attempt).unwrap_or(u64::MAX);
        let delay_ms = base_ms.saturating_mul(factor).min(cap_ms);

        #[cfg(feature = "observability")]
        tracing::trace!(attempt, delay_ms, "computed backoff delay");

        Duration::from_millis(delay_ms)
    }
}
