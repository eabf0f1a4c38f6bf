//! Integration tests for `wavelink_common::resilience`.

use std::time::Duration;

use wavelink_common::BackoffStrategy;

/// Validates the request retry schedule used with a 1s base and no cap.
///
/// Assertions:
/// - Confirms three retries wait 1s, 2s and 4s.
#[test]
fn request_retry_schedule_doubles_from_base() {
    let backoff = BackoffStrategy::exponential(Duration::from_millis(1000), Duration::MAX);
    let delays: Vec<Duration> = (0..3).map(|n| backoff.delay_for(n)).collect();
    assert_eq!(
        delays,
        vec![Duration::from_millis(1000), Duration::from_millis(2000), Duration::from_millis(4000)]
    );
}

#[test]
fn cap_lower_than_base_clamps_every_delay() {
    let backoff = BackoffStrategy::exponential(Duration::from_secs(5), Duration::from_secs(2));
    assert_eq!(backoff.delay_for(0), Duration::from_secs(2));
    assert_eq!(backoff.delay_for(3), Duration::from_secs(2));
}

/// Validates that sleeping on the schedule lands exactly on each delay.
///
/// Assertions:
/// - Confirms cumulative virtual time after four capped attempts is
///   0.5s + 1s + 2s + 3s.
#[tokio::test(start_paused = true)]
async fn sleeping_on_schedule_is_exact() {
    let backoff = BackoffStrategy::exponential(Duration::from_millis(500), Duration::from_secs(3));
    let start = tokio::time::Instant::now();
    for attempt in 0..4 {
        tokio::time::sleep(backoff.delay_for(attempt)).await;
    }
    assert_eq!(start.elapsed(), Duration::from_millis(6500));
}
