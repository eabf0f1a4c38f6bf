//! Shared test doubles for `wavelink-core` integration tests.
//!
//! Every port has an in-memory fake with counters so tests can assert on
//! how often collaborators were called and with what.

#![allow(dead_code)]

pub mod auth;
pub mod requests;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use wavelink_domain::ConnectionState;

/// Shared, ordered record of observable side effects
pub type Journal = Arc<parking_lot::Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(parking_lot::Mutex::new(Vec::new()))
}

/// Wait (in virtual time) until the state receiver reports `target`.
pub async fn wait_for_state(rx: &mut watch::Receiver<ConnectionState>, target: ConnectionState) {
    let reached = tokio::time::timeout(Duration::from_secs(600), async {
        loop {
            if *rx.borrow_and_update() == target {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    })
    .await;
    assert!(reached.is_ok(), "timed out waiting for {target}");
    assert_eq!(*rx.borrow(), target);
}

/// Let spawned tasks run without advancing the clock meaningfully.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
