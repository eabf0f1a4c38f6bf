//! Connectivity observer
//!
//! The host feeds platform reachability changes into [`NetworkObserver::update`];
//! the connection manager and retry engine read the latest snapshot before
//! every connect or retry decision. Backed by a `watch` channel: single
//! writer, any number of readers, last writer wins.

use tokio::sync::watch;
use tracing::info;
use wavelink_domain::NetworkStatus;

#[derive(Debug, Clone)]
pub struct NetworkObserver {
    tx: watch::Sender<NetworkStatus>,
}

impl NetworkObserver {
    pub fn new(initial: NetworkStatus) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn current(&self) -> NetworkStatus {
        *self.tx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.tx.borrow().is_connected
    }

    /// Publish a new snapshot. Readers are only woken when it differs from
    /// the previous one.
    pub fn update(&self, status: NetworkStatus) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });

        if changed {
            info!(
                is_connected = status.is_connected,
                network_type = %status.network_type,
                "network status changed"
            );
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.tx.subscribe()
    }
}

impl Default for NetworkObserver {
    fn default() -> Self {
        Self::new(NetworkStatus::default())
    }
}
