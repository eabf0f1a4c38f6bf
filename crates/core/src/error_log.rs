//! Bounded in-memory log of terminal request failures

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wavelink_domain::{HttpMethod, NetworkStatus};

/// One terminal failure, as logged and reported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub timestamp: DateTime<Utc>,
    pub kind: String,
    pub message: String,
    pub user_message: String,
    pub status: Option<u16>,
    pub retry_attempts: u32,
    pub network: NetworkStatus,
    pub request_id: Uuid,
    pub method: HttpMethod,
    pub path: String,
}

/// Ring of the most recent failures; the oldest entry is evicted first.
#[derive(Debug)]
pub struct ErrorLog {
    capacity: usize,
    entries: Mutex<VecDeque<ErrorRecord>>,
}

impl ErrorLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, entries: Mutex::new(VecDeque::with_capacity(capacity)) }
    }

    pub fn record(&self, record: ErrorRecord) {
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(record);
    }

    /// Oldest first
    pub fn entries(&self) -> Vec<ErrorRecord> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
