use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use wavelink_common::{CommonError, CommonResult};
use wavelink_core::{CredentialRefresher, CredentialStore};
use wavelink_domain::{Credential, RefreshedCredential, StoredCredentials};

/// Refresher that issues `access-N` on the N-th call after `delay`.
pub struct FakeRefresher {
    calls: AtomicUsize,
    delay: Duration,
    failures: Mutex<VecDeque<CommonError>>,
    panic_next: AtomicBool,
}

impl FakeRefresher {
    pub fn new(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
            failures: Mutex::new(VecDeque::new()),
            panic_next: AtomicBool::new(false),
        }
    }

    /// Panic inside the next call instead of answering
    pub fn panic_next(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }

    /// Fail the next call with `error`
    pub fn fail_next(&self, error: CommonError) {
        self.failures.lock().push_back(error);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialRefresher for FakeRefresher {
    async fn refresh(&self, _refresh_token: &str) -> CommonResult<RefreshedCredential> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("refresher blew up on call {call}");
        }
        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }
        Ok(RefreshedCredential {
            credential: Credential::new(format!("access-{call}")),
            refresh_token: Some(format!("refresh-{call}")),
        })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    stored: Mutex<StoredCredentials>,
    clears: AtomicUsize,
}

impl MemoryStore {
    pub fn with_refresh_token(token: &str) -> Self {
        let store = Self::default();
        store.stored.lock().refresh_token = Some(token.to_string());
        store
    }

    pub fn with_credentials(access: &str, refresh: &str) -> Self {
        let store = Self::with_refresh_token(refresh);
        store.stored.lock().credential = Some(Credential::new(access));
        store
    }

    pub fn snapshot(&self) -> StoredCredentials {
        self.stored.lock().clone()
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn load(&self) -> CommonResult<StoredCredentials> {
        Ok(self.stored.lock().clone())
    }

    async fn save(&self, credentials: &StoredCredentials) -> CommonResult<()> {
        *self.stored.lock() = credentials.clone();
        Ok(())
    }

    async fn clear(&self) -> CommonResult<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        *self.stored.lock() = StoredCredentials::default();
        Ok(())
    }
}
