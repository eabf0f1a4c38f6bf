//! Single-flight credential refresh
//!
//! At most one refresh runs at a time. The first caller that finds no usable
//! credential spawns the refresh task; every caller, the first included,
//! parks a completion slot in the pending list and awaits it. The task
//! drains the list under the lock once the refresher returns, so all
//! waiters observe the same outcome.
//!
//! The refresh runs on its own task and is never cancelled by a caller
//! giving up. A refresher that panics settles the flight with an error so
//! the next caller starts a fresh one.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, error, info, instrument, warn};
use wavelink_common::CommonError;
use wavelink_domain::{Credential, StoredCredentials};

use crate::error::{ChannelError, ChannelResult};
use crate::network::NetworkObserver;
use crate::ports::{CredentialRefresher, CredentialStore};

type Waiter = oneshot::Sender<ChannelResult<Credential>>;

#[derive(Default)]
struct CoordinatorState {
    cached: Option<Credential>,
    /// Set when the server rejected the cached credential
    invalidated: bool,
    /// `Some` while a refresh is in flight
    pending: Option<Vec<Waiter>>,
}

struct Inner {
    refresher: Arc<dyn CredentialRefresher>,
    store: Arc<dyn CredentialStore>,
    network: NetworkObserver,
    leeway: Duration,
    state: Mutex<CoordinatorState>,
}

#[derive(Clone)]
pub struct CredentialRefreshCoordinator {
    inner: Arc<Inner>,
}

impl CredentialRefreshCoordinator {
    pub fn new(
        refresher: Arc<dyn CredentialRefresher>,
        store: Arc<dyn CredentialStore>,
        network: NetworkObserver,
        leeway: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                refresher,
                store,
                network,
                leeway,
                state: Mutex::new(CoordinatorState::default()),
            }),
        }
    }

    /// Seed the cache from the credential store
    pub async fn initialize(&self) -> ChannelResult<()> {
        let stored = self.inner.store.load().await?;
        let has_credential = stored.credential.is_some();
        let mut state = self.inner.state.lock();
        state.cached = stored.credential;
        state.invalidated = false;
        drop(state);

        debug!(has_credential, "credential cache seeded from store");
        Ok(())
    }

    /// Replace the stored credentials, e.g. after an interactive login
    pub async fn store_credentials(&self, credentials: StoredCredentials) -> ChannelResult<()> {
        self.inner.store.save(&credentials).await?;
        let mut state = self.inner.state.lock();
        state.cached = credentials.credential;
        state.invalidated = false;
        Ok(())
    }

    /// Cached credential when usable, otherwise the result of a refresh.
    pub async fn get_valid_credential(&self) -> ChannelResult<Credential> {
        let (rx, start_refresh) = {
            let mut state = self.inner.state.lock();
            if !state.invalidated {
                if let Some(credential) = &state.cached {
                    if !credential.is_expired(self.inner.leeway) {
                        return Ok(credential.clone());
                    }
                }
            }

            let (tx, rx) = oneshot::channel();
            let start_refresh = match state.pending.as_mut() {
                Some(waiters) => {
                    waiters.push(tx);
                    false
                }
                None => {
                    state.pending = Some(vec![tx]);
                    true
                }
            };
            (rx, start_refresh)
        };

        if start_refresh {
            tokio::spawn(Arc::clone(&self.inner).run_refresh());
        } else {
            debug!("joining in-flight credential refresh");
        }

        rx.await.unwrap_or_else(|_| {
            Err(ChannelError::Common(CommonError::task_cancelled(
                "credential-refresh",
                "refresh task ended without a result",
            )))
        })
    }

    /// Flag `rejected` as invalid if it is still the cached credential.
    ///
    /// Returns `false` when the cache already holds a different credential,
    /// e.g. one produced by a refresh that finished after the rejected
    /// request was sent.
    pub fn invalidate(&self, rejected: &Credential) -> bool {
        let mut state = self.inner.state.lock();
        let matches = state
            .cached
            .as_ref()
            .is_some_and(|cached| cached.access_token == rejected.access_token);
        if matches {
            state.invalidated = true;
        }
        matches
    }

    /// Cached credential regardless of expiry
    pub fn current(&self) -> Option<Credential> {
        self.inner.state.lock().cached.clone()
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.state.lock().pending.is_some()
    }

    /// Drop the cached and stored credentials
    pub async fn clear(&self) -> ChannelResult<()> {
        {
            let mut state = self.inner.state.lock();
            state.cached = None;
            state.invalidated = false;
        }
        self.inner.store.clear().await?;
        Ok(())
    }
}

impl Inner {
    #[instrument(name = "credential_refresh", skip(self))]
    async fn run_refresh(self: Arc<Self>) {
        let outcome = match AssertUnwindSafe(self.refresh_once()).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!("credential refresher panicked");
                Err(ChannelError::Common(CommonError::task_cancelled(
                    "credential-refresh",
                    "refresher panicked",
                )))
            }
        };

        let waiters = {
            let mut state = self.state.lock();
            match &outcome {
                Ok(credential) => {
                    state.cached = Some(credential.clone());
                    state.invalidated = false;
                }
                Err(ChannelError::NetworkUnavailable) => {}
                Err(_) => {
                    state.cached = None;
                    state.invalidated = false;
                }
            }
            state.pending.take().unwrap_or_default()
        };

        match &outcome {
            Ok(_) => info!(waiters = waiters.len(), "credential refreshed"),
            Err(err) => warn!(waiters = waiters.len(), error = %err, "credential refresh failed"),
        }

        for waiter in waiters {
            // A waiter that stopped listening is fine to skip
            let _ = waiter.send(outcome.clone());
        }
    }

    async fn refresh_once(&self) -> ChannelResult<Credential> {
        if !self.network.is_connected() {
            return Err(ChannelError::NetworkUnavailable);
        }

        let stored = self
            .store
            .load()
            .await
            .map_err(|err| ChannelError::RefreshFailed(format!("credential store: {err}")))?;

        let Some(refresh_token) = stored.refresh_token else {
            self.clear_store().await;
            return Err(ChannelError::RefreshFailed("no refresh token available".to_string()));
        };

        match self.refresher.refresh(&refresh_token).await {
            Ok(refreshed) => {
                let credential = refreshed.credential;
                let persisted = StoredCredentials {
                    credential: Some(credential.clone()),
                    refresh_token: refreshed.refresh_token.or(Some(refresh_token)),
                };
                if let Err(err) = self.store.save(&persisted).await {
                    warn!(error = %err, "failed to persist refreshed credential");
                }
                Ok(credential)
            }
            Err(err) => {
                self.clear_store().await;
                Err(ChannelError::RefreshFailed(err.to_string()))
            }
        }
    }

    async fn clear_store(&self) {
        if let Err(err) = self.store.clear().await {
            warn!(error = %err, "failed to clear stored credentials");
        }
    }
}
