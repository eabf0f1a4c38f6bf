//! Public handle to the connection actor

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::debug;
use wavelink_common::BackoffStrategy;
use wavelink_domain::{ChannelConfig, ConnectionState, Topic};

use super::actor::{ConnectionActor, ConnectionCommand};
use crate::auth::CredentialRefreshCoordinator;
use crate::error::{ChannelError, ChannelResult};
use crate::events::EventDispatcher;
use crate::network::NetworkObserver;
use crate::ports::DuplexTransport;

const COMMAND_CHANNEL_CAPACITY: usize = 256;

/// Reconnect tuning derived from [`ChannelConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub max_reconnect_attempts: u32,
    pub backoff: BackoffStrategy,
}

impl From<&ChannelConfig> for ConnectionSettings {
    fn from(config: &ChannelConfig) -> Self {
        Self {
            max_reconnect_attempts: config.max_reconnect_attempts,
            backoff: BackoffStrategy::exponential(
                config.base_reconnect_delay(),
                config.max_reconnect_delay(),
            ),
        }
    }
}

pub struct ConnectionManager {
    commands: mpsc::Sender<ConnectionCommand>,
    state: watch::Receiver<ConnectionState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    /// Spawn the connection actor. Must be called inside a Tokio runtime.
    pub fn spawn(
        settings: ConnectionSettings,
        transport: Arc<dyn DuplexTransport>,
        credentials: CredentialRefreshCoordinator,
        network: &NetworkObserver,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        let (commands, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (state_tx, state) = watch::channel(ConnectionState::Disconnected);

        let actor = ConnectionActor::new(
            settings,
            transport,
            credentials,
            network.subscribe(),
            dispatcher,
            command_rx,
            state_tx,
        );
        let task = tokio::spawn(actor.run());

        Self { commands, state, task: Mutex::new(Some(task)) }
    }

    /// Open the channel.
    ///
    /// Resolves `true` once connected, `false` if the network is down or the
    /// attempt failed. Calls made while an attempt is in flight share its
    /// outcome.
    pub async fn connect(&self) -> bool {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(ConnectionCommand::Connect { reply }).await.is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Intentional teardown; never followed by an automatic reconnect.
    pub async fn disconnect(&self) {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(ConnectionCommand::Disconnect { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    pub async fn subscribe(&self, topic: Topic) -> ChannelResult<()> {
        self.request(|reply| ConnectionCommand::Subscribe { topic, reply }).await
    }

    pub async fn unsubscribe(&self, topic: Topic) -> ChannelResult<()> {
        self.request(|reply| ConnectionCommand::Unsubscribe { topic, reply }).await
    }

    /// Topics the host is subscribed to, whether or not they are live
    pub async fn subscriptions(&self) -> ChannelResult<Vec<Topic>> {
        self.request(|reply| ConnectionCommand::Subscriptions { reply }).await
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver notified on every state transition
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Stop the actor, closing the channel and forgetting subscriptions.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(ConnectionCommand::Shutdown { reply }).await.is_ok() {
            let _ = rx.await;
        }

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                debug!(error = %err, "connection actor ended abnormally");
            }
        }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> ConnectionCommand,
    ) -> ChannelResult<T> {
        let (reply, rx) = oneshot::channel();
        self.commands.send(command(reply)).await.map_err(|_| ChannelError::ShuttingDown)?;
        rx.await.map_err(|_| ChannelError::ShuttingDown)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}
