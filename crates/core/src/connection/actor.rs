//! Connection actor
//!
//! One task owns everything mutable about the connection. The main loop
//! multiplexes host commands, inbound frames, the in-flight open attempt,
//! the reconnect timer and network changes. Handlers run to completion
//! before the next branch is polled, which gives two guarantees:
//! subscriptions are replayed on a fresh channel before its first frame is
//! read, and the `Connecting` guard is set in the same step that accepts a
//! `connect()`.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use serde_json::json;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, trace, warn};
use wavelink_common::duration_millis;
use wavelink_domain::constants::{
    EVENT_CONNECTED, EVENT_CONNECT_FAILED, EVENT_DISCONNECTED, EVENT_RECONNECTING,
    EVENT_RECONNECT_EXHAUSTED, EVENT_UPDATE,
};
use wavelink_domain::{
    ConnectionState, ControlMessage, Credential, InboundMessage, NetworkStatus, Topic,
};

use super::manager::ConnectionSettings;
use crate::auth::CredentialRefreshCoordinator;
use crate::error::ChannelError;
use crate::events::EventDispatcher;
use crate::ports::{DuplexChannel, DuplexTransport, TransportError};
use crate::subscription::SubscriptionRegistry;

pub(super) enum ConnectionCommand {
    Connect { reply: oneshot::Sender<bool> },
    Disconnect { reply: oneshot::Sender<()> },
    Subscribe { topic: Topic, reply: oneshot::Sender<()> },
    Unsubscribe { topic: Topic, reply: oneshot::Sender<()> },
    Subscriptions { reply: oneshot::Sender<Vec<Topic>> },
    Shutdown { reply: oneshot::Sender<()> },
}

enum AttemptOutcome {
    Opened { channel: Box<dyn DuplexChannel>, credential: Credential },
    CredentialFailed(ChannelError),
    OpenFailed { error: TransportError, credential: Credential },
}

#[derive(Serialize)]
struct ReconnectingPayload {
    attempt: u32,
    #[serde(rename = "delay_ms", with = "duration_millis")]
    delay: Duration,
}

enum Flow {
    Continue,
    Stop,
}

pub(super) struct ConnectionActor {
    settings: ConnectionSettings,
    transport: Arc<dyn DuplexTransport>,
    credentials: CredentialRefreshCoordinator,
    network: watch::Receiver<NetworkStatus>,
    network_open: bool,
    /// Last `is_connected` the actor acted on; reconnects fire only on a down to up edge
    network_up: bool,
    dispatcher: Arc<EventDispatcher>,
    commands: mpsc::Receiver<ConnectionCommand>,
    state: watch::Sender<ConnectionState>,
    registry: SubscriptionRegistry,
    channel: Option<Box<dyn DuplexChannel>>,
    session_credential: Option<Credential>,
    attempt: Option<BoxFuture<'static, AttemptOutcome>>,
    connect_waiters: Vec<oneshot::Sender<bool>>,
    reconnect_at: Option<Instant>,
    reconnect_attempts: u32,
    /// Host asked for a connection and has not disconnected since
    wanted: bool,
}

impl ConnectionActor {
    pub(super) fn new(
        settings: ConnectionSettings,
        transport: Arc<dyn DuplexTransport>,
        credentials: CredentialRefreshCoordinator,
        network: watch::Receiver<NetworkStatus>,
        dispatcher: Arc<EventDispatcher>,
        commands: mpsc::Receiver<ConnectionCommand>,
        state: watch::Sender<ConnectionState>,
    ) -> Self {
        let network_up = network.borrow().is_connected;
        Self {
            settings,
            transport,
            credentials,
            network,
            network_open: true,
            network_up,
            dispatcher,
            commands,
            state,
            registry: SubscriptionRegistry::new(),
            channel: None,
            session_credential: None,
            attempt: None,
            connect_waiters: Vec::new(),
            reconnect_at: None,
            reconnect_attempts: 0,
            wanted: false,
        }
    }

    pub(super) async fn run(mut self) {
        debug!("connection actor started");
        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let flow = match command {
                        Some(command) => self.handle_command(command).await,
                        None => Flow::Stop,
                    };
                    if matches!(flow, Flow::Stop) {
                        break;
                    }
                }
                outcome = next_outcome(&mut self.attempt), if self.attempt.is_some() => {
                    self.attempt = None;
                    self.handle_attempt(outcome).await;
                }
                frame = next_frame(&mut self.channel), if self.channel.is_some() => {
                    self.handle_frame(frame).await;
                }
                () = sleep_until_deadline(self.reconnect_at), if self.reconnect_at.is_some() => {
                    self.reconnect_at = None;
                    self.handle_reconnect_timer();
                }
                changed = self.network.changed(), if self.network_open => {
                    if changed.is_err() {
                        self.network_open = false;
                        continue;
                    }
                    let status = *self.network.borrow_and_update();
                    self.handle_network(status);
                }
            }
        }

        self.teardown().await;
        debug!("connection actor stopped");
    }

    async fn handle_command(&mut self, command: ConnectionCommand) -> Flow {
        match command {
            ConnectionCommand::Connect { reply } => self.handle_connect(reply),
            ConnectionCommand::Disconnect { reply } => {
                self.close_intentionally("client").await;
                let _ = reply.send(());
            }
            ConnectionCommand::Subscribe { topic, reply } => {
                if let Some(message) = self.registry.subscribe(topic) {
                    self.send_control(message).await;
                }
                let _ = reply.send(());
            }
            ConnectionCommand::Unsubscribe { topic, reply } => {
                if let Some(message) = self.registry.unsubscribe(&topic) {
                    self.send_control(message).await;
                }
                let _ = reply.send(());
            }
            ConnectionCommand::Subscriptions { reply } => {
                let _ = reply.send(self.registry.topics());
            }
            ConnectionCommand::Shutdown { reply } => {
                self.teardown().await;
                let _ = reply.send(());
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    fn handle_connect(&mut self, reply: oneshot::Sender<bool>) {
        match self.current_state() {
            ConnectionState::Connected => {
                let _ = reply.send(true);
                return;
            }
            ConnectionState::Connecting => {
                self.wanted = true;
                self.connect_waiters.push(reply);
                return;
            }
            ConnectionState::Disconnected | ConnectionState::ReconnectWaiting => {}
        }

        // Remember the intent so a later network-up connects automatically
        self.wanted = true;
        if !self.network_online() {
            info!("connect requested while offline");
            let _ = reply.send(false);
            return;
        }

        self.reconnect_at = None;
        self.connect_waiters.push(reply);
        self.start_attempt();
    }

    fn start_attempt(&mut self) {
        self.set_state(ConnectionState::Connecting);

        let credentials = self.credentials.clone();
        let transport = Arc::clone(&self.transport);
        self.attempt = Some(
            async move {
                let credential = match credentials.get_valid_credential().await {
                    Ok(credential) => credential,
                    Err(err) => return AttemptOutcome::CredentialFailed(err),
                };
                match transport.open(&credential).await {
                    Ok(channel) => AttemptOutcome::Opened { channel, credential },
                    Err(error) => AttemptOutcome::OpenFailed { error, credential },
                }
            }
            .boxed(),
        );
    }

    async fn handle_attempt(&mut self, outcome: AttemptOutcome) {
        match outcome {
            AttemptOutcome::Opened { channel, credential } => {
                self.channel = Some(channel);
                self.session_credential = Some(credential);

                for message in self.registry.replay_all() {
                    if !self.write_frame(&message).await {
                        self.resolve_waiters(false);
                        self.channel_lost("replay failed").await;
                        return;
                    }
                }

                self.reconnect_attempts = 0;
                self.set_state(ConnectionState::Connected);
                info!(topics = self.registry.len(), "channel connected");
                self.resolve_waiters(true);
                self.emit(EVENT_CONNECTED, json!({ "topics": self.registry.len() }));
            }
            AttemptOutcome::CredentialFailed(err) => {
                self.resolve_waiters(false);
                match err {
                    ChannelError::NetworkUnavailable => {
                        info!("credential unavailable while offline, waiting for network");
                        self.set_state(ConnectionState::Disconnected);
                    }
                    err => {
                        error!(error = %err, "cannot obtain credential for channel");
                        self.wanted = false;
                        self.set_state(ConnectionState::Disconnected);
                        self.emit(
                            EVENT_CONNECT_FAILED,
                            json!({ "reason": err.kind(), "message": err.user_message() }),
                        );
                    }
                }
            }
            AttemptOutcome::OpenFailed { error, credential } => {
                warn!(error = %error, "channel open failed");
                if error.is_unauthorized() {
                    self.credentials.invalidate(&credential);
                }
                self.resolve_waiters(false);
                self.schedule_reconnect();
            }
        }
    }

    async fn handle_frame(&mut self, frame: Option<Result<String, TransportError>>) {
        let text = match frame {
            Some(Ok(text)) => text,
            Some(Err(err)) => {
                if err.is_unauthorized() {
                    if let Some(credential) = &self.session_credential {
                        self.credentials.invalidate(credential);
                    }
                }
                warn!(error = %err, "channel failed");
                self.channel_lost(&err.to_string()).await;
                return;
            }
            None => {
                warn!("channel closed by peer");
                self.channel_lost("closed by peer").await;
                return;
            }
        };

        let message = match InboundMessage::parse(&text) {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "dropping malformed frame");
                return;
            }
        };

        if message.event == EVENT_UPDATE {
            if let Some(topic) = &message.topic {
                if !self.registry.is_subscribed(topic) {
                    debug!(topic = %topic, "dropping update for unsubscribed topic");
                    return;
                }
            }
        }

        trace!(event = %message.event, "dispatching inbound event");
        self.dispatcher.dispatch(&message.event, &message.to_event_payload());
    }

    fn handle_reconnect_timer(&mut self) {
        if !self.network_online() {
            info!("reconnect timer fired while offline, waiting for network");
            self.set_state(ConnectionState::Disconnected);
            return;
        }
        debug!(attempt = self.reconnect_attempts, "reconnecting");
        self.start_attempt();
    }

    fn handle_network(&mut self, status: NetworkStatus) {
        let came_up = status.is_connected && !self.network_up;
        self.network_up = status.is_connected;
        // A type change on a live network leaves the backoff schedule alone
        if !came_up || !self.wanted || self.attempt.is_some() {
            return;
        }
        if matches!(
            self.current_state(),
            ConnectionState::Disconnected | ConnectionState::ReconnectWaiting
        ) {
            info!(network_type = %status.network_type, "network restored, connecting");
            self.reconnect_at = None;
            self.start_attempt();
        }
    }

    fn network_online(&mut self) -> bool {
        let online = self.network.borrow().is_connected;
        if !online {
            self.network_up = false;
        }
        online
    }

    /// Involuntary loss of the open channel
    async fn channel_lost(&mut self, reason: &str) {
        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
        }
        self.session_credential = None;
        self.registry.mark_offline();
        self.emit(EVENT_DISCONNECTED, json!({ "reason": reason, "intentional": false }));

        if self.wanted {
            self.schedule_reconnect();
        } else {
            self.set_state(ConnectionState::Disconnected);
        }
    }

    fn schedule_reconnect(&mut self) {
        if !self.network_online() {
            info!("network down, deferring reconnect until it returns");
            self.set_state(ConnectionState::Disconnected);
            return;
        }

        if self.reconnect_attempts >= self.settings.max_reconnect_attempts {
            let attempts = self.reconnect_attempts;
            let err = ChannelError::ReconnectExhausted { attempts };
            error!(attempts, "reconnect attempts exhausted");
            self.reconnect_attempts = 0;
            self.wanted = false;
            self.set_state(ConnectionState::Disconnected);
            self.emit(
                EVENT_RECONNECT_EXHAUSTED,
                json!({ "attempts": attempts, "message": err.user_message() }),
            );
            return;
        }

        self.reconnect_attempts += 1;
        let delay = self.settings.backoff.delay_for(self.reconnect_attempts - 1);
        self.reconnect_at = Some(Instant::now() + delay);
        self.set_state(ConnectionState::ReconnectWaiting);

        warn!(attempt = self.reconnect_attempts, ?delay, "scheduling reconnect");
        let payload = ReconnectingPayload { attempt: self.reconnect_attempts, delay };
        match serde_json::to_value(&payload) {
            Ok(payload) => self.emit(EVENT_RECONNECTING, payload),
            Err(err) => error!(error = %err, "failed to encode reconnecting event"),
        }
    }

    async fn close_intentionally(&mut self, reason: &str) {
        self.wanted = false;
        self.reconnect_at = None;
        self.reconnect_attempts = 0;
        self.attempt = None;
        self.resolve_waiters(false);

        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
        }
        self.session_credential = None;
        self.registry.mark_offline();

        if self.current_state() != ConnectionState::Disconnected {
            self.set_state(ConnectionState::Disconnected);
            info!(reason, "channel disconnected");
            self.emit(EVENT_DISCONNECTED, json!({ "reason": reason, "intentional": true }));
        }
    }

    async fn teardown(&mut self) {
        self.close_intentionally("shutdown").await;
        self.registry.clear();
    }

    async fn send_control(&mut self, message: ControlMessage) {
        if !self.write_frame(&message).await {
            self.channel_lost("send failed").await;
        }
    }

    /// Write one control frame; `false` if the channel is gone.
    async fn write_frame(&mut self, message: &ControlMessage) -> bool {
        let frame = match message.to_frame() {
            Ok(frame) => frame,
            Err(err) => {
                error!(error = %err, "failed to encode control frame");
                return true;
            }
        };
        let Some(channel) = self.channel.as_mut() else {
            return false;
        };
        match channel.send(frame).await {
            Ok(()) => {
                debug!(topic = %message.topic(), "control frame sent");
                true
            }
            Err(err) => {
                warn!(error = %err, "control frame send failed");
                false
            }
        }
    }

    fn resolve_waiters(&mut self, connected: bool) {
        for waiter in self.connect_waiters.drain(..) {
            let _ = waiter.send(connected);
        }
    }

    fn current_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "connection state changed");
        }
    }

    fn emit(&self, event: &str, payload: serde_json::Value) {
        self.dispatcher.dispatch(event, &payload);
    }
}

async fn next_outcome(attempt: &mut Option<BoxFuture<'static, AttemptOutcome>>) -> AttemptOutcome {
    match attempt {
        Some(future) => future.await,
        None => pending().await,
    }
}

async fn next_frame(
    channel: &mut Option<Box<dyn DuplexChannel>>,
) -> Option<Result<String, TransportError>> {
    match channel {
        Some(channel) => channel.next_frame().await,
        None => pending().await,
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}
