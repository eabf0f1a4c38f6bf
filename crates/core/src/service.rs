//! Realtime service - composition root for the update channel
//!
//! Wires the network observer, credential coordinator, retry engine,
//! connection manager and event dispatcher around injected collaborators
//! and owns their lifecycle.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::info;
use wavelink_common::{CommonError, ComponentHealth, ManagerHealth, ManagerStatus};
use wavelink_domain::{
    ApiRequest, ApiResponse, ChannelConfig, ConnectionState, NetworkStatus, Topic,
};

use crate::auth::CredentialRefreshCoordinator;
use crate::connection::{ConnectionManager, ConnectionSettings};
use crate::error::{ChannelError, ChannelResult, RequestError};
use crate::error_log::ErrorLog;
use crate::events::{EventDispatcher, HandlerError, HandlerId};
use crate::network::NetworkObserver;
use crate::ports::{
    CredentialRefresher, CredentialStore, DuplexTransport, ErrorReporter, RequestSender,
};
use crate::retry::{RetryPolicyEngine, RetrySettings};

/// Collects collaborators for [`RealtimeService::init`]
pub struct RealtimeServiceBuilder {
    config: ChannelConfig,
    network: NetworkStatus,
    transport: Option<Arc<dyn DuplexTransport>>,
    refresher: Option<Arc<dyn CredentialRefresher>>,
    store: Option<Arc<dyn CredentialStore>>,
    sender: Option<Arc<dyn RequestSender>>,
    reporter: Option<Arc<dyn ErrorReporter>>,
}

impl RealtimeServiceBuilder {
    pub fn with_transport(mut self, transport: Arc<dyn DuplexTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_refresher(mut self, refresher: Arc<dyn CredentialRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn with_credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_request_sender(mut self, sender: Arc<dyn RequestSender>) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Optional remote collector for server-side failures
    pub fn with_error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Connectivity to assume until the platform reports otherwise
    pub fn with_initial_network(mut self, status: NetworkStatus) -> Self {
        self.network = status;
        self
    }

    /// Validate the configuration, seed credentials and start the
    /// connection actor. Must be called inside a Tokio runtime.
    pub async fn init(self) -> ChannelResult<RealtimeService> {
        self.config.validate()?;

        let transport = required(self.transport, "transport")?;
        let refresher = required(self.refresher, "refresher")?;
        let store = required(self.store, "credential_store")?;
        let sender = required(self.sender, "request_sender")?;

        let network = NetworkObserver::new(self.network);
        let credentials = CredentialRefreshCoordinator::new(
            refresher,
            store,
            network.clone(),
            self.config.credential_expiry_leeway(),
        );
        credentials.initialize().await?;

        let dispatcher = Arc::new(EventDispatcher::new());
        let error_log = Arc::new(ErrorLog::new(self.config.error_log_capacity));

        let mut requests = RetryPolicyEngine::new(
            sender,
            credentials.clone(),
            network.clone(),
            RetrySettings::from(&self.config),
            Arc::clone(&error_log),
        );
        if let Some(reporter) = self.reporter {
            requests = requests.with_reporter(reporter);
        }

        let connection = ConnectionManager::spawn(
            ConnectionSettings::from(&self.config),
            transport,
            credentials.clone(),
            &network,
            Arc::clone(&dispatcher),
        );

        info!(
            max_reconnect_attempts = self.config.max_reconnect_attempts,
            max_request_retries = self.config.max_request_retries,
            "realtime service initialized"
        );

        Ok(RealtimeService {
            config: self.config,
            network,
            credentials,
            dispatcher,
            error_log,
            requests,
            connection,
            status: Mutex::new(ManagerStatus::Running),
        })
    }
}

fn required<T>(value: Option<T>, field: &str) -> ChannelResult<T> {
    value.ok_or_else(|| {
        ChannelError::Common(CommonError::config_field(field, "collaborator not provided"))
    })
}

pub struct RealtimeService {
    config: ChannelConfig,
    network: NetworkObserver,
    credentials: CredentialRefreshCoordinator,
    dispatcher: Arc<EventDispatcher>,
    error_log: Arc<ErrorLog>,
    requests: RetryPolicyEngine,
    connection: ConnectionManager,
    status: Mutex<ManagerStatus>,
}

impl RealtimeService {
    pub fn builder(config: ChannelConfig) -> RealtimeServiceBuilder {
        RealtimeServiceBuilder {
            config,
            network: NetworkStatus::default(),
            transport: None,
            refresher: None,
            store: None,
            sender: None,
            reporter: None,
        }
    }

    pub async fn connect(&self) -> bool {
        if !self.status().is_running() {
            return false;
        }
        self.connection.connect().await
    }

    pub async fn disconnect(&self) {
        self.connection.disconnect().await;
    }

    /// Blank topic names are rejected before anything reaches the channel.
    pub async fn subscribe<T>(&self, topic: T) -> ChannelResult<()>
    where
        T: TryInto<Topic>,
        ChannelError: From<T::Error>,
    {
        self.ensure_running()?;
        let topic = topic.try_into()?;
        self.connection.subscribe(topic).await
    }

    pub async fn unsubscribe<T>(&self, topic: T) -> ChannelResult<()>
    where
        T: TryInto<Topic>,
        ChannelError: From<T::Error>,
    {
        self.ensure_running()?;
        let topic = topic.try_into()?;
        self.connection.unsubscribe(topic).await
    }

    pub fn on<F>(&self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(&Value) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.dispatcher.on(event, handler)
    }

    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        self.dispatcher.off(event, id)
    }

    /// Issue a request through the retry engine
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, RequestError> {
        self.requests.execute(request).await
    }

    /// Feed a platform connectivity change
    pub fn update_network(&self, status: NetworkStatus) {
        self.network.update(status);
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn status(&self) -> ManagerStatus {
        *self.status.lock()
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn network(&self) -> &NetworkObserver {
        &self.network
    }

    pub fn credentials(&self) -> &CredentialRefreshCoordinator {
        &self.credentials
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    pub fn error_log(&self) -> &Arc<ErrorLog> {
        &self.error_log
    }

    /// Per-component health: network, connection and credentials
    pub fn health_check(&self) -> ManagerHealth {
        let network = self.network.current();
        let network_health = if network.is_connected {
            ComponentHealth::healthy("network")
        } else {
            ComponentHealth::unhealthy("network", "offline")
        };

        let state = self.connection.state();
        let connection_health = match state {
            ConnectionState::Connected => ComponentHealth::healthy("connection"),
            other => ComponentHealth::unhealthy("connection", other.to_string()),
        };

        let credential_health = match self.credentials.current() {
            Some(credential)
                if !credential.is_expired(self.config.credential_expiry_leeway()) =>
            {
                ComponentHealth::healthy("credentials")
            }
            Some(_) => ComponentHealth::unhealthy("credentials", "expired"),
            None => ComponentHealth::unhealthy("credentials", "missing"),
        };

        let status = self.status();
        if !status.is_running() {
            return ManagerHealth::unhealthy(format!("service {status}"))
                .with_component(network_health)
                .with_component(connection_health)
                .with_component(credential_health);
        }

        ManagerHealth::from_components(vec![network_health, connection_health, credential_health])
    }

    /// Stop the connection actor. Later calls are no-ops.
    pub async fn shutdown(&self) {
        {
            let mut status = self.status.lock();
            if matches!(*status, ManagerStatus::ShuttingDown | ManagerStatus::Shutdown) {
                return;
            }
            *status = ManagerStatus::ShuttingDown;
        }

        self.connection.shutdown().await;
        *self.status.lock() = ManagerStatus::Shutdown;
        info!("realtime service shut down");
    }

    fn ensure_running(&self) -> ChannelResult<()> {
        if self.status().is_running() {
            Ok(())
        } else {
            Err(ChannelError::ShuttingDown)
        }
    }
}
