//! Request execution with bounded retries
//!
//! Each attempt re-reads the credential, so a refresh triggered by one
//! request is picked up by every retry. A 401 gets exactly one
//! refresh-and-retry that does not count against `max_retries`; retryable
//! failures back off exponentially while the network is up; everything
//! else fails immediately. Terminal failures are enriched, logged to the
//! [`ErrorLog`] and, for server-side failures, forwarded to the optional
//! [`ErrorReporter`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, instrument, warn};
use wavelink_common::{BackoffStrategy, ErrorClassification};
use wavelink_domain::{ApiRequest, ApiResponse, ChannelConfig, Credential, RequestFailure};

use crate::auth::CredentialRefreshCoordinator;
use crate::error::{ChannelError, RequestError};
use crate::error_log::ErrorLog;
use crate::network::NetworkObserver;
use crate::ports::{ErrorReporter, RequestSender};

/// Retry tuning derived from [`ChannelConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub backoff: BackoffStrategy,
    pub request_timeout: Duration,
}

impl From<&ChannelConfig> for RetrySettings {
    fn from(config: &ChannelConfig) -> Self {
        Self {
            max_retries: config.max_request_retries,
            backoff: BackoffStrategy::exponential(config.base_retry_delay(), Duration::MAX),
            request_timeout: config.request_timeout(),
        }
    }
}

pub struct RetryPolicyEngine {
    sender: Arc<dyn RequestSender>,
    credentials: CredentialRefreshCoordinator,
    network: NetworkObserver,
    settings: RetrySettings,
    error_log: Arc<ErrorLog>,
    reporter: Option<Arc<dyn ErrorReporter>>,
}

impl RetryPolicyEngine {
    pub fn new(
        sender: Arc<dyn RequestSender>,
        credentials: CredentialRefreshCoordinator,
        network: NetworkObserver,
        settings: RetrySettings,
        error_log: Arc<ErrorLog>,
    ) -> Self {
        Self { sender, credentials, network, settings, error_log, reporter: None }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn settings(&self) -> &RetrySettings {
        &self.settings
    }

    /// Issue `request`, retrying as its failures allow.
    ///
    /// Only the final outcome is returned; intermediate failures are logged.
    #[instrument(
        skip(self, request),
        fields(request_id = %request.id, method = %request.method, path = %request.path)
    )]
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, RequestError> {
        let mut retries = 0_u32;
        let mut auth_retried = false;

        loop {
            let (attempt, credential) = match self.prepare(&request).await {
                Ok(prepared) => prepared,
                Err(err) => return Err(self.fail(err, &request, retries).await),
            };

            let failure = match self.send(attempt).await {
                Ok(response) => {
                    debug!(status = response.status, retries, "request succeeded");
                    return Ok(response);
                }
                Err(failure) => failure,
            };

            let err = ChannelError::from(&failure);
            match err {
                ChannelError::AuthExpired if request.authenticated && !auth_retried => {
                    auth_retried = true;
                    if let Some(rejected) = &credential {
                        self.credentials.invalidate(rejected);
                    }
                    debug!("credential rejected, retrying once after refresh");
                }
                err if err.is_retryable() => {
                    if !self.network.is_connected() {
                        warn!(error = %err, "network unavailable, not retrying");
                        return Err(self.fail(ChannelError::NetworkUnavailable, &request, retries).await);
                    }
                    if retries >= self.settings.max_retries {
                        return Err(self.fail(err, &request, retries).await);
                    }

                    let delay = self.settings.backoff.delay_for(retries);
                    retries += 1;
                    warn!(
                        error = %err,
                        attempt = retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "retrying request"
                    );
                    tokio::time::sleep(delay).await;
                }
                err => return Err(self.fail(err, &request, retries).await),
            }
        }
    }

    async fn prepare(
        &self,
        request: &ApiRequest,
    ) -> Result<(ApiRequest, Option<Credential>), ChannelError> {
        let mut attempt = request.clone();
        if !request.authenticated {
            return Ok((attempt, None));
        }

        let credential = self.credentials.get_valid_credential().await?;
        attempt.set_header("authorization", credential.bearer());
        Ok((attempt, Some(credential)))
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, RequestFailure> {
        let response =
            match tokio::time::timeout(self.settings.request_timeout, self.sender.send(request))
                .await
            {
                Ok(result) => result?,
                Err(_) => return Err(RequestFailure::Timeout),
            };

        if response.is_success() {
            Ok(response)
        } else {
            Err(RequestFailure::Status { status: response.status, body: Some(response.body.to_string()) })
        }
    }

    async fn fail(&self, err: ChannelError, request: &ApiRequest, retries: u32) -> RequestError {
        let failure = RequestError {
            user_message: err.user_message().to_string(),
            error: err,
            retry_attempts: retries,
            timestamp: Utc::now(),
            network: self.network.current(),
            request_id: request.id,
            method: request.method,
            path: request.path.clone(),
        };

        error!(
            kind = failure.error.kind(),
            status = failure.status(),
            retries,
            severity = %failure.error.severity(),
            "request failed"
        );

        let record = failure.to_record();
        self.error_log.record(record.clone());

        if matches!(failure.error, ChannelError::ServerError(_)) && failure.network.is_connected {
            if let Some(reporter) = &self.reporter {
                if let Err(report_err) = reporter.report(&record).await {
                    warn!(error = %report_err, "failed to report request failure");
                }
            }
        }

        failure
    }
}
