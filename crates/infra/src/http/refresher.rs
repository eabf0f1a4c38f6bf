use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use wavelink_common::{CommonError, CommonResult};
use wavelink_core::CredentialRefresher;
use wavelink_domain::{Credential, RefreshedCredential};

use super::join_url;
use crate::errors::InfraError;

const REFRESH_PATH: &str = "auth/refresh";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Seconds until the new access token expires
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Exchanges a refresh token at `POST {base}/auth/refresh`
#[derive(Clone)]
pub struct HttpCredentialRefresher {
    client: ReqwestClient,
    endpoint: String,
}

impl HttpCredentialRefresher {
    pub fn new(base_url: &str) -> CommonResult<Self> {
        let client = ReqwestClient::builder()
            .timeout(Duration::from_secs(15))
            .no_proxy()
            .build()
            .map_err(InfraError::from)?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: ReqwestClient, base_url: &str) -> Self {
        Self { client, endpoint: join_url(base_url, REFRESH_PATH) }
    }
}

#[async_trait]
impl CredentialRefresher for HttpCredentialRefresher {
    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    async fn refresh(&self, refresh_token: &str) -> CommonResult<RefreshedCredential> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(InfraError::from)?
            .error_for_status()
            .map_err(InfraError::from)?;

        let body: RefreshResponse = response.json().await.map_err(InfraError::from)?;
        if body.token.is_empty() {
            return Err(CommonError::validation("token", "refresh response carried an empty token"));
        }

        let credential = match body.expires_in {
            Some(secs) => Credential::expiring_in(body.token, Duration::from_secs(secs)),
            None => Credential::new(body.token),
        };
        debug!(rotated = body.refresh_token.is_some(), "credential refreshed");

        Ok(RefreshedCredential { credential, refresh_token: body.refresh_token })
    }
}
