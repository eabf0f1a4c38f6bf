use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as ReqwestClient, Method, Url};
use serde_json::Value;
use tracing::debug;
use wavelink_common::{CommonError, CommonResult};
use wavelink_core::RequestSender;
use wavelink_domain::{ApiRequest, ApiResponse, HttpMethod, RequestFailure};

use super::join_url;
use crate::errors::{request_failure, InfraError};

/// Sends [`ApiRequest`]s to a fixed base URL.
///
/// Performs exactly one attempt per call. Retries, deadlines and credential
/// headers are the retry engine's job.
#[derive(Clone)]
pub struct HttpRequestSender {
    client: ReqwestClient,
    base_url: String,
}

impl HttpRequestSender {
    /// Start building a sender for `base_url`.
    pub fn builder(base_url: impl Into<String>) -> HttpRequestSenderBuilder {
        HttpRequestSenderBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request(&self, request: &ApiRequest) -> Result<reqwest::RequestBuilder, RequestFailure> {
        let url = join_url(&self.base_url, &request.path);
        let url = Url::parse(&url)
            .map_err(|e| RequestFailure::Network(format!("invalid request url {url}: {e}")))?;

        let mut builder = self.client.request(to_method(request.method), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        Ok(builder)
    }
}

#[async_trait]
impl RequestSender for HttpRequestSender {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, RequestFailure> {
        let builder = self.build_request(&request)?;
        debug!(request_id = %request.id, method = %request.method, path = %request.path, "sending HTTP request");

        let response = builder.send().await.map_err(|err| {
            debug!(request_id = %request.id, error = %err, "HTTP request failed");
            request_failure(&err)
        })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|err| request_failure(&err))?;
        debug!(request_id = %request.id, status, "received HTTP response");

        if !(200..300).contains(&status) {
            let body = (!text.is_empty()).then_some(text);
            return Err(RequestFailure::Status { status, body });
        }

        Ok(ApiResponse::new(status, parse_body(text)))
    }
}

/// Empty bodies become `null`; non-JSON bodies are kept as a string.
fn parse_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Builder for [`HttpRequestSender`].
#[derive(Debug)]
pub struct HttpRequestSenderBuilder {
    base_url: String,
    connect_timeout: Duration,
    user_agent: Option<String>,
    default_headers: HeaderMap,
}

impl HttpRequestSenderBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout: Duration::from_secs(10),
            user_agent: None,
            default_headers: HeaderMap::new(),
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Header sent with every request, e.g. an API version.
    ///
    /// # Errors
    /// Returns `CommonError::Validation` for names or values that are not
    /// valid HTTP header text.
    pub fn default_header(mut self, name: &str, value: &str) -> CommonResult<Self> {
        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| CommonError::validation("header", e.to_string()))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| CommonError::validation("header", e.to_string()))?;
        self.default_headers.insert(header, value);
        Ok(self)
    }

    pub fn build(self) -> CommonResult<HttpRequestSender> {
        Url::parse(&self.base_url)
            .map_err(|e| CommonError::config_field("base_url", e.to_string()))?;

        let mut builder = ReqwestClient::builder()
            .connect_timeout(self.connect_timeout)
            .default_headers(self.default_headers)
            .no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder.build().map_err(InfraError::from)?;

        Ok(HttpRequestSender { client, base_url: self.base_url })
    }
}
