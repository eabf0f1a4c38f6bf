//! Requests issued through the retry engine and their outcomes

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request handed to the request-issuing collaborator.
///
/// The engine sets the `authorization` header on every attempt when
/// `authenticated` is true, so retries always carry the latest credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    /// Correlates log lines across attempts
    pub id: Uuid,
    pub method: HttpMethod,
    /// Path relative to the API base URL
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    pub authenticated: bool,
}

impl ApiRequest {
    pub fn new<P: Into<String>>(method: HttpMethod, path: P) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
            authenticated: true,
        }
    }

    pub fn get<P: Into<String>>(path: P) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post<P: Into<String>>(path: P, body: serde_json::Value) -> Self {
        Self::new(HttpMethod::Post, path).with_body(body)
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a header, replacing any existing one with the same name
    pub fn with_header<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.set_header(name, value);
        self
    }

    /// Skip credential attachment and the auth-refresh path
    pub fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }

    pub fn set_header<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        let name = name.into();
        self.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Successful response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    #[serde(default)]
    pub body: serde_json::Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: serde_json::Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure reported by the request-issuing collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestFailure {
    /// Response received with a non-success status
    #[error("request failed with status {status}")]
    Status { status: u16, body: Option<String> },

    #[error("request timed out")]
    Timeout,

    #[error("connection reset")]
    ConnectionReset,

    /// No response at all (DNS, refused connection, offline)
    #[error("network failure: {0}")]
    Network(String),
}

impl RequestFailure {
    pub fn status(status: u16) -> Self {
        Self::Status { status, body: None }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
