//! Access credentials
//!
//! `Debug` output never contains token material.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bearer credential used for channel opens and authenticated requests
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    /// `None` means the backend did not announce an expiry
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new<S: Into<String>>(access_token: S) -> Self {
        Self { access_token: access_token.into(), expires_at: None }
    }

    /// Credential expiring `ttl` from now
    pub fn expiring_in<S: Into<String>>(access_token: S, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = Utc::now().checked_add_signed(ttl);
        Self { access_token: access_token.into(), expires_at }
    }

    /// Expired, or expiring within `leeway`
    pub fn is_expired(&self, leeway: Duration) -> bool {
        let Some(expires_at) = self.expires_at else {
            return false;
        };
        let leeway = chrono::Duration::from_std(leeway).unwrap_or(chrono::Duration::MAX);
        match Utc::now().checked_add_signed(leeway) {
            Some(deadline) => deadline >= expires_at,
            None => true,
        }
    }

    /// `Authorization` header value
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Result of a successful refresh call
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshedCredential {
    pub credential: Credential,
    /// Rotated refresh token, when the backend issued one
    pub refresh_token: Option<String>,
}

impl fmt::Debug for RefreshedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshedCredential")
            .field("credential", &self.credential)
            .field("rotated", &self.refresh_token.is_some())
            .finish()
    }
}

/// What the credential store persists between sessions
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub credential: Option<Credential>,
    pub refresh_token: Option<String>,
}

impl fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("credential", &self.credential)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_expiry_never_expires() {
        let credential = Credential::new("abc");
        assert!(!credential.is_expired(Duration::from_secs(3600)));
    }

    #[test]
    fn test_leeway_counts_as_expired() {
        let credential = Credential::expiring_in("abc", Duration::from_secs(10));
        assert!(!credential.is_expired(Duration::ZERO));
        assert!(credential.is_expired(Duration::from_secs(30)));
    }

    #[test]
    fn test_past_expiry_is_expired() {
        let credential = Credential {
            access_token: "abc".to_string(),
            expires_at: Some(Utc::now() - chrono::Duration::seconds(5)),
        };
        assert!(credential.is_expired(Duration::ZERO));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let stored = StoredCredentials {
            credential: Some(Credential::new("secret-access")),
            refresh_token: Some("secret-refresh".to_string()),
        };
        let rendered = format!("{stored:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("has_refresh_token: true"));
    }

    #[test]
    fn test_bearer_header() {
        assert_eq!(Credential::new("t0k").bearer(), "Bearer t0k");
    }
}
