use async_trait::async_trait;
use parking_lot::RwLock;
use wavelink_common::CommonResult;
use wavelink_core::CredentialStore;
use wavelink_domain::StoredCredentials;

/// Process-local credential store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    inner: RwLock<StoredCredentials>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with a refresh token from a previous login
    pub fn with_refresh_token(refresh_token: impl Into<String>) -> Self {
        Self {
            inner: RwLock::new(StoredCredentials {
                credential: None,
                refresh_token: Some(refresh_token.into()),
            }),
        }
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load(&self) -> CommonResult<StoredCredentials> {
        Ok(self.inner.read().clone())
    }

    async fn save(&self, credentials: &StoredCredentials) -> CommonResult<()> {
        *self.inner.write() = credentials.clone();
        Ok(())
    }

    async fn clear(&self) -> CommonResult<()> {
        *self.inner.write() = StoredCredentials::default();
        Ok(())
    }
}
