use crate::domain_model::*;

#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn credentials(&self) -> Result<Credentials, SessionStoreError>;
    /// Replace the whole pair in one write (login, refresh success).
    async fn save_credentials(&self, credentials: Credentials) -> Result<(), SessionStoreError>;
    async fn save_access_token(&self, token: AccessToken) -> Result<(), SessionStoreError>;
    async fn save_refresh_token(&self, token: RefreshToken) -> Result<(), SessionStoreError>;
    /// Drop both tokens (logout).
    async fn clear(&self) -> Result<(), SessionStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
