use crate::domain_model::*;
use crate::domain_port::*;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, watch};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SessionStatus {
    SignedOut,
    SignedIn,
}

impl SessionStatus {
    fn of(credentials: &Credentials) -> Self {
        if credentials.access_token.is_some() {
            SessionStatus::SignedIn
        } else {
            SessionStatus::SignedOut
        }
    }
}

/// Process-wide credential pair with a status feed for observers.
pub struct MemorySessionStore {
    credentials: RwLock<Credentials>,
    status: watch::Sender<SessionStatus>,
    revision: AtomicU64,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::with_credentials(Credentials::empty())
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
        let (status, _) = watch::channel(SessionStatus::of(&credentials));
        Self {
            credentials: RwLock::new(credentials),
            status,
            revision: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Number of writes applied since construction.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> Credentials {
        self.credentials.read().await.clone()
    }

    pub(crate) async fn update<F>(&self, apply: F) -> Credentials
    where
        F: FnOnce(&mut Credentials),
    {
        let mut credentials = self.credentials.write().await;
        apply(&mut credentials);
        self.revision.fetch_add(1, Ordering::SeqCst);
        self.status.send_replace(SessionStatus::of(&credentials));
        credentials.clone()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn credentials(&self) -> Result<Credentials, SessionStoreError> {
        Ok(self.snapshot().await)
    }

    async fn save_credentials(&self, credentials: Credentials) -> Result<(), SessionStoreError> {
        self.update(|current| *current = credentials).await;
        Ok(())
    }

    async fn save_access_token(&self, token: AccessToken) -> Result<(), SessionStoreError> {
        self.update(|current| current.access_token = Some(token)).await;
        Ok(())
    }

    async fn save_refresh_token(&self, token: RefreshToken) -> Result<(), SessionStoreError> {
        self.update(|current| current.refresh_token = Some(token)).await;
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionStoreError> {
        self.update(|current| *current = Credentials::empty()).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_update_status_and_revision() {
        let store = MemorySessionStore::new();
        let mut status = store.subscribe();
        assert_eq!(store.status(), SessionStatus::SignedOut);

        store
            .save_credentials(Credentials::new(AccessToken::new("a"), RefreshToken::new("r")))
            .await
            .unwrap();
        assert!(status.has_changed().unwrap());
        assert_eq!(*status.borrow_and_update(), SessionStatus::SignedIn);
        assert_eq!(store.revision(), 1);

        store.clear().await.unwrap();
        assert_eq!(*status.borrow_and_update(), SessionStatus::SignedOut);
        assert!(store.snapshot().await.is_empty());
        assert_eq!(store.revision(), 2);
    }

    #[tokio::test]
    async fn single_token_writes_keep_the_other_token() {
        let store = MemorySessionStore::with_credentials(Credentials::new(
            AccessToken::new("a1"),
            RefreshToken::new("r1"),
        ));

        store.save_access_token(AccessToken::new("a2")).await.unwrap();
        let credentials = store.credentials().await.unwrap();
        assert_eq!(credentials.access_token, Some(AccessToken::new("a2")));
        assert_eq!(credentials.refresh_token, Some(RefreshToken::new("r1")));

        store.save_refresh_token(RefreshToken::new("r2")).await.unwrap();
        let credentials = store.credentials().await.unwrap();
        assert_eq!(credentials.refresh_token, Some(RefreshToken::new("r2")));
    }
}
