use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::sync::{Mutex, watch};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    credentials: Credentials,
    updated_at: DateTime<Utc>,
}

/// Credential pair persisted as JSON, cached in memory.
///
/// Every write replaces the file through a uniquely named temp file and a
/// rename, so a crash leaves either the old or the new pair on disk. Writes
/// and clears hold `writer` across the cache update and the file I/O, so the
/// file always ends up matching the cache.
pub struct FileSessionStore {
    path: PathBuf,
    cache: MemorySessionStore,
    writer: Mutex<()>,
}

impl FileSessionStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, SessionStoreError> {
        let path = path.into();
        let credentials = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<SessionFile>(&bytes)?.credentials,
            Err(e) if e.kind() == ErrorKind::NotFound => Credentials::empty(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), signed_in = credentials.access_token.is_some(), "opened session file");

        Ok(Self {
            path,
            cache: MemorySessionStore::with_credentials(credentials),
            writer: Mutex::new(()),
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.cache.subscribe()
    }

    async fn write<F>(&self, apply: F) -> Result<(), SessionStoreError>
    where
        F: FnOnce(&mut Credentials),
    {
        let _writer = self.writer.lock().await;
        let current = self.cache.update(apply).await;
        self.persist(current).await
    }

    async fn persist(&self, credentials: Credentials) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let file = SessionFile {
            credentials,
            updated_at: Utc::now(),
        };
        let bytes = serde_json::to_vec_pretty(&file)?;

        let tmp = self
            .path
            .with_extension(format!("{}.tmp", nanoid::nanoid!(8)));
        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionStore for FileSessionStore {
    async fn credentials(&self) -> Result<Credentials, SessionStoreError> {
        Ok(self.cache.snapshot().await)
    }

    async fn save_credentials(&self, credentials: Credentials) -> Result<(), SessionStoreError> {
        self.write(|c| *c = credentials).await
    }

    async fn save_access_token(&self, token: AccessToken) -> Result<(), SessionStoreError> {
        self.write(|c| c.access_token = Some(token)).await
    }

    async fn save_refresh_token(&self, token: RefreshToken) -> Result<(), SessionStoreError> {
        self.write(|c| c.refresh_token = Some(token)).await
    }

    async fn clear(&self) -> Result<(), SessionStoreError> {
        let _writer = self.writer.lock().await;
        self.cache.update(|c| *c = Credentials::empty()).await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    fn leftover_temp_files(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter(|entry| {
                entry
                    .as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .ends_with(".tmp")
            })
            .count()
    }

    #[tokio::test]
    async fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::open(dir.path().join("session.json"))
            .await
            .unwrap();
        assert!(store.credentials().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn credentials_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileSessionStore::open(&path).await.unwrap();
        store
            .save_credentials(Credentials::new(AccessToken::new("a1"), RefreshToken::new("r1")))
            .await
            .unwrap();
        store.save_access_token(AccessToken::new("a2")).await.unwrap();
        drop(store);

        let reopened = FileSessionStore::open(&path).await.unwrap();
        let credentials = reopened.credentials().await.unwrap();
        assert_eq!(credentials.access_token, Some(AccessToken::new("a2")));
        assert_eq!(credentials.refresh_token, Some(RefreshToken::new("r1")));
        assert_eq!(leftover_temp_files(path.parent().unwrap()), 0);
    }

    #[tokio::test]
    async fn clear_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = FileSessionStore::open(&path).await.unwrap();
        store
            .save_credentials(Credentials::new(AccessToken::new("a"), RefreshToken::new("r")))
            .await
            .unwrap();
        assert!(path.exists());

        store.clear().await.unwrap();
        assert!(!path.exists());
        assert_eq!(*store.subscribe().borrow(), SessionStatus::SignedOut);

        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"not json").unwrap();

        let result = FileSessionStore::open(&path).await;
        assert!(matches!(result, Err(SessionStoreError::Serde(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writes_leave_the_file_matching_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = Arc::new(FileSessionStore::open(&path).await.unwrap());
        store
            .save_credentials(Credentials::new(AccessToken::new("a0"), RefreshToken::new("r0")))
            .await
            .unwrap();

        let writers: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    if i % 2 == 0 {
                        store.save_access_token(AccessToken::new(format!("a{i}"))).await
                    } else {
                        store.save_refresh_token(RefreshToken::new(format!("r{i}"))).await
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        let cached = store.credentials().await.unwrap();
        let reopened = FileSessionStore::open(&path).await.unwrap();
        assert_eq!(reopened.credentials().await.unwrap(), cached);
        assert_eq!(leftover_temp_files(dir.path()), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn clear_racing_a_save_never_resurrects_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        for _ in 0..20 {
            let store = Arc::new(FileSessionStore::open(&path).await.unwrap());
            store
                .save_credentials(Credentials::new(AccessToken::new("a"), RefreshToken::new("r")))
                .await
                .unwrap();

            let saver = {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.save_access_token(AccessToken::new("rotated")).await })
            };
            store.clear().await.unwrap();
            saver.await.unwrap().unwrap();

            let cached = store.credentials().await.unwrap();
            let on_disk = FileSessionStore::open(&path).await.unwrap().credentials().await.unwrap();
            assert_eq!(on_disk, cached);
            if cached.access_token.is_none() {
                assert!(!path.exists());
            }

            store.clear().await.unwrap();
        }
    }
}
