//! Token pair and its persistence.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::auth::storage::{Storage, StorageError, REFRESH_TOKEN_KEY, TOKEN_KEY};

/// Opaque bearer credentials issued by login and refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// `data` payload of the login and refresh responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPayload {
    pub token: String,
    pub refresh_token: String,
}

impl From<TokenPayload> for TokenPair {
    fn from(p: TokenPayload) -> Self {
        Self {
            access_token: p.token,
            refresh_token: p.refresh_token,
        }
    }
}

/// Typed view over the two credential keys in a [`Storage`].
#[derive(Clone)]
pub struct Credentials {
    storage: Arc<dyn Storage>,
}

impl Credentials {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn access_token(&self) -> Option<String> {
        self.storage.get_item(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.storage.get_item(REFRESH_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn save(&self, pair: &TokenPair) -> Result<(), StorageError> {
        self.storage.set_item(TOKEN_KEY, &pair.access_token)?;
        self.storage.set_item(REFRESH_TOKEN_KEY, &pair.refresh_token)
    }

    /// Remove both tokens. Attempts both removals even if the first fails.
    pub fn clear(&self) -> Result<(), StorageError> {
        let access = self.storage.remove_item(TOKEN_KEY);
        let refresh = self.storage.remove_item(REFRESH_TOKEN_KEY);
        access.and(refresh)
    }

    /// [`save`](Self::save) on the blocking pool; file-backed storage does
    /// synchronous I/O.
    pub async fn store(&self, pair: TokenPair) -> Result<(), StorageError> {
        let credentials = self.clone();
        tokio::task::spawn_blocking(move || credentials.save(&pair))
            .await
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))?
    }

    /// [`clear`](Self::clear) on the blocking pool.
    pub async fn wipe(&self) -> Result<(), StorageError> {
        let credentials = self.clone();
        tokio::task::spawn_blocking(move || credentials.clear())
            .await
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::{FileStorage, MemoryStorage};

    #[test]
    fn test_payload_maps_to_pair() {
        let payload: TokenPayload =
            serde_json::from_str(r#"{"token":"a1","refresh_token":"r1"}"#).unwrap();
        let pair = TokenPair::from(payload);
        assert_eq!(pair.access_token, "a1");
        assert_eq!(pair.refresh_token, "r1");
    }

    #[test]
    fn test_save_and_clear() {
        let storage = Arc::new(MemoryStorage::new());
        let credentials = Credentials::new(storage.clone());
        assert!(credentials.access_token().is_none());

        let pair = TokenPair {
            access_token: "a".into(),
            refresh_token: "r".into(),
        };
        credentials.save(&pair).unwrap();
        assert_eq!(credentials.access_token().as_deref(), Some("a"));
        assert_eq!(credentials.refresh_token().as_deref(), Some("r"));

        credentials.clear().unwrap();
        assert!(storage.get_item(TOKEN_KEY).is_none());
        assert!(storage.get_item(REFRESH_TOKEN_KEY).is_none());
    }

    #[tokio::test]
    async fn test_store_and_wipe_on_blocking_pool() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let credentials = Credentials::new(Arc::new(FileStorage::open(&path).unwrap()));

        credentials
            .store(TokenPair { access_token: "a".into(), refresh_token: "r".into() })
            .await
            .unwrap();
        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get_item(TOKEN_KEY).as_deref(), Some("a"));

        credentials.wipe().await.unwrap();
        assert!(credentials.refresh_token().is_none());
        assert!(FileStorage::open(&path).unwrap().get_item(REFRESH_TOKEN_KEY).is_none());
    }

    #[test]
    fn test_empty_refresh_token_counts_as_missing() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item(REFRESH_TOKEN_KEY, "").unwrap();
        assert!(Credentials::new(storage).refresh_token().is_none());
    }
}
