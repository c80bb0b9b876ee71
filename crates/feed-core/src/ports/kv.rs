use async_trait::async_trait;

use crate::error::StorageError;

/// Key-value persistence backend (browser-style local storage, Redis, ...).
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Read a value. `Ok(None)` when the key was never written.
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError>;

    async fn delete(&self, key: &str) -> Result<(), KvError>;
}

/// Key-value operation errors.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl From<KvError> for StorageError {
    fn from(err: KvError) -> Self {
        match err {
            KvError::QuotaExceeded { .. } => StorageError::QuotaExceeded(err.to_string()),
            KvError::Connection(msg) | KvError::Operation(msg) => StorageError::Unavailable(msg),
        }
    }
}
