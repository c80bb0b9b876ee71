//! In-memory key-value backend - mirrors browser local storage, including
//! its size quota.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use feed_core::ports::{KeyValueBackend, KvError};

/// In-memory backend configuration.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKvConfig {
    /// Total bytes (keys plus values) the backend accepts. 0 = unlimited.
    pub quota_bytes: usize,
}

impl InMemoryKvConfig {
    pub fn from_env() -> Self {
        Self {
            quota_bytes: std::env::var("FEED_KV_QUOTA_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
        }
    }
}

/// Key-value map behind an async RwLock.
///
/// Note: Data is lost on process restart.
pub struct InMemoryKv {
    store: RwLock<HashMap<String, String>>,
    config: InMemoryKvConfig,
}

impl InMemoryKv {
    pub fn new(config: InMemoryKvConfig) -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Pre-populate a key, bypassing the quota. Used to load fixtures.
    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.store
            .get_mut()
            .insert(key.to_string(), value.to_string());
        self
    }

    fn used_bytes(store: &HashMap<String, String>, skip: &str) -> usize {
        store
            .iter()
            .filter(|(k, _)| k.as_str() != skip)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl Default for InMemoryKv {
    fn default() -> Self {
        Self::new(InMemoryKvConfig::default())
    }
}

#[async_trait]
impl KeyValueBackend for InMemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let store = self.store.read().await;
        Ok(store.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let mut store = self.store.write().await;

        if self.config.quota_bytes > 0 {
            let needed = Self::used_bytes(&store, key) + key.len() + value.len();
            if needed > self.config.quota_bytes {
                tracing::warn!(key = %key, needed, quota = self.config.quota_bytes, "Key-value quota exceeded");
                return Err(KvError::QuotaExceeded {
                    needed,
                    quota: self.config.quota_bytes,
                });
            }
        }

        store.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        let mut store = self.store.write().await;
        store.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let kv = InMemoryKv::default();
        kv.set("key1", "value1").await.unwrap();
        assert_eq!(kv.get("key1").await.unwrap(), Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_delete() {
        let kv = InMemoryKv::default();
        kv.set("key1", "value1").await.unwrap();
        kv.delete("key1").await.unwrap();
        assert_eq!(kv.get("key1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_quota_counts_replacement_not_previous_value() {
        let kv = InMemoryKv::new(InMemoryKvConfig { quota_bytes: 10 });
        kv.set("k", "12345").await.unwrap();
        // Overwriting the same key only counts the new value.
        kv.set("k", "123456789").await.unwrap();

        let err = kv.set("k", "1234567890").await.unwrap_err();
        assert!(matches!(err, KvError::QuotaExceeded { needed: 11, quota: 10 }));
        assert_eq!(kv.get("k").await.unwrap(), Some("123456789".to_string()));
    }
}
