//! Redis key-value backend for the server deployment.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};

use feed_core::ports::{KeyValueBackend, KvError};

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    pub connect_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            connect_timeout: Duration::from_secs(
                std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
        }
    }
}

/// Redis-backed key-value store.
///
/// Uses connection manager for automatic reconnection.
pub struct RedisKv {
    conn: ConnectionManager,
}

impl RedisKv {
    pub async fn new(config: RedisConfig) -> Result<Self, KvError> {
        let client =
            Client::open(config.url.as_str()).map_err(|e| KvError::Connection(e.to_string()))?;

        let conn = tokio::time::timeout(config.connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| KvError::Connection("Connection timed out".to_string()))?
            .map_err(|e| KvError::Connection(e.to_string()))?;

        tracing::info!(url = %config.url, "Connected to Redis key-value backend");

        Ok(Self { conn })
    }

    pub async fn from_env() -> Result<Self, KvError> {
        Self::new(RedisConfig::from_env()).await
    }
}

#[async_trait]
impl KeyValueBackend for RedisKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(key).await.map_err(|e| {
            tracing::warn!(key = %key, error = %e, "Redis GET failed");
            KvError::Operation(e.to_string())
        })
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| write_error(key, value, e))
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| KvError::Operation(e.to_string()))
    }
}

/// Redis rejects writes past `maxmemory` with an `OOM` error reply.
fn write_error(key: &str, value: &str, e: RedisError) -> KvError {
    if e.code() == Some("OOM") {
        KvError::QuotaExceeded {
            needed: key.len() + value.len(),
            quota: 0,
        }
    } else {
        KvError::Operation(e.to_string())
    }
}
