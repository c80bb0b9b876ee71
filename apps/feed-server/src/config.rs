//! Application configuration loaded from environment variables.

use std::env;

use feed_engine::EngineConfig;
use feed_infra::{InMemoryKvConfig, StoreConfig};

/// Where the post collection is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvBackend {
    Memory,
    Redis,
}

impl KvBackend {
    fn from_env() -> Self {
        match env::var("KV_BACKEND").map(|v| v.to_lowercase()).as_deref() {
            Ok("redis") => KvBackend::Redis,
            Ok("memory") | Err(_) => KvBackend::Memory,
            Ok(other) => {
                tracing::warn!(backend = %other, "Unknown KV_BACKEND, using memory");
                KvBackend::Memory
            }
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub kv_backend: KvBackend,
    pub memory_kv: InMemoryKvConfig,
    pub store: StoreConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            kv_backend: KvBackend::from_env(),
            memory_kv: InMemoryKvConfig::from_env(),
            store: StoreConfig::from_env(),
            engine: EngineConfig::from_env(),
        }
    }
}
