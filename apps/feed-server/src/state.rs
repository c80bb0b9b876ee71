//! Application state - shared across all handlers.

use std::sync::Arc;

use feed_core::ports::{KeyValueBackend, SystemClock, TokenService};
use feed_engine::{EngineConfig, PostService, ServiceDeps};
use feed_infra::{
    BroadcastEventBus, InMemoryKv, InMemorySocialGraph, PersistentPostStore,
    SimulatedReactionBackend, SimulatedReactionConfig, StoreConfig,
};

#[cfg(feature = "auth")]
use feed_infra::JwtTokenService;
#[cfg(feature = "redis")]
use feed_infra::RedisKv;

use crate::config::{AppConfig, KvBackend};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<PostService>,
    pub events: Arc<BroadcastEventBus>,
    pub social: Arc<InMemorySocialGraph>,
    /// Absent when the server is built without the `auth` feature; every
    /// caller is then anonymous.
    pub tokens: Option<Arc<dyn TokenService>>,
}

impl AppState {
    /// Build the application state with the configured backends.
    pub async fn new(config: &AppConfig) -> Self {
        let kv = Self::kv_backend(config).await;

        #[cfg(feature = "auth")]
        let tokens: Option<Arc<dyn TokenService>> = Some(Arc::new(JwtTokenService::from_env()));

        #[cfg(not(feature = "auth"))]
        let tokens: Option<Arc<dyn TokenService>> = {
            tracing::warn!("Running without auth feature - all callers are anonymous");
            None
        };

        let state = Self::assemble(
            kv,
            config.store.clone(),
            config.engine.clone(),
            SimulatedReactionConfig::from_env(),
            tokens,
        )
        .await;

        tracing::info!("Application state initialized");
        state
    }

    /// Fully in-memory state with no startup I/O.
    #[cfg(test)]
    pub async fn in_memory(
        engine: EngineConfig,
        reactions: SimulatedReactionConfig,
        tokens: Option<Arc<dyn TokenService>>,
    ) -> Self {
        Self::assemble(
            Arc::new(InMemoryKv::default()),
            StoreConfig::default(),
            engine,
            reactions,
            tokens,
        )
        .await
    }

    async fn assemble(
        kv: Arc<dyn KeyValueBackend>,
        store: StoreConfig,
        engine: EngineConfig,
        reactions: SimulatedReactionConfig,
        tokens: Option<Arc<dyn TokenService>>,
    ) -> Self {
        let clock = Arc::new(SystemClock);
        let events = Arc::new(BroadcastEventBus::default());
        let social = Arc::new(InMemorySocialGraph::new());
        let store = Arc::new(PersistentPostStore::open(kv, clock.clone(), store).await);

        let posts = PostService::new(
            ServiceDeps {
                store,
                clock,
                reactions: Arc::new(SimulatedReactionBackend::new(reactions)),
                social: social.clone(),
                events: events.clone(),
            },
            engine,
        );

        Self {
            posts: Arc::new(posts),
            events,
            social,
            tokens,
        }
    }

    async fn kv_backend(config: &AppConfig) -> Arc<dyn KeyValueBackend> {
        let memory = || -> Arc<dyn KeyValueBackend> {
            Arc::new(InMemoryKv::new(config.memory_kv.clone()))
        };

        match config.kv_backend {
            KvBackend::Memory => {
                tracing::info!("Using in-memory key-value backend; posts are lost on restart");
                memory()
            }
            #[cfg(feature = "redis")]
            KvBackend::Redis => match RedisKv::from_env().await {
                Ok(redis) => Arc::new(redis),
                Err(e) => {
                    tracing::error!(
                        "Failed to connect to Redis: {}. Using in-memory fallback.",
                        e
                    );
                    memory()
                }
            },
            #[cfg(not(feature = "redis"))]
            KvBackend::Redis => {
                tracing::warn!("KV_BACKEND=redis but the redis feature is off. Using in-memory fallback.");
                memory()
            }
        }
    }
}
