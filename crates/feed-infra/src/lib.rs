//! # Feed Infrastructure
//!
//! Concrete implementations of the ports defined in `feed-core`: key-value
//! persistence, the persistent post store, the event bus, auth, and the
//! stand-ins for remote collaborators.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `auth` - JWT bearer tokens
//! - `redis` - Redis key-value backend

pub mod auth;
pub mod events;
pub mod kv;
pub mod reactions;
pub mod social;
pub mod store;
pub mod timer;

// Re-exports - In-Memory
pub use auth::SessionAuth;
pub use events::BroadcastEventBus;
pub use kv::{InMemoryKv, InMemoryKvConfig};
pub use reactions::{ReactionCall, SimulatedReactionBackend, SimulatedReactionConfig};
pub use social::InMemorySocialGraph;
pub use store::{PersistentPostStore, StoreConfig};
pub use timer::IntervalTimer;

#[cfg(feature = "auth")]
pub use auth::{JwtConfig, JwtTokenService};

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use kv::{RedisConfig, RedisKv};
