//! Key-value backends - in-memory with quota, and Redis.

mod memory;

pub use memory::{InMemoryKv, InMemoryKvConfig};

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::{RedisConfig, RedisKv};
