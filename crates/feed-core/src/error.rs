//! Domain-level error types.

use thiserror::Error;

use crate::domain::{PostId, PostStatus};

/// Errors surfaced to callers of the feed engine.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Not allowed to modify post {0}")]
    Forbidden(PostId),

    #[error("Post not found: {0}")]
    NotFound(PostId),

    #[error("Post {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: PostId,
        from: PostStatus,
        to: PostStatus,
    },

    /// The bounded wait elapsed. The operation keeps running and its result
    /// is applied to the store when it lands.
    #[error("{operation} still pending after {waited_ms} ms")]
    TimedOut {
        operation: &'static str,
        waited_ms: u64,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl FeedError {
    pub fn validation(msg: impl Into<String>) -> Self {
        FeedError::Validation(msg.into())
    }
}

/// Persistence failures. Cloneable so one outcome can be handed to every
/// caller waiting on the same idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Stored data is unreadable: {0}")]
    Corrupt(String),

    #[error("Store is read-only: {0}")]
    ReadOnly(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}
