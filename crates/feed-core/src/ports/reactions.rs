//! Reaction backend port - the round trip that confirms an "interested" toggle.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::PostId;
use crate::error::StorageError;

#[async_trait]
pub trait ReactionBackend: Send + Sync {
    /// Record the user's membership. Called after the optimistic flip is
    /// already visible; an error triggers a rollback.
    async fn persist_interest(
        &self,
        post_id: PostId,
        user_id: Uuid,
        interested: bool,
    ) -> Result<(), ReactionBackendError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ReactionBackendError {
    #[error("Reaction rejected: {0}")]
    Rejected(String),

    #[error("Reaction backend unavailable: {0}")]
    Unavailable(String),
}

impl From<ReactionBackendError> for StorageError {
    fn from(err: ReactionBackendError) -> Self {
        StorageError::Unavailable(err.to_string())
    }
}
