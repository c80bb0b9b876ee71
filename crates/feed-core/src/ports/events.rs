//! State-change notifications for the rendering layer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Post, PostId};

/// A committed change to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PostEvent {
    Created { post: Post },
    Published { post: Post },
    ReactionsChanged {
        post_id: PostId,
        user_id: Uuid,
        interested: bool,
        count: usize,
        /// `false` once the reaction backend has confirmed or rejected it.
        pending: bool,
    },
    Archived { post_id: PostId },
    Deleted { post_id: PostId },
    Purged { post_ids: Vec<PostId> },
}

impl PostEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PostEvent::Created { .. } => "created",
            PostEvent::Published { .. } => "published",
            PostEvent::ReactionsChanged { .. } => "reactions_changed",
            PostEvent::Archived { .. } => "archived",
            PostEvent::Deleted { .. } => "deleted",
            PostEvent::Purged { .. } => "purged",
        }
    }
}

/// Fire-and-forget publisher. Must never block the caller.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: PostEvent);
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn publish(&self, _event: PostEvent) {}
}
