//! Post store port - the single writer of truth.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{NewPost, Post, PostId, PostPatch};
use crate::error::StorageError;

/// Filter applied lazily over a snapshot.
pub type PostPredicate = Arc<dyn Fn(&Post) -> bool + Send + Sync>;

/// Immutable view of the store, in canonical order.
///
/// Cloning is cheap and every clone can be iterated any number of times.
#[derive(Clone, Default)]
pub struct PostSnapshot {
    posts: Arc<Vec<Post>>,
}

impl PostSnapshot {
    pub fn new(posts: Arc<Vec<Post>>) -> Self {
        Self { posts }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Post> {
        self.posts.iter()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn filter(self, predicate: PostPredicate) -> PostQuery {
        PostQuery {
            snapshot: self,
            predicate,
        }
    }
}

impl fmt::Debug for PostSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostSnapshot")
            .field("len", &self.posts.len())
            .finish()
    }
}

/// Result of [`PostStore::query_all`]: a finite, restartable sequence.
#[derive(Clone)]
pub struct PostQuery {
    snapshot: PostSnapshot,
    predicate: PostPredicate,
}

impl PostQuery {
    pub fn iter(&self) -> impl Iterator<Item = &Post> + '_ {
        self.snapshot.iter().filter(move |p| (self.predicate)(*p))
    }
}

/// Whether the store loaded cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreHealth {
    Healthy,
    /// The persisted value could not be read; the store serves an empty,
    /// read-only view.
    Degraded(String),
}

/// Ordered, durable collection of posts.
///
/// Writes are atomic: a failed write leaves nothing observable behind.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Persist a new post and return the id the store assigned to it.
    async fn append(&self, post: NewPost) -> Result<PostId, StorageError>;

    async fn get(&self, id: PostId) -> Option<Post>;

    /// Apply `patch`. `Ok(false)` when the post is missing or the patch was
    /// refused (guard mismatch or illegal transition).
    async fn update(&self, id: PostId, patch: PostPatch) -> Result<bool, StorageError>;

    async fn remove(&self, id: PostId) -> Result<bool, StorageError>;

    async fn query_all(&self, predicate: PostPredicate) -> PostQuery;

    async fn snapshot(&self) -> PostSnapshot;

    fn health(&self) -> StoreHealth;
}
