//! Post store persisted as one JSON array under a single key.
//!
//! Readers get immutable snapshots. Writers are serialized by an async lock
//! that is held across the backend write, and the new snapshot is only
//! swapped in once the backend accepted it, so a failed or interleaved write
//! is never half-visible.

use std::cmp::Ordering;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::Mutex;

use feed_core::StorageError;
use feed_core::domain::{NewPost, Post, PostId, PostPatch};
use feed_core::ports::{
    Clock, KeyValueBackend, PostPredicate, PostQuery, PostSnapshot, PostStore, StoreHealth,
};

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Key the serialized collection lives under.
    pub key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key: "feed.posts".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Self {
            key: std::env::var("FEED_STORE_KEY").unwrap_or_else(|_| "feed.posts".to_string()),
        }
    }
}

struct Writer {
    last_id: u64,
}

impl Writer {
    /// Millisecond timestamp, bumped past the previous id when the clock
    /// has not moved (or moved backwards).
    fn next_id(&mut self, now_millis: i64) -> PostId {
        let candidate = u64::try_from(now_millis).unwrap_or(0);
        self.last_id = candidate.max(self.last_id + 1);
        PostId(self.last_id)
    }
}

pub struct PersistentPostStore {
    backend: Arc<dyn KeyValueBackend>,
    clock: Arc<dyn Clock>,
    config: StoreConfig,
    posts: RwLock<Arc<Vec<Post>>>,
    writer: Mutex<Writer>,
    health: StoreHealth,
}

impl PersistentPostStore {
    /// Load the collection. Never fails: an unreadable value yields an empty
    /// (or partial) read-only store.
    pub async fn open(
        backend: Arc<dyn KeyValueBackend>,
        clock: Arc<dyn Clock>,
        config: StoreConfig,
    ) -> Self {
        let (mut posts, health) = match backend.get(&config.key).await {
            Ok(None) => (Vec::new(), StoreHealth::Healthy),
            Ok(Some(raw)) if raw.trim().is_empty() => (Vec::new(), StoreHealth::Healthy),
            Ok(Some(raw)) => decode(&raw),
            Err(e) => (
                Vec::new(),
                StoreHealth::Degraded(format!("could not read stored posts: {e}")),
            ),
        };
        posts.sort_by(Post::canonical_cmp);

        let last_id = posts.iter().map(|p| p.id.0).max().unwrap_or(0);

        match &health {
            StoreHealth::Healthy => {
                tracing::info!(key = %config.key, posts = posts.len(), "Post store loaded")
            }
            StoreHealth::Degraded(reason) => tracing::warn!(
                key = %config.key,
                posts = posts.len(),
                reason = %reason,
                "Post store degraded, serving read-only view"
            ),
        }

        Self {
            backend,
            clock,
            config,
            posts: RwLock::new(Arc::new(posts)),
            writer: Mutex::new(Writer { last_id }),
            health,
        }
    }

    fn current(&self) -> Arc<Vec<Post>> {
        self.posts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn ensure_writable(&self) -> Result<(), StorageError> {
        match &self.health {
            StoreHealth::Healthy => Ok(()),
            StoreHealth::Degraded(reason) => Err(StorageError::ReadOnly(reason.clone())),
        }
    }

    /// Write `next` to the backend, then publish it to readers.
    /// Caller must hold the writer lock.
    async fn commit(&self, next: Vec<Post>) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(&next)
            .map_err(|e| StorageError::Corrupt(format!("could not encode posts: {e}")))?;

        if let Err(e) = self.backend.set(&self.config.key, &encoded).await {
            tracing::error!(key = %self.config.key, error = %e, "Failed to persist posts");
            return Err(e.into());
        }

        *self.posts.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        Ok(())
    }
}

/// Decode the stored array, keeping every record that still parses.
fn decode(raw: &str) -> (Vec<Post>, StoreHealth) {
    let records: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(records) => records,
        Err(e) => {
            return (
                Vec::new(),
                StoreHealth::Degraded(format!("stored posts are unreadable: {e}")),
            );
        }
    };

    let total = records.len();
    let mut posts: Vec<Post> = Vec::with_capacity(total);
    for record in records {
        match serde_json::from_value::<Post>(record) {
            Ok(post) if posts.iter().all(|p| p.id != post.id) => posts.push(post),
            Ok(post) => tracing::warn!(post_id = %post.id, "Dropping duplicate stored post"),
            Err(e) => tracing::warn!(error = %e, "Dropping unreadable stored post"),
        }
    }

    let health = if posts.len() == total {
        StoreHealth::Healthy
    } else {
        StoreHealth::Degraded(format!(
            "{} of {} stored posts are unreadable",
            total - posts.len(),
            total
        ))
    };
    (posts, health)
}

fn insert_sorted(posts: &mut Vec<Post>, post: Post) {
    let idx = posts.partition_point(|p| Post::canonical_cmp(p, &post) == Ordering::Less);
    posts.insert(idx, post);
}

#[async_trait]
impl PostStore for PersistentPostStore {
    async fn append(&self, post: NewPost) -> Result<PostId, StorageError> {
        let mut writer = self.writer.lock().await;
        self.ensure_writable()?;

        let id = writer.next_id(self.clock.now().timestamp_millis());
        let mut next = self.current().as_ref().clone();
        insert_sorted(&mut next, post.into_post(id));

        self.commit(next).await?;
        tracing::debug!(post_id = %id, "Post appended");
        Ok(id)
    }

    async fn get(&self, id: PostId) -> Option<Post> {
        self.current().iter().find(|p| p.id == id).cloned()
    }

    async fn update(&self, id: PostId, patch: PostPatch) -> Result<bool, StorageError> {
        let _writer = self.writer.lock().await;
        self.ensure_writable()?;

        let mut next = self.current().as_ref().clone();
        let Some(idx) = next.iter().position(|p| p.id == id) else {
            return Ok(false);
        };

        let mut post = next[idx].clone();
        if !post.apply(&patch) {
            tracing::debug!(post_id = %id, ?patch, "Patch refused");
            return Ok(false);
        }

        // Status and timestamp changes can move the post.
        next.remove(idx);
        insert_sorted(&mut next, post);

        self.commit(next).await?;
        tracing::debug!(post_id = %id, "Post updated");
        Ok(true)
    }

    async fn remove(&self, id: PostId) -> Result<bool, StorageError> {
        let _writer = self.writer.lock().await;
        self.ensure_writable()?;

        let mut next = self.current().as_ref().clone();
        let Some(idx) = next.iter().position(|p| p.id == id) else {
            return Ok(false);
        };
        next.remove(idx);

        self.commit(next).await?;
        tracing::debug!(post_id = %id, "Post removed");
        Ok(true)
    }

    async fn query_all(&self, predicate: PostPredicate) -> PostQuery {
        PostSnapshot::new(self.current()).filter(predicate)
    }

    async fn snapshot(&self) -> PostSnapshot {
        PostSnapshot::new(self.current())
    }

    fn health(&self) -> StoreHealth {
        self.health.clone()
    }
}
