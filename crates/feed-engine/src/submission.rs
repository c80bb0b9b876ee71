//! Submission controller: the single path by which posts enter the store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use uuid::Uuid;

use feed_core::domain::{Identity, NewPost, Post, PostId, PostStatus, SubmissionRequest};
use feed_core::ports::{Clock, EventSink, PostEvent, PostStore};
use feed_core::{FeedError, StorageError};

use crate::config::EngineConfig;

type Outcome = Option<Result<PostId, StorageError>>;

/// Idempotency keys are scoped per author.
type KeyId = (Uuid, String);

/// Result of a successful submission.
#[derive(Debug, Clone)]
pub struct Submitted {
    pub post: Post,
    /// The key had already been used for this request; nothing was appended.
    pub replayed: bool,
}

enum KeySlot {
    /// The original is still being appended. Waiters watch for its outcome.
    InFlight(watch::Receiver<Outcome>),
    Done(PostId),
}

struct KeyEntry {
    fingerprint: u64,
    seen_at: DateTime<Utc>,
    slot: KeySlot,
}

enum Claim {
    Owner(watch::Sender<Outcome>),
    Wait(watch::Receiver<Outcome>),
    Replay(PostId),
}

pub struct SubmissionController {
    store: Arc<dyn PostStore>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
    config: EngineConfig,
    keys: Mutex<HashMap<KeyId, KeyEntry>>,
}

impl SubmissionController {
    pub fn new(
        store: Arc<dyn PostStore>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            clock,
            events,
            config,
            keys: Mutex::new(HashMap::new()),
        }
    }

    /// Validate and append a post for `author`.
    ///
    /// A key seen within the dedup window replays the original post, even
    /// when the payload changed in between. A key whose original is still in
    /// flight waits for that outcome instead of appending again.
    pub async fn submit(
        &self,
        author: Identity,
        request: SubmissionRequest,
    ) -> Result<Submitted, FeedError> {
        self.validate_shape(&request)?;

        let key: KeyId = (author.user_id, request.idempotency_key.trim().to_string());
        let fingerprint = request.fingerprint();

        loop {
            match self.claim(&key, fingerprint) {
                Claim::Replay(id) => return self.replay(&key, id).await,
                Claim::Wait(mut rx) => {
                    tracing::debug!(key = %key.1, "Waiting on in-flight submission");
                    let outcome = match rx.wait_for(Option::is_some).await {
                        Ok(outcome) => outcome.clone(),
                        Err(_) => None,
                    };
                    match outcome {
                        Some(Ok(id)) => return self.replay(&key, id).await,
                        Some(Err(e)) => return Err(e.into()),
                        // Original abandoned without an outcome; claim the key again.
                        None => continue,
                    }
                }
                Claim::Owner(tx) => return self.admit(key, author, request, tx).await,
            }
        }
    }

    /// Number of idempotency keys currently remembered.
    pub fn tracked_keys(&self) -> usize {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn validate_shape(&self, request: &SubmissionRequest) -> Result<(), FeedError> {
        if request.idempotency_key.trim().is_empty() {
            return Err(FeedError::validation("idempotency key is required"));
        }
        if request.body().is_none() && request.attachments.is_empty() {
            return Err(FeedError::validation(
                "a post needs text or at least one attachment",
            ));
        }
        if let Some(body) = request.body() {
            let chars = body.chars().count();
            if chars > self.config.max_content_chars {
                return Err(FeedError::validation(format!(
                    "content is {chars} characters, the limit is {}",
                    self.config.max_content_chars
                )));
            }
        }
        Ok(())
    }

    fn claim(&self, key: &KeyId, fingerprint: u64) -> Claim {
        let now = self.clock.now();
        let window = chrono::Duration::from_std(self.config.dedup_window)
            .unwrap_or(chrono::Duration::MAX);

        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        keys.retain(|_, entry| match entry.slot {
            KeySlot::InFlight(_) => true,
            KeySlot::Done(_) => now - entry.seen_at < window,
        });

        if let Some(entry) = keys.get(key) {
            if entry.fingerprint != fingerprint {
                tracing::warn!(
                    key = %key.1,
                    user_id = %key.0,
                    "Idempotency key reused with a different payload, keeping the original post"
                );
            }
            match &entry.slot {
                KeySlot::Done(id) => return Claim::Replay(*id),
                // `has_changed` errs once the sender is gone.
                KeySlot::InFlight(rx) if rx.has_changed().is_ok() => {
                    return Claim::Wait(rx.clone());
                }
                KeySlot::InFlight(_) => {}
            }
        }

        let (tx, rx) = watch::channel(None);
        keys.insert(
            key.clone(),
            KeyEntry {
                fingerprint,
                seen_at: now,
                slot: KeySlot::InFlight(rx),
            },
        );
        Claim::Owner(tx)
    }

    /// Record the original's outcome. Failures forget the key so a manual
    /// retry can go through.
    fn settle(&self, key: &KeyId, outcome: &Result<PostId, StorageError>) {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        match outcome {
            Ok(id) => {
                if let Some(entry) = keys.get_mut(key) {
                    entry.slot = KeySlot::Done(*id);
                    entry.seen_at = self.clock.now();
                }
            }
            Err(_) => {
                keys.remove(key);
            }
        }
    }

    fn release(&self, key: &KeyId) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    async fn admit(
        &self,
        key: KeyId,
        author: Identity,
        request: SubmissionRequest,
        tx: watch::Sender<Outcome>,
    ) -> Result<Submitted, FeedError> {
        let now = self.clock.now();

        if let Some(at) = request.scheduled_for {
            if at <= now {
                self.release(&key);
                return Err(FeedError::validation(
                    "scheduled time must be in the future",
                ));
            }
        }

        let status = if request.scheduled_for.is_some() {
            PostStatus::Scheduled
        } else {
            PostStatus::Published
        };
        let post = NewPost {
            author_id: author.user_id,
            author_name: author.display_name,
            content: request.body().map(str::to_string),
            attachments: request.attachments,
            created_at: now,
            scheduled_for: request.scheduled_for,
            status,
            visibility: request.visibility,
            community_id: request.community_id,
        };

        let outcome = self.store.append(post).await;
        self.settle(&key, &outcome);
        tx.send_replace(Some(outcome.clone()));

        let id = outcome.map_err(|e| {
            tracing::error!(key = %key.1, error = %e, "Submission failed");
            FeedError::Storage(e)
        })?;
        let post = self.store.get(id).await.ok_or(FeedError::NotFound(id))?;

        tracing::info!(post_id = %id, status = %post.status, "Post submitted");
        self.events.publish(PostEvent::Created { post: post.clone() });

        Ok(Submitted {
            post,
            replayed: false,
        })
    }

    async fn replay(&self, key: &KeyId, id: PostId) -> Result<Submitted, FeedError> {
        tracing::debug!(key = %key.1, post_id = %id, "Replaying idempotent submission");
        let post = self.store.get(id).await.ok_or(FeedError::NotFound(id))?;
        Ok(Submitted {
            post,
            replayed: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_core::domain::Attachment;
    use feed_core::ports::{ManualClock, NoopEventSink};
    use feed_infra::{InMemoryKv, PersistentPostStore, StoreConfig};

    struct Fixture {
        controller: SubmissionController,
        store: Arc<PersistentPostStore>,
        clock: Arc<ManualClock>,
        me: Identity,
    }

    async fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(
            PersistentPostStore::open(
                Arc::new(InMemoryKv::default()),
                clock.clone(),
                StoreConfig::default(),
            )
            .await,
        );
        Fixture {
            controller: SubmissionController::new(
                store.clone(),
                clock.clone(),
                Arc::new(NoopEventSink),
                EngineConfig::default(),
            ),
            store,
            clock,
            me: Identity::new(Uuid::new_v4(), "Ada"),
        }
    }

    #[tokio::test]
    async fn test_blank_post_is_rejected() {
        let f = fixture().await;
        let result = f
            .controller
            .submit(f.me.clone(), SubmissionRequest::text("k", "   "))
            .await;
        assert!(matches!(result, Err(FeedError::Validation(_))));
        assert_eq!(f.controller.tracked_keys(), 0);
    }

    #[tokio::test]
    async fn test_attachment_only_post_is_accepted() {
        let f = fixture().await;
        let request = SubmissionRequest::text("k", "").with_attachment(Attachment {
            url: "https://cdn.example/cat.png".to_string(),
            media_type: "image/png".to_string(),
        });

        let submitted = f.controller.submit(f.me.clone(), request).await.unwrap();
        assert_eq!(submitted.post.content, None);
        assert_eq!(submitted.post.attachments.len(), 1);
    }

    #[tokio::test]
    async fn test_schedule_must_be_in_the_future() {
        let f = fixture().await;
        let request = SubmissionRequest::text("k", "Too late").scheduled(f.clock.now());

        let result = f.controller.submit(f.me.clone(), request).await;
        assert!(matches!(result, Err(FeedError::Validation(_))));
        assert_eq!(f.controller.tracked_keys(), 0);
    }

    #[tokio::test]
    async fn test_oversized_content_is_rejected() {
        let f = fixture().await;
        let request = SubmissionRequest::text("k", "x".repeat(5001));
        let result = f.controller.submit(f.me.clone(), request).await;
        assert!(matches!(result, Err(FeedError::Validation(_))));
    }

    #[tokio::test]
    async fn test_edited_payload_under_same_key_replays_original() {
        let f = fixture().await;
        let first = f
            .controller
            .submit(f.me.clone(), SubmissionRequest::text("k", "Hello"))
            .await
            .unwrap();

        let second = f
            .controller
            .submit(f.me.clone(), SubmissionRequest::text("k", "Hello!"))
            .await
            .unwrap();

        assert!(second.replayed);
        assert_eq!(second.post.id, first.post.id);
        assert_eq!(second.post.content.as_deref(), Some("Hello"));
        assert_eq!(f.store.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_keys_are_scoped_per_author() {
        let f = fixture().await;
        let other = Identity::new(Uuid::new_v4(), "Grace");

        let mine = f
            .controller
            .submit(f.me.clone(), SubmissionRequest::text("k", "hi"))
            .await
            .unwrap();
        let theirs = f
            .controller
            .submit(other, SubmissionRequest::text("k", "hi"))
            .await
            .unwrap();

        assert!(!theirs.replayed);
        assert_ne!(mine.post.id, theirs.post.id);
    }

    #[tokio::test]
    async fn test_key_expires_after_window() {
        let f = fixture().await;
        let first = f
            .controller
            .submit(f.me.clone(), SubmissionRequest::text("k", "hi"))
            .await
            .unwrap();

        f.clock.advance(chrono::Duration::seconds(11));
        let second = f
            .controller
            .submit(f.me.clone(), SubmissionRequest::text("k", "hi"))
            .await
            .unwrap();

        assert!(!second.replayed);
        assert_ne!(first.post.id, second.post.id);
    }
}
