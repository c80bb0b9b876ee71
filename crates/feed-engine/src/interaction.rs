//! Optimistic "interested" reactions.
//!
//! The store is updated immediately; the reaction backend is told in the
//! background. At most one backend call per `(post, user)` is in flight.
//! Requests that arrive meanwhile only move the desired end state, which a
//! follow-up call sends once the in-flight one returns. A backend failure
//! rolls the store back to the last membership the backend confirmed.
//!
//! Work on one `(post, user)` pair is serialized by a per-pair gate. The
//! shared map of pending calls is only locked for bookkeeping, never across
//! a store write, so a slow write on one post does not stall another.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

use feed_core::FeedError;
use feed_core::domain::{Post, PostId, PostPatch, PostStatus};
use feed_core::ports::{EventSink, PostEvent, PostStore, ReactionBackend};

/// Membership as the caller should render it right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterestState {
    pub post_id: PostId,
    pub interested: bool,
    pub count: usize,
    /// A backend call for this user and post is still outstanding.
    pub pending: bool,
}

#[derive(Debug, Clone, Copy)]
enum Intent {
    Toggle,
    Set(bool),
}

#[derive(Debug)]
struct PendingInterest {
    /// Membership when the in-flight window opened.
    original: bool,
    /// Last membership the backend accepted.
    confirmed: bool,
    desired: bool,
}

/// What the driver does after a backend call returns.
#[derive(Clone, Copy)]
enum Step {
    FollowUp(bool),
    Settled(bool),
    RollBack(bool),
}

type PendingKey = (PostId, Uuid);
type Gate = Arc<tokio::sync::Mutex<()>>;

#[derive(Clone)]
pub struct InteractionEngine {
    store: Arc<dyn PostStore>,
    backend: Arc<dyn ReactionBackend>,
    events: Arc<dyn EventSink>,
    pending: Arc<Mutex<HashMap<PendingKey, PendingInterest>>>,
    gates: Arc<Mutex<HashMap<PendingKey, Gate>>>,
}

impl InteractionEngine {
    pub fn new(
        store: Arc<dyn PostStore>,
        backend: Arc<dyn ReactionBackend>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            backend,
            events,
            pending: Arc::new(Mutex::new(HashMap::new())),
            gates: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Flip the user's membership. While a call is in flight this targets
    /// the opposite of the membership seen when it started, so a double
    /// click nets a single toggle.
    pub async fn toggle_interest(
        &self,
        post_id: PostId,
        user_id: Uuid,
    ) -> Result<InterestState, FeedError> {
        self.request(post_id, user_id, Intent::Toggle).await
    }

    /// Set the membership explicitly; the latest call wins.
    pub async fn set_interest(
        &self,
        post_id: PostId,
        user_id: Uuid,
        interested: bool,
    ) -> Result<InterestState, FeedError> {
        self.request(post_id, user_id, Intent::Set(interested)).await
    }

    /// Backend calls not yet settled.
    pub fn pending_count(&self) -> usize {
        self.pending_map().len()
    }

    fn pending_map(&self) -> std::sync::MutexGuard<'_, HashMap<PendingKey, PendingInterest>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn gate(&self, key: PendingKey) -> Gate {
        self.gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_default()
            .clone()
    }

    fn release_gate(&self, key: PendingKey, gate: Gate) {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map and this caller still hold it.
        if Arc::strong_count(&gate) == 2 {
            gates.remove(&key);
        }
    }

    async fn request(
        &self,
        post_id: PostId,
        user_id: Uuid,
        intent: Intent,
    ) -> Result<InterestState, FeedError> {
        let key = (post_id, user_id);
        let gate = self.gate(key);
        let result = {
            let _turn = gate.lock().await;
            self.apply(key, intent).await
        };
        self.release_gate(key, gate);
        result
    }

    async fn apply(&self, key: PendingKey, intent: Intent) -> Result<InterestState, FeedError> {
        let (post_id, user_id) = key;
        let post = self
            .store
            .get(post_id)
            .await
            .ok_or(FeedError::NotFound(post_id))?;
        if post.status != PostStatus::Published {
            return Err(FeedError::validation(format!(
                "post {post_id} is {} and does not accept reactions",
                post.status
            )));
        }
        let current = post.is_interested(&user_id);

        let (desired, previous, starts) = {
            let mut pending = self.pending_map();
            match pending.get_mut(&key) {
                Some(entry) => {
                    let previous = entry.desired;
                    entry.desired = match intent {
                        Intent::Toggle => !entry.original,
                        Intent::Set(value) => value,
                    };
                    (entry.desired, Some(previous), false)
                }
                None => {
                    let desired = match intent {
                        Intent::Toggle => !current,
                        Intent::Set(value) => value,
                    };
                    if desired == current {
                        return Ok(state_of(&post, user_id, false));
                    }
                    pending.insert(
                        key,
                        PendingInterest {
                            original: current,
                            confirmed: current,
                            desired,
                        },
                    );
                    (desired, None, true)
                }
            }
        };

        let post = match self.write_membership(post_id, user_id, desired, true).await {
            Ok(post) => post,
            Err(e) => {
                let mut pending = self.pending_map();
                match previous {
                    Some(previous) => {
                        if let Some(entry) = pending.get_mut(&key) {
                            entry.desired = previous;
                        }
                    }
                    None => {
                        pending.remove(&key);
                    }
                }
                return Err(e);
            }
        };

        if starts {
            tracing::debug!(post_id = %post_id, user_id = %user_id, interested = desired, "Interest change dispatched");
            let engine = self.clone();
            tokio::spawn(async move { engine.drive(key, desired).await });
        }

        Ok(state_of(&post, user_id, true))
    }

    /// Send the desired state until the backend has confirmed the latest
    /// one, or roll back on the first failure.
    async fn drive(self, key: PendingKey, mut sent: bool) {
        let (post_id, user_id) = key;

        loop {
            let result = self
                .backend
                .persist_interest(post_id, user_id, sent)
                .await;

            let gate = self.gate(key);
            let turn = gate.lock().await;
            let step = {
                let mut pending = self.pending_map();
                let Some(entry) = pending.get_mut(&key) else {
                    drop(turn);
                    self.release_gate(key, gate);
                    return;
                };
                match result {
                    Ok(()) => {
                        entry.confirmed = sent;
                        if entry.desired == sent {
                            pending.remove(&key);
                            Step::Settled(sent)
                        } else {
                            Step::FollowUp(entry.desired)
                        }
                    }
                    Err(e) => {
                        let restore = entry.confirmed;
                        pending.remove(&key);
                        tracing::warn!(
                            post_id = %post_id,
                            user_id = %user_id,
                            error = %e,
                            restored = restore,
                            "Interest change failed, rolling back"
                        );
                        Step::RollBack(restore)
                    }
                }
            };

            match step {
                Step::FollowUp(next) => {
                    sent = next;
                    tracing::debug!(post_id = %post_id, user_id = %user_id, interested = sent, "Sending follow-up interest change");
                }
                Step::Settled(interested) => {
                    tracing::debug!(post_id = %post_id, user_id = %user_id, interested, "Interest confirmed");
                    self.publish_settled(post_id, user_id, interested).await;
                }
                Step::RollBack(restore) => {
                    if let Err(e) = self.write_membership(post_id, user_id, restore, false).await {
                        tracing::error!(post_id = %post_id, error = %e, "Rollback of interest change failed");
                    }
                }
            }

            drop(turn);
            self.release_gate(key, gate);
            if !matches!(step, Step::FollowUp(_)) {
                return;
            }
        }
    }

    async fn publish_settled(&self, post_id: PostId, user_id: Uuid, interested: bool) {
        let Some(post) = self.store.get(post_id).await else {
            return;
        };
        self.events.publish(PostEvent::ReactionsChanged {
            post_id,
            user_id,
            interested,
            count: post.interest_count(),
            pending: false,
        });
    }

    async fn write_membership(
        &self,
        post_id: PostId,
        user_id: Uuid,
        interested: bool,
        pending: bool,
    ) -> Result<Post, FeedError> {
        if !self
            .store
            .update(post_id, PostPatch::interest(user_id, interested))
            .await?
        {
            return Err(FeedError::NotFound(post_id));
        }
        let post = self
            .store
            .get(post_id)
            .await
            .ok_or(FeedError::NotFound(post_id))?;

        self.events.publish(PostEvent::ReactionsChanged {
            post_id,
            user_id,
            interested,
            count: post.interest_count(),
            pending,
        });
        Ok(post)
    }
}

fn state_of(post: &Post, user_id: Uuid, pending: bool) -> InterestState {
    InterestState {
        post_id: post.id,
        interested: post.is_interested(&user_id),
        count: post.interest_count(),
        pending,
    }
}
