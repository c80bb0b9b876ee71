//! The one injected entry point for views and adapters.

use std::sync::{Arc, Mutex, PoisonError};

use feed_core::FeedError;
use feed_core::domain::{
    FeedPage, FeedQuery, FeedSelector, Post, PostId, PostPatch, PostStatus, SubmissionRequest,
};
use feed_core::ports::{
    AuthProvider, Clock, EventSink, PostEvent, PostStore, ReactionBackend, SocialGraph,
    StoreHealth, Timer, TimerError, TimerHandle, tick_fn,
};

use crate::composer::{Feed, FeedComposer};
use crate::config::EngineConfig;
use crate::interaction::{InteractionEngine, InterestState};
use crate::pending::{AffordanceLease, run_bounded};
use crate::reconciler::{ReconcileReport, SchedulerReconciler};
use crate::submission::{SubmissionController, Submitted};

/// Collaborators the service is wired from.
#[derive(Clone)]
pub struct ServiceDeps {
    pub store: Arc<dyn PostStore>,
    pub clock: Arc<dyn Clock>,
    pub reactions: Arc<dyn ReactionBackend>,
    pub social: Arc<dyn SocialGraph>,
    pub events: Arc<dyn EventSink>,
}

pub struct PostService {
    config: EngineConfig,
    store: Arc<dyn PostStore>,
    events: Arc<dyn EventSink>,
    submissions: Arc<SubmissionController>,
    reconciler: Arc<SchedulerReconciler>,
    interactions: InteractionEngine,
    composer: FeedComposer,
    reconcile_task: Mutex<Option<TimerHandle>>,
}

impl PostService {
    pub fn new(deps: ServiceDeps, config: EngineConfig) -> Self {
        let ServiceDeps {
            store,
            clock,
            reactions,
            social,
            events,
        } = deps;

        Self {
            submissions: Arc::new(SubmissionController::new(
                store.clone(),
                clock.clone(),
                events.clone(),
                config.clone(),
            )),
            reconciler: Arc::new(SchedulerReconciler::new(
                store.clone(),
                clock,
                events.clone(),
            )),
            interactions: InteractionEngine::new(store.clone(), reactions, events.clone()),
            composer: FeedComposer::new(store.clone(), social, config.clone()),
            reconcile_task: Mutex::new(None),
            config,
            store,
            events,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register the periodic reconciler. Calling it again while running is a no-op.
    pub async fn start(&self, timer: &dyn Timer) -> Result<(), TimerError> {
        if self.is_running() {
            tracing::warn!("Post service already started");
            return Ok(());
        }

        let reconciler = self.reconciler.clone();
        let tick = tick_fn(move || {
            let reconciler = reconciler.clone();
            async move {
                reconciler.run_pass().await;
            }
        });
        let handle = timer
            .every("reconcile-scheduled-posts", self.config.reconcile_interval, tick)
            .await?;

        let previous = self
            .reconcile_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        // Lost a race with a concurrent start; keep only one task.
        if let Some(previous) = previous {
            previous.cancel();
        }

        tracing::info!(
            interval_secs = self.config.reconcile_interval.as_secs(),
            "Post service started"
        );
        Ok(())
    }

    /// Cancel the periodic reconciler. In-flight work finishes on its own.
    pub fn shutdown(&self) {
        let handle = self
            .reconcile_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.cancel();
            tracing::info!("Post service stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.reconcile_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn health(&self) -> StoreHealth {
        self.store.health()
    }

    pub async fn submit(
        &self,
        auth: &dyn AuthProvider,
        request: SubmissionRequest,
    ) -> Result<Submitted, FeedError> {
        self.dispatch_submit(auth, request, AffordanceLease::detached())
            .await
    }

    /// Submit on behalf of a view control disabled with
    /// [`Affordance::disable`]. The lease restores it exactly once, when the
    /// post lands or the bounded wait ends.
    pub async fn submit_from(
        &self,
        auth: &dyn AuthProvider,
        request: SubmissionRequest,
        lease: AffordanceLease,
    ) -> Result<Submitted, FeedError> {
        self.dispatch_submit(auth, request, lease).await
    }

    async fn dispatch_submit(
        &self,
        auth: &dyn AuthProvider,
        request: SubmissionRequest,
        lease: AffordanceLease,
    ) -> Result<Submitted, FeedError> {
        let lease = Arc::new(lease);
        let author = match auth.require() {
            Ok(author) => author,
            Err(e) => {
                lease.release();
                return Err(e);
            }
        };

        let submissions = self.submissions.clone();
        let reconciler = self.reconciler.clone();
        run_bounded("submit", self.config.pending_timeout, lease, async move {
            let submitted = submissions.submit(author, request).await?;
            if !submitted.replayed {
                reconciler.run_pass().await;
            }
            Ok(submitted)
        })
        .await
    }

    pub async fn get(&self, id: PostId) -> Result<Post, FeedError> {
        self.store.get(id).await.ok_or(FeedError::NotFound(id))
    }

    pub async fn compose(
        &self,
        auth: &dyn AuthProvider,
        selector: &FeedSelector,
    ) -> Result<Feed, FeedError> {
        self.composer.compose(auth, selector).await
    }

    pub async fn feed(
        &self,
        auth: &dyn AuthProvider,
        query: &FeedQuery,
    ) -> Result<FeedPage, FeedError> {
        self.composer.feed(auth, query).await
    }

    pub async fn toggle_interest(
        &self,
        auth: &dyn AuthProvider,
        post_id: PostId,
    ) -> Result<InterestState, FeedError> {
        let me = auth.require()?;
        let interactions = self.interactions.clone();
        run_bounded(
            "toggle_interest",
            self.config.pending_timeout,
            Arc::new(AffordanceLease::detached()),
            async move { interactions.toggle_interest(post_id, me.user_id).await },
        )
        .await
    }

    pub async fn set_interest(
        &self,
        auth: &dyn AuthProvider,
        post_id: PostId,
        interested: bool,
    ) -> Result<InterestState, FeedError> {
        let me = auth.require()?;
        let interactions = self.interactions.clone();
        run_bounded(
            "set_interest",
            self.config.pending_timeout,
            Arc::new(AffordanceLease::detached()),
            async move {
                interactions
                    .set_interest(post_id, me.user_id, interested)
                    .await
            },
        )
        .await
    }

    /// Reaction backend calls not yet settled.
    pub fn pending_interactions(&self) -> usize {
        self.interactions.pending_count()
    }

    /// Published -> Archived. Owner only.
    pub async fn archive(&self, auth: &dyn AuthProvider, id: PostId) -> Result<Post, FeedError> {
        let post = self.transition(auth, id, PostStatus::Archived).await?;
        self.events.publish(PostEvent::Archived { post_id: id });
        Ok(post)
    }

    /// Published -> Deleted. Owner only. The tombstone stays until purged.
    pub async fn delete(&self, auth: &dyn AuthProvider, id: PostId) -> Result<Post, FeedError> {
        let post = self.transition(auth, id, PostStatus::Deleted).await?;
        self.events.publish(PostEvent::Deleted { post_id: id });
        Ok(post)
    }

    async fn transition(
        &self,
        auth: &dyn AuthProvider,
        id: PostId,
        to: PostStatus,
    ) -> Result<Post, FeedError> {
        let me = auth.require()?;
        let post = self.get(id).await?;

        if post.author_id != me.user_id {
            return Err(FeedError::Forbidden(id));
        }
        if !post.status.can_transition_to(to) {
            return Err(FeedError::InvalidTransition {
                id,
                from: post.status,
                to,
            });
        }

        if !self
            .store
            .update(id, PostPatch::transition(post.status, to))
            .await?
        {
            // Moved by someone else between the read and the guarded write.
            let current = self.get(id).await?;
            return Err(FeedError::InvalidTransition {
                id,
                from: current.status,
                to,
            });
        }

        tracing::info!(post_id = %id, status = %to, "Post status changed");
        self.get(id).await
    }

    /// Drop deleted tombstones from the store.
    pub async fn purge_deleted(&self) -> Result<Vec<PostId>, FeedError> {
        let deleted: Vec<PostId> = self
            .store
            .query_all(Arc::new(|p: &Post| p.status == PostStatus::Deleted))
            .await
            .iter()
            .map(|p| p.id)
            .collect();

        let mut purged = Vec::with_capacity(deleted.len());
        let mut failure = None;
        for id in deleted {
            match self.store.remove(id).await {
                Ok(true) => purged.push(id),
                Ok(false) => {}
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        if !purged.is_empty() {
            tracing::info!(count = purged.len(), "Deleted posts purged");
            self.events.publish(PostEvent::Purged {
                post_ids: purged.clone(),
            });
        }
        match failure {
            Some(e) => Err(e.into()),
            None => Ok(purged),
        }
    }

    pub async fn reconcile(&self) -> ReconcileReport {
        self.reconciler.run_pass().await
    }
}

impl Drop for PostService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
