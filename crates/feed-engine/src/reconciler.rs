//! Promotes scheduled posts whose time has come.

use std::sync::Arc;

use feed_core::domain::{Post, PostId, PostPatch, PostStatus};
use feed_core::ports::{Clock, EventSink, PostEvent, PostStore, StoreHealth};

/// Outcome of one reconciler pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub published: Vec<PostId>,
    /// Due posts another pass (or an owner action) moved first.
    pub skipped: usize,
    pub failed: usize,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.published.is_empty() && self.skipped == 0 && self.failed == 0
    }
}

pub struct SchedulerReconciler {
    store: Arc<dyn PostStore>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
}

impl SchedulerReconciler {
    pub fn new(
        store: Arc<dyn PostStore>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            clock,
            events,
        }
    }

    /// Publish every scheduled post that is due.
    ///
    /// Each promotion is a compare-and-transition on `Scheduled`, so
    /// overlapping passes publish a post at most once.
    pub async fn run_pass(&self) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        if let StoreHealth::Degraded(reason) = self.store.health() {
            tracing::debug!(reason = %reason, "Store is read-only, skipping reconcile pass");
            return report;
        }

        let now = self.clock.now();
        let due: Vec<PostId> = self
            .store
            .query_all(Arc::new(move |p: &Post| {
                p.status == PostStatus::Scheduled && p.scheduled_for.is_some_and(|at| at <= now)
            }))
            .await
            .iter()
            .map(|p| p.id)
            .collect();

        for id in due {
            match self.store.update(id, PostPatch::publish(self.clock.now())).await {
                Ok(true) => {
                    tracing::info!(post_id = %id, "Scheduled post published");
                    if let Some(post) = self.store.get(id).await {
                        self.events.publish(PostEvent::Published { post });
                    }
                    report.published.push(id);
                }
                Ok(false) => {
                    tracing::debug!(post_id = %id, "Post already moved on, skipping");
                    report.skipped += 1;
                }
                Err(e) => {
                    tracing::error!(post_id = %id, error = %e, "Failed to publish scheduled post");
                    report.failed += 1;
                }
            }
        }

        if !report.is_empty() {
            tracing::info!(
                published = report.published.len(),
                skipped = report.skipped,
                failed = report.failed,
                "Reconcile pass finished"
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use feed_core::domain::{NewPost, Visibility};
    use feed_core::ports::{ManualClock, NoopEventSink};
    use feed_infra::{InMemoryKv, PersistentPostStore, StoreConfig};
    use uuid::Uuid;

    async fn setup() -> (Arc<PersistentPostStore>, Arc<ManualClock>, SchedulerReconciler) {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(
            PersistentPostStore::open(
                Arc::new(InMemoryKv::default()),
                clock.clone(),
                StoreConfig::default(),
            )
            .await,
        );
        let reconciler =
            SchedulerReconciler::new(store.clone(), clock.clone(), Arc::new(NoopEventSink));
        (store, clock, reconciler)
    }

    fn scheduled(at: chrono::DateTime<chrono::Utc>, now: chrono::DateTime<chrono::Utc>) -> NewPost {
        NewPost {
            author_id: Uuid::new_v4(),
            author_name: "Ada".to_string(),
            content: Some("soon".to_string()),
            attachments: vec![],
            created_at: now,
            scheduled_for: Some(at),
            status: PostStatus::Scheduled,
            visibility: Visibility::Public,
            community_id: None,
        }
    }

    #[tokio::test]
    async fn test_future_posts_are_left_alone() {
        let (store, clock, reconciler) = setup().await;
        let now = clock.now();
        let id = store.append(scheduled(now + Duration::minutes(5), now)).await.unwrap();

        assert!(reconciler.run_pass().await.is_empty());
        assert_eq!(store.get(id).await.unwrap().status, PostStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_overlapping_passes_publish_once() {
        let (store, clock, reconciler) = setup().await;
        let now = clock.now();
        let id = store.append(scheduled(now + Duration::seconds(1), now)).await.unwrap();
        clock.advance(Duration::seconds(2));

        let (a, b) = tokio::join!(reconciler.run_pass(), reconciler.run_pass());

        let published: Vec<PostId> = a.published.into_iter().chain(b.published).collect();
        assert_eq!(published, vec![id]);
        assert_eq!(store.get(id).await.unwrap().status, PostStatus::Published);
    }
}
