//! Feed composition: which posts a selector shows, in which order, one page
//! at a time.

use std::collections::HashSet;
use std::sync::Arc;

use feed_core::FeedError;
use feed_core::domain::{Cursor, FeedPage, FeedQuery, FeedSelector, Post, PostStatus};
use feed_core::ports::{AuthProvider, PostPredicate, PostQuery, PostStore, SocialGraph, StoreHealth};

use crate::config::EngineConfig;

/// A composed feed over one store snapshot.
///
/// Iterating is lazy for every selector except `mine`, and can be restarted
/// any number of times; the only state that outlives a call is the cursor
/// held by the caller.
pub struct Feed {
    selector: FeedSelector,
    query: PostQuery,
    notice: Option<String>,
}

impl Feed {
    pub fn selector(&self) -> &FeedSelector {
        &self.selector
    }

    /// Set when the store could not be read and this is a degraded view.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = &Post> + '_> {
        match self.selector {
            // Mixes statuses, so the store order does not apply. Newest
            // submission first: ids never change, unlike a promoted post's
            // effective time.
            FeedSelector::Mine => {
                let mut posts: Vec<&Post> = self.query.iter().collect();
                posts.sort_by(|a, b| b.id.cmp(&a.id));
                Box::new(posts.into_iter())
            }
            _ => Box::new(self.query.iter()),
        }
    }

    fn after(&self, cursor: &Cursor, post: &Post) -> bool {
        match self.selector {
            FeedSelector::Mine => post.id < cursor.id,
            _ => cursor.precedes(post.effective_at(), post.id, self.selector.ascending()),
        }
    }

    /// Up to `size` posts strictly after `cursor`.
    pub fn page(&self, cursor: Option<&Cursor>, size: usize) -> FeedPage {
        let mut posts: Vec<Post> = self
            .iter()
            .filter(|p| cursor.is_none_or(|c| self.after(c, p)))
            .take(size + 1)
            .cloned()
            .collect();

        let next_cursor = if posts.len() > size {
            posts.truncate(size);
            posts.last().map(|p| Cursor::new(p.effective_at(), p.id))
        } else {
            None
        };

        FeedPage {
            posts,
            next_cursor,
            notice: self.notice.clone(),
        }
    }
}

pub struct FeedComposer {
    store: Arc<dyn PostStore>,
    social: Arc<dyn SocialGraph>,
    config: EngineConfig,
}

impl FeedComposer {
    pub fn new(store: Arc<dyn PostStore>, social: Arc<dyn SocialGraph>, config: EngineConfig) -> Self {
        Self {
            store,
            social,
            config,
        }
    }

    pub async fn compose(
        &self,
        auth: &dyn AuthProvider,
        selector: &FeedSelector,
    ) -> Result<Feed, FeedError> {
        let viewer = if selector.requires_identity() {
            Some(auth.require()?)
        } else {
            auth.current()
        };

        let predicate: PostPredicate = match (selector, viewer) {
            (FeedSelector::All, _) => Arc::new(|p: &Post| p.status == PostStatus::Published),
            (FeedSelector::Community(id), _) => {
                let id = id.clone();
                Arc::new(move |p: &Post| {
                    p.status == PostStatus::Published && p.community_id.as_deref() == Some(id.as_str())
                })
            }
            (FeedSelector::Following, Some(me)) => {
                let authors: HashSet<_> = self.social.following(me.user_id).await;
                Arc::new(move |p: &Post| {
                    p.status == PostStatus::Published && authors.contains(&p.author_id)
                })
            }
            (FeedSelector::Scheduled, Some(me)) => Arc::new(move |p: &Post| {
                p.status == PostStatus::Scheduled && p.author_id == me.user_id
            }),
            (FeedSelector::Mine, Some(me)) => Arc::new(move |p: &Post| {
                p.status != PostStatus::Deleted && p.author_id == me.user_id
            }),
            (_, None) => return Err(FeedError::AuthRequired),
        };

        let notice = match self.store.health() {
            StoreHealth::Healthy => None,
            StoreHealth::Degraded(reason) => Some(format!(
                "Saved posts could not be read ({reason}); showing a read-only view"
            )),
        };

        Ok(Feed {
            selector: selector.clone(),
            query: self.store.query_all(predicate).await,
            notice,
        })
    }

    /// One page of `query`, with the page size clamped to the configured range.
    pub async fn feed(
        &self,
        auth: &dyn AuthProvider,
        query: &FeedQuery,
    ) -> Result<FeedPage, FeedError> {
        let feed = self.compose(auth, &query.selector).await?;
        let size = self.config.page_size(query.page_size);
        let page = feed.page(query.cursor.as_ref(), size);

        tracing::debug!(
            selector = %query.selector,
            returned = page.posts.len(),
            more = page.next_cursor.is_some(),
            "Feed page composed"
        );
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use feed_core::domain::{Identity, NewPost, PostId, PostPatch, Visibility};
    use feed_core::ports::ManualClock;
    use feed_infra::{InMemoryKv, InMemorySocialGraph, PersistentPostStore, StoreConfig};
    use uuid::Uuid;

    struct Fixture {
        store: Arc<PersistentPostStore>,
        social: Arc<InMemorySocialGraph>,
        composer: FeedComposer,
        me: Identity,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(
            PersistentPostStore::open(
                Arc::new(InMemoryKv::default()),
                Arc::new(ManualClock::default()),
                StoreConfig::default(),
            )
            .await,
        );
        let social = Arc::new(InMemorySocialGraph::new());
        Fixture {
            composer: FeedComposer::new(store.clone(), social.clone(), EngineConfig::default()),
            store,
            social,
            me: Identity::new(Uuid::new_v4(), "Ada"),
        }
    }

    async fn add(store: &PersistentPostStore, author: Uuid, status: PostStatus, community: Option<&str>) -> PostId {
        let now = Utc::now();
        store
            .append(NewPost {
                author_id: author,
                author_name: "someone".to_string(),
                content: Some("post".to_string()),
                attachments: vec![],
                created_at: now,
                scheduled_for: (status == PostStatus::Scheduled).then(|| now + Duration::hours(1)),
                status,
                visibility: Visibility::Public,
                community_id: community.map(str::to_string),
            })
            .await
            .unwrap()
    }

    fn ids(feed: &Feed) -> Vec<PostId> {
        feed.iter().map(|p| p.id).collect()
    }

    #[tokio::test]
    async fn test_following_shows_only_followed_authors() {
        let f = fixture().await;
        let friend = Uuid::new_v4();
        f.social.follow(f.me.user_id, friend).await;

        let theirs = add(&f.store, friend, PostStatus::Published, None).await;
        add(&f.store, Uuid::new_v4(), PostStatus::Published, None).await;

        let feed = f.composer.compose(&f.me, &FeedSelector::Following).await.unwrap();
        assert_eq!(ids(&feed), vec![theirs]);
    }

    #[tokio::test]
    async fn test_community_feed_filters_by_community() {
        let f = fixture().await;
        let inside = add(&f.store, Uuid::new_v4(), PostStatus::Published, Some("rust")).await;
        add(&f.store, Uuid::new_v4(), PostStatus::Published, Some("go")).await;

        let selector = FeedSelector::Community("rust".to_string());
        let feed = f.composer.compose(&None::<Identity>, &selector).await.unwrap();
        assert_eq!(ids(&feed), vec![inside]);
    }

    #[tokio::test]
    async fn test_mine_hides_deleted_and_shows_archived() {
        let f = fixture().await;
        let me = f.me.user_id;
        let archived = add(&f.store, me, PostStatus::Published, None).await;
        let deleted = add(&f.store, me, PostStatus::Published, None).await;
        let scheduled = add(&f.store, me, PostStatus::Scheduled, None).await;
        add(&f.store, Uuid::new_v4(), PostStatus::Published, None).await;

        f.store
            .update(archived, PostPatch::transition(PostStatus::Published, PostStatus::Archived))
            .await
            .unwrap();
        f.store
            .update(deleted, PostPatch::transition(PostStatus::Published, PostStatus::Deleted))
            .await
            .unwrap();

        let feed = f.composer.compose(&f.me, &FeedSelector::Mine).await.unwrap();
        assert_eq!(ids(&feed), vec![scheduled, archived]);

        let all = f.composer.compose(&f.me, &FeedSelector::All).await.unwrap();
        assert!(!ids(&all).contains(&archived));
    }

    #[tokio::test]
    async fn test_personal_feeds_need_identity() {
        let f = fixture().await;
        for selector in [FeedSelector::Following, FeedSelector::Scheduled, FeedSelector::Mine] {
            let result = f.composer.compose(&None::<Identity>, &selector).await;
            assert!(matches!(result, Err(FeedError::AuthRequired)));
        }
        assert!(f.composer.compose(&None::<Identity>, &FeedSelector::All).await.is_ok());
    }

    #[tokio::test]
    async fn test_degraded_store_carries_notice() {
        let store = Arc::new(
            PersistentPostStore::open(
                Arc::new(InMemoryKv::default().with_value("feed.posts", "garbage")),
                Arc::new(ManualClock::default()),
                StoreConfig::default(),
            )
            .await,
        );
        let composer = FeedComposer::new(store, Arc::new(InMemorySocialGraph::new()), EngineConfig::default());

        let page = composer
            .feed(&None::<Identity>, &FeedQuery::new(FeedSelector::All))
            .await
            .unwrap();
        assert!(page.posts.is_empty());
        assert!(page.notice.is_some());
    }

    #[tokio::test]
    async fn test_last_page_has_no_cursor() {
        let f = fixture().await;
        for _ in 0..3 {
            add(&f.store, Uuid::new_v4(), PostStatus::Published, None).await;
        }

        let first = f
            .composer
            .feed(&f.me, &FeedQuery::new(FeedSelector::All).with_page_size(2))
            .await
            .unwrap();
        let cursor = first.next_cursor.unwrap();
        let second = f
            .composer
            .feed(&f.me, &FeedQuery::new(FeedSelector::All).after(cursor).with_page_size(2))
            .await
            .unwrap();

        assert_eq!(second.posts.len(), 1);
        assert!(second.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_mine_pages_survive_promotion_mid_scroll() {
        let f = fixture().await;
        let me = f.me.user_id;
        let old = add(&f.store, me, PostStatus::Published, None).await;
        let sooner = add(&f.store, me, PostStatus::Scheduled, None).await;
        let later = add(&f.store, me, PostStatus::Scheduled, None).await;

        let mut seen = Vec::new();
        let first = f
            .composer
            .feed(&f.me, &FeedQuery::new(FeedSelector::Mine).with_page_size(1))
            .await
            .unwrap();
        seen.extend(first.posts.iter().map(|p| p.id));

        // Both scheduled posts go live between page requests.
        let now = Utc::now() + Duration::hours(3);
        for id in [sooner, later] {
            assert!(f.store.update(id, PostPatch::publish(now)).await.unwrap());
        }

        let mut cursor = first.next_cursor;
        while let Some(c) = cursor {
            let page = f
                .composer
                .feed(&f.me, &FeedQuery::new(FeedSelector::Mine).after(c).with_page_size(1))
                .await
                .unwrap();
            seen.extend(page.posts.iter().map(|p| p.id));
            cursor = page.next_cursor;
        }

        assert_eq!(seen, vec![later, sooner, old]);
    }
}
