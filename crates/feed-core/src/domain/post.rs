use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Store-assigned post identifier. Monotonically increasing, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub u64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PostId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(PostId)
    }
}

/// Lifecycle of a persisted post.
///
/// `Scheduled -> Published -> Archived` or `Published -> Deleted`.
/// Drafts never reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Scheduled,
    Published,
    Archived,
    Deleted,
}

impl PostStatus {
    pub fn can_transition_to(self, next: PostStatus) -> bool {
        matches!(
            (self, next),
            (PostStatus::Scheduled, PostStatus::Published)
                | (PostStatus::Published, PostStatus::Archived)
                | (PostStatus::Published, PostStatus::Deleted)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Scheduled => "scheduled",
            PostStatus::Published => "published",
            PostStatus::Archived => "archived",
            PostStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audience hint carried with a post. The engine does not enforce it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Connections,
    Private,
}

/// Reference to uploaded media.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub media_type: String,
}

/// Post entity - the unit every feed is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: Uuid,
    pub author_name: String,
    pub content: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Publication time. Reassigned once when a scheduled post goes live.
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    pub status: PostStatus,
    /// Users who marked the post as interesting.
    #[serde(default)]
    pub reactions: BTreeSet<Uuid>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_id: Option<String>,
}

impl Post {
    pub fn interest_count(&self) -> usize {
        self.reactions.len()
    }

    pub fn is_interested(&self, user_id: &Uuid) -> bool {
        self.reactions.contains(user_id)
    }

    /// `scheduled_for` while scheduled, `created_at` otherwise.
    pub fn effective_at(&self) -> DateTime<Utc> {
        match (self.status, self.scheduled_for) {
            (PostStatus::Scheduled, Some(at)) => at,
            _ => self.created_at,
        }
    }

    /// Canonical store order: scheduled posts first, soonest first; everything
    /// else newest first. Ties fall back to the id in the same direction.
    pub fn canonical_cmp(a: &Post, b: &Post) -> Ordering {
        let a_sched = a.status == PostStatus::Scheduled;
        let b_sched = b.status == PostStatus::Scheduled;
        match (a_sched, b_sched) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (true, true) => (a.effective_at(), a.id).cmp(&(b.effective_at(), b.id)),
            (false, false) => (b.created_at, b.id).cmp(&(a.created_at, a.id)),
        }
    }

    /// Apply a patch in place. Returns `false`, leaving the post untouched,
    /// when the patch would break the status invariants or its expected
    /// status does not match.
    pub fn apply(&mut self, patch: &PostPatch) -> bool {
        if let Some(expected) = patch.expected_status {
            if self.status != expected {
                return false;
            }
        }

        if let Some(next) = patch.status {
            if !self.status.can_transition_to(next) {
                return false;
            }
            // Going live needs a fresh publication timestamp.
            if next == PostStatus::Published && patch.created_at.is_none() {
                return false;
            }
        }
        if patch.created_at.is_some() && patch.status != Some(PostStatus::Published) {
            return false;
        }

        if let Some(next) = patch.status {
            self.status = next;
            if next == PostStatus::Published {
                self.scheduled_for = None;
            }
        }
        if let Some(at) = patch.created_at {
            self.created_at = at;
        }
        if let Some(Membership {
            user_id,
            interested,
        }) = patch.interest
        {
            if interested {
                self.reactions.insert(user_id);
            } else {
                self.reactions.remove(&user_id);
            }
        }
        true
    }
}

/// One user's membership in a post's reaction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Membership {
    pub user_id: Uuid,
    pub interested: bool,
}

/// Partial update applied by [`crate::ports::PostStore::update`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostPatch {
    /// Compare-and-transition guard checked under the store's write lock.
    pub expected_status: Option<PostStatus>,
    pub status: Option<PostStatus>,
    pub created_at: Option<DateTime<Utc>>,
    pub interest: Option<Membership>,
}

impl PostPatch {
    /// Scheduled -> Published, stamping the publication time.
    pub fn publish(now: DateTime<Utc>) -> Self {
        Self {
            expected_status: Some(PostStatus::Scheduled),
            status: Some(PostStatus::Published),
            created_at: Some(now),
            interest: None,
        }
    }

    pub fn transition(from: PostStatus, to: PostStatus) -> Self {
        Self {
            expected_status: Some(from),
            status: Some(to),
            ..Self::default()
        }
    }

    pub fn interest(user_id: Uuid, interested: bool) -> Self {
        Self {
            interest: Some(Membership {
                user_id,
                interested,
            }),
            ..Self::default()
        }
    }
}

/// A post that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub author_id: Uuid,
    pub author_name: String,
    pub content: Option<String>,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub status: PostStatus,
    pub visibility: Visibility,
    pub community_id: Option<String>,
}

impl NewPost {
    pub fn into_post(self, id: PostId) -> Post {
        Post {
            id,
            author_id: self.author_id,
            author_name: self.author_name,
            content: self.content,
            attachments: self.attachments,
            created_at: self.created_at,
            scheduled_for: self.scheduled_for,
            status: self.status,
            reactions: BTreeSet::new(),
            visibility: self.visibility,
            community_id: self.community_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn post(id: u64, status: PostStatus, created_at: DateTime<Utc>) -> Post {
        NewPost {
            author_id: Uuid::new_v4(),
            author_name: "Ada".to_string(),
            content: Some("hi".to_string()),
            attachments: vec![],
            created_at,
            scheduled_for: (status == PostStatus::Scheduled).then(|| created_at + Duration::hours(1)),
            status,
            visibility: Visibility::Public,
            community_id: None,
        }
        .into_post(PostId(id))
    }

    #[test]
    fn test_publish_patch_clears_schedule_and_stamps_time() {
        let now = Utc::now();
        let mut p = post(1, PostStatus::Scheduled, now);
        let later = now + Duration::hours(2);

        assert!(p.apply(&PostPatch::publish(later)));
        assert_eq!(p.status, PostStatus::Published);
        assert_eq!(p.created_at, later);
        assert_eq!(p.scheduled_for, None);

        // A second publish fails the guard and changes nothing.
        let snapshot = p.clone();
        assert!(!p.apply(&PostPatch::publish(later + Duration::minutes(1))));
        assert_eq!(p, snapshot);
    }

    #[test]
    fn test_status_never_moves_backwards() {
        let mut p = post(1, PostStatus::Published, Utc::now());
        let back = PostPatch {
            status: Some(PostStatus::Scheduled),
            ..PostPatch::default()
        };
        assert!(!p.apply(&back));
        assert!(p.apply(&PostPatch::transition(PostStatus::Published, PostStatus::Deleted)));
        assert!(!p.apply(&PostPatch::transition(PostStatus::Deleted, PostStatus::Archived)));
    }

    #[test]
    fn test_interest_patch_is_set_membership() {
        let mut p = post(1, PostStatus::Published, Utc::now());
        let user = Uuid::new_v4();
        assert!(p.apply(&PostPatch::interest(user, true)));
        assert!(p.apply(&PostPatch::interest(user, true)));
        assert_eq!(p.interest_count(), 1);
        assert!(p.apply(&PostPatch::interest(user, false)));
        assert_eq!(p.interest_count(), 0);
    }

    #[test]
    fn test_canonical_order() {
        let now = Utc::now();
        let old = post(1, PostStatus::Published, now - Duration::hours(1));
        let new = post(2, PostStatus::Published, now);
        let soon = post(3, PostStatus::Scheduled, now);
        let later = post(4, PostStatus::Scheduled, now + Duration::hours(1));

        let mut all = vec![old.clone(), later.clone(), new.clone(), soon.clone()];
        all.sort_by(Post::canonical_cmp);
        let ids: Vec<u64> = all.iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec![3, 4, 2, 1]);
    }
}
