//! In-memory follow graph.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use feed_core::ports::SocialGraph;

#[derive(Debug, Default)]
pub struct InMemorySocialGraph {
    edges: RwLock<HashMap<Uuid, HashSet<Uuid>>>,
}

impl InMemorySocialGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if `follower` already followed `followee`.
    pub async fn follow(&self, follower: Uuid, followee: Uuid) -> bool {
        self.edges
            .write()
            .await
            .entry(follower)
            .or_default()
            .insert(followee)
    }

    pub async fn unfollow(&self, follower: Uuid, followee: Uuid) -> bool {
        self.edges
            .write()
            .await
            .get_mut(&follower)
            .is_some_and(|set| set.remove(&followee))
    }
}

#[async_trait]
impl SocialGraph for InMemorySocialGraph {
    async fn following(&self, user_id: Uuid) -> HashSet<Uuid> {
        self.edges
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_follow_is_directional() {
        let graph = InMemorySocialGraph::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(graph.follow(a, b).await);
        assert!(!graph.follow(a, b).await);

        assert!(graph.following(a).await.contains(&b));
        assert!(graph.following(b).await.is_empty());

        assert!(graph.unfollow(a, b).await);
        assert!(graph.following(a).await.is_empty());
    }
}
