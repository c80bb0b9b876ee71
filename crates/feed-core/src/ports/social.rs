use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

/// Who follows whom. Owned by the profile/community side of the app.
#[async_trait]
pub trait SocialGraph: Send + Sync {
    async fn following(&self, user_id: Uuid) -> HashSet<Uuid>;
}
