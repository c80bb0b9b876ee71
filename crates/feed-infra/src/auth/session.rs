use std::sync::{PoisonError, RwLock};

use feed_core::domain::Identity;
use feed_core::ports::AuthProvider;

/// Holds the signed-in user of a single-user (embedded) session.
#[derive(Debug, Default)]
pub struct SessionAuth {
    current: RwLock<Option<Identity>>,
}

impl SessionAuth {
    pub fn signed_in(identity: Identity) -> Self {
        Self {
            current: RwLock::new(Some(identity)),
        }
    }

    pub fn sign_in(&self, identity: Identity) {
        tracing::info!(user_id = %identity.user_id, "Session signed in");
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(identity);
    }

    pub fn sign_out(&self) {
        if let Some(identity) = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            tracing::info!(user_id = %identity.user_id, "Session signed out");
        }
    }
}

impl AuthProvider for SessionAuth {
    fn current(&self) -> Option<Identity> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_core::FeedError;
    use uuid::Uuid;

    #[test]
    fn test_sign_in_and_out() {
        let auth = SessionAuth::default();
        assert!(matches!(auth.require(), Err(FeedError::AuthRequired)));

        let me = Identity::new(Uuid::new_v4(), "Ada");
        auth.sign_in(me.clone());
        assert_eq!(auth.require().unwrap(), me);

        auth.sign_out();
        assert!(auth.current().is_none());
    }
}
