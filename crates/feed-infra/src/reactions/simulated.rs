//! Stand-in for the remote reaction endpoint: a fixed delay, plus failures
//! that can be injected from tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use feed_core::domain::PostId;
use feed_core::ports::{ReactionBackend, ReactionBackendError};

#[derive(Debug, Clone)]
pub struct SimulatedReactionConfig {
    /// Round-trip delay of every call.
    pub latency: Duration,
}

impl Default for SimulatedReactionConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(300),
        }
    }
}

impl SimulatedReactionConfig {
    pub fn from_env() -> Self {
        Self {
            latency: Duration::from_millis(
                std::env::var("FEED_REACTION_LATENCY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
        }
    }
}

/// A recorded `persist_interest` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionCall {
    pub post_id: PostId,
    pub user_id: Uuid,
    pub interested: bool,
}

#[derive(Debug, Default)]
pub struct SimulatedReactionBackend {
    config: SimulatedReactionConfig,
    failures: AtomicUsize,
    calls: Mutex<Vec<ReactionCall>>,
}

impl SimulatedReactionBackend {
    pub fn new(config: SimulatedReactionConfig) -> Self {
        Self {
            config,
            failures: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make the next `n` calls fail after their delay.
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<ReactionCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn take_failure(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ReactionBackend for SimulatedReactionBackend {
    async fn persist_interest(
        &self,
        post_id: PostId,
        user_id: Uuid,
        interested: bool,
    ) -> Result<(), ReactionBackendError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ReactionCall {
                post_id,
                user_id,
                interested,
            });

        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }

        if self.take_failure() {
            tracing::debug!(post_id = %post_id, user_id = %user_id, "Simulated reaction failure");
            return Err(ReactionBackendError::Unavailable(
                "simulated network failure".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_calls_are_recorded_and_failures_consumed() {
        let backend = SimulatedReactionBackend::default();
        let user = Uuid::new_v4();
        backend.fail_next(1);

        assert!(backend.persist_interest(PostId(1), user, true).await.is_err());
        assert!(backend.persist_interest(PostId(1), user, false).await.is_ok());

        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].interested);
        assert!(!calls[1].interested);
    }
}
