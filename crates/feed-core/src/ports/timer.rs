//! Timer port - periodic work behind a swappable scheduler.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// Work run on every tick.
pub type TickFn = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Wrap an async closure as a [`TickFn`].
pub fn tick_fn<F, Fut>(f: F) -> TickFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move || Box::pin(f()) as Pin<Box<dyn Future<Output = ()> + Send>>)
}

#[async_trait]
pub trait Timer: Send + Sync {
    /// Run `tick` every `period` until the returned handle is cancelled.
    async fn every(
        &self,
        name: &str,
        period: Duration,
        tick: TickFn,
    ) -> Result<TimerHandle, TimerError>;
}

/// Cancels a registered periodic task. Dropping the handle leaves the task
/// running; cancellation is always explicit.
pub struct TimerHandle {
    name: String,
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl TimerHandle {
    pub fn new(name: impl Into<String>, cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("name", &self.name)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    #[error("Failed to schedule '{name}': {reason}")]
    Schedule { name: String, reason: String },
}
