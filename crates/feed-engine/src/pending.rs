//! Bounded waits for operations that stand in for a network round trip.
//!
//! The caller's control (a submit or reaction button) is modelled as an
//! [`Affordance`]. Dispatching an operation disables it and yields an
//! [`AffordanceLease`]; the lease restores the control exactly once, either
//! when the operation completes or when the bounded wait runs out, whichever
//! happens first. The engine only holds a weak reference, so a torn-down
//! view turns the restore into a no-op.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use feed_core::{FeedError, StorageError};

/// A re-actionable control owned by the view.
#[derive(Debug)]
pub struct Affordance {
    enabled: AtomicBool,
    restores: AtomicUsize,
}

impl Affordance {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            enabled: AtomicBool::new(true),
            restores: AtomicUsize::new(0),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// How many times a lease handed the control back.
    pub fn restore_count(&self) -> usize {
        self.restores.load(Ordering::SeqCst)
    }

    /// Disable the control for the duration of one operation.
    pub fn disable(self: &Arc<Self>) -> AffordanceLease {
        self.enabled.store(false, Ordering::SeqCst);
        AffordanceLease {
            target: Arc::downgrade(self),
            released: AtomicBool::new(false),
        }
    }
}

/// One operation's hold on an [`Affordance`].
#[derive(Debug)]
pub struct AffordanceLease {
    target: Weak<Affordance>,
    released: AtomicBool,
}

impl AffordanceLease {
    /// A lease with no view behind it.
    pub fn detached() -> Self {
        Self {
            target: Weak::new(),
            released: AtomicBool::new(false),
        }
    }

    /// Restore the control. Only the first call has an effect; returns
    /// whether this call restored a live control.
    pub fn release(&self) -> bool {
        if self.released.swap(true, Ordering::SeqCst) {
            return false;
        }
        match self.target.upgrade() {
            Some(affordance) => {
                affordance.enabled.store(true, Ordering::SeqCst);
                affordance.restores.fetch_add(1, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// Run `work` on its own task and wait at most `timeout` for it.
///
/// The lease is released by whichever comes first: completion or timeout.
/// On timeout the caller gets [`FeedError::TimedOut`] while the task keeps
/// running, so its eventual store writes still land.
pub async fn run_bounded<T, F>(
    operation: &'static str,
    timeout: Duration,
    lease: Arc<AffordanceLease>,
    work: F,
) -> Result<T, FeedError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, FeedError>> + Send + 'static,
{
    let completion = lease.clone();
    let task = tokio::spawn(async move {
        let result = work.await;
        completion.release();
        result
    });

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => {
            lease.release();
            tracing::error!(operation, error = %join_error, "Pending operation aborted");
            Err(FeedError::Storage(StorageError::Unavailable(format!(
                "{operation} did not complete: {join_error}"
            ))))
        }
        Err(_) => {
            lease.release();
            let waited_ms = timeout.as_millis() as u64;
            tracing::warn!(
                operation,
                waited_ms,
                "Operation still pending, restoring affordance"
            );
            Err(FeedError::TimedOut {
                operation,
                waited_ms,
            })
        }
    }
}
