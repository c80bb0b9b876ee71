//! Timer on tokio intervals. Each registration runs on its own task.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, MissedTickBehavior};

use feed_core::ports::{TickFn, Timer, TimerError, TimerHandle};

#[derive(Debug, Clone, Copy, Default)]
pub struct IntervalTimer;

impl IntervalTimer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Timer for IntervalTimer {
    async fn every(
        &self,
        name: &str,
        period: Duration,
        tick: TickFn,
    ) -> Result<TimerHandle, TimerError> {
        if period.is_zero() {
            return Err(TimerError::Schedule {
                name: name.to_string(),
                reason: "period must be non-zero".to_string(),
            });
        }

        let task_name = name.to_string();
        let task = tokio::spawn(async move {
            // First tick after one full period.
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                tracing::debug!(task = %task_name, "Timer tick");
                tick().await;
            }
        });

        tracing::info!(task = %name, period_ms = period.as_millis() as u64, "Periodic task registered");

        let abort = task.abort_handle();
        let cancelled = name.to_string();
        Ok(TimerHandle::new(name, move || {
            abort.abort();
            tracing::info!(task = %cancelled, "Periodic task cancelled");
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_core::ports::tick_fn;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_tick(count: Arc<AtomicUsize>) -> TickFn {
        tick_fn(move || {
            let count = count.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_until_cancelled() {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = IntervalTimer
            .every("test", Duration::from_secs(60), counting_tick(count.clone()))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(150)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_period_is_rejected() {
        let result = IntervalTimer
            .every("test", Duration::ZERO, counting_tick(Arc::default()))
            .await;
        assert!(matches!(result, Err(TimerError::Schedule { .. })));
    }
}
