//! Cron-style timer using tokio-cron-scheduler.

use std::time::Duration;

use async_trait::async_trait;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use uuid::Uuid;

use feed_core::ports::{TickFn, Timer, TimerError, TimerHandle};

use super::SchedulerConfig;

/// [`Timer`] backed by a shared [`JobScheduler`].
///
/// With a cron expression configured every registered task runs on that
/// schedule and the requested period is ignored.
pub struct CronTimer {
    inner: JobScheduler,
    cron: Option<String>,
}

impl CronTimer {
    /// Create and start the scheduler.
    pub async fn new(config: &SchedulerConfig) -> Result<Self, JobSchedulerError> {
        let inner = JobScheduler::new().await?;
        inner.start().await?;
        tracing::info!(cron = ?config.reconcile_cron, "Scheduler started");

        Ok(Self {
            inner,
            cron: config.reconcile_cron.clone(),
        })
    }

    /// Stop the scheduler.
    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        self.inner.shutdown().await?;
        tracing::info!("Scheduler stopped");
        Ok(())
    }
}

#[async_trait]
impl Timer for CronTimer {
    async fn every(
        &self,
        name: &str,
        period: Duration,
        tick: TickFn,
    ) -> Result<TimerHandle, TimerError> {
        let schedule_error = |e: JobSchedulerError| TimerError::Schedule {
            name: name.to_string(),
            reason: e.to_string(),
        };

        let run = move |_id: Uuid, _lock: JobScheduler| tick();
        let job = match &self.cron {
            Some(expr) => Job::new_async(expr.as_str(), run),
            None => Job::new_repeated_async(period, run),
        }
        .map_err(schedule_error)?;

        let id = self.inner.add(job).await.map_err(schedule_error)?;
        match &self.cron {
            Some(expr) => tracing::info!(job = %name, schedule = %expr, job_id = %id, "Cron job registered"),
            None => tracing::info!(job = %name, period_secs = period.as_secs(), job_id = %id, "Repeated job registered"),
        }

        let scheduler = self.inner.clone();
        let job_name = name.to_string();
        Ok(TimerHandle::new(name, move || {
            tokio::spawn(async move {
                match scheduler.remove(&id).await {
                    Ok(()) => tracing::info!(job = %job_name, job_id = %id, "Job removed"),
                    Err(e) => tracing::error!(job = %job_name, error = %e, "Failed to remove job"),
                }
            });
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use feed_core::ports::tick_fn;

    #[tokio::test]
    async fn test_bad_cron_expression_is_a_schedule_error() {
        let timer = CronTimer::new(&SchedulerConfig {
            enabled: true,
            reconcile_cron: Some("not a schedule".to_string()),
        })
        .await
        .unwrap();

        let result = timer
            .every("broken", Duration::from_secs(1), tick_fn(|| async {}))
            .await;
        assert!(matches!(result, Err(TimerError::Schedule { .. })));
    }

    #[tokio::test]
    async fn test_repeated_job_ticks_until_cancelled() {
        let mut timer = CronTimer::new(&SchedulerConfig {
            enabled: true,
            reconcile_cron: None,
        })
        .await
        .unwrap();

        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let handle = timer
            .every(
                "count",
                Duration::from_secs(1),
                tick_fn(move || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }
                }),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        handle.cancel();
        tokio::time::sleep(Duration::from_millis(1200)).await;
        let seen = ticks.load(Ordering::SeqCst);
        assert!(seen >= 1, "expected at least one tick, saw {seen}");

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
        timer.shutdown().await.unwrap();
    }
}
