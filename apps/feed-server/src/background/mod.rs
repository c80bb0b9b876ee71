//! Periodic background work.

#[cfg(feature = "scheduler")]
mod scheduler;

#[cfg(feature = "scheduler")]
pub use scheduler::CronTimer;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Run the scheduled-post reconciler in the background.
    pub enabled: bool,
    /// Six-field cron expression for reconciler passes. When unset the
    /// engine's reconcile interval is used instead.
    pub reconcile_cron: Option<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reconcile_cron: Some("0 * * * * *".to_string()),
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: std::env::var("SCHEDULER_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            reconcile_cron: match std::env::var("RECONCILE_CRON") {
                Ok(expr) if expr.trim().is_empty() => None,
                Ok(expr) => Some(expr),
                Err(_) => Some("0 * * * * *".to_string()),
            },
        }
    }
}
