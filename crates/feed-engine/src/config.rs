//! Engine configuration loaded from environment variables.

use std::env;
use std::time::Duration;

/// Tunables shared by the engine components.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a completed idempotency key keeps answering retries.
    pub dedup_window: Duration,
    /// Bounded wait before a pending operation hands the affordance back.
    pub pending_timeout: Duration,
    pub reconcile_interval: Duration,
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub max_content_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dedup_window: Duration::from_secs(10),
            pending_timeout: Duration::from_millis(6000),
            reconcile_interval: Duration::from_secs(60),
            default_page_size: 20,
            max_page_size: 100,
            max_content_chars: 5000,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            dedup_window: Duration::from_secs(
                parse_var("FEED_DEDUP_WINDOW_SECS").unwrap_or(defaults.dedup_window.as_secs()),
            ),
            pending_timeout: Duration::from_millis(
                parse_var("FEED_PENDING_TIMEOUT_MS")
                    .unwrap_or(defaults.pending_timeout.as_millis() as u64),
            ),
            reconcile_interval: Duration::from_secs(
                parse_var("FEED_RECONCILE_INTERVAL_SECS")
                    .unwrap_or(defaults.reconcile_interval.as_secs()),
            ),
            default_page_size: parse_var("FEED_DEFAULT_PAGE_SIZE")
                .unwrap_or(defaults.default_page_size),
            max_page_size: parse_var("FEED_MAX_PAGE_SIZE").unwrap_or(defaults.max_page_size),
            max_content_chars: parse_var("FEED_MAX_CONTENT_CHARS")
                .unwrap_or(defaults.max_content_chars),
        }
    }

    /// Clamp a requested page size to `[1, max_page_size]`.
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.parse().ok())
}
