//! Queue and sync settings, read from `MATCHNG_*` environment variables.

use std::time::Duration;

use matchng_store::config::env_or;

use crate::retry::RetryPolicy;

pub const DEFAULT_REPLAY_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct OfflineConfig {
    /// Target of the [`HttpProbe`](crate::HttpProbe). `None` means no probe:
    /// the instance considers itself online.
    pub probe_url: Option<String>,
    pub replay_delay: Duration,
    pub sync_interval: Duration,
    pub retry: RetryPolicy,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            probe_url: None,
            replay_delay: DEFAULT_REPLAY_DELAY,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            retry: RetryPolicy::default(),
        }
    }
}

impl OfflineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            probe_url: std::env::var("MATCHNG_PROBE_URL")
                .ok()
                .filter(|u| !u.trim().is_empty()),
            replay_delay: Duration::from_millis(env_or(
                "MATCHNG_REPLAY_DELAY_MS",
                defaults.replay_delay.as_millis() as u64,
            )),
            sync_interval: Duration::from_secs(env_or(
                "MATCHNG_SYNC_INTERVAL_SECS",
                defaults.sync_interval.as_secs(),
            ))
            .max(Duration::from_secs(1)),
            retry: RetryPolicy {
                max_attempts: env_or("MATCHNG_MAX_ATTEMPTS", defaults.retry.max_attempts),
                ..defaults.retry
            },
        }
    }
}
