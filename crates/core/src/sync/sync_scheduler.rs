//! Flush cadence constants and scheduler configuration.

use std::time::Duration;

/// Trailing debounce after the last mutation before a flush is scheduled.
pub const RESUME_SYNC_DEBOUNCE_MS: u64 = 500;

/// Minimum time between the starts of two flushes.
pub const RESUME_SYNC_MIN_FLUSH_INTERVAL_MS: u64 = 1_000;

/// Base delay before retrying a failed flush.
pub const RESUME_SYNC_RETRY_SECS: u64 = 5;

/// Upper bound for the retry delay.
pub const RESUME_SYNC_MAX_RETRY_SECS: u64 = 5 * 60;

/// Maximum jitter (milliseconds) added to retry delays.
pub const RESUME_SYNC_RETRY_JITTER_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub debounce: Duration,
    pub min_flush_interval: Duration,
    pub retry_base: Duration,
    pub retry_max: Duration,
    pub retry_jitter: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(RESUME_SYNC_DEBOUNCE_MS),
            min_flush_interval: Duration::from_millis(RESUME_SYNC_MIN_FLUSH_INTERVAL_MS),
            retry_base: Duration::from_secs(RESUME_SYNC_RETRY_SECS),
            retry_max: Duration::from_secs(RESUME_SYNC_MAX_RETRY_SECS),
            retry_jitter: Duration::from_millis(RESUME_SYNC_RETRY_JITTER_MS),
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("[ResumeSync] Ignoring non-numeric {}={}", key, raw);
            None
        }
    }
}

impl SchedulerConfig {
    /// Defaults overridden by `RESUME_SYNC_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ms) = env_u64("RESUME_SYNC_DEBOUNCE_MS") {
            config.debounce = Duration::from_millis(ms);
        }
        if let Some(ms) = env_u64("RESUME_SYNC_MIN_INTERVAL_MS") {
            config.min_flush_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = env_u64("RESUME_SYNC_RETRY_SECS") {
            config.retry_base = Duration::from_secs(secs.max(1));
        }
        if let Some(ms) = env_u64("RESUME_SYNC_RETRY_JITTER_MS") {
            config.retry_jitter = Duration::from_millis(ms);
        }
        config
    }

    /// No jitter; for deterministic timing.
    pub fn without_jitter(mut self) -> Self {
        self.retry_jitter = Duration::ZERO;
        self
    }

    /// Exponential retry delay for `consecutive_failures` (1 = first failure), capped.
    pub fn retry_delay(&self, consecutive_failures: u32) -> Duration {
        const MAX_EXPONENT: u32 = 8;
        let exponent = consecutive_failures.saturating_sub(1).min(MAX_EXPONENT);
        self.retry_base
            .saturating_mul(1_u32 << exponent)
            .min(self.retry_max)
    }
}
