//! Configuration types for cluster requests and bulk runs.

use std::env;
use std::time::Duration;

use crate::errors::TimError;

/// Default maximum size of one bulk request body (100 MiB).
pub const DEFAULT_MAX_CHUNK_BYTES: usize = 100 * 1024 * 1024;

/// Default number of retries for transient request failures.
pub const DEFAULT_MAX_RETRIES: u32 = 50;

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Default number of processed items between progress log lines.
pub const DEFAULT_STATUS_UPDATE_INTERVAL: u64 = 1000;

/// Default delay before the first retry.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(2);

/// Default upper bound for the retry delay.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(600);

/// Tuning for cluster requests and bulk runs.
///
/// Built once at start-up and passed to the client adapter and the bulk engine.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkConfig {
    /// Upper bound for the encoded size of one bulk request.
    pub max_chunk_bytes: usize,
    /// Retries for timeouts and throttling responses before giving up.
    pub max_retries: u32,
    /// Timeout applied to every request.
    pub request_timeout: Duration,
    /// Items between progress log lines.
    pub status_update_interval: u64,
    /// Delay before the first retry; doubled on each attempt.
    pub initial_backoff: Duration,
    /// Cap for the retry delay.
    pub max_backoff: Duration,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            max_chunk_bytes: DEFAULT_MAX_CHUNK_BYTES,
            max_retries: DEFAULT_MAX_RETRIES,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            status_update_interval: DEFAULT_STATUS_UPDATE_INTERVAL,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl BulkConfig {
    /// Read the configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_BULK_MAX_CHUNK_BYTES`: bulk request size limit (default: 104857600)
    /// - `OPENSEARCH_BULK_MAX_RETRIES`: retries for transient failures (default: 50)
    /// - `OPENSEARCH_REQUEST_TIMEOUT`: request timeout in seconds (default: 120)
    /// - `STATUS_UPDATE_INTERVAL`: items between progress log lines (default: 1000)
    ///
    /// Unset or empty variables fall back to the default.
    pub fn from_env() -> Result<Self, TimError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TimError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            max_chunk_bytes: parse_var(
                &lookup,
                "OPENSEARCH_BULK_MAX_CHUNK_BYTES",
                defaults.max_chunk_bytes,
            )?,
            max_retries: parse_var(&lookup, "OPENSEARCH_BULK_MAX_RETRIES", defaults.max_retries)?,
            request_timeout: Duration::from_secs(parse_var(
                &lookup,
                "OPENSEARCH_REQUEST_TIMEOUT",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            status_update_interval: parse_var(
                &lookup,
                "STATUS_UPDATE_INTERVAL",
                defaults.status_update_interval,
            )?,
            ..defaults
        })
    }

    /// Override the retry delays.
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Override the chunk size limit.
    pub fn with_max_chunk_bytes(mut self, max_chunk_bytes: usize) -> Self {
        self.max_chunk_bytes = max_chunk_bytes;
        self
    }

    /// Override the retry count.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Delay before retry number `attempt` (zero-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, TimError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(value) => value.trim().parse::<T>().map_err(|_| {
            TimError::configuration(format!("{} must be an integer, got '{}'", key, value))
        }),
        None => Ok(default),
    }
}
