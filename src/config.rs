//! Configuration Module
//!
//! Handles loading the coordinator and demo settings from environment variables.

use std::env;
use std::time::Duration;

/// Runtime configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Purge sweep interval in milliseconds, 0 disables the sweep
    pub purge_interval_ms: u64,
    /// Number of participants the demo attaches
    pub participants: usize,
    /// TTL in milliseconds for entries stored by the demo load
    pub entry_ttl_ms: u64,
    /// Pause between two store/read iterations of a demo participant
    pub iteration_interval_ms: u64,
    /// How long the demo load runs, in seconds
    pub run_duration_secs: u64,
    /// How often the coordinator reports the cache size, in seconds
    pub report_interval_secs: u64,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `PURGE_INTERVAL_MS` - Purge sweep interval (default: 1000, 0 disables)
    /// - `PARTICIPANTS` - Demo participants (default: 4)
    /// - `ENTRY_TTL_MS` - Demo entry TTL (default: 10000)
    /// - `ITERATION_INTERVAL_MS` - Demo pause between iterations (default: 10)
    /// - `RUN_DURATION_SECS` - Demo load duration (default: 30)
    /// - `REPORT_INTERVAL_SECS` - Size report frequency (default: 5)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            purge_interval_ms: env_or("PURGE_INTERVAL_MS", defaults.purge_interval_ms),
            participants: env_or("PARTICIPANTS", defaults.participants),
            entry_ttl_ms: env_or("ENTRY_TTL_MS", defaults.entry_ttl_ms),
            iteration_interval_ms: env_or("ITERATION_INTERVAL_MS", defaults.iteration_interval_ms),
            run_duration_secs: env_or("RUN_DURATION_SECS", defaults.run_duration_secs),
            report_interval_secs: env_or("REPORT_INTERVAL_SECS", defaults.report_interval_secs),
        }
    }

    /// Purge interval, `None` when purging is disabled.
    pub fn purge_interval(&self) -> Option<Duration> {
        (self.purge_interval_ms > 0).then(|| Duration::from_millis(self.purge_interval_ms))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            purge_interval_ms: 1000,
            participants: 4,
            entry_ttl_ms: 10_000,
            iteration_interval_ms: 10,
            run_duration_secs: 30,
            report_interval_secs: 5,
        }
    }
}
