//! Coordinator setup options

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::cache::CacheEntry;
use crate::config::Config;
use crate::diagnostics::DiagnosticSink;

/// Entry inserted into the store when the coordinator is set up.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedEntry {
    pub key: String,
    pub value: Value,
    pub ttl: Option<Duration>,
}

impl SeedEntry {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub(crate) fn into_entry(self) -> CacheEntry {
        CacheEntry::new(self.key, self.value, self.ttl)
    }
}

/// Options accepted by [`Coordinator::start`](super::Coordinator::start) and
/// [`Coordinator::setup`](super::Coordinator::setup).
#[derive(Clone, Default)]
pub struct SetupOptions {
    /// Period of the purge sweep; `None` leaves expiration lazy only
    pub purge_interval: Option<Duration>,
    /// Entries inserted at setup
    pub mock_data: Vec<SeedEntry>,
    /// Replaces the default diagnostic sink
    pub logger: Option<Arc<dyn DiagnosticSink>>,
}

impl SetupOptions {
    /// Derives setup options from the environment configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            purge_interval: config.purge_interval(),
            ..Self::default()
        }
    }

    pub fn with_purge_interval(mut self, interval: Duration) -> Self {
        self.purge_interval = Some(interval);
        self
    }

    pub fn with_mock_data(mut self, mock_data: Vec<SeedEntry>) -> Self {
        self.mock_data = mock_data;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn DiagnosticSink>) -> Self {
        self.logger = Some(logger);
        self
    }
}

impl fmt::Debug for SetupOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetupOptions")
            .field("purge_interval", &self.purge_interval)
            .field("mock_data", &self.mock_data.len())
            .field("logger", &self.logger.is_some())
            .finish()
    }
}
