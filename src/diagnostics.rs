//! Diagnostic sink
//!
//! Where the cache reports role violations, unknown operations and traffic.
//! The default sink forwards to `tracing`, so nothing is printed unless the
//! host installs a subscriber.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Receiver for cache diagnostics, swappable through setup options.
pub trait DiagnosticSink: Send + Sync {
    /// Routine traffic, e.g. every envelope received.
    fn log(&self, message: &str);
    /// Something was refused or dropped.
    fn warn(&self, message: &str);
}

/// Sink that forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn log(&self, message: &str) {
        tracing::debug!(target: "memored", "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "memored", "{}", message);
    }
}

/// Shared handle to a sink.
///
/// Clones share one slot: [`Diagnostics::replace`] is seen by every clone.
#[derive(Clone)]
pub struct Diagnostics(Arc<RwLock<Arc<dyn DiagnosticSink>>>);

impl Diagnostics {
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self(Arc::new(RwLock::new(sink)))
    }

    /// Swaps the sink for this handle and all of its clones.
    pub fn replace(&self, sink: Arc<dyn DiagnosticSink>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = sink;
    }

    fn sink(&self) -> Arc<dyn DiagnosticSink> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn log(&self, message: impl AsRef<str>) {
        self.sink().log(message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.sink().warn(message.as_ref());
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Diagnostics")
    }
}

/// Sink that records every message, for assertions in tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    pub logs: std::sync::Mutex<Vec<String>>,
    pub warnings: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl DiagnosticSink for RecordingSink {
    fn log(&self, message: &str) {
        self.logs.lock().unwrap().push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }
}
