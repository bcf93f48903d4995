//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::Value;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// The key this entry is stored under
    pub key: String,
    /// The stored payload
    pub value: Value,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Requested TTL, None = no expiration
    pub ttl: Option<Duration>,
    /// Expiration timestamp (Unix milliseconds), present iff `ttl` is
    pub expires_at: Option<u64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry stamped with the current time.
    pub fn new(key: String, value: Value, ttl: Option<Duration>) -> Self {
        Self::created_at(key, value, ttl, current_timestamp_ms())
    }

    /// Creates a new cache entry stamped with `now` (Unix milliseconds).
    pub fn created_at(key: String, value: Value, ttl: Option<Duration>, now: u64) -> Self {
        let expires_at = ttl.map(|ttl| now.saturating_add(ttl_millis(ttl)));

        Self {
            key,
            value,
            created_at: now,
            ttl,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once `now` is strictly past its expiration time;
    /// at the exact expiration millisecond it is still readable.
    pub fn is_expired_at(&self, now: u64) -> bool {
        match self.expires_at {
            Some(expires) => expires < now,
            None => false,
        }
    }
}

// == Utility Functions ==
/// Converts a TTL to whole milliseconds, rounding up and saturating.
///
/// Any non-zero TTL maps to at least 1ms, so it never reads as "no TTL".
pub fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
}

/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
