//! Cache Module
//!
//! Provides the authoritative in-memory store with TTL expiration.

mod entry;
mod store;


// Re-export public types
pub use entry::{current_timestamp_ms, ttl_millis, CacheEntry};
pub use store::{CacheStore, Lookup};
