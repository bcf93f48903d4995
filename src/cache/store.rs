//! Cache Store Module
//!
//! The authoritative key/value map. It is owned by the coordinator task and
//! never shared, so none of its operations lock.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::CacheEntry;

// == Lookup ==
/// Result of reading a key from the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// No entry under this key
    Missing,
    /// The entry is still present but logically absent
    Expired,
    /// Live entry
    Hit {
        value: Value,
        expires_at: Option<u64>,
    },
}

#[cfg(test)]
impl Lookup {
    /// Collapses the lookup into the `(value, expires_at)` pair callers see.
    pub(crate) fn into_hit(self) -> Option<(Value, Option<u64>)> {
        match self {
            Lookup::Hit { value, expires_at } => Some((value, expires_at)),
            Lookup::Missing | Lookup::Expired => None,
        }
    }
}

// == Cache Store ==
/// Main cache storage with TTL support.
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: HashMap<String, CacheEntry>,
}

impl CacheStore {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Put ==
    /// Stores a value, replacing any previous entry under the same key.
    ///
    /// Returns the expiration timestamp when a TTL was given.
    pub fn put(&mut self, key: String, value: Value, ttl: Option<Duration>) -> Option<u64> {
        self.put_at(key, value, ttl, current_timestamp_ms())
    }

    /// Same as [`CacheStore::put`] with an explicit creation time.
    pub fn put_at(
        &mut self,
        key: String,
        value: Value,
        ttl: Option<Duration>,
        now: u64,
    ) -> Option<u64> {
        let entry = CacheEntry::created_at(key.clone(), value, ttl, now);
        let expires_at = entry.expires_at;
        self.entries.insert(key, entry);
        expires_at
    }

    /// Inserts a fully built entry, used for setup seeding.
    pub fn insert(&mut self, entry: CacheEntry) {
        self.entries.insert(entry.key.clone(), entry);
    }

    // == Get ==
    /// Reads a key against the wall clock.
    ///
    /// Does not mutate the store. An `Expired` result tells the owner to
    /// schedule the removal once the current read is done.
    pub fn get(&self, key: &str) -> Lookup {
        self.get_at(key, current_timestamp_ms())
    }

    /// Reads a key as of `now`.
    pub fn get_at(&self, key: &str, now: u64) -> Lookup {
        match self.entries.get(key) {
            None => Lookup::Missing,
            Some(entry) if entry.is_expired_at(now) => Lookup::Expired,
            Some(entry) => Lookup::Hit {
                value: entry.value.clone(),
                expires_at: entry.expires_at,
            },
        }
    }

    // == Remove ==
    /// Removes an entry; absent keys are ignored.
    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Removes an entry only if it is expired at `now`.
    ///
    /// Used for deferred lazy expiration: an entry overwritten between the
    /// read that saw it expire and this call survives.
    pub fn remove_if_expired(&mut self, key: &str, now: u64) -> bool {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired_at(now));
        if expired {
            self.entries.remove(key);
        }
        expired
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // == Size ==
    /// Number of physically present entries, expired-but-unswept included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Keys ==
    /// Snapshot of every physically present key.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    // == Sweep ==
    /// Removes all entries whose expiration time is strictly before `now`.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        before - self.entries.len()
    }
}
