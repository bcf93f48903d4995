//! Fan-out Module
//!
//! Multi-key operations built from single-key requests. Every request is put
//! in flight before any response is awaited; the aggregate resolves once the
//! number of resolved requests reaches the number issued.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::cache::ttl_millis;
use crate::dispatch::{Hit, SharedCache};
use crate::error::{CacheError, Result};
use crate::participant::PendingResponse;
use crate::protocol::{Operation, RequestParams, ResponseParams};

/// Waits for every pending response, in issue order.
async fn join_all(pending: Vec<PendingResponse>) -> Result<Vec<ResponseParams>> {
    let issued = pending.len();
    let mut responses = Vec::with_capacity(issued);
    for response in pending {
        responses.push(response.await.map_err(|_| CacheError::ResponseLost)?);
    }
    debug!(issued, resolved = responses.len(), "Fan-out complete");
    Ok(responses)
}

impl SharedCache {
    // == Multi Store ==
    /// Stores every entry with the same TTL.
    ///
    /// Returns the expiration time reported for the first entry in iteration
    /// order. Entries are stored one by one, so other entries may expire a
    /// few milliseconds later.
    pub async fn multi_store<K, I>(&self, entries: I, ttl: Option<Duration>) -> Result<Option<u64>>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let participant = self.participant_only("multiStore")?;
        let ttl_ms = ttl.map(ttl_millis);

        let mut pending = Vec::new();
        for (key, value) in entries {
            let params = RequestParams {
                key: Some(key.into()),
                value: Some(value),
                ttl: ttl_ms,
            };
            pending.push(participant.submit(Operation::Store, params).await?);
        }

        let responses = join_all(pending).await?;
        Ok(responses
            .into_iter()
            .next()
            .and_then(|first| first.expiration_time))
    }

    // == Multi Read ==
    /// Reads every key; keys that are missing or expired are left out.
    pub async fn multi_read<K, I>(&self, keys: I) -> Result<HashMap<String, Hit>>
    where
        K: Into<String>,
        I: IntoIterator<Item = K>,
    {
        let participant = self.participant_only("multiRead")?;

        let mut requested = Vec::new();
        let mut pending = Vec::new();
        for key in keys {
            let key = key.into();
            pending.push(
                participant
                    .submit(Operation::Read, RequestParams::key(key.clone()))
                    .await?,
            );
            requested.push(key);
        }

        let responses = join_all(pending).await?;
        Ok(requested
            .into_iter()
            .zip(responses)
            .filter_map(|(key, response)| Hit::from_response(response).map(|hit| (key, hit)))
            .collect())
    }

    // == Multi Remove ==
    /// Removes every key, resolving once all removals are done.
    pub async fn multi_remove<K, I>(&self, keys: I) -> Result<()>
    where
        K: Into<String>,
        I: IntoIterator<Item = K>,
    {
        let participant = self.participant_only("multiRemove")?;

        let mut pending = Vec::new();
        for key in keys {
            pending.push(
                participant
                    .submit(Operation::Remove, RequestParams::key(key))
                    .await?,
            );
        }

        join_all(pending).await?;
        Ok(())
    }
}
