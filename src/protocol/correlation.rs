//! Correlation table
//!
//! Tracks the requests a participant has in flight, keyed by correlation id,
//! so responses arriving in any order reach the caller that caused them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{oneshot, Mutex};

use super::envelope::{CorrelationId, ResponseParams};

/// Continuation completed when the matching response arrives.
pub type Continuation = oneshot::Sender<ResponseParams>;

#[derive(Debug, Default)]
pub struct CorrelationTable {
    next_id: AtomicU64,
    pending: Mutex<HashMap<CorrelationId, Continuation>>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next correlation id. Ids are never reused.
    pub fn next_id(&self) -> CorrelationId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Registers a continuation under `id`.
    pub async fn register(&self, id: CorrelationId, continuation: Continuation) {
        self.pending.lock().await.insert(id, continuation);
    }

    /// Removes and completes the continuation for `id`.
    ///
    /// Returns false when nothing was waiting on `id` (stale, duplicate or
    /// never registered).
    pub async fn resolve(&self, id: CorrelationId, response: ResponseParams) -> bool {
        let continuation = self.pending.lock().await.remove(&id);
        match continuation {
            // The caller may have stopped waiting; the entry is consumed either way.
            Some(continuation) => {
                let _ = continuation.send(response);
                true
            }
            None => false,
        }
    }

    /// Drops the continuation for `id` without completing it.
    pub async fn forget(&self, id: CorrelationId) {
        self.pending.lock().await.remove(&id);
    }

    /// Drops every pending continuation, failing their callers.
    ///
    /// Called once no response can arrive any more.
    pub async fn abandon_all(&self) -> usize {
        let mut pending = self.pending.lock().await;
        let count = pending.len();
        pending.clear();
        count
    }

    /// Number of requests still waiting on a response.
    pub async fn pending(&self) -> usize {
        self.pending.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_are_monotonic() {
        let table = CorrelationTable::new();
        let ids: Vec<_> = (0..5).map(|_| table.next_id()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_resolve_completes_once() {
        let table = CorrelationTable::new();
        let (tx, rx) = oneshot::channel();
        let id = table.next_id();
        table.register(id, tx).await;

        let response = ResponseParams {
            value: Some(json!("v")),
            ..ResponseParams::default()
        };
        assert!(table.resolve(id, response.clone()).await);
        assert!(!table.resolve(id, response.clone()).await, "second delivery is dropped");

        assert_eq!(rx.await.unwrap(), response);
        assert_eq!(table.pending().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_id_is_ignored() {
        let table = CorrelationTable::new();
        assert!(!table.resolve(99, ResponseParams::default()).await);
    }

    #[tokio::test]
    async fn test_out_of_order_responses() {
        let table = CorrelationTable::new();
        let (tx_a, rx_a) = oneshot::channel();
        let (tx_b, rx_b) = oneshot::channel();
        let a = table.next_id();
        let b = table.next_id();
        table.register(a, tx_a).await;
        table.register(b, tx_b).await;
        assert_eq!(table.pending().await, 2);

        table
            .resolve(b, ResponseParams { size: Some(2), ..Default::default() })
            .await;
        table
            .resolve(a, ResponseParams { size: Some(1), ..Default::default() })
            .await;

        assert_eq!(rx_a.await.unwrap().size, Some(1));
        assert_eq!(rx_b.await.unwrap().size, Some(2));
    }

    #[tokio::test]
    async fn test_abandon_all_fails_waiters() {
        let table = CorrelationTable::new();
        let (tx_a, rx_a) = oneshot::channel();
        let (tx_b, rx_b) = oneshot::channel();
        table.register(table.next_id(), tx_a).await;
        table.register(table.next_id(), tx_b).await;

        assert_eq!(table.abandon_all().await, 2);

        assert!(rx_a.await.is_err());
        assert!(rx_b.await.is_err());
    }

    #[tokio::test]
    async fn test_forget_drops_continuation() {
        let table = CorrelationTable::new();
        let (tx, rx) = oneshot::channel();
        table.register(0, tx).await;

        table.forget(0).await;

        assert!(rx.await.is_err());
        assert_eq!(table.pending().await, 0);
    }
}
