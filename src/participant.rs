//! Participant Module
//!
//! A participant never touches the store. It turns each operation into an
//! envelope for the coordinator and matches responses back to the caller
//! through its correlation table.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::coordinator::Command;
use crate::diagnostics::Diagnostics;
use crate::dispatch::SharedCache;
use crate::error::{CacheError, Result};
use crate::protocol::{
    Continuation, CorrelationTable, Envelope, Operation, ParticipantId, RequestParams,
    ResponseParams,
};

/// Response that has been requested but not yet received.
pub type PendingResponse = oneshot::Receiver<ResponseParams>;

/// Handle of one participant. Clones share the same identity and table.
#[derive(Debug, Clone)]
pub struct Participant {
    inner: Arc<ParticipantInner>,
}

#[derive(Debug)]
struct ParticipantInner {
    id: ParticipantId,
    table: Arc<CorrelationTable>,
    coordinator: mpsc::UnboundedSender<Command>,
    inbound: JoinHandle<()>,
    diagnostics: Diagnostics,
}

impl Participant {
    /// Starts the inbound loop for a participant already attached to the
    /// coordinator under `id`.
    pub(crate) fn spawn(
        id: ParticipantId,
        coordinator: mpsc::UnboundedSender<Command>,
        inbound: mpsc::UnboundedReceiver<String>,
        diagnostics: Diagnostics,
    ) -> Self {
        let table = Arc::new(CorrelationTable::new());
        let inbound = tokio::spawn(receive_loop(
            id,
            inbound,
            table.clone(),
            diagnostics.clone(),
        ));

        Self {
            inner: Arc::new(ParticipantInner {
                id,
                table,
                coordinator,
                inbound,
                diagnostics,
            }),
        }
    }

    pub fn id(&self) -> ParticipantId {
        self.inner.id
    }

    /// Cache handle in the participant role.
    pub fn into_cache(self) -> SharedCache {
        let diagnostics = self.inner.diagnostics.clone();
        SharedCache::participant(self, diagnostics)
    }

    // == Send ==
    /// Sends one request to the coordinator.
    ///
    /// With a continuation the request is tracked until its response
    /// arrives; without one the response is discarded on arrival.
    pub async fn send(
        &self,
        operation: Operation,
        params: RequestParams,
        continuation: Option<Continuation>,
    ) -> Result<()> {
        let inner = &self.inner;
        let id = inner.table.next_id();
        let frame = Envelope::request(inner.id, id, operation, params).encode()?;

        let tracked = continuation.is_some();
        if let Some(continuation) = continuation {
            inner.table.register(id, continuation).await;
        }

        if inner.coordinator.send(Command::Frame(frame)).is_err() {
            if tracked {
                inner.table.forget(id).await;
            }
            return Err(CacheError::ChannelClosed);
        }

        debug!(participant = inner.id, id, operation = operation.as_str(), "Request sent");
        Ok(())
    }

    /// Sends a tracked request and returns the receiver for its response
    /// without waiting on it.
    pub async fn submit(
        &self,
        operation: Operation,
        params: RequestParams,
    ) -> Result<PendingResponse> {
        let (continuation, pending) = oneshot::channel();
        self.send(operation, params, Some(continuation)).await?;
        Ok(pending)
    }

    /// Sends a tracked request and waits for its response.
    pub async fn request(
        &self,
        operation: Operation,
        params: RequestParams,
    ) -> Result<ResponseParams> {
        let pending = self.submit(operation, params).await?;
        pending.await.map_err(|_| CacheError::ResponseLost)
    }

    /// Number of requests sent but not answered yet.
    pub async fn pending_requests(&self) -> usize {
        self.inner.table.pending().await
    }
}

impl Drop for ParticipantInner {
    fn drop(&mut self) {
        self.inbound.abort();
        let _ = self.coordinator.send(Command::Detach { id: self.id });
    }
}

// == Inbound ==
/// Matches coordinator responses to pending requests until the coordinator
/// goes away, then fails whatever is still pending.
async fn receive_loop(
    id: ParticipantId,
    mut inbound: mpsc::UnboundedReceiver<String>,
    table: Arc<CorrelationTable>,
    diagnostics: Diagnostics,
) {
    while let Some(frame) = inbound.recv().await {
        diagnostics.log(format!("Participant {} received message: {}", id, frame));

        let envelope = match Envelope::decode(&frame) {
            Ok(envelope) => envelope,
            Err(_) => continue,
        };
        if !envelope.is_ours() || envelope.origin != id {
            continue;
        }

        let response = envelope.response_params.unwrap_or_default();
        if !table.resolve(envelope.id, response).await {
            debug!(participant = id, id = envelope.id, "Unmatched response dropped");
        }
    }

    let abandoned = table.abandon_all().await;
    if abandoned > 0 {
        debug!(participant = id, abandoned, "Coordinator gone, pending requests dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Participant wired to a bare mailbox, standing in for the coordinator.
    fn detached_participant() -> (
        Participant,
        mpsc::UnboundedReceiver<Command>,
        mpsc::UnboundedSender<String>,
    ) {
        let (coordinator, mailbox) = mpsc::unbounded_channel();
        let (outbound, inbound) = mpsc::unbounded_channel();
        let participant = Participant::spawn(7, coordinator, inbound, Diagnostics::default());
        (participant, mailbox, outbound)
    }

    async fn next_request(mailbox: &mut mpsc::UnboundedReceiver<Command>) -> Envelope {
        match mailbox.recv().await {
            Some(Command::Frame(frame)) => Envelope::decode(&frame).unwrap(),
            other => panic!("expected a frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_assigns_increasing_ids() {
        let (participant, mut mailbox, _outbound) = detached_participant();

        participant
            .send(Operation::Size, RequestParams::default(), None)
            .await
            .unwrap();
        participant
            .send(Operation::Keys, RequestParams::default(), None)
            .await
            .unwrap();

        let first = next_request(&mut mailbox).await;
        let second = next_request(&mut mailbox).await;
        assert_eq!((first.origin, first.id), (7, 0));
        assert_eq!((second.origin, second.id), (7, 1));
        assert_eq!(participant.pending_requests().await, 0, "untracked sends");
    }

    #[tokio::test]
    async fn test_response_resolves_matching_request() {
        let (participant, mut mailbox, outbound) = detached_participant();

        let pending = participant
            .submit(Operation::Read, RequestParams::key("k"))
            .await
            .unwrap();
        assert_eq!(participant.pending_requests().await, 1);

        let request = next_request(&mut mailbox).await;
        let response = request.into_response(ResponseParams {
            value: Some(json!("v")),
            ..ResponseParams::default()
        });
        outbound.send(response.encode().unwrap()).unwrap();

        assert_eq!(pending.await.unwrap().value, Some(json!("v")));
        assert_eq!(participant.pending_requests().await, 0);
    }

    #[tokio::test]
    async fn test_foreign_and_stale_responses_are_ignored() {
        let (participant, mut mailbox, outbound) = detached_participant();

        let pending = participant
            .submit(Operation::Size, RequestParams::default())
            .await
            .unwrap();
        let request = next_request(&mut mailbox).await;

        let mut foreign = request.clone().into_response(ResponseParams {
            size: Some(99),
            ..ResponseParams::default()
        });
        foreign.origin = 8;
        outbound.send(foreign.encode().unwrap()).unwrap();

        let mut stale = foreign.clone();
        stale.origin = 7;
        stale.id = 42;
        outbound.send(stale.encode().unwrap()).unwrap();
        outbound.send("noise".to_string()).unwrap();

        let answer = request.into_response(ResponseParams {
            size: Some(3),
            ..ResponseParams::default()
        });
        outbound.send(answer.encode().unwrap()).unwrap();
        outbound.send(answer.encode().unwrap()).unwrap();

        assert_eq!(pending.await.unwrap().size, Some(3));
        assert_eq!(participant.pending_requests().await, 0);
    }

    #[tokio::test]
    async fn test_closed_coordinator_fails_send() {
        let (participant, mailbox, _outbound) = detached_participant();
        drop(mailbox);

        let result = participant
            .request(Operation::Size, RequestParams::default())
            .await;

        assert!(matches!(result, Err(CacheError::ChannelClosed)));
        assert_eq!(participant.pending_requests().await, 0);
    }

    #[tokio::test]
    async fn test_lost_coordinator_fails_pending() {
        let (participant, _mailbox, outbound) = detached_participant();

        let pending = participant
            .submit(Operation::Size, RequestParams::default())
            .await
            .unwrap();
        drop(outbound);

        assert!(pending.await.is_err());
    }

    #[tokio::test]
    async fn test_drop_detaches() {
        let (participant, mut mailbox, _outbound) = detached_participant();

        drop(participant);

        assert!(matches!(
            mailbox.recv().await,
            Some(Command::Detach { id: 7 })
        ));
    }
}
