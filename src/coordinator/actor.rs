//! Coordinator actor
//!
//! The only owner of the cache store. Every envelope, local query, sweep and
//! setup step arrives through one mailbox and is handled to completion before
//! the next one, so the store is never touched concurrently.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{current_timestamp_ms, CacheEntry, CacheStore, Lookup};
use crate::diagnostics::Diagnostics;
use crate::protocol::{Envelope, Operation, ParticipantId, RequestParams, ResponseParams};
use crate::tasks::spawn_purge_task;

/// Messages accepted by the coordinator mailbox.
#[derive(Debug)]
pub(crate) enum Command {
    /// Encoded envelope sent by a participant
    Frame(String),
    /// Registers the outbound channel of a new participant
    Attach {
        id: ParticipantId,
        outbound: mpsc::UnboundedSender<String>,
    },
    Detach {
        id: ParticipantId,
    },
    /// Operation issued from the coordinator role itself
    Query {
        operation: Operation,
        reply: oneshot::Sender<ResponseParams>,
    },
    Setup {
        seed: Vec<CacheEntry>,
        purge_interval: Option<Duration>,
        reply: oneshot::Sender<()>,
    },
    /// Purge tick
    Sweep,
    /// Stops the purge scheduler and empties the store
    Reset {
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}

pub(crate) struct CoordinatorActor {
    store: CacheStore,
    participants: HashMap<ParticipantId, mpsc::UnboundedSender<String>>,
    /// Keys seen expired by a read, removed once that read is answered
    deferred: Vec<String>,
    purge: Option<JoinHandle<()>>,
    mailbox: mpsc::WeakUnboundedSender<Command>,
    diagnostics: Diagnostics,
}

impl CoordinatorActor {
    pub(crate) fn new(mailbox: mpsc::WeakUnboundedSender<Command>, diagnostics: Diagnostics) -> Self {
        Self {
            store: CacheStore::new(),
            participants: HashMap::new(),
            deferred: Vec::new(),
            purge: None,
            mailbox,
            diagnostics,
        }
    }

    // == Run ==
    /// Processes the mailbox until shutdown or until every sender is gone.
    pub(crate) async fn run(mut self, mut mailbox: mpsc::UnboundedReceiver<Command>) {
        info!("Coordinator started");

        while let Some(command) = mailbox.recv().await {
            if matches!(command, Command::Shutdown) {
                break;
            }
            self.handle(command);
            self.flush_deferred();
        }

        self.stop_purge();
        info!(entries = self.store.len(), "Coordinator stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Frame(frame) => self.handle_frame(frame),
            Command::Attach { id, outbound } => {
                info!(participant = id, "Participant attached");
                self.participants.insert(id, outbound);
            }
            Command::Detach { id } => {
                if self.participants.remove(&id).is_some() {
                    info!(participant = id, "Participant detached");
                }
            }
            Command::Query { operation, reply } => {
                if let Some(response) = self.execute(operation, RequestParams::default()) {
                    let _ = reply.send(response);
                }
            }
            Command::Setup {
                seed,
                purge_interval,
                reply,
            } => {
                for entry in seed {
                    self.store.insert(entry);
                }
                if let Some(interval) = purge_interval {
                    self.start_purge(interval);
                }
                let _ = reply.send(());
            }
            Command::Sweep => {
                let removed = self.store.sweep(current_timestamp_ms());
                if removed > 0 {
                    info!("Purge: removed {} expired entries", removed);
                } else {
                    debug!("Purge: no expired entries found");
                }
            }
            Command::Reset { reply } => {
                self.stop_purge();
                self.store.clear();
                self.deferred.clear();
                let _ = reply.send(());
            }
            Command::Shutdown => {}
        }
    }

    // == Inbound Envelope ==
    fn handle_frame(&mut self, frame: String) {
        self.diagnostics
            .log(format!("Coordinator received message: {}", frame));

        let mut envelope = match Envelope::decode(&frame) {
            Ok(envelope) => envelope,
            Err(err) => {
                self.diagnostics
                    .warn(format!("Dropping undecodable message: {}", err));
                return;
            }
        };

        if !envelope.is_ours() {
            return;
        }

        let params = std::mem::take(&mut envelope.request_params);
        match self.execute(envelope.operation, params) {
            Some(response) => self.reply(envelope.into_response(response)),
            None => self.diagnostics.warn(format!(
                "Received an invalid message type from participant {} (id {})",
                envelope.origin, envelope.id
            )),
        }
    }

    /// Runs one operation against the store.
    ///
    /// Returns `None` for operations this coordinator does not know.
    fn execute(&mut self, operation: Operation, params: RequestParams) -> Option<ResponseParams> {
        let mut response = ResponseParams::default();
        let key = params.key.unwrap_or_default();

        match operation {
            Operation::Read => match self.store.get(&key) {
                Lookup::Hit { value, expires_at } => {
                    response.value = Some(value);
                    response.expiration_time = expires_at;
                }
                Lookup::Expired => self.deferred.push(key),
                Lookup::Missing => {}
            },
            Operation::Store => {
                // A zero TTL means no expiration.
                let ttl = params
                    .ttl
                    .filter(|ms| *ms > 0)
                    .map(Duration::from_millis);
                let value = params.value.unwrap_or(Value::Null);
                response.expiration_time = self.store.put(key, value, ttl);
            }
            Operation::Remove => self.store.remove(&key),
            Operation::Clean => self.store.clear(),
            Operation::Size => response.size = Some(self.store.len()),
            Operation::Keys => response.keys = Some(self.store.keys()),
            Operation::Unknown => return None,
        }

        Some(response)
    }

    fn reply(&mut self, envelope: Envelope) {
        let origin = envelope.origin;
        let frame = match envelope.encode() {
            Ok(frame) => frame,
            Err(err) => {
                self.diagnostics
                    .warn(format!("Failed to encode response for {}: {}", origin, err));
                return;
            }
        };

        match self.participants.get(&origin) {
            Some(outbound) => {
                if outbound.send(frame).is_err() {
                    self.participants.remove(&origin);
                    self.diagnostics
                        .warn(format!("Participant {} is gone, response dropped", origin));
                }
            }
            None => self
                .diagnostics
                .warn(format!("No participant {} attached, response dropped", origin)),
        }
    }

    // == Deferred Expiration ==
    fn flush_deferred(&mut self) {
        if self.deferred.is_empty() {
            return;
        }
        let now = current_timestamp_ms();
        for key in std::mem::take(&mut self.deferred) {
            self.store.remove_if_expired(&key, now);
        }
    }

    // == Purge Scheduler ==
    fn start_purge(&mut self, interval: Duration) {
        self.stop_purge();
        if interval.is_zero() {
            return;
        }
        if let Some(mailbox) = self.mailbox.upgrade() {
            self.purge = Some(spawn_purge_task(mailbox, interval));
        }
    }

    fn stop_purge(&mut self) {
        if let Some(handle) = self.purge.take() {
            handle.abort();
            info!("Purge task stopped");
        }
    }
}
