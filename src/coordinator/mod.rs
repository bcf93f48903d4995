//! Coordinator Module
//!
//! Starts the actor that owns the authoritative store, hands out participant
//! handles and exposes the coordinator-only setup and reset operations.

mod actor;
mod setup;

use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::diagnostics::Diagnostics;
use crate::dispatch::SharedCache;
use crate::error::{CacheError, Result};
use crate::participant::Participant;
use crate::protocol::{Operation, ParticipantId, ResponseParams};

pub(crate) use actor::Command;
pub use setup::{SeedEntry, SetupOptions};

use actor::CoordinatorActor;

// == Coordinator Handle ==
/// Cheap handle used by the coordinator-role dispatcher to reach the actor.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    mailbox: mpsc::UnboundedSender<Command>,
}

impl CoordinatorHandle {
    /// Runs a read-only operation against the local store.
    pub(crate) async fn query(&self, operation: Operation) -> Result<ResponseParams> {
        let (reply, rx) = oneshot::channel();
        self.mailbox
            .send(Command::Query { operation, reply })
            .map_err(|_| CacheError::ChannelClosed)?;
        rx.await.map_err(|_| CacheError::ResponseLost)
    }

    pub(crate) async fn reset(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.mailbox
            .send(Command::Reset { reply })
            .map_err(|_| CacheError::ChannelClosed)?;
        rx.await.map_err(|_| CacheError::ResponseLost)
    }
}

// == Coordinator ==
/// Owner of the shared cache.
///
/// Must be created inside a tokio runtime. Dropping it stops the actor and
/// the purge scheduler; participant operations then fail with
/// [`CacheError::ChannelClosed`].
#[derive(Debug)]
pub struct Coordinator {
    handle: CoordinatorHandle,
    actor: Option<JoinHandle<()>>,
    next_participant: AtomicU32,
    diagnostics: Diagnostics,
}

impl Coordinator {
    // == Start ==
    /// Spawns the coordinator actor and applies `options`.
    pub async fn start(options: SetupOptions) -> Result<Self> {
        let (mailbox, receiver) = mpsc::unbounded_channel();
        let diagnostics = Diagnostics::default();
        let actor = CoordinatorActor::new(mailbox.downgrade(), diagnostics.clone());
        let actor = tokio::spawn(actor.run(receiver));

        let mut coordinator = Self {
            handle: CoordinatorHandle { mailbox },
            actor: Some(actor),
            next_participant: AtomicU32::new(1),
            diagnostics,
        };
        coordinator.setup(options).await?;
        Ok(coordinator)
    }

    // == Setup ==
    /// Seeds mock data, installs the logger and (re)starts the purge
    /// scheduler when an interval is given. May be called more than once.
    ///
    /// The logger is swapped in place, so participants and cache handles
    /// created before this call report to it as well.
    pub async fn setup(&mut self, options: SetupOptions) -> Result<()> {
        if let Some(logger) = options.logger {
            self.diagnostics.replace(logger);
        }

        let seed: Vec<_> = options
            .mock_data
            .into_iter()
            .map(SeedEntry::into_entry)
            .collect();
        info!(
            seeded = seed.len(),
            purge_interval = ?options.purge_interval,
            "Coordinator setup"
        );

        let (reply, rx) = oneshot::channel();
        self.handle
            .mailbox
            .send(Command::Setup {
                seed,
                purge_interval: options.purge_interval,
                reply,
            })
            .map_err(|_| CacheError::ChannelClosed)?;
        rx.await.map_err(|_| CacheError::ResponseLost)
    }

    // == Attach ==
    /// Creates a participant connected to this coordinator.
    ///
    /// The participant shares the coordinator's diagnostic sink.
    pub fn attach(&self) -> Result<Participant> {
        let id: ParticipantId = self.next_participant.fetch_add(1, Ordering::Relaxed);
        let (outbound, inbound) = mpsc::unbounded_channel();

        self.handle
            .mailbox
            .send(Command::Attach { id, outbound })
            .map_err(|_| CacheError::ChannelClosed)?;

        Ok(Participant::spawn(
            id,
            self.handle.mailbox.clone(),
            inbound,
            self.diagnostics.clone(),
        ))
    }

    /// Cache handle in the coordinator role.
    pub fn cache(&self) -> SharedCache {
        SharedCache::coordinator(self.handle.clone(), self.diagnostics.clone())
    }

    // == Reset ==
    /// Stops the purge scheduler and empties the store.
    pub async fn reset(&self) -> Result<()> {
        self.handle.reset().await
    }

    // == Shutdown ==
    /// Stops the actor and waits for it to finish.
    pub async fn shutdown(mut self) {
        let _ = self.handle.mailbox.send(Command::Shutdown);
        if let Some(actor) = self.actor.take() {
            if let Err(err) = actor.await {
                warn!("Coordinator task ended abnormally: {}", err);
            }
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        if self.actor.is_some() {
            let _ = self.handle.mailbox.send(Command::Shutdown);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::diagnostics::RecordingSink;

    #[tokio::test]
    async fn test_start_with_mock_data() {
        let coordinator = Coordinator::start(SetupOptions::default().with_mock_data(vec![
            SeedEntry::new("mock1", json!(1)),
            SeedEntry::new("mock2", json!(2)).with_ttl(Duration::from_secs(60)),
        ]))
        .await
        .unwrap();

        assert_eq!(coordinator.cache().size().await.unwrap(), 2);
        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn test_attach_assigns_distinct_ids() {
        let coordinator = Coordinator::start(SetupOptions::default()).await.unwrap();

        let first = coordinator.attach().unwrap();
        let second = coordinator.attach().unwrap();

        assert_ne!(first.id(), second.id());
    }

    #[tokio::test]
    async fn test_setup_logger_is_used_by_new_participants() {
        let mut coordinator = Coordinator::start(SetupOptions::default()).await.unwrap();
        let sink = Arc::new(RecordingSink::default());
        coordinator
            .setup(SetupOptions::default().with_logger(sink.clone()))
            .await
            .unwrap();
        assert!(sink.logs.lock().unwrap().is_empty());

        let cache = coordinator.attach().unwrap().into_cache();
        cache.store("user8", json!({"n": 8}), None).await.unwrap();

        let logs = sink.logs.lock().unwrap();
        assert_eq!(logs.len(), 2, "one line per side: {:?}", *logs);
        assert!(logs[0].starts_with("Coordinator received message"));
        assert!(logs[1].starts_with("Participant"));
    }

    #[tokio::test]
    async fn test_setup_logger_reaches_existing_handles() {
        let mut coordinator = Coordinator::start(SetupOptions::default()).await.unwrap();
        let cache = coordinator.attach().unwrap().into_cache();
        let local = coordinator.cache();

        let sink = Arc::new(RecordingSink::default());
        coordinator
            .setup(SetupOptions::default().with_logger(sink.clone()))
            .await
            .unwrap();

        cache.store("user8", json!({"n": 8}), None).await.unwrap();
        assert!(local.read("user8").await.is_err());

        let logs = sink.logs.lock().unwrap();
        assert_eq!(logs.len(), 2, "one line per side: {:?}", *logs);
        assert!(logs[0].starts_with("Coordinator received message"));
        assert!(logs[1].starts_with("Participant"));
        assert_eq!(sink.warnings.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_clears_store() {
        let coordinator = Coordinator::start(
            SetupOptions::default().with_mock_data(vec![SeedEntry::new("k", json!(1))]),
        )
        .await
        .unwrap();

        coordinator.reset().await.unwrap();

        assert_eq!(coordinator.cache().size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_operations_fail_after_shutdown() {
        let coordinator = Coordinator::start(SetupOptions::default()).await.unwrap();
        let participant = coordinator.attach().unwrap().into_cache();
        let local = coordinator.cache();

        coordinator.shutdown().await;

        assert!(matches!(
            participant.read("k").await,
            Err(CacheError::ChannelClosed)
        ));
        assert!(matches!(local.size().await, Err(CacheError::ChannelClosed)));
    }
}
