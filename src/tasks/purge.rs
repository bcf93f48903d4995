//! Purge Task
//!
//! Background task that periodically asks the coordinator to sweep expired
//! entries. Reads only remove what they observe, so entries nobody reads
//! again are reclaimed here.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::coordinator::Command;

/// Spawns a background task that sends a sweep to the coordinator mailbox
/// every `interval`.
///
/// The sweep itself runs inside the coordinator, which owns the store. The
/// task ends on its own once the mailbox is closed; otherwise the returned
/// handle is aborted by reset or shutdown.
pub(crate) fn spawn_purge_task(
    mailbox: mpsc::UnboundedSender<Command>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting purge task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            if mailbox.send(Command::Sweep).is_err() {
                debug!("Coordinator mailbox closed, purge task exiting");
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_purge_task_ticks_at_interval() {
        let (mailbox, mut receiver) = mpsc::unbounded_channel();
        let handle = spawn_purge_task(mailbox, Duration::from_millis(50));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(receiver.try_recv().is_err(), "no sweep before the first tick");

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(matches!(receiver.try_recv(), Ok(Command::Sweep)));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(matches!(receiver.try_recv(), Ok(Command::Sweep)));

        handle.abort();
    }

    #[tokio::test]
    async fn test_purge_task_exits_when_mailbox_closes() {
        let (mailbox, receiver) = mpsc::unbounded_channel();
        let handle = spawn_purge_task(mailbox, Duration::from_millis(5));

        drop(receiver);

        tokio_test::assert_ok!(handle.await);
    }

    #[tokio::test]
    async fn test_purge_task_can_be_aborted() {
        let (mailbox, _receiver) = mpsc::unbounded_channel();
        let handle = spawn_purge_task(mailbox, Duration::from_secs(1));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
