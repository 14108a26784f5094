use super::actor::{CalendarSyncActor, CalendarSyncCommand};
use super::feed::EntrySource;
use super::models::SyncReport;
use super::store::ScheduledEventStore;
use crate::error::{calendar_error, BotResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// What happened to a sync request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A pass ran to completion
    Completed(SyncReport),
    /// Another pass was running; nothing was done
    AlreadyRunning,
    /// The sync has been stopped
    Stopped,
}

/// Handle for interacting with the calendar sync actor
#[derive(Clone)]
pub struct CalendarSyncHandle {
    command_tx: mpsc::Sender<CalendarSyncCommand>,
    in_progress: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    _actor_task: Arc<JoinHandle<()>>,
}

impl CalendarSyncHandle {
    /// Create a new handle and spawn the actor
    pub fn new(source: Box<dyn EntrySource>, store: Arc<dyn ScheduledEventStore>) -> Self {
        let in_progress = Arc::new(AtomicBool::new(false));
        let (mut actor, command_tx) =
            CalendarSyncActor::new(source, store, Arc::clone(&in_progress));

        let actor_task = tokio::spawn(async move {
            actor.run().await;
        });

        Self {
            command_tx,
            in_progress,
            stopped: Arc::new(AtomicBool::new(false)),
            _actor_task: Arc::new(actor_task),
        }
    }

    /// Run a pass unless one is already running.
    ///
    /// A pass-level failure (feed or listing) is returned as an error.
    pub async fn trigger(&self) -> BotResult<SyncOutcome> {
        if self.stopped.load(Ordering::SeqCst) {
            return Ok(SyncOutcome::Stopped);
        }
        if self.in_progress.swap(true, Ordering::SeqCst) {
            return Ok(SyncOutcome::AlreadyRunning);
        }

        let (response_tx, mut response_rx) = mpsc::channel(1);
        if let Err(e) = self
            .command_tx
            .send(CalendarSyncCommand::RunOnce(response_tx))
            .await
        {
            self.in_progress.store(false, Ordering::SeqCst);
            return Err(calendar_error(&format!("Actor mailbox error: {}", e)));
        }

        let report = response_rx
            .recv()
            .await
            .ok_or_else(|| calendar_error("Response channel closed"))??;

        Ok(SyncOutcome::Completed(report))
    }

    /// Whether a pass is currently running
    pub fn is_running(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Stop accepting passes and shut the actor down
    pub async fn shutdown(&self) -> BotResult<()> {
        self.stopped.store(true, Ordering::SeqCst);
        let _ = self.command_tx.send(CalendarSyncCommand::Shutdown).await;
        Ok(())
    }
}
