use super::feed::EntrySource;
use super::models::SyncReport;
use super::reconcile::run_pass;
use super::store::ScheduledEventStore;
use crate::error::BotResult;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Commands that can be sent to the calendar sync actor
pub enum CalendarSyncCommand {
    RunOnce(mpsc::Sender<BotResult<SyncReport>>),
    Shutdown,
}

/// The calendar sync actor: runs passes one at a time
pub struct CalendarSyncActor {
    source: Box<dyn EntrySource>,
    store: Arc<dyn ScheduledEventStore>,
    in_progress: Arc<AtomicBool>,
    command_rx: mpsc::Receiver<CalendarSyncCommand>,
}

impl CalendarSyncActor {
    /// Create a new actor and the sender for its mailbox
    pub fn new(
        source: Box<dyn EntrySource>,
        store: Arc<dyn ScheduledEventStore>,
        in_progress: Arc<AtomicBool>,
    ) -> (Self, mpsc::Sender<CalendarSyncCommand>) {
        let (command_tx, command_rx) = mpsc::channel(8);

        let actor = Self {
            source,
            store,
            in_progress,
            command_rx,
        };

        (actor, command_tx)
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Calendar sync actor started");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                CalendarSyncCommand::RunOnce(response_tx) => {
                    let result = run_pass(self.source.as_ref(), self.store.as_ref(), Utc::now()).await;
                    if let Err(e) = &result {
                        error!("Calendar sync error: {}", e);
                    }
                    // The pass is over whether or not anyone still waits for it
                    self.in_progress.store(false, Ordering::SeqCst);
                    let _ = response_tx.send(result).await;
                }
                CalendarSyncCommand::Shutdown => {
                    info!("Calendar sync actor shutting down");
                    break;
                }
            }
        }

        info!("Calendar sync actor shut down");
    }
}
