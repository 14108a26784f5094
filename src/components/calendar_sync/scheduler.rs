use super::handle::{CalendarSyncHandle, SyncOutcome};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Run a pass now and then every `interval_minutes` until `cancel` fires
pub fn start_scheduler(
    handle: CalendarSyncHandle,
    interval_minutes: u64,
    cancel: CancellationToken,
) {
    let period = Duration::from_secs(interval_minutes.max(1) * 60);

    tokio::spawn(async move {
        // First tick completes immediately
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Calendar sync scheduler stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match handle.trigger().await {
                        Ok(SyncOutcome::Completed(_)) => {}
                        Ok(SyncOutcome::AlreadyRunning) => {
                            warn!("Skipping scheduled calendar sync, a pass is still running");
                        }
                        Ok(SyncOutcome::Stopped) => break,
                        Err(e) => error!("Scheduled calendar sync failed: {}", e),
                    }
                }
            }
        }
    });

    info!("Calendar sync scheduled every {} minute(s)", interval_minutes.max(1));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::calendar_sync::{
        CalendarEntry, EntrySource, RemoteEvent, ScheduledEventStore,
    };
    use crate::error::{calendar_error, BotResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::sleep;

    struct CountingSource {
        passes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EntrySource for CountingSource {
        async fn fetch_entries(&self) -> BotResult<Vec<CalendarEntry>> {
            self.passes.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    struct NoEvents;

    #[async_trait]
    impl ScheduledEventStore for NoEvents {
        async fn list(&self) -> BotResult<Vec<RemoteEvent>> {
            Ok(Vec::new())
        }

        async fn create(&self, _entry: &CalendarEntry) -> BotResult<RemoteEvent> {
            Err(calendar_error("unexpected create"))
        }

        async fn update(&self, _id: u64, _entry: &CalendarEntry) -> BotResult<RemoteEvent> {
            Err(calendar_error("unexpected update"))
        }

        async fn delete(&self, _id: u64) -> BotResult<()> {
            Err(calendar_error("unexpected delete"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_now_then_every_minute_until_cancelled() {
        let passes = Arc::new(AtomicUsize::new(0));
        let handle = CalendarSyncHandle::new(
            Box::new(CountingSource {
                passes: Arc::clone(&passes),
            }),
            Arc::new(NoEvents),
        );
        let cancel = CancellationToken::new();

        // Zero minutes is clamped to one
        start_scheduler(handle, 0, cancel.clone());

        sleep(Duration::from_secs(1)).await;
        assert_eq!(passes.load(Ordering::SeqCst), 1);

        sleep(Duration::from_secs(30)).await;
        assert_eq!(passes.load(Ordering::SeqCst), 1);

        sleep(Duration::from_secs(30)).await;
        assert_eq!(passes.load(Ordering::SeqCst), 2);

        cancel.cancel();
        sleep(Duration::from_secs(600)).await;
        assert_eq!(passes.load(Ordering::SeqCst), 2);
    }
}
