mod actor;
pub mod feed;
mod handle;
pub mod models;
pub mod reconcile;
mod scheduler;
pub mod store;
pub mod time;

pub use feed::{EntrySource, IcsFeed};
pub use handle::{CalendarSyncHandle, SyncOutcome};
pub use models::{CalendarEntry, RemoteEvent, SyncReport};
pub use store::{GuildEventStore, ScheduledEventStore};

use crate::config::Config;
use crate::error::BotResult;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use scheduler::start_scheduler;

/// Mirrors an ICS feed into the guild's scheduled events
#[derive(Default)]
pub struct CalendarSync {
    handle: RwLock<Option<CalendarSyncHandle>>,
    cancel: CancellationToken,
}

impl CalendarSync {
    /// Create a new calendar sync component
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the handle if the sync is running
    pub async fn get_handle(&self) -> Option<CalendarSyncHandle> {
        let handle_lock = self.handle.read().await;
        handle_lock.clone()
    }

    /// Install `handle` as the running sync.
    ///
    /// With `interval_minutes` set, a pass runs now and then periodically;
    /// with `None` passes only run when triggered.
    pub async fn start(
        &self,
        handle: CalendarSyncHandle,
        interval_minutes: Option<u64>,
    ) -> CalendarSyncHandle {
        let mut handle_lock = self.handle.write().await;
        if let Some(existing) = handle_lock.as_ref() {
            return existing.clone();
        }

        if let Some(minutes) = interval_minutes {
            start_scheduler(handle.clone(), minutes, self.cancel.clone());
        }
        *handle_lock = Some(handle.clone());
        handle
    }
}

#[async_trait]
impl super::Component for CalendarSync {
    fn name(&self) -> &'static str {
        "calendar_sync"
    }

    async fn init(&self, ctx: &serenity::Context, config: Arc<RwLock<Config>>) -> BotResult<()> {
        let config = config.read().await;
        let Some(ics_url) = config.calendar_ics_url.clone() else {
            warn!("Calendar sync disabled: set CALENDAR_ICS_URL and GUILD_ID.");
            return Ok(());
        };

        info!("Starting calendar sync for guild {}", config.guild_id);
        let feed = IcsFeed::new(reqwest::Client::new(), ics_url, config.timezone);
        let store = GuildEventStore::new(Arc::clone(&ctx.http), config.guild_id);
        let handle = CalendarSyncHandle::new(Box::new(feed), Arc::new(store));
        self.start(handle, Some(config.calendar_sync_interval_minutes))
            .await;

        Ok(())
    }

    async fn shutdown(&self) -> BotResult<()> {
        self.cancel.cancel();
        let handle_lock = self.handle.read().await;
        if let Some(handle) = &*handle_lock {
            handle.shutdown().await?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
