use super::models::{CalendarEntry, RemoteEvent};
use crate::error::{calendar_error, BotResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// The remote set of scheduled events a pass reconciles against
#[async_trait]
pub trait ScheduledEventStore: Send + Sync {
    /// List every scheduled event, managed or not
    async fn list(&self) -> BotResult<Vec<RemoteEvent>>;

    /// Create an event mirroring `entry`
    async fn create(&self, entry: &CalendarEntry) -> BotResult<RemoteEvent>;

    /// Overwrite the mirrored fields of event `id` with `entry`
    async fn update(&self, id: u64, entry: &CalendarEntry) -> BotResult<RemoteEvent>;

    /// Delete event `id`
    async fn delete(&self, id: u64) -> BotResult<()>;
}

/// Scheduled events of a Discord guild
#[derive(Clone)]
pub struct GuildEventStore {
    http: Arc<serenity::Http>,
    guild_id: serenity::GuildId,
}

impl GuildEventStore {
    pub fn new(http: Arc<serenity::Http>, guild_id: u64) -> Self {
        Self {
            http,
            guild_id: serenity::GuildId::new(guild_id),
        }
    }
}

#[async_trait]
impl ScheduledEventStore for GuildEventStore {
    async fn list(&self) -> BotResult<Vec<RemoteEvent>> {
        let events = self.guild_id.scheduled_events(&*self.http, false).await?;
        Ok(events.into_iter().map(to_remote_event).collect())
    }

    async fn create(&self, entry: &CalendarEntry) -> BotResult<RemoteEvent> {
        let builder = serenity::CreateScheduledEvent::new(
            serenity::ScheduledEventType::External,
            &entry.name,
            to_timestamp(entry.start)?,
        )
        .description(&entry.description)
        .end_time(to_timestamp(entry.end)?)
        .location(&entry.location);

        let created = self
            .guild_id
            .create_scheduled_event(&*self.http, builder)
            .await?;
        Ok(to_remote_event(created))
    }

    async fn update(&self, id: u64, entry: &CalendarEntry) -> BotResult<RemoteEvent> {
        let builder = serenity::EditScheduledEvent::new()
            .name(&entry.name)
            .description(&entry.description)
            .start_time(to_timestamp(entry.start)?)
            .end_time(to_timestamp(entry.end)?)
            .location(&entry.location);

        let updated = self
            .guild_id
            .edit_scheduled_event(&*self.http, serenity::ScheduledEventId::new(id), builder)
            .await?;
        Ok(to_remote_event(updated))
    }

    async fn delete(&self, id: u64) -> BotResult<()> {
        self.guild_id
            .delete_scheduled_event(&*self.http, serenity::ScheduledEventId::new(id))
            .await?;
        Ok(())
    }
}

fn to_remote_event(event: serenity::ScheduledEvent) -> RemoteEvent {
    RemoteEvent {
        id: event.id.get(),
        name: event.name,
        description: event.description,
        location: event.metadata.and_then(|m| m.location),
        start: from_timestamp(event.start_time),
        end: event.end_time.map(from_timestamp),
    }
}

fn to_timestamp(dt: DateTime<Utc>) -> BotResult<serenity::Timestamp> {
    serenity::Timestamp::from_unix_timestamp(dt.timestamp())
        .map_err(|e| calendar_error(&format!("Invalid event time {}: {}", dt, e)))
}

fn from_timestamp(ts: serenity::Timestamp) -> DateTime<Utc> {
    DateTime::from_timestamp(ts.unix_timestamp(), 0).unwrap_or_default()
}
