use super::feed::EntrySource;
use super::models::{CalendarEntry, RemoteEvent, SyncReport};
use super::store::ScheduledEventStore;
use crate::error::BotResult;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, info};

/// Run one full pass: fetch the feed, list remote events, reconcile.
///
/// Fetch and listing failures abort the pass before any remote write.
pub async fn run_pass(
    source: &dyn EntrySource,
    store: &dyn ScheduledEventStore,
    now: DateTime<Utc>,
) -> BotResult<SyncReport> {
    let entries = source.fetch_entries().await?;
    let existing = store.list().await?;

    let report = reconcile(&entries, existing, store, now).await;
    info!(
        "Calendar sync complete: {} entries, {} created, {} updated, {} deleted, {} failed",
        report.entries, report.created, report.updated, report.deleted, report.failed
    );
    Ok(report)
}

/// Diff `entries` against `existing` and apply creates, updates and deletes.
///
/// Only events carrying a marker are considered. Each remote call is
/// isolated: failures are logged, counted and skipped.
pub async fn reconcile(
    entries: &[CalendarEntry],
    existing: Vec<RemoteEvent>,
    store: &dyn ScheduledEventStore,
    now: DateTime<Utc>,
) -> SyncReport {
    let mut report = SyncReport {
        entries: entries.len(),
        ..SyncReport::default()
    };

    let fetched = existing.len();
    let mut index: HashMap<String, RemoteEvent> = existing
        .into_iter()
        .filter_map(|event| event.key().map(|key| (key, event)))
        .collect();
    report.managed = index.len();

    info!(
        "Fetched {} existing events, {} matched by description",
        fetched, report.managed
    );

    for entry in entries {
        if entry.start < now {
            debug!(
                "Skipping past-start event: {} at {}",
                entry.name,
                entry.start.to_rfc3339()
            );
            report.skipped_past += 1;
            continue;
        }

        let matched = index
            .get(&entry.key)
            .map(|remote| (remote.id, remote.needs_update(entry)));

        match matched {
            None => {
                info!("Creating event: {}", entry.name);
                match store.create(entry).await {
                    Ok(created) => {
                        // Later entries with the same key see the new event
                        index.insert(entry.key.clone(), created);
                        report.created += 1;
                    }
                    Err(e) => {
                        error!("Failed to create scheduled event {}: {}", entry.name, e);
                        report.failed += 1;
                    }
                }
            }
            Some((id, true)) => {
                info!("Updating event: {}", entry.name);
                match store.update(id, entry).await {
                    Ok(updated) => {
                        index.insert(entry.key.clone(), updated);
                        report.updated += 1;
                    }
                    Err(e) => {
                        error!("Failed to update scheduled event {}: {}", id, e);
                        report.failed += 1;
                    }
                }
            }
            Some((_, false)) => {
                debug!("No changes for: {}", entry.name);
                report.unchanged += 1;
            }
        }
    }

    let known_keys: HashSet<&str> = entries.iter().map(|e| e.key.as_str()).collect();
    for (key, event) in &index {
        if known_keys.contains(key.as_str()) {
            continue;
        }
        info!(
            "Deleting event no longer in calendar: {} ({})",
            event.name, event.id
        );
        match store.delete(event.id).await {
            Ok(()) => report.deleted += 1,
            Err(e) => {
                error!("Failed to delete scheduled event {}: {}", event.id, e);
                report.failed += 1;
            }
        }
    }

    report
}
