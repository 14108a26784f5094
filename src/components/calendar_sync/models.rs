use crate::utils::text::truncate_chars;
use chrono::{DateTime, Duration, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

/// Location used when a feed entry or scheduled event has none
pub const DEFAULT_LOCATION: &str = "External";

/// Name used when a feed entry has no summary
pub const DEFAULT_NAME: &str = "Untitled Event";

/// Discord's limit for scheduled event descriptions
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

lazy_static! {
    static ref MARKER_RE: Regex = Regex::new(r"(?i)\|\|icsId:(.+)\|\|").unwrap();
}

/// A feed entry reduced to the fields mirrored into a scheduled event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEntry {
    /// Stable identifier, embedded in the event description as a marker
    pub key: String,
    pub name: String,
    /// Managed description, already carrying the marker
    pub description: String,
    pub location: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CalendarEntry {
    /// Build an entry, applying the end-time and description rules.
    ///
    /// A missing end, or one that does not come after `start`, becomes
    /// `start + 1h`.
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        base_description: Option<&str>,
        location: Option<&str>,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        rsvp_url: Option<&str>,
    ) -> Self {
        let key = key.into();
        let end = match end {
            Some(end) if end > start => end,
            _ => start + Duration::hours(1),
        };
        let description = build_description(base_description, &key, rsvp_url);
        let location = location
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LOCATION)
            .to_string();

        Self {
            key,
            name: name.into(),
            description,
            location,
            start,
            end,
        }
    }
}

/// A guild scheduled event as seen by the reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEvent {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl RemoteEvent {
    /// The feed key recovered from the description marker.
    ///
    /// `None` means the event is not managed by the sync.
    pub fn key(&self) -> Option<String> {
        self.description.as_deref().and_then(extract_key)
    }

    /// Whether any mirrored field differs from `target`
    pub fn needs_update(&self, target: &CalendarEntry) -> bool {
        let start_changed = self.start.timestamp() != target.start.timestamp();
        let end_changed =
            self.end.map(|e| e.timestamp()).unwrap_or(0) != target.end.timestamp();
        let name_changed = self.name != target.name;
        let desc_changed = self.description.as_deref().unwrap_or("") != target.description;
        let loc_changed =
            self.location.as_deref().unwrap_or(DEFAULT_LOCATION) != target.location;

        start_changed || end_changed || name_changed || desc_changed || loc_changed
    }
}

/// Outcome counters for one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Entries read from the feed
    pub entries: usize,
    /// Remote events carrying a marker
    pub managed: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub skipped_past: usize,
    /// Individual remote calls that failed
    pub failed: usize,
}

/// The marker correlating a scheduled event with its feed entry.
/// Rendered as a spoiler so it stays out of sight in the client.
pub fn marker(key: &str) -> String {
    format!("||icsId:{}||", key)
}

/// Extract the feed key from a description
pub fn extract_key(description: &str) -> Option<String> {
    MARKER_RE
        .captures(description)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|k| !k.is_empty())
}

/// Compose a managed description: RSVP link, feed text, marker.
///
/// The feed text is shortened so the whole description fits in
/// [`MAX_DESCRIPTION_CHARS`]; the marker is never cut. An RSVP link too
/// long to fit next to the marker is dropped.
pub fn build_description(base: Option<&str>, key: &str, rsvp_url: Option<&str>) -> String {
    const SEPARATOR: &str = "\n\n";

    let marker = marker(key);
    let mut lines: Vec<String> = Vec::new();
    if let Some(url) = rsvp_url.map(str::trim).filter(|u| !u.is_empty()) {
        let rsvp = format!("[RSVP Here]({})", url);
        // A cut link is useless, so one that cannot fit whole is left out
        if rsvp.chars().count() + SEPARATOR.len() + marker.chars().count()
            <= MAX_DESCRIPTION_CHARS
        {
            lines.push(rsvp);
        } else {
            debug!("Dropping RSVP link for {}: too long for the description", key);
        }
    }

    if let Some(base) = base.map(str::trim).filter(|b| !b.is_empty()) {
        let reserved: usize = lines
            .iter()
            .map(|l| l.chars().count() + SEPARATOR.len())
            .sum::<usize>()
            + marker.chars().count()
            + SEPARATOR.len();
        let budget = MAX_DESCRIPTION_CHARS.saturating_sub(reserved);
        if budget > 0 {
            lines.push(truncate_chars(base, budget));
        }
    }

    lines.push(marker);
    lines.join(SEPARATOR)
}
