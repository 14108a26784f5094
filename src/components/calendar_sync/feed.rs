use super::models::{CalendarEntry, DEFAULT_NAME};
use super::time::resolve_time;
use crate::error::{calendar_error, BotResult};
use async_trait::async_trait;
use chrono_tz::Tz;
use icalendar::parser::{read_calendar, unfold, Component};
use icalendar::DatePerhapsTime;
use reqwest::Client;
use tracing::{debug, info};

/// Source of calendar entries for a sync pass
#[async_trait]
pub trait EntrySource: Send + Sync {
    /// Fetch the current entries
    async fn fetch_entries(&self) -> BotResult<Vec<CalendarEntry>>;
}

/// An ICS feed fetched over HTTP
#[derive(Debug, Clone)]
pub struct IcsFeed {
    client: Client,
    url: String,
    timezone: Tz,
}

impl IcsFeed {
    /// Create a feed reader for `url`, reading floating times in `timezone`
    pub fn new(client: Client, url: impl Into<String>, timezone: Tz) -> Self {
        Self {
            client,
            url: url.into(),
            timezone,
        }
    }
}

#[async_trait]
impl EntrySource for IcsFeed {
    async fn fetch_entries(&self) -> BotResult<Vec<CalendarEntry>> {
        // webcal:// is plain https for fetching purposes
        let url = match self.url.strip_prefix("webcal://") {
            Some(rest) => format!("https://{}", rest),
            None => self.url.clone(),
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| calendar_error(&format!("Failed to fetch calendar feed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(calendar_error(&format!(
                "Failed to fetch calendar feed: HTTP {}",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| calendar_error(&format!("Failed to read calendar feed: {}", e)))?;

        parse_entries(&body, self.timezone)
    }
}

/// Parse ICS content into calendar entries.
///
/// Components other than VEVENT, entries without a start, and recurring
/// entries (including overridden occurrences) are left out.
pub fn parse_entries(content: &str, timezone: Tz) -> BotResult<Vec<CalendarEntry>> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded)
        .map_err(|e| calendar_error(&format!("Failed to parse calendar feed: {}", e)))?;

    let mut vevents = Vec::new();
    collect_vevents(&calendar.components, &mut vevents);

    let entries: Vec<CalendarEntry> = vevents
        .into_iter()
        .filter_map(|vevent| to_calendar_entry(vevent, timezone))
        .collect();

    debug!("Parsed {} calendar entries from feed", entries.len());
    Ok(entries)
}

fn collect_vevents<'a>(components: &'a [Component<'a>], out: &mut Vec<&'a Component<'a>>) {
    for component in components {
        if component.name == "VEVENT" {
            out.push(component);
        } else {
            collect_vevents(&component.components, out);
        }
    }
}

fn to_calendar_entry(vevent: &Component<'_>, timezone: Tz) -> Option<CalendarEntry> {
    let text = |name: &str| {
        vevent
            .find_prop(name)
            .map(|p| unescape_text(p.val.as_ref()))
            .filter(|v| !v.trim().is_empty())
    };

    let start = resolve_time(
        DatePerhapsTime::try_from(vevent.find_prop("DTSTART")?).ok()?,
        timezone,
    )?;
    let end = vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .and_then(|dpt| resolve_time(dpt, timezone));

    let summary = text("SUMMARY");
    let name = summary.clone().unwrap_or_else(|| DEFAULT_NAME.to_string());

    if vevent.find_prop("RRULE").is_some() {
        info!("Skipping recurring event: {}", name);
        return None;
    }
    // Overrides of a single occurrence belong to their recurring series
    if vevent.find_prop("RECURRENCE-ID").is_some() {
        info!("Skipping recurring event occurrence: {}", name);
        return None;
    }

    let key = text("UID").unwrap_or_else(|| {
        format!(
            "{}-{}",
            summary.as_deref().unwrap_or(DEFAULT_NAME),
            start.to_rfc3339()
        )
    });

    Some(CalendarEntry::new(
        key,
        name,
        text("DESCRIPTION").as_deref(),
        text("LOCATION").as_deref(),
        start,
        end,
        text("RSVP-URL").as_deref(),
    ))
}

/// Decode RFC 5545 TEXT escapes
pub fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_text() {
        assert_eq!(unescape_text(r"Line one\nLine two"), "Line one\nLine two");
        assert_eq!(unescape_text(r"a\, b\; c\\d"), r"a, b; c\d");
        assert_eq!(unescape_text("trailing\\"), "trailing\\");
    }
}
