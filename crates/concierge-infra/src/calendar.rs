//! ICS holiday feed implementing the `HolidayFeed` port.
//!
//! Fetches an iCalendar document (or reads a local `.ics` file) and extracts
//! one [`HolidayEvent`] per `VEVENT`, in document order.

use std::time::Duration;

use chrono::NaiveDate;

use concierge_core::tools::{CapabilityError, HolidayEvent, HolidayFeed};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Holiday feed backed by an iCalendar source.
#[derive(Debug, Clone)]
pub struct IcsHolidayFeed {
    http: reqwest::Client,
}

impl IcsHolidayFeed {
    pub fn new() -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http })
    }

    async fn fetch(&self, source: &str) -> Result<String, CapabilityError> {
        if source.starts_with("http://") || source.starts_with("https://") {
            let response = self
                .http
                .get(source)
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(|e| CapabilityError(format!("failed to fetch calendar: {e}")))?;
            response
                .text()
                .await
                .map_err(|e| CapabilityError(format!("failed to read calendar: {e}")))
        } else {
            tokio::fs::read_to_string(source)
                .await
                .map_err(|e| CapabilityError(format!("failed to read calendar {source}: {e}")))
        }
    }
}

impl HolidayFeed for IcsHolidayFeed {
    async fn load_events(&self, source: &str) -> Result<Vec<HolidayEvent>, CapabilityError> {
        let body = self.fetch(source).await?;
        let events = parse_ics(&body);
        tracing::debug!(source, count = events.len(), "loaded holiday events");
        Ok(events)
    }
}

/// Join folded lines: a line starting with a space or tab continues the previous one.
fn unfold(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.starts_with([' ', '\t']) {
            if let Some(prev) = lines.last_mut() {
                prev.push_str(&line[1..]);
                continue;
            }
        }
        lines.push(line.to_string());
    }
    lines
}

/// Undo iCalendar TEXT escaping.
fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// `DTSTART` as a DATE (`20240101`) or DATE-TIME (`20240101T090000Z`).
fn parse_start(value: &str) -> Option<NaiveDate> {
    let date_part = value.split('T').next()?;
    NaiveDate::parse_from_str(date_part.trim(), "%Y%m%d").ok()
}

/// Extract events from an iCalendar document. Events whose start date
/// cannot be parsed are skipped.
pub fn parse_ics(text: &str) -> Vec<HolidayEvent> {
    let mut events = Vec::new();
    let mut in_event = false;
    let mut start: Option<NaiveDate> = None;
    let mut summary = String::new();

    for line in unfold(text) {
        let Some((head, value)) = line.split_once(':') else {
            continue;
        };
        let name = head.split(';').next().unwrap_or(head).to_ascii_uppercase();

        match (name.as_str(), value.trim()) {
            ("BEGIN", "VEVENT") => {
                in_event = true;
                start = None;
                summary.clear();
            }
            ("END", "VEVENT") if in_event => {
                in_event = false;
                match start.take() {
                    Some(date) => events.push(HolidayEvent {
                        date,
                        name: std::mem::take(&mut summary),
                    }),
                    None => tracing::debug!(summary = %summary, "skipping event without a valid start"),
                }
            }
            ("DTSTART", v) if in_event => start = parse_start(v),
            ("SUMMARY", v) if in_event => summary = unescape_text(v),
            _ => {}
        }
    }

    events
}
