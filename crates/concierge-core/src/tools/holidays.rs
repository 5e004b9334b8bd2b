//! `get_holidays` tool: public holidays from a calendar feed, filtered by date.
//!
//! The feed returns every event in feed order; the date window and count
//! limit are applied here.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::{HolidayEvent, HolidayFeed, Tool, ToolError, ToolFuture};

pub const HOLIDAYS_TOOL_NAME: &str = "get_holidays";

#[derive(Debug, Default, Deserialize)]
struct HolidayArgs {
    #[serde(default)]
    before_date: Option<String>,
    #[serde(default)]
    after_date: Option<String>,
    #[serde(default)]
    max_count: Option<i64>,
}

/// Parsed filter for a holiday query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidayQuery {
    /// Skip events strictly after this instant.
    pub before: Option<DateTime<Utc>>,
    /// Skip events strictly before this instant.
    pub after: Option<DateTime<Utc>>,
    /// Stop after this many events; zero means no limit.
    pub max_count: usize,
}

impl HolidayQuery {
    fn from_args(args: HolidayArgs) -> Result<Self, ToolError> {
        Ok(Self {
            before: parse_bound("before_date", args.before_date)?,
            after: parse_bound("after_date", args.after_date)?,
            max_count: args.max_count.unwrap_or(0).max(0) as usize,
        })
    }
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
/// Blank values count as absent.
fn parse_bound(field: &str, value: Option<String>) -> Result<Option<DateTime<Utc>>, ToolError> {
    let Some(raw) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map(|d| Some(midnight_utc(d)))
        .map_err(|_| ToolError::InvalidArguments(format!("{field}: '{raw}' is not an RFC3339 date")))
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Apply `query` to `events`, keeping feed order. One `"YYYY-MM-DD: name"` line per event.
pub fn filter_holidays(events: &[HolidayEvent], query: &HolidayQuery) -> Vec<String> {
    let mut lines = Vec::new();
    for event in events {
        if query.max_count > 0 && lines.len() >= query.max_count {
            break;
        }
        let at = midnight_utc(event.date);
        if query.before.is_some_and(|before| at > before) {
            continue;
        }
        if query.after.is_some_and(|after| at < after) {
            continue;
        }
        lines.push(format!("{}: {}", event.date.format("%Y-%m-%d"), event.name));
    }
    lines
}

/// Holiday lookups against a single calendar feed.
pub struct HolidaysTool<F> {
    feed: F,
    source: String,
}

impl<F: HolidayFeed> HolidaysTool<F> {
    pub fn new(feed: F, source: impl Into<String>) -> Self {
        Self {
            feed,
            source: source.into(),
        }
    }

    async fn run(&self, arguments: &str) -> Result<String, ToolError> {
        // Models often send an empty payload when no filter applies.
        let args = if arguments.trim().is_empty() {
            HolidayArgs::default()
        } else {
            serde_json::from_str(arguments)
                .map_err(|e| ToolError::InvalidArguments(e.to_string()))?
        };
        let query = HolidayQuery::from_args(args)?;

        let events = self.feed.load_events(&self.source).await.map_err(|e| {
            warn!(source = %self.source, error = %e, "failed to load holiday feed");
            ToolError::CapabilityFailed("failed to load holiday events".to_string())
        })?;

        Ok(filter_holidays(&events, &query).join("\n"))
    }
}

impl<F: HolidayFeed> Tool for HolidaysTool<F> {
    fn name(&self) -> &str {
        HOLIDAYS_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Gets local bank and public holidays. Each line is a single holiday in the format \
         'YYYY-MM-DD: Holiday Name'."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "before_date": {
                    "type": "string",
                    "description": "Optional date in RFC3339 format to get holidays before this date. If not provided, all holidays will be returned."
                },
                "after_date": {
                    "type": "string",
                    "description": "Optional date in RFC3339 format to get holidays after this date. If not provided, all holidays will be returned."
                },
                "max_count": {
                    "type": "integer",
                    "description": "Optional maximum number of holidays to return. If not provided, all holidays will be returned."
                }
            }
        })
    }

    fn execute<'a>(&'a self, arguments: &'a str) -> ToolFuture<'a> {
        Box::pin(self.run(arguments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::CapabilityError;

    fn event(y: i32, m: u32, d: u32, name: &str) -> HolidayEvent {
        HolidayEvent {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            name: name.to_string(),
        }
    }

    fn feed_2024() -> Vec<HolidayEvent> {
        vec![
            event(2024, 1, 1, "New Year's Day"),
            event(2024, 6, 15, "Midsummer"),
            event(2024, 12, 25, "Christmas Day"),
        ]
    }

    struct StaticFeed(Result<Vec<HolidayEvent>, CapabilityError>);

    impl HolidayFeed for StaticFeed {
        async fn load_events(&self, _source: &str) -> Result<Vec<HolidayEvent>, CapabilityError> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn after_date_with_max_count_returns_single_event() {
        let tool = HolidaysTool::new(StaticFeed(Ok(feed_2024())), "feed");
        let out = tool
            .execute(r#"{"after_date":"2024-02-01T00:00:00Z","max_count":1}"#)
            .await
            .unwrap();
        assert_eq!(out, "2024-06-15: Midsummer");
    }

    #[tokio::test]
    async fn no_filter_returns_everything_in_feed_order() {
        let tool = HolidaysTool::new(StaticFeed(Ok(feed_2024())), "feed");
        let out = tool.execute("{}").await.unwrap();
        assert_eq!(
            out,
            "2024-01-01: New Year's Day\n2024-06-15: Midsummer\n2024-12-25: Christmas Day"
        );
        assert_eq!(tool.execute("").await.unwrap(), out);
    }

    #[test]
    fn before_date_is_inclusive_of_same_day() {
        let query = HolidayQuery {
            before: Some(midnight_utc(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())),
            ..Default::default()
        };
        assert_eq!(
            filter_holidays(&feed_2024(), &query),
            vec!["2024-01-01: New Year's Day", "2024-06-15: Midsummer"]
        );
    }

    #[test]
    fn plain_dates_are_accepted() {
        let query = HolidayQuery::from_args(HolidayArgs {
            before_date: Some("2024-07-01".into()),
            after_date: Some("".into()),
            max_count: Some(-3),
        })
        .unwrap();
        assert!(query.after.is_none());
        assert_eq!(query.max_count, 0);
        assert_eq!(
            filter_holidays(&feed_2024(), &query),
            vec!["2024-01-01: New Year's Day", "2024-06-15: Midsummer"]
        );
    }

    #[tokio::test]
    async fn unparseable_date_is_invalid_arguments() {
        let tool = HolidaysTool::new(StaticFeed(Ok(feed_2024())), "feed");
        let err = tool
            .execute(r#"{"before_date":"next friday"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn feed_failure_becomes_fixed_message() {
        let tool = HolidaysTool::new(StaticFeed(Err(CapabilityError("timeout".into()))), "feed");
        let err = tool.execute("{}").await.unwrap_err();
        assert_eq!(err.to_string(), "failed to load holiday events");
    }
}
