//! `get_today_date` tool: the current instant as an RFC 3339 timestamp.

use chrono::SecondsFormat;
use serde_json::json;

use super::{Clock, Tool, ToolFuture};

pub const DATE_TOOL_NAME: &str = "get_today_date";

pub struct DateTool<C> {
    clock: C,
}

impl<C: Clock> DateTool<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> Tool for DateTool<C> {
    fn name(&self) -> &str {
        DATE_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Get today's date and time in RFC3339 format"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({ "type": "object", "properties": {} })
    }

    // Arguments are ignored; the model sometimes sends "" or "{}".
    fn execute<'a>(&'a self, _arguments: &'a str) -> ToolFuture<'a> {
        let now = self.clock.now().to_rfc3339_opts(SecondsFormat::Secs, true);
        Box::pin(async move { Ok(now) })
    }
}
