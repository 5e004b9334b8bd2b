//! Tools the model can call during a reply, and the capability ports behind them.
//!
//! A [`Tool`] validates the model's raw JSON arguments and calls its
//! capability. Capabilities (`WeatherService`, `HolidayFeed`, `Clock`) are
//! ports implemented in concierge-infra. Every [`ToolError`] is turned into
//! tool-result text by the tool loop; none of them ends a turn.

pub mod date;
pub mod holidays;
pub mod registry;
pub mod weather;

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use concierge_types::llm::ToolDefinition;

pub use date::DateTool;
pub use holidays::HolidaysTool;
pub use registry::ToolRegistry;
pub use weather::WeatherTool;

/// Boxed future returned by [`Tool::execute`].
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + 'a>>;

/// Recoverable tool failures. Rendered to the model as the tool result.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("{0}")]
    CapabilityFailed(String),
}

/// Failure reported by an external capability (weather API, holiday feed).
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct CapabilityError(pub String);

/// A named function the model may invoke.
///
/// Object-safe so a registry can hold heterogeneous tools.
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema describing the accepted arguments.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Run the tool with the model's raw argument payload.
    fn execute<'a>(&'a self, arguments: &'a str) -> ToolFuture<'a>;

    /// Declaration sent to the model alongside every request.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Weather lookups. Implemented by the WeatherAPI client in concierge-infra.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait WeatherService: Send + Sync {
    /// Current conditions at `location`, formatted for the model.
    fn current(
        &self,
        location: &str,
    ) -> impl Future<Output = Result<String, CapabilityError>> + Send;

    /// Daily forecast for `days` days. Implementations clamp out-of-range values.
    fn forecast(
        &self,
        location: &str,
        days: i64,
    ) -> impl Future<Output = Result<String, CapabilityError>> + Send;
}

/// One entry of a holiday calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolidayEvent {
    pub date: NaiveDate,
    pub name: String,
}

/// Source of holiday events, in feed order.
pub trait HolidayFeed: Send + Sync {
    fn load_events(
        &self,
        source: &str,
    ) -> impl Future<Output = Result<Vec<HolidayEvent>, CapabilityError>> + Send;
}

/// Wall clock, swappable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// [`Clock`] backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
