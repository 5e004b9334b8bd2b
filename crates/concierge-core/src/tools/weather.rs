//! `get_weather` tool: current conditions or a short forecast for a location.

use serde::Deserialize;
use serde_json::json;

use super::{Tool, ToolError, ToolFuture, WeatherService};

pub const WEATHER_TOOL_NAME: &str = "get_weather";

#[derive(Debug, Deserialize)]
struct WeatherArgs {
    location: String,
    #[serde(default)]
    forecast_days: Option<i64>,
}

/// Weather lookups through a [`WeatherService`].
///
/// The service is optional: without one the tool still answers, telling the
/// model that weather is unavailable.
pub struct WeatherTool<W> {
    service: Option<W>,
}

impl<W: WeatherService> WeatherTool<W> {
    pub fn new(service: Option<W>) -> Self {
        Self { service }
    }

    async fn run(&self, arguments: &str) -> Result<String, ToolError> {
        let args: WeatherArgs = serde_json::from_str(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let service = self
            .service
            .as_ref()
            .ok_or(ToolError::NotConfigured("weather service (WEATHER_API_KEY)"))?;

        let result = match args.forecast_days {
            Some(days) if days > 0 => service.forecast(&args.location, days).await,
            _ => service.current(&args.location).await,
        };

        result.map_err(|e| ToolError::CapabilityFailed(format!("failed to get weather information: {e}")))
    }
}

impl<W: WeatherService> Tool for WeatherTool<W> {
    fn name(&self) -> &str {
        WEATHER_TOOL_NAME
    }

    fn description(&self) -> &str {
        "ALWAYS use this function when users ask about weather, temperature, forecast, or \
         climate conditions. Do NOT generate weather information from training data. This \
         function provides real-time weather data."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "City name, coordinates, or location query (e.g., 'Barcelona', 'London,UK', '40.7128,-74.0060')"
                },
                "forecast_days": {
                    "type": "integer",
                    "description": "Number of forecast days (1-14). If not provided, returns only current weather."
                }
            },
            "required": ["location"]
        })
    }

    fn execute<'a>(&'a self, arguments: &'a str) -> ToolFuture<'a> {
        Box::pin(self.run(arguments))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::tools::CapabilityError;

    #[derive(Default)]
    struct RecordingWeather {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl WeatherService for RecordingWeather {
        async fn current(&self, location: &str) -> Result<String, CapabilityError> {
            self.calls.lock().unwrap().push(format!("current:{location}"));
            if self.fail {
                return Err(CapabilityError("No matching location found.".into()));
            }
            Ok(format!("sunny in {location}"))
        }

        async fn forecast(&self, location: &str, days: i64) -> Result<String, CapabilityError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("forecast:{location}:{days}"));
            Ok(format!("{days} days of sun in {location}"))
        }
    }

    #[tokio::test]
    async fn absent_or_non_positive_days_mean_current_conditions() {
        let tool = WeatherTool::new(Some(RecordingWeather::default()));

        tool.execute(r#"{"location":"Barcelona"}"#).await.unwrap();
        tool.execute(r#"{"location":"Barcelona","forecast_days":0}"#)
            .await
            .unwrap();
        tool.execute(r#"{"location":"Barcelona","forecast_days":-2}"#)
            .await
            .unwrap();

        let calls = tool.service.as_ref().unwrap().calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["current:Barcelona"; 3]);
    }

    #[tokio::test]
    async fn positive_days_request_forecast() {
        let tool = WeatherTool::new(Some(RecordingWeather::default()));
        let out = tool
            .execute(r#"{"location":"London,UK","forecast_days":3}"#)
            .await
            .unwrap();
        assert_eq!(out, "3 days of sun in London,UK");
    }

    #[tokio::test]
    async fn malformed_arguments_are_reported() {
        let tool = WeatherTool::new(Some(RecordingWeather::default()));
        let err = tool.execute(r#"{"forecast_days":3}"#).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
        assert!(err.to_string().contains("location"));
    }

    #[tokio::test]
    async fn missing_service_is_reported() {
        let tool: WeatherTool<RecordingWeather> = WeatherTool::new(None);
        let err = tool.execute(r#"{"location":"Paris"}"#).await.unwrap_err();
        assert!(matches!(err, ToolError::NotConfigured(_)));
        assert!(err.to_string().contains("WEATHER_API_KEY"));
    }

    #[tokio::test]
    async fn service_failure_is_reported() {
        let tool = WeatherTool::new(Some(RecordingWeather {
            fail: true,
            ..Default::default()
        }));
        let err = tool.execute(r#"{"location":"Atlantis"}"#).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to get weather information: No matching location found."
        );
    }
}
