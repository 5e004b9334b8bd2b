//! WeatherAPI client implementing the `WeatherService` port.
//!
//! Calls `current.json` and `forecast.json` on WeatherAPI with the key as a
//! query parameter and renders the payload as markdown for the model.

use std::fmt::Write as _;
use std::time::Duration;

use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use concierge_core::tools::{CapabilityError, WeatherService};

/// Outbound request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Days requested when the caller asks for an unsupported range.
pub const DEFAULT_FORECAST_DAYS: i64 = 3;

/// Longest forecast WeatherAPI serves.
pub const MAX_FORECAST_DAYS: i64 = 14;

/// Failure talking to WeatherAPI.
#[derive(Debug, Error)]
pub enum WeatherApiError {
    #[error("failed to make request: {0}")]
    Request(#[from] reqwest::Error),

    #[error("weather API error: {0}")]
    Api(String),

    #[error("weather API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse weather response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl From<WeatherApiError> for CapabilityError {
    fn from(err: WeatherApiError) -> Self {
        CapabilityError(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WeatherResponse {
    location: Location,
    current: Current,
    forecast: Forecast,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Location {
    name: String,
    country: String,
    lat: f64,
    lon: f64,
    localtime: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Condition {
    text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Current {
    temp_c: f64,
    temp_f: f64,
    condition: Condition,
    wind_kph: f64,
    wind_mph: f64,
    wind_dir: String,
    humidity: i64,
    feelslike_c: f64,
    feelslike_f: f64,
    uv: f64,
    vis_km: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Forecast {
    forecastday: Vec<ForecastDay>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ForecastDay {
    date: String,
    day: DaySummary,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DaySummary {
    maxtemp_c: f64,
    maxtemp_f: f64,
    mintemp_c: f64,
    mintemp_f: f64,
    maxwind_kph: f64,
    maxwind_mph: f64,
    totalprecip_mm: f64,
    totalprecip_in: f64,
    condition: Condition,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for WeatherAPI.
///
/// Does NOT derive Debug: it holds the API key.
pub struct WeatherApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl WeatherApiClient {
    pub fn new(api_key: SecretString, base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn fetch(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<WeatherResponse, WeatherApiError> {
        let url = format!("{}/{endpoint}", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.expose_secret())])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(endpoint, status = status.as_u16(), "weather API request failed");
            return Err(error_from_body(status.as_u16(), body));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Prefer the provider's own error message over the raw body.
fn error_from_body(status: u16, body: String) -> WeatherApiError {
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) if !parsed.error.message.is_empty() => WeatherApiError::Api(parsed.error.message),
        _ => WeatherApiError::Status { status, body },
    }
}

/// Days outside 1..=14 fall back to the 3-day default.
pub fn clamp_forecast_days(days: i64) -> i64 {
    if (1..=MAX_FORECAST_DAYS).contains(&days) {
        days
    } else {
        DEFAULT_FORECAST_DAYS
    }
}

impl WeatherService for WeatherApiClient {
    async fn current(&self, location: &str) -> Result<String, CapabilityError> {
        let weather = self
            .fetch("current.json", &[("q", location), ("aqi", "no")])
            .await?;
        Ok(format_current(&weather))
    }

    async fn forecast(&self, location: &str, days: i64) -> Result<String, CapabilityError> {
        let days = clamp_forecast_days(days).to_string();
        let weather = self
            .fetch(
                "forecast.json",
                &[("q", location), ("days", days.as_str()), ("aqi", "no"), ("alerts", "no")],
            )
            .await?;
        Ok(format_forecast(&weather))
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

fn write_header(out: &mut String, loc: &Location) {
    let _ = writeln!(out, "**{}, {}**", loc.name, loc.country);
    let _ = writeln!(out, "Coordinates: {:.2}, {:.2}", loc.lat, loc.lon);
    let _ = writeln!(out, "Local Time: {}\n", loc.localtime);
}

fn format_current(weather: &WeatherResponse) -> String {
    let c = &weather.current;
    let mut out = String::new();
    write_header(&mut out, &weather.location);

    out.push_str("**Current Weather Conditions:**\n");
    let _ = writeln!(out, "**Temperature:** {:.1}°C ({:.1}°F)", c.temp_c, c.temp_f);
    let _ = writeln!(out, "**Conditions:** {}", c.condition.text);
    let _ = writeln!(
        out,
        "**Wind:** {:.1} km/h ({:.1} mph) {}",
        c.wind_kph, c.wind_mph, c.wind_dir
    );
    let _ = writeln!(out, "**Humidity:** {}%", c.humidity);
    let _ = writeln!(
        out,
        "**Feels Like:** {:.1}°C ({:.1}°F)",
        c.feelslike_c, c.feelslike_f
    );
    let _ = writeln!(out, "**UV Index:** {:.1}", c.uv);
    let _ = writeln!(out, "**Visibility:** {:.1} km", c.vis_km);
    out
}

fn format_forecast(weather: &WeatherResponse) -> String {
    let days = &weather.forecast.forecastday;
    let mut out = String::new();
    write_header(&mut out, &weather.location);

    let _ = writeln!(out, "**{}-Day Weather Forecast:**\n", days.len());

    for (i, fd) in days.iter().enumerate() {
        let date = NaiveDate::parse_from_str(&fd.date, "%Y-%m-%d").ok();
        match (i, date) {
            (0, Some(d)) => {
                let _ = writeln!(out, "**Today** ({})", d.format("%A, %B %-d"));
            }
            (_, Some(d)) => {
                let _ = writeln!(out, "**{}** ({})", d.format("%A"), d.format("%B %-d"));
            }
            (0, None) => {
                let _ = writeln!(out, "**Today** ({})", fd.date);
            }
            (_, None) => {
                let _ = writeln!(out, "**{}**", fd.date);
            }
        }

        let d = &fd.day;
        let _ = writeln!(
            out,
            "   **High:** {:.1}°C ({:.1}°F) | **Low:** {:.1}°C ({:.1}°F)",
            d.maxtemp_c, d.maxtemp_f, d.mintemp_c, d.mintemp_f
        );
        let _ = writeln!(out, "   **Conditions:** {}", d.condition.text);
        let _ = writeln!(
            out,
            "   **Wind:** {:.1} km/h ({:.1} mph)",
            d.maxwind_kph, d.maxwind_mph
        );
        let _ = writeln!(
            out,
            "   **Precipitation:** {:.1} mm ({:.1} in)\n",
            d.totalprecip_mm, d.totalprecip_in
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURRENT: &str = r#"{
        "location": {"name": "London", "country": "United Kingdom", "region": "City of London",
                     "lat": 51.517, "lon": -0.106, "localtime": "2024-06-01 14:05"},
        "current": {"temp_c": 18.0, "temp_f": 64.4, "condition": {"text": "Partly cloudy", "icon": ""},
                    "wind_kph": 11.2, "wind_mph": 6.9, "wind_degree": 240, "wind_dir": "WSW",
                    "humidity": 63, "feelslike_c": 18.0, "feelslike_f": 64.4, "uv": 4.0, "vis_km": 10.0}
    }"#;

    const FORECAST: &str = r#"{
        "location": {"name": "Paris", "country": "France", "lat": 48.867, "lon": 2.333,
                     "localtime": "2024-06-01 15:00"},
        "forecast": {"forecastday": [
            {"date": "2024-06-01", "day": {"maxtemp_c": 21.3, "maxtemp_f": 70.3, "mintemp_c": 12.1,
              "mintemp_f": 53.8, "maxwind_kph": 14.4, "maxwind_mph": 8.9, "totalprecip_mm": 0.2,
              "totalprecip_in": 0.01, "condition": {"text": "Sunny"}}},
            {"date": "2024-06-02", "day": {"maxtemp_c": 19.0, "maxtemp_f": 66.2, "mintemp_c": 11.0,
              "mintemp_f": 51.8, "maxwind_kph": 20.0, "maxwind_mph": 12.4, "totalprecip_mm": 3.5,
              "totalprecip_in": 0.14, "condition": {"text": "Light rain"}}}
        ]}
    }"#;

    #[test]
    fn current_conditions_are_rendered_as_markdown() {
        let weather: WeatherResponse = serde_json::from_str(CURRENT).unwrap();
        let text = format_current(&weather);

        assert!(text.starts_with("**London, United Kingdom**\n"));
        assert!(text.contains("Coordinates: 51.52, -0.11\n"));
        assert!(text.contains("Local Time: 2024-06-01 14:05\n\n"));
        assert!(text.contains("**Current Weather Conditions:**\n"));
        assert!(text.contains("**Temperature:** 18.0°C (64.4°F)\n"));
        assert!(text.contains("**Wind:** 11.2 km/h (6.9 mph) WSW\n"));
        assert!(text.contains("**Humidity:** 63%\n"));
        assert!(text.contains("**Visibility:** 10.0 km\n"));
    }

    #[test]
    fn forecast_lists_each_day() {
        let weather: WeatherResponse = serde_json::from_str(FORECAST).unwrap();
        let text = format_forecast(&weather);

        assert!(text.contains("**2-Day Weather Forecast:**\n\n"));
        assert!(text.contains("**Today** (Saturday, June 1)\n"));
        assert!(text.contains("**Sunday** (June 2)\n"));
        assert!(text.contains("   **High:** 21.3°C (70.3°F) | **Low:** 12.1°C (53.8°F)\n"));
        assert!(text.contains("   **Conditions:** Light rain\n"));
        assert!(text.contains("   **Precipitation:** 3.5 mm (0.1 in)\n"));
    }

    #[test]
    fn forecast_days_are_clamped() {
        assert_eq!(clamp_forecast_days(1), 1);
        assert_eq!(clamp_forecast_days(14), 14);
        assert_eq!(clamp_forecast_days(0), DEFAULT_FORECAST_DAYS);
        assert_eq!(clamp_forecast_days(15), DEFAULT_FORECAST_DAYS);
        assert_eq!(clamp_forecast_days(-2), DEFAULT_FORECAST_DAYS);
    }

    #[test]
    fn provider_error_message_is_surfaced() {
        let err = error_from_body(
            400,
            r#"{"error":{"code":1006,"message":"No matching location found."}}"#.to_string(),
        );
        assert_eq!(err.to_string(), "weather API error: No matching location found.");

        let err = error_from_body(502, "Bad Gateway".to_string());
        assert_eq!(err.to_string(), "weather API returned status 502: Bad Gateway");
    }

    #[test]
    fn client_normalizes_base_url() {
        let client = WeatherApiClient::new(
            SecretString::from("key".to_string()),
            "http://api.weatherapi.com/v1/",
        )
        .unwrap();
        assert_eq!(client.base_url, "http://api.weatherapi.com/v1");
    }
}
