//! Global configuration loader for Concierge.
//!
//! Reads `config.toml` from the data directory (`~/.concierge/` by default)
//! and deserializes it into [`GlobalConfig`]. Falls back to defaults when the
//! file is missing or malformed. API keys are read from the environment only.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use concierge_types::config::GlobalConfig;

/// Overrides the data directory.
pub const DATA_DIR_ENV: &str = "CONCIERGE_DATA_DIR";

/// Key for the model provider.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Key for WeatherAPI. Absent means the weather tool reports itself unconfigured.
pub const WEATHER_API_KEY_ENV: &str = "WEATHER_API_KEY";

/// Overrides the holiday calendar URL from `config.toml`.
pub const HOLIDAY_CALENDAR_LINK_ENV: &str = "HOLIDAY_CALENDAR_LINK";

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`GlobalConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    }
}

/// `$CONCIERGE_DATA_DIR`, else `~/.concierge`, else `./.concierge`.
pub fn resolve_data_dir() -> PathBuf {
    data_dir_from(std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
}

fn data_dir_from(env_override: Option<PathBuf>) -> PathBuf {
    env_override
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".concierge")
        })
}

/// Secrets and overrides taken from the process environment.
///
/// Does NOT derive Debug to keep keys out of logs.
pub struct EnvSecrets {
    pub openai_api_key: Option<SecretString>,
    pub weather_api_key: Option<SecretString>,
    pub holiday_calendar_link: Option<String>,
}

impl EnvSecrets {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Blank values count as unset.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            openai_api_key: get(OPENAI_API_KEY_ENV).map(SecretString::from),
            weather_api_key: get(WEATHER_API_KEY_ENV).map(SecretString::from),
            holiday_calendar_link: get(HOLIDAY_CALENDAR_LINK_ENV),
        }
    }

    /// Feed URL: the environment override wins over `config.toml`.
    pub fn holiday_source(&self, config: &GlobalConfig) -> String {
        self.holiday_calendar_link
            .clone()
            .unwrap_or_else(|| config.holiday_calendar_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.model, "o1");
        assert_eq!(config.request_timeout_ms, 30_000);
    }

    #[tokio::test]
    async fn valid_toml_is_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
model = "gpt-4o-mini"
request_timeout_ms = 20000
title_cache_capacity = 64
"#,
        )
        .await
        .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.request_timeout_ms, 20_000);
        assert_eq!(config.title_cache_capacity, 64);
        assert_eq!(config.max_tool_rounds, 15);
    }

    #[tokio::test]
    async fn invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.model, "o1");
    }

    #[test]
    fn data_dir_prefers_override() {
        assert_eq!(
            data_dir_from(Some(PathBuf::from("/srv/concierge"))),
            PathBuf::from("/srv/concierge")
        );
        assert!(data_dir_from(Some(PathBuf::new())).ends_with(".concierge"));
        assert!(data_dir_from(None).ends_with(".concierge"));
    }

    #[test]
    fn secrets_treat_blank_as_unset() {
        let env: HashMap<&str, &str> = HashMap::from([
            (OPENAI_API_KEY_ENV, "sk-live"),
            (WEATHER_API_KEY_ENV, "   "),
        ]);
        let secrets = EnvSecrets::from_lookup(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(secrets.openai_api_key.unwrap().expose_secret(), "sk-live");
        assert!(secrets.weather_api_key.is_none());
        assert!(secrets.holiday_calendar_link.is_none());
    }

    #[test]
    fn holiday_link_overrides_config() {
        let config = GlobalConfig::default();
        let env: HashMap<&str, &str> =
            HashMap::from([(HOLIDAY_CALENDAR_LINK_ENV, "https://example.org/h.ics")]);
        let secrets = EnvSecrets::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(secrets.holiday_source(&config), "https://example.org/h.ics");

        let none = EnvSecrets::from_lookup(|_| None);
        assert_eq!(none.holiday_source(&config), config.holiday_calendar_url);
    }
}
