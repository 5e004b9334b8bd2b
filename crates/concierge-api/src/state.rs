//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST API.
//! `ChatService` is generic over its repository; AppState pins it to SQLite.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use secrecy::SecretString;

use concierge_core::chat::service::{ChatService, TurnSettings};
use concierge_core::title::TitleCache;
use concierge_core::tools::{DateTool, HolidaysTool, SystemClock, ToolRegistry, WeatherTool};
use concierge_infra::calendar::IcsHolidayFeed;
use concierge_infra::config::{EnvSecrets, OPENAI_API_KEY_ENV, load_global_config, resolve_data_dir};
use concierge_infra::crypto::hash::Sha256ContentHasher;
use concierge_infra::llm::create_provider;
use concierge_infra::sqlite::conversation::SqliteConversationRepository;
use concierge_infra::sqlite::pool::{DatabasePool, database_url};
use concierge_infra::weather::WeatherApiClient;
use concierge_types::config::GlobalConfig;

/// Concrete chat service pinned to the SQLite repository.
pub type ConcreteChatService = ChatService<SqliteConversationRepository>;

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    pub config: Arc<GlobalConfig>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state: load config, connect to DB, wire services.
    ///
    /// With `needs_model` the model API key must be present; read-only
    /// commands can run without it.
    pub async fn init(needs_model: bool) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let config = load_global_config(&data_dir).await;
        let secrets = EnvSecrets::from_env();

        let db_url = format!("{}?mode=rwc", database_url(&data_dir));
        let db_pool = DatabasePool::new(&db_url)
            .await
            .context("failed to open database")?;

        let api_key = match secrets.openai_api_key.clone() {
            Some(key) => key,
            None if needs_model => anyhow::bail!("{OPENAI_API_KEY_ENV} is not set"),
            // Never used: read-only commands make no model calls.
            None => SecretString::from(String::new()),
        };
        let provider = create_provider(&config, Some(api_key))?;

        let weather = match secrets.weather_api_key.clone() {
            Some(key) => Some(WeatherApiClient::new(key, config.weather_base_url.clone())?),
            None => {
                tracing::info!("WEATHER_API_KEY not set; weather tool will report it is unconfigured");
                None
            }
        };

        let tools = ToolRegistry::new()
            .with(WeatherTool::new(weather))
            .with(DateTool::new(SystemClock))
            .with(HolidaysTool::new(
                IcsHolidayFeed::new()?,
                secrets.holiday_source(&config),
            ));
        tracing::debug!(tools = ?tools.tool_names(), "tool registry ready");

        let chat_service = ChatService::new(
            SqliteConversationRepository::new(db_pool),
            Arc::new(provider),
            Arc::new(tools),
            TitleCache::new(config.title_cache_capacity),
            Arc::new(Sha256ContentHasher::new()),
            TurnSettings::from(&config),
        );

        Ok(Self::from_parts(chat_service, config, data_dir))
    }

    /// Assemble state from an already wired service.
    pub fn from_parts(
        chat_service: ConcreteChatService,
        config: GlobalConfig,
        data_dir: PathBuf,
    ) -> Self {
        Self {
            chat_service: Arc::new(chat_service),
            config: Arc::new(config),
            data_dir,
        }
    }
}
