use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::auth::TokenService;
use crate::clients::openrouter::OpenRouterClient;
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, InsightGenerator, SeaOrmAuthService, SeaOrmUserService, SeaOrmWeatherService,
    UserService, WeatherService,
};

/// Build a shared HTTP client with reasonable defaults for API calls.
fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(concat!("gdash/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub user_service: Arc<dyn UserService>,

    pub weather_service: Arc<dyn WeatherService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Self::with_store(config, store)
    }

    /// Wires services on top of an already connected store.
    pub fn with_store(config: Config, store: Store) -> anyhow::Result<Self> {
        let generator: Option<Arc<dyn InsightGenerator>> = if config.insights.enabled {
            let http_client = build_shared_http_client(config.insights.timeout_seconds)?;
            let client = OpenRouterClient::new(http_client, config.insights.clone());
            if !client.is_configured() {
                warn!("OPENROUTER_API_KEY not configured. AI insights will not be available.");
            }
            Some(Arc::new(client))
        } else {
            None
        };

        Self::with_generator(config, store, generator)
    }

    /// Like [`Self::with_store`] but with an explicit insight generator.
    pub fn with_generator(
        config: Config,
        store: Store,
        generator: Option<Arc<dyn InsightGenerator>>,
    ) -> anyhow::Result<Self> {
        let tokens = TokenService::from_config(&config.security)?;

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            tokens,
            config.security.clone(),
        )) as Arc<dyn AuthService>;

        let user_service = Arc::new(SeaOrmUserService::new(
            store.clone(),
            config.security.clone(),
        )) as Arc<dyn UserService>;

        let weather_service = Arc::new(SeaOrmWeatherService::new(
            store.clone(),
            generator,
            Duration::from_secs(config.insights.timeout_seconds),
        )) as Arc<dyn WeatherService>;

        Ok(Self {
            config: Arc::new(config),
            store,
            auth_service,
            user_service,
            weather_service,
        })
    }
}
