use crate::config::*;
use crate::error::{Error, Result};
use crate::registry::{default_indices, IndexRegistry};
use crate::types::index::IndexDefinition;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub quote_source: QuoteSourceConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "default_indices")]
    pub indices: Vec<IndexDefinition>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            server: ServerConfig::default(),
            refresh: RefreshConfig::default(),
            quote_source: QuoteSourceConfig::default(),
            store: StoreConfig::default(),
            logging: LoggingConfig::default(),
            indices: default_indices(),
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("MARKET_INDICES").separator("__"))
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        let mut app: AppConfig = config.try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        // Hosting platforms hand out the listen port through PORT.
        if let Ok(port) = std::env::var("PORT") {
            app.server.port = port.parse()
                .map_err(|_| Error::ConfigError(format!("PORT is not a valid port: {}", port)))?;
        }

        app.validate()?;
        Ok(app)
    }

    pub fn from_toml(source: &str) -> Result<Self> {
        let app: AppConfig = Config::builder()
            .add_source(File::from_str(source, config::FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<()> {
        // Empty, duplicate and blank entries
        IndexRegistry::new(self.indices.clone())?;

        if self.refresh.interval_secs == 0 {
            return Err(Error::ConfigError("refresh.interval_secs must be positive".into()));
        }
        if self.refresh.retry_attempts == 0 {
            return Err(Error::ConfigError("refresh.retry_attempts must be at least 1".into()));
        }
        if self.refresh.lookback_days < 2 {
            return Err(Error::ConfigError("refresh.lookback_days must be at least 2".into()));
        }
        if self.quote_source.request_timeout_secs == 0 {
            return Err(Error::ConfigError("quote_source.request_timeout_secs must be positive".into()));
        }
        Ok(())
    }
}
