use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod loader;

pub use loader::AppConfig;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allow_any_origin: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_allow_any_origin: true,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_secs: u64,
    pub retry_attempts: u32,
    pub retry_backoff_secs: u64,
    pub lookback_days: u32,
    pub run_on_startup: bool,
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            interval_secs: 300,  // 5 minutes
            retry_attempts: 3,
            retry_backoff_secs: 2,
            lookback_days: 2,
            run_on_startup: true,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct QuoteSourceConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for QuoteSourceConfig {
    fn default() -> Self {
        QuoteSourceConfig {
            base_url: "https://query1.finance.yahoo.com/v8/finance/chart".to_string(),
            request_timeout_secs: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    Memory,
    Firestore {
        #[serde(default = "default_collection")]
        collection: String,
        credentials: CredentialsSource,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory
    }
}

fn default_collection() -> String {
    "market_indices".to_string()
}

/// Where the service-account key for the store comes from.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialsSource {
    /// Name of an environment variable holding the key JSON.
    Env(String),
    File(PathBuf),
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}
