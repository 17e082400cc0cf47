//! API configuration

use domain_inventory::PostingConfig;
use infra_db::DatabaseConfig;
use serde::Deserialize;

/// Optional configuration file, without extension (`config/inventory.toml`)
const CONFIG_FILE: &str = "config/inventory";

/// Keys whose environment values are comma separated lists
const LIST_KEYS: &[&str] = &["posting.inbound_types", "posting.outbound_types"];

/// Where the ledger lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// PostgreSQL through `infra_db`
    #[default]
    Postgres,
    /// Process-local store, lost on restart
    Memory,
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Log level
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
    /// Ledger storage backend
    pub storage: StorageBackend,
    /// Database pool settings, used with the Postgres backend
    pub database: DatabaseConfig,
    /// Operation catalogs, VAT rate and retry policy
    pub posting: PostingConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_json: false,
            storage: StorageBackend::default(),
            database: DatabaseConfig::default(),
            posting: PostingConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `config/inventory.*` (if present) overlaid
    /// with `API_` environment variables
    ///
    /// Nested keys use `__`, e.g. `API_DATABASE__URL` or
    /// `API_POSTING__OUTBOUND_TYPES=Sale,Outgoing`.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let environment = LIST_KEYS.iter().fold(
            config::Environment::with_prefix("API")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .try_parsing(true),
            |environment, key| environment.with_list_parse_key(key),
        );

        config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(environment)
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
