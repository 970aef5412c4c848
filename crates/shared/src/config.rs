//! Application configuration management.

use serde::Deserialize;

/// Pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EtlConfig {
    /// Warehouse database configuration.
    pub warehouse: DatabaseConfig,
    /// OLTP source database configuration.
    pub source: DatabaseConfig,
    /// File-based source configuration.
    pub files: FilesConfig,
    /// Load engine configuration.
    #[serde(default)]
    pub load: LoadConfig,
    /// Retry policy for transient connectivity failures.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    10
}

/// Paths to the file-based sources.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// FX rate workbook path.
    pub fx_path: String,
    /// Worksheet name inside the FX workbook; first sheet when absent.
    #[serde(default)]
    pub fx_sheet: Option<String>,
    /// Monthly aggregated sales feed path.
    pub json_path: String,
}

/// Load engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoadConfig {
    /// Facts per transactional chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// ISO code of the warehouse's local currency.
    #[serde(default = "default_local_currency")]
    pub local_currency: String,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            local_currency: default_local_currency(),
        }
    }
}

fn default_chunk_size() -> usize {
    500
}

fn default_local_currency() -> String {
    "CRC".to_string()
}

/// Retry policy for transient connectivity failures.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts before the run aborts.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base backoff delay in milliseconds, doubled per attempt.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    250
}

impl EtlConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("STARLIFT").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
