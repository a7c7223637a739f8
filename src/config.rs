use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub price_service: PriceServiceSettings,
    #[serde(default)]
    pub enrichment: EnrichmentSettings,
    pub benchmark: BenchmarkSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

/// Where orders are stored
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub backend: StorageBackend,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database_name: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PriceServiceSettings {
    /// Endpoint queried as `{base_url}?symbol={ticker}`
    pub base_url: String,
    pub timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

impl PriceServiceSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EnrichmentSettings {
    /// Overall bound on the fan-out join; unbounded when unset
    pub scope_deadline_ms: Option<u64>,
}

impl EnrichmentSettings {
    pub fn scope_deadline(&self) -> Option<Duration> {
        self.scope_deadline_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BenchmarkSettings {
    /// `platform`/`heavyweight` or `virtual`/`lightweight`
    pub strategy: String,
    pub task_count: usize,
    pub sample_interval: usize,
    pub verbose: bool,
    pub worker_threads: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let config = Self::with_defaults(Config::builder(), &environment)?
            // Add configuration file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix
            .add_source(
                Environment::with_prefix("ORDER_SCOPE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Built-in defaults only, ignoring files and the environment
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::with_defaults(Config::builder(), "test")?
            .build()?
            .try_deserialize()
    }

    fn with_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        environment: &str,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("application.host", "0.0.0.0")?
            .set_default("application.port", 8080)?
            .set_default("application.environment", environment)?
            .set_default("database.backend", "memory")?
            .set_default("database.host", "localhost")?
            .set_default("database.port", 5432)?
            .set_default("database.username", "postgres")?
            .set_default("database.password", "password")?
            .set_default("database.database_name", "order_scope")?
            .set_default("database.max_connections", 10)?
            .set_default(
                "price_service.base_url",
                "http://127.0.0.1:9090/api/v3/ticker/price",
            )?
            .set_default("price_service.timeout_ms", 3000)?
            .set_default("price_service.connect_timeout_ms", 2000)?
            .set_default("benchmark.strategy", "virtual")?
            .set_default("benchmark.task_count", 5000)?
            .set_default("benchmark.sample_interval", 500)?
            .set_default("benchmark.verbose", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "compact")
    }

    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.database.username,
            self.database.password,
            self.database.host,
            self.database.port,
            self.database.database_name
        )
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }
}
