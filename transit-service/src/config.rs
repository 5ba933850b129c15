//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: TRANSIT_, nested keys separated by `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/transit-service/{service_name}/config.toml
//! 4. System directory: /etc/transit-service/{service_name}/config.toml
//! 5. Default values
//!
//! ```toml
//! [service]
//! name = "transit-api"
//! log_level = "debug"
//!
//! [database]
//! url = "sqlite://transit.db?mode=rwc"
//! max_connections = 10
//!
//! [pagination]
//! default_per_page = 25
//! max_per_page = 200
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::repository::{PageLimits, DEFAULT_PER_PAGE, MAX_PER_PAGE};

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "TRANSIT_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// List pagination bounds
    #[serde(default)]
    pub pagination: PaginationConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// Log level or `EnvFilter` directive (e.g. `info,sqlx=warn`)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Environment (dev, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum idle connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Maximum retry attempts for establishing database connection
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between retry attempts in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    /// Apply embedded migrations after connecting
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

impl DatabaseConfig {
    /// Pool acquire timeout
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Delay before the first retry
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout_secs: default_connection_timeout(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
            run_migrations: default_true(),
        }
    }
}

/// Pagination bounds for list endpoints
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationConfig {
    /// Page size when the request does not give one
    #[serde(default = "default_per_page")]
    pub default_per_page: u32,

    /// Largest accepted page size; larger requests are rejected
    #[serde(default = "default_max_per_page")]
    pub max_per_page: u32,
}

impl PaginationConfig {
    /// Limits applied when building query parameters
    pub fn limits(&self) -> PageLimits {
        PageLimits {
            default_per_page: self.default_per_page.clamp(1, self.max_per_page.max(1)),
            max_per_page: self.max_per_page.max(1),
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_per_page: default_per_page(),
            max_per_page: default_max_per_page(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_database_url() -> String {
    "sqlite://transit.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_delay() -> u64 {
    2
}

fn default_true() -> bool {
    true
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

fn default_max_per_page() -> u32 {
    MAX_PER_PAGE
}

impl Config {
    /// Load configuration from all sources
    ///
    /// Searches for config files in this order (first found is used):
    /// 1. Current working directory: ./config.toml
    /// 2. XDG config directory: ~/.config/transit-service/{service_name}/config.toml
    /// 3. System directory: /etc/transit-service/{service_name}/config.toml
    ///
    /// Environment variables (TRANSIT_ prefix) override all file-based configs.
    pub fn load() -> Result<Self> {
        // Try to infer service name from binary name or use default
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "transit-service".to_string());

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Lowest priority first so higher priority files override
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config = figment.extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// This bypasses XDG directories and loads directly from the given path.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Find all possible config file paths for a service, highest priority first
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix("transit-service");
        let config_file_path = Path::new(service_name).join("config.toml");
        if let Some(path) = xdg_dirs.find_config_file(&config_file_path) {
            paths.push(path);
        }

        paths.push(
            PathBuf::from("/etc/transit-service")
                .join(service_name)
                .join("config.toml"),
        );

        paths
    }

    /// Pagination limits for building query parameters
    pub fn page_limits(&self) -> PageLimits {
        self.pagination.limits()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "transit-service".to_string(),
                log_level: default_log_level(),
                environment: default_environment(),
            },
            database: DatabaseConfig::default(),
            pagination: PaginationConfig::default(),
        }
    }
}
