//! Configuration loading and config file resolution
//!
//! Config file priority order:
//! 1. Command-line argument (highest priority)
//! 2. `ESG_CONFIG` environment variable
//! 3. `<config dir>/esg-engine/config.toml`
//! 4. Built-in defaults (fallback)
//!
//! A missing file at the default location is not an error: the engine starts
//! on built-in defaults and logs a warning. A file named explicitly (CLI or
//! environment) must exist.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "ESG_CONFIG";

/// World Bank Indicators API v2
pub const DEFAULT_API_BASE_URL: &str = "https://api.worldbank.org/v2";

/// Engine configuration
///
/// Every field has a built-in default, so an empty TOML document is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of the indicator data source
    pub api_base_url: String,
    /// Historical window requested per indicator (`date=` query value)
    pub date_range: String,
    /// Data points requested per indicator (`per_page=` query value)
    pub per_page: u32,
    /// Per-request timeout
    pub request_timeout_secs: u64,
    /// Maximum requests in flight per cycle (unset: the whole cycle at once)
    pub max_concurrent_requests: Option<usize>,
    /// Request rate limit (unset: unlimited)
    pub requests_per_second: Option<u32>,
    /// Maximum entities scored per cycle (unset: all selected)
    pub max_entities: Option<usize>,
    /// Async bus fan-out buffer
    pub bus_capacity: usize,
    /// Parameters kept by quick analysis
    pub quick_max_parameters: usize,
    /// Entities kept by quick analysis
    pub quick_max_entities: usize,
    /// Catalog TOML file (unset: built-in catalog)
    pub catalog_path: Option<PathBuf>,
    pub thresholds: RecommendationThresholds,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            date_range: "2020:2023".to_string(),
            per_page: 50,
            request_timeout_secs: 30,
            max_concurrent_requests: None,
            requests_per_second: None,
            max_entities: None,
            bus_capacity: 100,
            quick_max_parameters: 3,
            quick_max_entities: 2,
            catalog_path: None,
            thresholds: RecommendationThresholds::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Score thresholds below which a recommendation is emitted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationThresholds {
    pub environmental: f64,
    pub social: f64,
    pub governance: f64,
    pub overall: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            environmental: 60.0,
            social: 70.0,
            governance: 65.0,
            overall: 55.0,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5780,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log filter (trace, debug, info, warn, error, or an EnvFilter directive)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Resolve the config file and load it, falling back to defaults
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        match ConfigResolver::new().resolve(cli_path) {
            ConfigSource::Explicit(path) => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(&path)
            }
            ConfigSource::Default(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(&path)
            }
            ConfigSource::Default(path) => {
                warn!(
                    "No config file at {}, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            ConfigSource::BuiltIn => {
                warn!("Could not determine config directory, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(Error::Config("api_base_url must not be empty".to_string()));
        }
        if self.max_concurrent_requests == Some(0) {
            return Err(Error::Config(
                "max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.requests_per_second == Some(0) {
            return Err(Error::Config(
                "requests_per_second must be at least 1".to_string(),
            ));
        }
        if self.max_entities == Some(0) {
            return Err(Error::Config("max_entities must be at least 1".to_string()));
        }
        if self.quick_max_parameters == 0 || self.quick_max_entities == 0 {
            return Err(Error::Config(
                "quick_max_parameters and quick_max_entities must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where the config file comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Named on the command line or in the environment; must exist
    Explicit(PathBuf),
    /// Platform default location; may be absent
    Default(PathBuf),
    /// No location available on this platform
    BuiltIn,
}

/// Config file path resolution
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    env_var_name: String,
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self {
            env_var_name: CONFIG_ENV_VAR.to_string(),
        }
    }

    /// Resolve using a different environment variable (tests)
    pub fn with_env_var(env_var_name: impl Into<String>) -> Self {
        Self {
            env_var_name: env_var_name.into(),
        }
    }

    pub fn resolve(&self, cli_path: Option<&Path>) -> ConfigSource {
        // Priority 1: Command-line argument
        if let Some(path) = cli_path {
            return ConfigSource::Explicit(path.to_path_buf());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(&self.env_var_name) {
            if !path.trim().is_empty() {
                return ConfigSource::Explicit(PathBuf::from(path));
            }
        }

        // Priority 3: Platform config directory
        match default_config_path() {
            Some(path) => ConfigSource::Default(path),
            None => ConfigSource::BuiltIn,
        }
    }
}

/// `<config dir>/esg-engine/config.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("esg-engine").join("config.toml"))
}
