//! Configuration for MailCheck

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable prefix, e.g. `MAILCHECK__RESOLVER__NAMESERVER`
pub const ENV_PREFIX: &str = "MAILCHECK";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Resolver configuration
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// DKIM probe configuration
    #[serde(default)]
    pub dkim: DkimConfig,

    /// Rule engine configuration
    #[serde(default)]
    pub rules: RulesConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Nameserver queried first
    #[serde(default = "default_nameserver")]
    pub nameserver: String,

    /// Nameserver used when the DKIM and DNSSEC probes fail against the primary
    #[serde(default = "default_secondary_nameserver")]
    pub secondary_nameserver: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            nameserver: default_nameserver(),
            secondary_nameserver: default_secondary_nameserver(),
        }
    }
}

fn default_nameserver() -> String {
    "8.8.8.8".to_string()
}

fn default_secondary_nameserver() -> String {
    "8.8.4.4".to_string()
}

/// DKIM probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DkimConfig {
    /// Selector names probed under `_domainkey.<domain>`
    #[serde(default = "default_selectors")]
    pub selectors: Vec<String>,
}

impl Default for DkimConfig {
    fn default() -> Self {
        Self {
            selectors: default_selectors(),
        }
    }
}

/// Selector names commonly published by mail providers
pub const DEFAULT_DKIM_SELECTORS: [&str; 16] = [
    "default",
    "dkim",
    "mail",
    "email",
    "k1",
    "selector1",
    "selector2",
    "google",
    "zoho",
    "mx",
    "key",
    "mta",
    "pm",
    "dkim-smtp",
    "s1",
    "s2",
];

fn default_selectors() -> Vec<String> {
    DEFAULT_DKIM_SELECTORS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Rule engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Rule identifiers that should not be evaluated
    #[serde(default)]
    pub disabled: Vec<u8>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving persisted JSON reports
    pub directory: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Load configuration from an optional file layered with environment variables
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(crate::Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                builder = builder.add_source(config::File::from(path));
            }
            None => {
                let default_path = PathBuf::from("./mailcheck.toml");
                builder = builder.add_source(config::File::from(default_path).required(false));
            }
        }

        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .map_err(|e| crate::Error::Config(format!("Failed to load config: {}", e)))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        debug!(
            "Loaded configuration: nameserver={}, {} DKIM selectors",
            config.resolver.nameserver,
            config.dkim.selectors.len()
        );

        Ok(config)
    }
}
