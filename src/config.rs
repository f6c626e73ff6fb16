//! fieldgraph configuration management.
//!
//! Configuration is read from TOML at:
//! - an explicit `--config` path, or
//! - `<config dir>/fieldgraph/config.toml` (e.g. `~/.config/fieldgraph/config.toml`)
//!
//! A missing file yields defaults. Selected values can be overridden from the
//! environment after loading (`FIELDGRAPH_LEDGER_URL`,
//! `FIELDGRAPH_PUBLISHER_TOKEN`, `FIELDGRAPH_WORKBOOK_URL`, `FIELDGRAPH_LOG`).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{FieldGraphError, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldGraphConfig {
    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub publisher: PublisherConfig,

    #[serde(default)]
    pub workbook: WorkbookConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Spreadsheet ledger endpoint and table names
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LedgerConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub data_dictionary: String,
    pub chart_library: String,
    pub article_library: String,
    pub field_chart_links: String,
    pub chart_article_links: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: 30,
            data_dictionary: "data_dictionary".to_string(),
            chart_library: "chart_library".to_string(),
            article_library: "article_library".to_string(),
            field_chart_links: "field_chart_links".to_string(),
            chart_article_links: "chart_article_links".to_string(),
        }
    }
}

/// Help-center publishing API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PublisherConfig {
    pub base_url: String,
    pub token: String,
    pub api_version: String,
    pub timeout_secs: u64,
    pub author_id: Option<String>,
    pub default_collection: Option<String>,
    pub data_dictionary_collection: Option<String>,
    pub chart_collection: Option<String>,
    pub article_collection: Option<String>,
    pub retry: RetryConfig,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.intercom.io".to_string(),
            token: String::new(),
            api_version: "2.14".to_string(),
            timeout_secs: 30,
            author_id: None,
            default_collection: None,
            data_dictionary_collection: None,
            chart_collection: None,
            article_collection: None,
            retry: RetryConfig::default(),
        }
    }
}

impl PublisherConfig {
    pub fn data_dictionary_collection(&self) -> Option<&str> {
        self.data_dictionary_collection
            .as_deref()
            .or(self.default_collection.as_deref())
    }

    pub fn chart_collection(&self) -> Option<&str> {
        self.chart_collection
            .as_deref()
            .or(self.default_collection.as_deref())
    }

    pub fn article_collection(&self) -> Option<&str> {
        self.article_collection
            .as_deref()
            .or(self.default_collection.as_deref())
    }
}

/// Fixed-delay retry for publisher writes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 2000,
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// BI server REST API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkbookConfig {
    pub server_url: String,
    pub api_version: String,
    pub timeout_secs: u64,
}

impl Default for WorkbookConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            api_version: "3.20".to_string(),
            timeout_secs: 45,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl FieldGraphConfig {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("fieldgraph").join("config.toml"))
    }

    /// Load from `path`, or the default location when `None`, then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(FieldGraphError::ConfigError {
                        message: format!("config file not found: {}", p.display()),
                    });
                }
                Self::load_from(p)?
            }
            None => match Self::default_path() {
                Some(p) => Self::load_from(&p)?,
                None => Self::default(),
            },
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific path; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| FieldGraphError::ConfigError {
            message: format!("Failed to parse config: {}", e),
        })
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production). Empty values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = get("FIELDGRAPH_LEDGER_URL") {
            self.ledger.url = url;
        }
        if let Some(token) = get("FIELDGRAPH_PUBLISHER_TOKEN") {
            self.publisher.token = token;
        }
        if let Some(url) = get("FIELDGRAPH_WORKBOOK_URL") {
            self.workbook.server_url = url;
        }
        if let Some(level) = get("FIELDGRAPH_LOG") {
            self.logging.level = level;
        }
    }

    /// Settings required to talk to the ledger and publisher.
    pub fn validate(&self) -> Result<()> {
        if self.ledger.url.trim().is_empty() {
            return Err(FieldGraphError::ConfigError {
                message: "ledger.url is not set".to_string(),
            });
        }
        if self.publisher.token.trim().is_empty() {
            return Err(FieldGraphError::ConfigError {
                message: "publisher.token is not set".to_string(),
            });
        }
        if self.publisher.retry.attempts == 0 {
            return Err(FieldGraphError::ConfigError {
                message: "publisher.retry.attempts must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Display configuration as TOML, with the publisher token masked
    pub fn display(&self) -> String {
        let mut shown = self.clone();
        if !shown.publisher.token.is_empty() {
            shown.publisher.token = "********".to_string();
        }
        toml::to_string_pretty(&shown).unwrap_or_default()
    }
}
