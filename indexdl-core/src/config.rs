//! Download configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. The CLI layers its flags on top of what is loaded here.

use crate::data::constituents::NSE_NIFTY50_CSV_URL;
use crate::data::{DownloadPlan, OutputLayout, RetryPolicy, Universe};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_LOG_FILE: &str = "stock_downloader.log";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Root directory for all output files.
    pub base_path: PathBuf,
    /// Years of history when no explicit start date is given.
    pub years: u32,
    /// Minimum spacing between consecutive provider requests.
    pub request_delay_ms: u64,
    pub include_indices: bool,
    pub universes: Vec<Universe>,
    pub retry: RetryPolicy,
    pub http: HttpConfig,
    pub constituents: ConstituentsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub constituents_timeout_secs: u64,
    pub user_agent: String,
}

/// Dynamic constituent list URLs. An empty string disables the lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstituentsConfig {
    pub nifty50_url: String,
    pub sensex30_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: PathBuf,
    pub level: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("data"),
            years: 10,
            request_delay_ms: 500,
            include_indices: true,
            universes: Universe::ALL.to_vec(),
            retry: RetryPolicy::default(),
            http: HttpConfig::default(),
            constituents: ConstituentsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            constituents_timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for ConstituentsConfig {
    fn default() -> Self {
        Self {
            nifty50_url: NSE_NIFTY50_CSV_URL.to_string(),
            sensex30_url: String::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_LOG_FILE),
            level: "info".to_string(),
        }
    }
}

impl ConstituentsConfig {
    pub fn url_for(&self, universe: Universe) -> Option<String> {
        let url = match universe {
            Universe::Nifty50 => &self.nifty50_url,
            Universe::Sensex30 => &self.sensex30_url,
        };
        Some(url.trim().to_string()).filter(|u| !u.is_empty())
    }
}

impl DownloadConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".into()));
        }
        if self.years == 0 {
            return Err(ConfigError::Invalid("years must be at least 1".into()));
        }
        if self.http.timeout_secs == 0 || self.http.constituents_timeout_secs == 0 {
            return Err(ConfigError::Invalid("http timeouts must be non-zero".into()));
        }
        if self.base_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("base_path must not be empty".into()));
        }
        Ok(())
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    pub fn constituents_timeout(&self) -> Duration {
        Duration::from_secs(self.http.constituents_timeout_secs)
    }

    pub fn layout(&self) -> OutputLayout {
        OutputLayout::new(&self.base_path)
    }

    pub fn plan(&self) -> DownloadPlan {
        DownloadPlan {
            universes: self.universes.clone(),
            include_indices: self.include_indices,
            request_delay: self.request_delay(),
            retry: self.retry,
        }
    }
}
