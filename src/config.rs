//! TOML configuration for the scanner and notifier.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::scanner::ScanOptions;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub reader: ReaderConfig,
    pub notifier: NotifierConfig,
}

/// Serial link and polling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Reader address, 0xFF for broadcast.
    pub address: u8,
    pub baud_rate: u32,
    pub read_timeout_ms: u32,
    /// Delay between polling cycles.
    pub scan_interval_ms: u64,
    pub read_buffer: usize,
    /// Substring matched against USB product/manufacturer when listing ports.
    pub port_filter: String,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            address: 0xFF,
            baud_rate: 57600,
            read_timeout_ms: 100,
            scan_interval_ms: 1000,
            read_buffer: 512,
            port_filter: "CH340".to_string(),
        }
    }
}

/// HTTP forwarding of accepted tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub enabled: bool,
    pub url: String,
    pub timeout_secs: u64,
    pub position_param: String,
    pub uid_param: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            timeout_secs: 5,
            position_param: "pos".to_string(),
            uid_param: "kode".to_string(),
        }
    }
}

impl ScanConfig {
    /// Load and validate from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ScanConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reader.read_buffer == 0 {
            return Err(ConfigError::Validation("reader.read_buffer must be greater than 0".into()));
        }
        if self.reader.baud_rate == 0 {
            return Err(ConfigError::Validation("reader.baud_rate must be greater than 0".into()));
        }
        if self.notifier.enabled && self.notifier.url.trim().is_empty() {
            return Err(ConfigError::Validation("notifier.url is required when the notifier is enabled".into()));
        }
        Ok(())
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            address: self.reader.address,
            baud_rate: self.reader.baud_rate,
            read_timeout_ms: self.reader.read_timeout_ms,
            read_buffer: self.reader.read_buffer,
            interval: Duration::from_millis(self.reader.scan_interval_ms),
        }
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notifier.timeout_secs)
    }
}
