//! Configuration management for Plunge
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files. User-entered tariff settings live in the
//! separate [`crate::settings`] store.

use crate::error::{PlungeError, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Pricing API connection configuration
    pub api: ApiConfig,

    /// Notification delivery configuration
    pub notifications: NotificationsConfig,

    /// Current-slot liveness configuration
    pub current_slot: CurrentSlotConfig,

    /// Refresh gating configuration
    pub refresh: RefreshConfig,

    /// IANA timezone of the viewer, used for day and slot keys
    pub timezone: String,

    /// Path of the persisted settings record
    pub settings_file: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console-specific level
    pub console_level: Option<String>,

    /// Optional file-specific level
    pub file_level: Option<String>,

    /// Path to log file (or directory)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Pricing API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the pricing API, without trailing slash
    pub base_url: String,

    /// User agent sent with every request
    pub user_agent: String,
}

/// Notification delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Webhook receiving `{title, body, tag}` JSON; empty disables the persistent channel
    pub webhook_url: String,

    /// Whether the in-session console channel may show notifications
    pub console: bool,
}

/// Current-slot liveness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentSlotConfig {
    /// Delay past a slot's end before re-resolving, in milliseconds
    pub boundary_guard_ms: u64,
}

/// Refresh gating configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Local hour after which next-day prices are normally published
    pub publish_hour: u32,

    /// Fetch rates once when the application starts
    pub fetch_on_start: bool,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default locations
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os("PLUNGE_CONFIG") {
            return Self::from_file(path);
        }

        let default_paths = ["plunge_config.yaml", "/etc/plunge/config.yaml"];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Fall back to default configuration
        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parsed viewer timezone
    pub fn tz(&self) -> Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|_| {
            PlungeError::validation("timezone", &format!("Unknown timezone {}", self.timezone))
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(PlungeError::validation(
                "api.base_url",
                "Base URL cannot be empty",
            ));
        }

        self.tz()?;

        if self.settings_file.trim().is_empty() {
            return Err(PlungeError::validation(
                "settings_file",
                "Settings path cannot be empty",
            ));
        }

        if self.refresh.publish_hour > 23 {
            return Err(PlungeError::validation(
                "refresh.publish_hour",
                "Must be between 0 and 23",
            ));
        }

        // A guard of a minute or more would show a stale slot for too long
        if self.current_slot.boundary_guard_ms >= 60_000 {
            return Err(PlungeError::validation(
                "current_slot.boundary_guard_ms",
                "Must be below 60000",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "https://api.octopus.energy/v1");
        assert_eq!(config.timezone, "Europe/London");
        assert_eq!(config.current_slot.boundary_guard_ms, 100);
        assert_eq!(config.refresh.publish_hour, 16);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.api.base_url = String::new();
        assert!(config.validate().is_err());

        config = Config::default();
        config.timezone = "Mars/Olympus_Mons".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.refresh.publish_hour = 24;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("timezone: UTC\n").unwrap();
        assert_eq!(config.timezone, "UTC");
        assert_eq!(config.api.base_url, "https://api.octopus.energy/v1");
        assert!(config.notifications.console);
    }
}
