//! Persisted user settings
//!
//! A flat key-value record (credential, meter identifiers, tariff, region,
//! price cap, notification flag) stored as a JSON object. Keys are the
//! camelCase names used on disk. The store is only mutated through its own
//! `set`/`update`/`reset_to_defaults` operations, each of which persists.

use crate::error::{PlungeError, Result};
use crate::logging::get_logger;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Default Agile product code
pub const DEFAULT_AGILE_PLAN_VERSION: &str = "AGILE-FLEX-22-11-25";

/// Default grid supply point region
pub const DEFAULT_REGION: &str = "H";

/// Default price cap reference in p/kWh
pub const DEFAULT_OFGEM_CAP_RATE: f64 = 24.5;

/// User-entered configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// API credential
    pub api_key: String,

    /// Meter point administration number
    pub mpan: String,

    /// Meter serial number
    pub serial: String,

    /// Agile product code
    pub agile_plan_version: String,

    /// Region letter
    pub region: String,

    /// Price cap reference in p/kWh
    pub ofgem_cap_rate: f64,

    /// Whether negative-price notifications are enabled
    pub notifications_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            mpan: String::new(),
            serial: String::new(),
            agile_plan_version: DEFAULT_AGILE_PLAN_VERSION.to_string(),
            region: DEFAULT_REGION.to_string(),
            ofgem_cap_rate: DEFAULT_OFGEM_CAP_RATE,
            notifications_enabled: false,
        }
    }
}

impl Settings {
    /// Defaults seeded from `PLUNGE_OCTOPUS_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults seeded from an arbitrary variable lookup
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let base = Self::default();
        let pick = |name: &str, fallback: String| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(fallback)
        };
        Self {
            api_key: pick("PLUNGE_OCTOPUS_API_KEY", base.api_key),
            mpan: pick("PLUNGE_OCTOPUS_MPAN", base.mpan),
            serial: pick("PLUNGE_OCTOPUS_SERIAL", base.serial),
            agile_plan_version: pick("PLUNGE_OCTOPUS_AGILE_PLAN_VERSION", base.agile_plan_version),
            region: pick("PLUNGE_OCTOPUS_REGION", base.region),
            ofgem_cap_rate: base.ofgem_cap_rate,
            notifications_enabled: base.notifications_enabled,
        }
    }

    /// Names of the required fields that are empty
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.api_key.trim().is_empty() {
            missing.push("apiKey");
        }
        if self.mpan.trim().is_empty() {
            missing.push("mpan");
        }
        if self.serial.trim().is_empty() {
            missing.push("serial");
        }
        missing
    }

    /// Whether credential, MPAN and serial are all present
    pub fn has_credentials(&self) -> bool {
        self.missing_credentials().is_empty()
    }
}

/// File-backed settings store
pub struct SettingsStore {
    file_path: PathBuf,
    defaults: Settings,
    settings: Settings,
    logger: crate::logging::StructuredLogger,
}

impl SettingsStore {
    /// Create a store holding `defaults` until [`SettingsStore::load`] is called
    pub fn new<P: AsRef<Path>>(file_path: P, defaults: Settings) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
            settings: defaults.clone(),
            defaults,
            logger: get_logger("settings"),
        }
    }

    /// Load settings from disk; absent keys take their default values
    pub fn load(&mut self) -> Result<()> {
        if !self.file_path.exists() {
            self.logger.info("No settings file found, using defaults");
            return Ok(());
        }

        let contents = std::fs::read_to_string(&self.file_path)?;
        let stored: Value = serde_json::from_str(&contents)?;
        let Value::Object(stored) = stored else {
            return Err(PlungeError::Serialization {
                message: "settings file must contain a JSON object".to_string(),
            });
        };

        let mut merged = self.defaults_map()?;
        for (key, value) in stored {
            // Unknown keys from older versions are ignored
            if merged.contains_key(&key) {
                merged.insert(key, value);
            }
        }
        self.settings = serde_json::from_value(Value::Object(merged))?;
        self.logger.info("Loaded settings from disk");
        Ok(())
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<()> {
        let contents = serde_json::to_string_pretty(&self.settings)?;
        if let Some(parent) = self.file_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.file_path, contents)?;
        self.logger.debug("Saved settings to disk");
        Ok(())
    }

    /// Current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Defaults this store resets to
    pub fn defaults(&self) -> &Settings {
        &self.defaults
    }

    /// Get a single value by its camelCase key
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        let value = serde_json::to_value(&self.settings).ok()?;
        value
            .get(key)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
    }

    /// Set a single value by its camelCase key and persist
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<()> {
        let mut partial = Map::new();
        partial.insert(key.to_string(), serde_json::to_value(value)?);
        self.update(Value::Object(partial))
    }

    /// Apply a partial record and persist; all keys must be known
    pub fn update(&mut self, partial: Value) -> Result<()> {
        let Value::Object(partial) = partial else {
            return Err(PlungeError::validation(
                "settings",
                "update must be a JSON object",
            ));
        };

        let Value::Object(mut current) = serde_json::to_value(&self.settings)? else {
            return Err(PlungeError::generic("settings did not serialize to an object"));
        };
        for (key, value) in partial {
            if !current.contains_key(&key) {
                return Err(PlungeError::validation(key.as_str(), "unknown setting"));
            }
            current.insert(key, value);
        }

        let updated: Settings = serde_json::from_value(Value::Object(current))
            .map_err(|e| PlungeError::validation("settings", &e.to_string()))?;
        self.settings = updated;
        self.save()
    }

    /// Restore the defaults and persist
    pub fn reset_to_defaults(&mut self) -> Result<()> {
        self.settings = self.defaults.clone();
        self.logger.info("Settings reset to defaults");
        self.save()
    }

    fn defaults_map(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(&self.defaults)? {
            Value::Object(map) => Ok(map),
            _ => Err(PlungeError::generic("settings did not serialize to an object")),
        }
    }
}
