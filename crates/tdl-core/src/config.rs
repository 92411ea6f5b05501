//! Device configuration.
//!
//! Defaults reproduce the stock driver: `tdlchar` in class `tdl` with a
//! 256-byte buffer. A configuration can also be loaded from JSON, with any
//! missing field falling back to its default.

use alloc::format;
use alloc::string::{String, ToString};
use core::fmt;
use serde::{Deserialize, Serialize};

use crate::types::{CLASS_NAME, DEFAULT_CAPACITY, DEVICE_NAME, MIN_CAPACITY};

/// Configuration for one device instance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device name; the node appears at `/dev/<name>`
    pub name: String,
    /// Class the device is listed under in `/sys/class`
    pub class_name: String,
    /// Buffer capacity in bytes, terminator slot included
    pub capacity: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: DEVICE_NAME.to_string(),
            class_name: CLASS_NAME.to_string(),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl DeviceConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: DeviceConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity < MIN_CAPACITY {
            return Err(ConfigError::CapacityTooSmall {
                capacity: self.capacity,
            });
        }
        validate_name(&self.name, "name")?;
        validate_name(&self.class_name, "class_name")?;
        Ok(())
    }

    /// Path of the device node
    pub fn node_path(&self) -> String {
        format!("/dev/{}", self.name)
    }

    /// Path of the class entry
    pub fn class_path(&self) -> String {
        format!("/sys/class/{}/{}", self.class_name, self.name)
    }
}

fn validate_name(value: &str, field: &'static str) -> Result<(), ConfigError> {
    if value.is_empty() || value.contains('/') || !value.is_ascii() {
        return Err(ConfigError::InvalidName {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Errors from configuration loading
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// No room for a payload byte next to the terminator
    CapacityTooSmall { capacity: usize },
    /// Name is empty, non-ASCII or contains a path separator
    InvalidName { field: &'static str, value: String },
    /// Malformed JSON
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::CapacityTooSmall { capacity } => write!(
                f,
                "Capacity {} too small, need at least {}",
                capacity, MIN_CAPACITY
            ),
            ConfigError::InvalidName { field, value } => {
                write!(f, "Invalid {}: {:?}", field, value)
            }
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
        }
    }
}
