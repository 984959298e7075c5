//! Bridge configuration
//!
//! Loaded from a JSON file; every field has a default so an empty object is a
//! valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::bridge::{BridgeOptions, DEFAULT_COPY_BUFFER_SIZE};
use crate::engine::DEFAULT_QUEUE_CAPACITY;
use crate::protocol::DEFAULT_BAUD_RATE;

/// Default TCP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:9003";

/// Default serial device path
pub const DEFAULT_SERIAL_PATH: &str = "/dev/cu.usbserial-DA017N8D";

/// Errors loading or validating a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON for this schema
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Where the device side of each session comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceConfig {
    /// Local serial port, opened per session
    Serial {
        /// Device path
        #[serde(default = "default_serial_path")]
        path: String,
        /// Line speed
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
    },
    /// Another bridge (or anything speaking raw bytes over TCP)
    Remote {
        /// `host:port` to dial for each session
        addr: String,
    },
    /// In-process protocol engine, one per client
    Simulated {
        /// Apply sensing noise to each session's sensor table
        #[serde(default)]
        sensing: bool,
    },
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig::Serial {
            path: default_serial_path(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl DeviceConfig {
    /// Whether sessions need exclusive access to the device
    pub fn is_exclusive(&self) -> bool {
        !matches!(self, DeviceConfig::Simulated { .. })
    }
}

fn default_serial_path() -> String {
    DEFAULT_SERIAL_PATH.to_string()
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

/// Top-level bridge configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// TCP address clients connect to
    pub listen_addr: String,
    /// Device side of each session
    pub device: DeviceConfig,
    /// Per-read timeout on bridge endpoints, in milliseconds
    pub read_timeout_ms: u64,
    /// Capacity of the simulator's output queue
    pub write_queue_capacity: usize,
    /// Relay buffer size per direction
    pub copy_buffer_size: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            device: DeviceConfig::default(),
            read_timeout_ms: 5000,
            write_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            copy_buffer_size: DEFAULT_COPY_BUFFER_SIZE,
        }
    }
}

impl BridgeConfig {
    /// Load and validate a configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate a configuration from JSON text
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the bridge cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_addr.trim().is_empty() {
            return Err(ConfigError::Invalid("listen_addr is empty".to_string()));
        }
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "read_timeout_ms must be positive".to_string(),
            ));
        }
        if self.write_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "write_queue_capacity must be positive".to_string(),
            ));
        }
        if self.copy_buffer_size == 0 {
            return Err(ConfigError::Invalid(
                "copy_buffer_size must be positive".to_string(),
            ));
        }
        match &self.device {
            DeviceConfig::Serial { path, baud_rate } => {
                if path.is_empty() {
                    return Err(ConfigError::Invalid("serial path is empty".to_string()));
                }
                if *baud_rate == 0 {
                    return Err(ConfigError::Invalid("baud_rate must be positive".to_string()));
                }
            }
            DeviceConfig::Remote { addr } => {
                if addr.trim().is_empty() {
                    return Err(ConfigError::Invalid("remote addr is empty".to_string()));
                }
            }
            DeviceConfig::Simulated { .. } => {}
        }
        Ok(())
    }

    /// Per-read timeout on bridge endpoints
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Session tuning derived from this configuration
    pub fn bridge_options(&self) -> BridgeOptions {
        BridgeOptions {
            read_timeout: self.read_timeout(),
            buffer_size: self.copy_buffer_size,
        }
    }
}
