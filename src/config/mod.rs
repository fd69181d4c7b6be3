//! Configuration module for the serial plotter
//!
//! This module handles application configuration including:
//! - Serial transport settings (port, baud rate, timeouts)
//! - Per-session ingest settings ([`SessionConfig`])
//! - Persistence of both as a TOML file
//!
//! # Config Location
//!
//! The config file lives in the platform-appropriate config directory under
//! `dev.serial-plotter`:
//!
//! - **Linux**: `~/.config/dev.serial-plotter/config.toml`
//! - **macOS**: `~/Library/Application Support/dev.serial-plotter/config.toml`
//! - **Windows**: `%APPDATA%\dev.serial-plotter\config.toml`
//!
//! # Example
//!
//! ```ignore
//! use serial_plotter::config::PlotterConfig;
//!
//! let mut config = PlotterConfig::load_or_default(PlotterConfig::default_path());
//! config.serial.port = "/dev/ttyUSB0".to_string();
//! config.save(PlotterConfig::default_path().unwrap())?;
//! ```

pub mod session;

pub use session::*;

use crate::error::{PlotterError, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "dev.serial-plotter";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default serial speed
pub const DEFAULT_BAUD_RATE: u32 = 921_600;

/// Baud rates offered to the user
pub const STANDARD_BAUD_RATES: &[u32] = &[
    9_600, 19_200, 38_400, 57_600, 115_200, 230_400, 460_800, 921_600,
];

/// Default driver-level read timeout in milliseconds
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// Default pause after opening the port, letting boards that reset on open boot
pub const DEFAULT_SETTLE_MS: u64 = 1000;

// ==================== Serial Config ====================

/// Serial transport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port device name (e.g. `/dev/ttyUSB0`, `COM3`)
    pub port: String,

    /// Line speed
    pub baud_rate: u32,

    /// Driver read timeout in milliseconds
    pub read_timeout_ms: u64,

    /// Pause after open before the first read, in milliseconds
    pub settle_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            settle_ms: DEFAULT_SETTLE_MS,
        }
    }
}

impl SerialConfig {
    /// Create a config for `port` at `baud_rate`
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            ..Self::default()
        }
    }

    /// Whether `baud_rate` is one of [`STANDARD_BAUD_RATES`]
    pub fn is_standard_baud(&self) -> bool {
        STANDARD_BAUD_RATES.contains(&self.baud_rate)
    }

    /// Check that a port is selected and the speed is usable
    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(PlotterError::config("port", "no serial port selected"));
        }
        if self.baud_rate == 0 {
            return Err(PlotterError::config(
                "baud_rate",
                "must be greater than zero",
            ));
        }
        if !self.is_standard_baud() {
            tracing::warn!("Non-standard baud rate {} requested", self.baud_rate);
        }
        Ok(())
    }
}

// ==================== Plotter Config ====================

/// Complete persisted configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotterConfig {
    /// Transport settings
    pub serial: SerialConfig,

    /// Ingest session settings
    pub session: SessionConfig,
}

impl PlotterConfig {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
    }

    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(PlotterError::from)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        config.session.validate()?;
        Ok(config)
    }

    /// Load a config file, returning defaults if it is missing or invalid
    pub fn load_or_default(path: Option<impl AsRef<Path>>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config as TOML, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(PlotterError::from)
                .context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| PlotterError::Serialization(e.to_string()))?;

        std::fs::write(path, content)
            .map_err(PlotterError::from)
            .with_context(|| format!("Failed to write config file {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_defaults() {
        let serial = SerialConfig::default();
        assert_eq!(serial.baud_rate, 921_600);
        assert!(serial.is_standard_baud());
        assert_eq!(serial.validate().unwrap_err().config_field(), Some("port"));
    }

    #[test]
    fn test_serial_validate() {
        assert!(SerialConfig::new("/dev/ttyUSB0", 115_200).validate().is_ok());
        let err = SerialConfig::new("/dev/ttyUSB0", 0).validate().unwrap_err();
        assert_eq!(err.config_field(), Some("baud_rate"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = PlotterConfig::default();
        config.serial = SerialConfig::new("COM7", 115_200);
        config.session = SessionConfig::default()
            .with_capacity(1000)
            .with_vertical_bound(Some(2.5))
            .with_redraw(RedrawPolicy::fixed_hz(DEFAULT_FIXED_RATE_HZ));

        config.save(&path).unwrap();
        let loaded = PlotterConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[session]\ncapacity = 64\n").unwrap();

        let loaded = PlotterConfig::load(&path).unwrap();
        assert_eq!(loaded.session.capacity, 64);
        assert_eq!(loaded.session.redraw, RedrawPolicy::Immediate);
        assert_eq!(loaded.serial.baud_rate, DEFAULT_BAUD_RATE);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[session]\ncapacity = 0\n").unwrap();
        assert!(PlotterConfig::load(&path).is_err());

        std::fs::write(&path, "this is = = not toml").unwrap();
        assert!(PlotterConfig::load(&path).is_err());
        assert_eq!(PlotterConfig::load_or_default(Some(&path)), PlotterConfig::default());
    }

    #[test]
    fn test_load_or_default_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert_eq!(PlotterConfig::load_or_default(Some(&missing)), PlotterConfig::default());
        assert_eq!(PlotterConfig::load_or_default(None::<&Path>), PlotterConfig::default());
    }
}
