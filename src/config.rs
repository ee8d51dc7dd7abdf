//! Configuration management for the matrix driver
//!
//! Provides persistent configuration loaded from a platform-specific
//! config file; the matrix wiring, hardware variant and logging all come
//! from here.
//!
//! ## Config File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/keymatrix/config.toml` |
//! | macOS | `~/Library/Application Support/keymatrix/config.toml` |
//! | Windows | `%APPDATA%\keymatrix\config.toml` |
//!
//! ## Example
//!
//! ```no_run
//! use keymatrix::Config;
//!
//! // Load existing config or use defaults
//! let mut config = Config::load().unwrap_or_default();
//!
//! // Modify settings
//! config.log.level = "debug".to_string();
//!
//! // Save to disk
//! config.save().expect("Failed to save config");
//! ```

use crate::keyboard::keymap::KeyboardModel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;

/// Error type for configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to determine config directory
    NoConfigDir,
    /// IO error reading or writing config file
    Io(io::Error),
    /// Failed to parse config file
    Parse(toml::de::Error),
    /// Failed to serialize config
    Serialize(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoConfigDir => write!(f, "Could not determine config directory"),
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Serialize(e) => write!(f, "Serialize error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(e: toml::ser::Error) -> Self {
        ConfigError::Serialize(e)
    }
}

/// Returns the path to the config file.
///
/// Creates the config directory if it doesn't exist.
///
/// # Platform-specific paths
///
/// - Linux: `~/.config/keymatrix/config.toml`
/// - macOS: `~/Library/Application Support/keymatrix/config.toml`
/// - Windows: `%APPDATA%\keymatrix\config.toml`
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    let app_dir = config_dir.join("keymatrix");

    // Create directory if it doesn't exist
    if !app_dir.exists() {
        fs::create_dir_all(&app_dir)?;
    }

    Ok(app_dir.join("config.toml"))
}

/// Main driver configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Matrix wiring and hardware variant
    #[serde(default)]
    pub matrix: MatrixConfig,
    /// Virtual device identity
    #[serde(default)]
    pub device: DeviceConfig,
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

/// Matrix wiring and hardware variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixConfig {
    /// Which keyboard build is attached
    pub model: KeyboardModel,
    /// Row output pins in matrix row order (BCM numbering)
    pub row_pins: Vec<u8>,
    /// Column input pins in matrix column order (BCM numbering)
    pub col_pins: Vec<u8>,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            model: KeyboardModel::default(),
            row_pins: vec![11, 5, 6, 12, 13, 19, 16, 26],
            col_pins: vec![17, 18, 27, 22, 23, 24, 10, 9, 25],
        }
    }
}

/// Virtual device identity
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeviceConfig {
    /// Override for the announced device name; unset means the model's
    /// own name is used
    pub name: Option<String>,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default log filter, overridden by RUST_LOG
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default config file.
    ///
    /// Returns the default configuration if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a specific path.
    ///
    /// Useful for testing or using custom config locations.
    pub fn load_from(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default config file.
    ///
    /// Creates the config directory and file if they don't exist.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    ///
    /// Useful for testing or using custom config locations.
    pub fn save_to(&self, path: &PathBuf) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Name the virtual device should announce
    pub fn device_name(&self) -> String {
        self.device
            .name
            .clone()
            .unwrap_or_else(|| self.matrix.model.device_name().to_string())
    }
}
