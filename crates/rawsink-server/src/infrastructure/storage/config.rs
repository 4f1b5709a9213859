//! TOML-based configuration for the rawsink server.
//!
//! Reads `SinkConfig` from the platform-appropriate config file:
//! - Windows:  `%APPDATA%\rawsink\config.toml`
//! - Linux:    `~/.config/rawsink/config.toml`
//! - macOS:    `~/Library/Application Support/rawsink/config.toml`
//!
//! Example:
//!
//! ```toml
//! [network]
//! interface_preference = "192.168.*.*"
//! broadcast_port = 5973
//!
//! [logging]
//! verbose = false
//! log_level = "info"
//! ```
//!
//! Every field is optional.  A missing file yields [`SinkConfig::default`];
//! command-line flags and environment variables override whatever the file
//! says (see `main.rs`).

use std::path::{Path, PathBuf};

use rawsink_core::{AddressPatternError, InterfacePattern};
use serde::Deserialize;
use thiserror::Error;

/// Default UDP port the key events are broadcast to.
pub const DEFAULT_BROADCAST_PORT: u16 = 5973;

/// Default interface preference: any address.
pub const DEFAULT_INTERFACE_PREFERENCE: &str = "*.*.*.*";

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The interface preference is not a valid wildcard pattern.
    #[error(transparent)]
    InterfacePattern(#[from] AddressPatternError),

    /// The broadcast port is 0.
    #[error("broadcast port must be between 1 and 65535")]
    InvalidPort,
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
pub struct SinkConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Broadcast destination and local interface selection.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Wildcard IPv4 pattern selecting the local interface, e.g. `192.168.*.*`.
    #[serde(default = "default_interface_preference")]
    pub interface_preference: String,
    /// UDP port the datagrams are sent to.
    #[serde(default = "default_broadcast_port")]
    pub broadcast_port: u16,
}

/// Logging behaviour.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log every sent event.
    #[serde(default)]
    pub verbose: bool,
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_interface_preference() -> String {
    DEFAULT_INTERFACE_PREFERENCE.to_string()
}
fn default_broadcast_port() -> u16 {
    DEFAULT_BROADCAST_PORT
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            interface_preference: default_interface_preference(),
            broadcast_port: default_broadcast_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_level: default_log_level(),
        }
    }
}

impl SinkConfig {
    /// Parses the interface preference.
    pub fn interface_pattern(&self) -> Result<InterfacePattern, ConfigError> {
        Ok(InterfacePattern::parse(&self.network.interface_preference)?)
    }

    /// Checks every value that can be wrong independently of the environment.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.broadcast_port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        self.interface_pattern()?;
        Ok(())
    }

    /// The effective default log filter: `debug` when verbose, else `log_level`.
    pub fn default_log_filter(&self) -> &str {
        if self.logging.verbose {
            "debug"
        } else {
            self.logging.log_level.as_str()
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads the config from `path`, or from the default location when `path` is
/// `None`.  A missing file yields the defaults.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: Option<&Path>) -> Result<SinkConfig, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match config_file_path() {
            Ok(p) => p,
            // No home directory at all: nothing to load.
            Err(ConfigError::NoPlatformConfigDir) => return Ok(SinkConfig::default()),
            Err(e) => return Err(e),
        },
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => parse_config(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SinkConfig::default()),
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

/// Parses config TOML text.
pub fn parse_config(content: &str) -> Result<SinkConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Resolves the platform config directory including the `rawsink` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("rawsink"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("rawsink"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("rawsink")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
