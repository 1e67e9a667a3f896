//! Configuration loading and root folder resolution
//!
//! Bootstrap settings come from one TOML file. Values that can also be given
//! on the command line or in the environment are resolved in this order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::store::ISSUES_SLOT;
use crate::workflow::TransitionPolicy;
use crate::{Error, Result};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "ROADIT_ROOT_FOLDER";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5780;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the issue slot (JSON file or SQLite database)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// External service settings; API keys may instead come from the
    /// environment
    #[serde(default)]
    pub gateways: GatewaysToml,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error); RUST_LOG wins
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Where the issue slot is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// `<root>/<slot>.json`
    #[default]
    File,
    /// `<root>/roadit.db`, table `slots`
    Sqlite,
    /// Process memory; lost on exit
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageKind,

    #[serde(default = "default_slot")]
    pub slot: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageKind::default(),
            slot: default_slot(),
        }
    }
}

fn default_slot() -> String {
    ISSUES_SLOT.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub policy: TransitionPolicy,
}

/// Raw `[gateways]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewaysToml {
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default)]
    pub maps_api_key: Option<String>,
    #[serde(default)]
    pub assessment_model: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File(PathBuf),
    /// Built-in defaults, with the reason no file was used
    Defaults(String),
}

/// Parsed configuration plus its origin
///
/// Loading happens before the subscriber exists, so the origin is reported
/// later through [`LoadedConfig::log_source`].
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TomlConfig,
    pub source: ConfigSource,
}

impl LoadedConfig {
    pub fn log_source(&self) {
        match &self.source {
            ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
            ConfigSource::Defaults(reason) => warn!("{}; using built-in defaults", reason),
        }
    }
}

/// Load the config file, falling back to defaults
///
/// An explicitly named file must exist and parse. Without one, the
/// platform locations are tried and a missing or unreadable file just means
/// defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        return Ok(LoadedConfig {
            config: load_toml_config(path)?,
            source: ConfigSource::File(path.to_path_buf()),
        });
    }

    let loaded = match default_config_path() {
        Some(path) => match load_toml_config(&path) {
            Ok(config) => LoadedConfig {
                config,
                source: ConfigSource::File(path),
            },
            Err(e) => LoadedConfig {
                config: TomlConfig::default(),
                source: ConfigSource::Defaults(e.to_string()),
            },
        },
        None => LoadedConfig {
            config: TomlConfig::default(),
            source: ConfigSource::Defaults("No config file found".to_string()),
        },
    };
    Ok(loaded)
}

/// First existing config file among the platform locations
///
/// `~/.config/roadit/config.toml`, then `/etc/roadit/config.toml` on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("roadit").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/roadit/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Root folder: CLI → `ROADIT_ROOT_FOLDER` → TOML → OS default
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("roadit"))
        .unwrap_or_else(|| PathBuf::from("./roadit_data"))
}

/// Port: CLI/env (already merged by clap) → TOML → default
pub fn resolve_port(cli_arg: Option<u16>, toml_config: &TomlConfig) -> u16 {
    cli_arg.or(toml_config.port).unwrap_or(DEFAULT_PORT)
}
