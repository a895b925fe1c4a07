//! Configuration loading and resolution
//!
//! Every setting resolves in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable TOML file is never fatal; it logs a warning and the
//! remaining tiers apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable for the root folder
pub const ENV_ROOT_FOLDER: &str = "POPREPORT_ROOT_FOLDER";
/// Environment variable for the HTTP bind address
pub const ENV_BIND: &str = "POPREPORT_BIND";
/// Environment variable for the API access password
pub const ENV_ACCESS_PASSWORD: &str = "POPREPORT_ACCESS_PASSWORD";
/// Environment variable for the static assets folder
pub const ENV_STATIC_DIR: &str = "POPREPORT_STATIC_DIR";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "popreport.db";

/// Logging section of the TOML file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// On-disk TOML configuration; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind: Option<String>,
    pub access_password: Option<String>,
    pub static_assets: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Platform defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub bind: String,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = dirs::data_local_dir()
            .map(|d| d.join("popreport"))
            .unwrap_or_else(|| PathBuf::from("./popreport_data"));

        Self {
            root_folder,
            bind: "127.0.0.1:5730".to_string(),
            log_level: default_log_level(),
        }
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_folder: Option<PathBuf>,
    pub bind: Option<String>,
    pub static_assets: Option<PathBuf>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub bind: String,
    /// `None` disables password gating
    pub access_password: Option<String>,
    pub static_assets: Option<PathBuf>,
    pub log_level: String,
}

impl ServiceConfig {
    /// Path of the SQLite database inside the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    /// Create the root folder if it does not exist yet
    pub fn ensure_root_folder(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        Ok(())
    }
}

/// Resolves [`ServiceConfig`] from CLI, environment, TOML and defaults
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    toml_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Resolver reading the platform TOML location
    pub fn new() -> Self {
        Self {
            toml_path: default_toml_path(),
        }
    }

    /// Resolver reading an explicit TOML file
    pub fn with_toml_path(path: impl Into<PathBuf>) -> Self {
        Self {
            toml_path: Some(path.into()),
        }
    }

    /// Load the TOML tier, degrading to defaults on any problem
    pub fn load_toml(&self) -> TomlConfig {
        let Some(path) = &self.toml_path else {
            debug!("No TOML config location for this platform");
            return TomlConfig::default();
        };

        if !path.exists() {
            debug!("TOML config not found at {}", path.display());
            return TomlConfig::default();
        }

        match load_toml_config(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring TOML config {}: {}", path.display(), e);
                TomlConfig::default()
            }
        }
    }

    pub fn resolve(&self, cli: &CliOverrides) -> ServiceConfig {
        let toml = self.load_toml();
        let defaults = CompiledDefaults::for_current_platform();

        let root_folder = cli
            .root_folder
            .clone()
            .or_else(|| env_value(ENV_ROOT_FOLDER).map(PathBuf::from))
            .or(toml.root_folder)
            .unwrap_or(defaults.root_folder);

        let bind = cli
            .bind
            .clone()
            .or_else(|| env_value(ENV_BIND))
            .or(toml.bind)
            .unwrap_or(defaults.bind);

        let access_password = env_value(ENV_ACCESS_PASSWORD)
            .or(toml.access_password)
            .filter(|p| !p.trim().is_empty());

        let static_assets = cli
            .static_assets
            .clone()
            .or_else(|| env_value(ENV_STATIC_DIR).map(PathBuf::from))
            .or(toml.static_assets);

        ServiceConfig {
            root_folder,
            bind,
            access_password,
            static_assets,
            log_level: toml.logging.level,
        }
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Platform location of the TOML config file
///
/// On Linux the per-user file wins over `/etc/popreport/config.toml`.
pub fn default_toml_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("popreport").join("config.toml"));

    if cfg!(target_os = "linux") {
        if let Some(path) = &user_config {
            if path.exists() {
                return user_config;
            }
        }
        let system_config = PathBuf::from("/etc/popreport/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    user_config
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
