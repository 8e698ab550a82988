//! Configuration file shared by the three tools.
//!
//! ```yaml
//! database:
//!   database_path: /var/lib/doorkeeper/doorkeeper.db
//! hardware:
//!   backend: sysfs
//!   reader:
//!     command: nfc-read
//! engine:
//!   unlock_hold_secs: 3
//! logging:
//!   level: debug
//! ```
//!
//! Every section, and every field inside it, may be omitted.

use std::path::{Path, PathBuf};

use anyhow::Context;
use doorkeeper_core::constants::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use doorkeeper_engine::EngineConfig;
use doorkeeper_hardware::HardwareConfig;
use doorkeeper_storage::DatabaseConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub hardware: HardwareConfig,
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset: `trace`, `debug`, `info`, `warn` or `error`.
    pub level: String,
    /// Include the module target in each line.
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            with_target: false,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Load from `path`, falling back to [`Config::default`] only when the
    /// file does not exist. A file that exists but does not parse is an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// The path to read: the explicit argument, then `DOORKEEPER_CONFIG`,
    /// then the system default.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        Self::resolve_path_with(explicit, std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
    }

    fn resolve_path_with(explicit: Option<&Path>, from_env: Option<PathBuf>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or(from_env.filter(|p| !p.as_os_str().is_empty()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }
}
