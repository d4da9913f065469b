//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/eduflow/config.toml)
//! 3. Environment variables (EDUFLOW_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix
const ENV_PREFIX: &str = "EDUFLOW";

/// Attendance older than this many days is read-only
pub const DEFAULT_FREEZE_WINDOW_DAYS: i64 = 7;

/// Domain used for generated account emails
pub const DEFAULT_EMAIL_DOMAIN: &str = "eduflow.edu";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the stored collections
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Days after which an attendance sheet can no longer be edited
    #[serde(default = "default_freeze_window_days")]
    pub freeze_window_days: i64,

    /// Domain for generated student and staff emails
    #[serde(default = "default_email_domain")]
    pub email_domain: String,

    /// Log filter directive (e.g. "warn", "debug", "eduflow_core=trace")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            freeze_window_days: DEFAULT_FREEZE_WINDOW_DAYS,
            email_domain: DEFAULT_EMAIL_DOMAIN.to_string(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (EDUFLOW_DATA_DIR, EDUFLOW_FREEZE_WINDOW_DAYS, ...)
    /// 2. Config file (~/.config/eduflow/config.toml or EDUFLOW_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit path from the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_path(p),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_FREEZE_WINDOW_DAYS", ENV_PREFIX)) {
            self.freeze_window_days = val
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}_FREEZE_WINDOW_DAYS: {:?}", ENV_PREFIX, val))?;
        }

        if let Ok(val) = std::env::var(format!("{}_EMAIL_DOMAIN", ENV_PREFIX)) {
            if !val.is_empty() {
                self.email_domain = val;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_LOG", ENV_PREFIX)) {
            if !val.is_empty() {
                self.log_level = val;
            }
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.freeze_window_days < 0 {
            anyhow::bail!(
                "freeze_window_days must not be negative (got {})",
                self.freeze_window_days
            );
        }
        if self.email_domain.trim().is_empty() {
            anyhow::bail!("email_domain must not be empty");
        }
        Ok(())
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with EDUFLOW_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("eduflow")
            .join("config.toml")
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("eduflow")
}

fn default_freeze_window_days() -> i64 {
    DEFAULT_FREEZE_WINDOW_DAYS
}

fn default_email_domain() -> String {
    DEFAULT_EMAIL_DOMAIN.to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}
