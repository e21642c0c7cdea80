//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/cortex/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/cortex/` (~/.config/cortex/)
//! - Data: `$XDG_DATA_HOME/cortex/` (~/.local/share/cortex/)
//! - State/Logs: `$XDG_STATE_HOME/cortex/` (~/.local/state/cortex/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
pub fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Briefing budgets and output location
    #[serde(default)]
    pub briefing: BriefingConfig,

    /// Event store location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Briefing budget configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BriefingConfig {
    /// Approximate token budget for the whole document
    #[serde(default = "default_max_briefing_tokens")]
    pub max_briefing_tokens: usize,

    /// Immortal events rendered with their full content
    #[serde(default = "default_max_full_decisions")]
    pub max_full_decisions: usize,

    /// Immortal events rendered as one-line summaries after the full ones
    #[serde(default = "default_max_summary_decisions")]
    pub max_summary_decisions: usize,

    /// Upper bound on events loaded into the recent tier
    #[serde(default = "default_max_recent_events")]
    pub max_recent_events: usize,

    /// Briefing file location, relative to the project root
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

impl Default for BriefingConfig {
    fn default() -> Self {
        Self {
            max_briefing_tokens: default_max_briefing_tokens(),
            max_full_decisions: default_max_full_decisions(),
            max_summary_decisions: default_max_summary_decisions(),
            max_recent_events: default_max_recent_events(),
            output_path: default_output_path(),
        }
    }
}

impl BriefingConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.max_briefing_tokens == 0 {
            return Err(Error::Config(
                "briefing.max_briefing_tokens must be greater than 0".to_string(),
            ));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(Error::Config(
                "briefing.output_path must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the briefing output file for a project root.
    pub fn output_file(&self, project_root: &Path) -> PathBuf {
        if self.output_path.is_absolute() {
            self.output_path.clone()
        } else {
            project_root.join(&self.output_path)
        }
    }
}

fn default_max_briefing_tokens() -> usize {
    3000
}

fn default_max_full_decisions() -> usize {
    10
}

fn default_max_summary_decisions() -> usize {
    20
}

fn default_max_recent_events() -> usize {
    30
}

fn default_output_path() -> PathBuf {
    PathBuf::from(".claude/rules/cortex-briefing.md")
}

/// Storage location overrides
#[derive(Debug, Deserialize, Default, Clone)]
pub struct StorageConfig {
    /// Override for the data directory holding `cortex.db`
    pub data_dir: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
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

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::debug!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.briefing.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/cortex/config.toml` (~/.config/cortex/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("cortex").join("config.toml")
    }

    /// Returns the data directory path (for the SQLite event store)
    ///
    /// Honors `storage.data_dir`, otherwise `$XDG_DATA_HOME/cortex/`.
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .unwrap_or_else(|| xdg_data_home().join("cortex"))
    }

    /// Returns the database file path inside [`Config::data_dir`]
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join("cortex.db")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/cortex/` (~/.local/state/cortex/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("cortex")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("cortex.log")
    }
}
