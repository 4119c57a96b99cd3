//! Configuration management for the wrapper.
//!
//! Settings live in a TOML file, by default `minepass.toml` in the world
//! directory. A missing file is created with defaults on first start.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use wrapper_core::config::default_server_binary;
use wrapper_core::WrapperConfig;

use crate::cli::CliArgs;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub wrapper: WrapperSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// How to launch the Minetest server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub binary: String,
    /// World directory; `--world` takes precedence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world: Option<String>,
    /// Extra arguments appended to the server command line
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub ignore_missing_world: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            binary: default_server_binary().display().to_string(),
            world: None,
            args: Vec::new(),
            ignore_missing_world: false,
        }
    }
}

fn default_login_delay_ms() -> u64 {
    1500
}

fn default_launch_delay_ms() -> u64 {
    1500
}

fn default_task_interval_ms() -> u64 {
    1000
}

fn default_command_queue_capacity() -> usize {
    256
}

fn default_max_hold_lines() -> usize {
    10_000
}

fn default_command_file() -> String {
    "command.txt".to_string()
}

fn default_roster_file() -> String {
    "minepass-roster.toml".to_string()
}

/// Wrapper timing, queue sizes and roster behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WrapperSettings {
    #[serde(default = "default_login_delay_ms")]
    pub login_delay_ms: u64,
    #[serde(default = "default_launch_delay_ms")]
    pub launch_delay_ms: u64,
    #[serde(default = "default_task_interval_ms")]
    pub task_interval_ms: u64,
    #[serde(default = "default_command_queue_capacity")]
    pub command_queue_capacity: usize,
    /// Zero disables the bound
    #[serde(default = "default_max_hold_lines")]
    pub max_hold_lines: usize,
    /// Relative to the world directory
    #[serde(default = "default_command_file")]
    pub command_file: String,
    /// Relative to the world directory
    #[serde(default = "default_roster_file")]
    pub roster_file: String,
    /// Kick online players missing from the roster
    #[serde(default)]
    pub enforce_roster: bool,
}

impl Default for WrapperSettings {
    fn default() -> Self {
        Self {
            login_delay_ms: default_login_delay_ms(),
            launch_delay_ms: default_launch_delay_ms(),
            task_interval_ms: default_task_interval_ms(),
            command_queue_capacity: default_command_queue_capacity(),
            max_hold_lines: default_max_hold_lines(),
            command_file: default_command_file(),
            roster_file: default_roster_file(),
            enforce_roster: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from `path`, writing a default file when it does
    /// not exist.
    ///
    /// # Returns
    ///
    /// The configuration, and `true` when the default file was just created.
    /// Logging is not set up yet at this point, so reporting the creation is
    /// left to the caller.
    pub async fn load_from_file(path: &Path) -> Result<(Self, bool)> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: AppConfig =
                toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok((config, false))
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Ok((default_config, true))
        }
    }

    /// Applies command-line overrides on top of the loaded file.
    pub fn apply_cli(&mut self, args: &CliArgs) {
        if let Some(binary) = &args.server_binary {
            self.server.binary = binary.display().to_string();
        }
        if let Some(world) = &args.world {
            self.server.world = Some(world.display().to_string());
        }
        if args.ignore_missing_world {
            self.server.ignore_missing_world = true;
        }
        if !args.server_args.is_empty() {
            self.server.args = args.server_args.clone();
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.binary.trim().is_empty() {
            return Err("Server binary cannot be empty".to_string());
        }

        match &self.server.world {
            Some(world) if !world.trim().is_empty() => {}
            _ => return Err("World directory is required (--world)".to_string()),
        }

        if self.wrapper.task_interval_ms == 0 {
            return Err("task_interval_ms must be greater than zero".to_string());
        }

        if self.wrapper.command_queue_capacity == 0 {
            return Err("command_queue_capacity must be greater than zero".to_string());
        }

        if self.wrapper.command_file.trim().is_empty() {
            return Err("command_file cannot be empty".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level, valid_levels
            ));
        }

        Ok(())
    }

    pub fn world_path(&self) -> PathBuf {
        PathBuf::from(self.server.world.as_deref().unwrap_or_default())
    }

    pub fn roster_path(&self) -> PathBuf {
        self.world_path().join(&self.wrapper.roster_file)
    }

    pub fn to_wrapper_config(&self) -> WrapperConfig {
        WrapperConfig {
            server_binary: PathBuf::from(&self.server.binary),
            world_path: self.world_path(),
            server_args: self.server.args.clone(),
            ignore_missing_world: self.server.ignore_missing_world,
            wrapper_version: env!("CARGO_PKG_VERSION").to_string(),
            login_delay: Duration::from_millis(self.wrapper.login_delay_ms),
            launch_delay: Duration::from_millis(self.wrapper.launch_delay_ms),
            task_interval: Duration::from_millis(self.wrapper.task_interval_ms),
            command_queue_capacity: self.wrapper.command_queue_capacity,
            max_hold_lines: self.wrapper.max_hold_lines,
            command_file: self.wrapper.command_file.clone(),
        }
    }
}
