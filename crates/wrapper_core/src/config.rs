//! Runtime settings for the supervisor.
//!
//! This is the resolved, validated form; file and command-line parsing live
//! in the binary.

use std::path::PathBuf;
use std::time::Duration;

/// Default server binary for the current platform.
pub fn default_server_binary() -> PathBuf {
    if cfg!(target_os = "macos") {
        PathBuf::from("/Applications/minetest.app/Contents/MacOS/minetest")
    } else if cfg!(windows) {
        PathBuf::from("minetest.exe")
    } else {
        PathBuf::from("minetest")
    }
}

#[derive(Debug, Clone)]
pub struct WrapperConfig {
    pub server_binary: PathBuf,
    pub world_path: PathBuf,
    /// Extra arguments appended to the server command line.
    pub server_args: Vec<String>,
    pub ignore_missing_world: bool,
    pub wrapper_version: String,
    pub login_delay: Duration,
    pub launch_delay: Duration,
    pub task_interval: Duration,
    pub command_queue_capacity: usize,
    /// Continuation lines one hold may consume before it is force-released.
    /// Zero disables the bound.
    pub max_hold_lines: usize,
    /// Command file name, relative to the world directory.
    pub command_file: String,
}

impl Default for WrapperConfig {
    fn default() -> Self {
        Self {
            server_binary: default_server_binary(),
            world_path: PathBuf::from("world"),
            server_args: Vec::new(),
            ignore_missing_world: false,
            wrapper_version: env!("CARGO_PKG_VERSION").to_string(),
            login_delay: Duration::from_millis(1500),
            launch_delay: Duration::from_millis(1500),
            task_interval: Duration::from_secs(1),
            command_queue_capacity: 256,
            max_hold_lines: 10_000,
            command_file: "command.txt".to_string(),
        }
    }
}

impl WrapperConfig {
    pub fn command_file_path(&self) -> PathBuf {
        self.world_path.join(&self.command_file)
    }

    /// Pre-existing auth list offered for import on first activation.
    pub fn auth_import_path(&self) -> PathBuf {
        self.world_path.join("auth.import.txt")
    }
}
