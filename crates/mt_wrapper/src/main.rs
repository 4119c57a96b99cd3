//! MinePass wrapper for a Minetest server.
//!
//! Loads configuration, prepares the roster-backed authorization directory
//! and runs the supervised server until it exits or a termination signal
//! arrives.

mod cli;
mod config;
mod logging;
mod roster;
mod signals;

use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{error, info};

use wrapper_core::{shutdown_channel, AuthDirectory, Supervisor};

use crate::cli::CliArgs;
use crate::config::AppConfig;
use crate::roster::{OfflineDirectory, RosterTasks};

/// Main application struct.
pub struct Application {
    config: AppConfig,
    directory: Arc<OfflineDirectory>,
}

impl Application {
    pub async fn new(args: CliArgs) -> Result<Self> {
        let config_path = args
            .resolved_config_path()
            .ok_or_else(|| anyhow!("A world directory is required (--world <DIR>)"))?;

        // Load configuration first (before logging setup)
        let (mut config, created) = AppConfig::load_from_file(&config_path).await?;
        config.apply_cli(&args);

        if let Err(e) = config.validate() {
            return Err(anyhow!("Configuration validation failed: {}", e));
        }

        logging::setup_logging(&config.logging)?;

        info!("MinePass Minetest Wrapper v{}", env!("CARGO_PKG_VERSION"));
        if created {
            info!("Created default configuration file: {}", config_path.display());
        }
        info!("Config: {} | World: {}", config_path.display(), config.world_path().display());

        let directory = Arc::new(OfflineDirectory::load(config.roster_path(), config.world_path()).await?);
        directory.backup_auth_for_import().await?;
        directory.update_local_auth().await?;

        Ok(Self { config, directory })
    }

    pub async fn run(self) -> Result<i32> {
        let wrapper_config = self.config.to_wrapper_config();
        let tasks = Arc::new(RosterTasks::new(self.directory.clone(), self.config.wrapper.enforce_roster));
        let supervisor = Supervisor::new(wrapper_config, self.directory, tasks);

        let (trigger, signal) = shutdown_channel();
        signals::spawn_signal_handler(trigger);

        let console = BufReader::new(tokio::io::stdin());
        let status = supervisor.run(console, signal).await?;

        info!("MinePass wrapper stopped");
        Ok(status.and_then(|s| s.code()).unwrap_or(0))
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let args = CliArgs::parse();

    let app = match Application::new(args).await {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Failed to start wrapper: {:#}", e);
            std::process::exit(1);
        }
    };

    // Reading stdin parks a blocking thread the runtime cannot reclaim, so
    // exit explicitly instead of waiting for runtime shutdown.
    match app.run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("Wrapper error: {:#}", e);
            std::process::exit(1);
        }
    }
}
