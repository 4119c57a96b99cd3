//! Scheduled reconciliation.
//!
//! Once the server is ready, a fixed-interval loop runs the externally
//! defined reconciliation tasks and then hands the next queued command to the
//! side channel.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::AuthDirectory;
use crate::commands::{CommandChannel, CommandQueue};
use crate::error::WrapperError;
use crate::shutdown::ShutdownSignal;
use crate::state::SharedState;

/// Reconciliation run once per tick.
#[async_trait]
pub trait GameserverTasks: Send + Sync {
    async fn run_tasks(&self, control: &ServerControl) -> Result<(), WrapperError>;
}

/// Primitives the reconciliation tasks use to act on the server. Players are
/// addressed by id and translated to names through the login cache.
#[derive(Clone)]
pub struct ServerControl {
    state: Arc<SharedState>,
    queue: Arc<CommandQueue>,
    directory: Arc<dyn AuthDirectory>,
}

impl ServerControl {
    pub fn new(state: Arc<SharedState>, queue: Arc<CommandQueue>, directory: Arc<dyn AuthDirectory>) -> Self {
        Self { state, queue, directory }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Online players keyed by id.
    pub fn current_players(&self) -> HashMap<Uuid, String> {
        self.state.current_players_by_id()
    }

    /// Kicks a player. Unknown ids are skipped with a warning.
    pub fn kick_player(&self, player_id: &Uuid, message: &str) -> Result<(), WrapperError> {
        match self.state.player_name(player_id) {
            Some(name) => self.queue.push_command("/kick", &[&name, message]),
            None => {
                warn!("Cannot kick unknown player id {}", player_id);
                Ok(())
            }
        }
    }

    /// Sends a private message. Does nothing when the id is unknown.
    pub fn warn_player(&self, player_id: &Uuid, message: &str) -> Result<(), WrapperError> {
        match self.state.player_name(player_id) {
            Some(name) => self.queue.push_command("/msg", &[&name, message]),
            None => Ok(()),
        }
    }

    /// Like [`warn_player`](Self::warn_player), pointing the player at the
    /// signup page.
    pub fn warn_player_pass(&self, player_id: &Uuid, message: &str) -> Result<(), WrapperError> {
        let message = format!("{} Please signup at: {}", message, self.directory.server_join_url());
        self.warn_player(player_id, &message)
    }

    /// Rewrites the local auth file and tells the server to reload it.
    pub async fn update_and_reload_local_auth(&self) -> Result<(), WrapperError> {
        self.directory.update_local_auth().await?;
        self.queue.push("/auth_reload")?;
        info!("Local auth updated");
        Ok(())
    }
}

/// Runs `tasks` every `interval` and drains one command per tick, until
/// shutdown.
pub async fn run_task_loop(
    tasks: Arc<dyn GameserverTasks>,
    control: ServerControl,
    channel: Arc<dyn CommandChannel>,
    interval: Duration,
    mut shutdown: ShutdownSignal,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick fires immediately.
    ticker.tick().await;

    info!("Scheduled tasks running every {:?}", interval);
    loop {
        tokio::select! {
            biased;
            _ = shutdown.wait() => break,
            _ = ticker.tick() => {}
        }

        if let Err(e) = tasks.run_tasks(&control).await {
            error!("Scheduled tasks failed: {}", e);
        }
        if let Err(e) = control.queue.deliver_next(channel.as_ref()).await {
            error!("Failed to deliver server command: {}", e);
        }
    }
    info!("Scheduled tasks stopped");
}
