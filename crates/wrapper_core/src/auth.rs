//! Authorization directory interface.
//!
//! The hosted authorization service is an external collaborator. The core
//! only needs the narrow set of calls below; the binary supplies an
//! implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::WrapperError;

/// A player record known to the authorization directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: Uuid,
    pub name: String,
}

/// One mod entry reported with the server details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginEntry {
    pub name: String,
    pub version: String,
    pub source: String,
}

/// Server description sent to the directory once the server is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDetails {
    pub plugin_type: String,
    pub plugin_version: String,
    pub game_realm: String,
    pub game_version: Option<String>,
    pub game_version_raw: String,
    pub plugins: Vec<PluginEntry>,
    /// Pre-existing auth list to import, when the directory has not
    /// imported one yet.
    pub whitelist_import: Option<PathBuf>,
}

impl ServerDetails {
    /// Starts a details record for the given wrapper and game version.
    pub fn new(plugin_version: &str, game_version: Option<String>) -> Self {
        let raw = format!("Minetest {}", game_version.as_deref().unwrap_or("unknown"));
        Self {
            plugin_type: "minetest-wrapper".to_string(),
            plugin_version: plugin_version.to_string(),
            game_realm: "os".to_string(),
            game_version,
            game_version_raw: raw,
            plugins: Vec::new(),
            whitelist_import: None,
        }
    }

    /// Adds a mod, falling back to the game version when the mod did not
    /// report one.
    pub fn add_plugin(&mut self, name: &str, version: &str) {
        let version = if version.is_empty() {
            self.game_version.clone().unwrap_or_default()
        } else {
            version.to_string()
        };
        self.plugins.push(PluginEntry {
            name: name.to_string(),
            version,
            source: name.to_string(),
        });
    }
}

#[async_trait]
pub trait AuthDirectory: Send + Sync {
    /// Looks a player up by login name. `Ok(None)` is a normal miss.
    async fn resolve_player_by_name(&self, name: &str) -> Result<Option<PlayerRecord>, WrapperError>;

    /// The details most recently accepted by the directory, if any.
    async fn current_server_details(&self) -> Result<Option<ServerDetails>, WrapperError>;

    async fn send_server_details(&self, details: &ServerDetails) -> Result<(), WrapperError>;

    fn server_join_url(&self) -> String;

    fn founder_name(&self) -> String;

    fn whitelist_imported(&self) -> bool;

    /// Regenerates the local auth file from directory data.
    async fn update_local_auth(&self) -> Result<(), WrapperError>;
}
