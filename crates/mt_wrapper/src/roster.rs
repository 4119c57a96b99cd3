//! Offline player roster.
//!
//! A TOML file in the world directory stands in for the hosted
//! authorization service: it lists the players allowed on the server with
//! their auth secrets and privileges. The roster generates the server's
//! `auth.txt` and, when enforcement is on, players missing from it are
//! kicked.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use wrapper_core::{AuthDirectory, GameserverTasks, PlayerRecord, ServerControl, ServerDetails, WrapperError};

const AUTH_FILE: &str = "auth.txt";
const AUTH_SHADOW_FILE: &str = "auth.shadow.txt";
const AUTH_IMPORT_FILE: &str = "auth.import.txt";
const DETAILS_FILE: &str = "minepass-details.json";

/// Realm of accounts that live in this server's `auth.txt`.
const LOCAL_REALM: &str = "os";

/// Granted for the `mt:all` privilege.
const ALL_PRIVILEGES: [&str; 18] = [
    "server",
    "shout",
    "fly",
    "password",
    "bring",
    "kick",
    "teleport",
    "ban",
    "noclip",
    "interact",
    "fast",
    "home",
    "privs",
    "give",
    "protection_bypass",
    "rollback",
    "settime",
    "basic_privs",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterPlayer {
    pub id: Uuid,
    pub name: String,
    /// Password hash as stored in `auth.txt`
    #[serde(default)]
    pub secret: String,
    /// Privileges as `mt:<name>`; `mt:all` grants everything
    #[serde(default)]
    pub privileges: Vec<String>,
    /// Only players in the local realm are written to `auth.txt`
    #[serde(default = "default_realm")]
    pub realm: String,
}

fn default_realm() -> String {
    LOCAL_REALM.to_string()
}

impl RosterPlayer {
    fn auth_line(&self) -> String {
        let mut privileges: Vec<&str> = Vec::new();
        for p in &self.privileges {
            match p.strip_prefix("mt:") {
                Some("all") => privileges.extend(ALL_PRIVILEGES),
                Some(name) => privileges.push(name),
                None => {}
            }
        }
        format!("{}:{}:{}", self.name, self.secret, privileges.join(","))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    pub join_url: String,
    #[serde(default)]
    pub founder: String,
    #[serde(default)]
    pub whitelist_imported: bool,
    #[serde(default)]
    pub players: Vec<RosterPlayer>,
    /// Accounts kept in `auth.txt` without a pass, name to identity line
    #[serde(default)]
    pub bypass_players: BTreeMap<String, String>,
}

impl Default for Roster {
    fn default() -> Self {
        Self {
            join_url: "https://minepass.net".to_string(),
            founder: String::new(),
            whitelist_imported: false,
            players: Vec::new(),
            bypass_players: BTreeMap::new(),
        }
    }
}

impl Roster {
    pub fn find_by_name(&self, name: &str) -> Option<&RosterPlayer> {
        self.players.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Contents of the server's `auth.txt`.
    pub fn auth_txt(&self) -> String {
        let mut out = String::new();
        for player in self.players.iter().filter(|p| p.realm.eq_ignore_ascii_case(LOCAL_REALM)) {
            out.push_str(&player.auth_line());
            out.push('\n');
        }
        for (name, identity) in &self.bypass_players {
            out.push_str(&format!("{}:{}\n", name, identity));
        }
        out
    }
}

fn parse_roster(path: &Path, content: &str) -> Result<Roster, WrapperError> {
    toml::from_str(content).map_err(|e| WrapperError::Directory(format!("{}: {}", path.display(), e)))
}

/// [`AuthDirectory`] backed by the roster file.
pub struct OfflineDirectory {
    roster_path: PathBuf,
    world: PathBuf,
    roster: RwLock<Roster>,
}

impl OfflineDirectory {
    /// Loads the roster, writing an empty one when the file is missing.
    pub async fn load(roster_path: PathBuf, world: PathBuf) -> Result<Self, WrapperError> {
        let roster = if roster_path.exists() {
            let content = tokio::fs::read_to_string(&roster_path).await?;
            parse_roster(&roster_path, &content)?
        } else {
            let roster = Roster::default();
            save_roster(&roster_path, &roster).await?;
            info!("Created empty roster: {}", roster_path.display());
            roster
        };

        info!("Roster loaded with {} players", roster.players.len());
        Ok(Self {
            roster_path,
            world,
            roster: RwLock::new(roster),
        })
    }

    pub fn roster(&self) -> Roster {
        self.roster.read().clone()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.roster.read().players.iter().any(|p| p.id == *id)
    }

    /// Re-reads the roster file. Returns `true` when its contents changed.
    pub async fn refresh(&self) -> Result<bool, WrapperError> {
        let content = tokio::fs::read_to_string(&self.roster_path).await?;
        let fresh = parse_roster(&self.roster_path, &content)?;

        let mut roster = self.roster.write();
        if *roster == fresh {
            return Ok(false);
        }
        *roster = fresh;
        Ok(true)
    }

    /// Keeps a copy of the server's existing `auth.txt` so it can be offered
    /// for import. Only done once, and only before the import happened.
    pub async fn backup_auth_for_import(&self) -> Result<bool, WrapperError> {
        if self.roster.read().whitelist_imported {
            return Ok(false);
        }

        let auth = self.world.join(AUTH_FILE);
        let backup = self.world.join(AUTH_IMPORT_FILE);
        let has_auth = match tokio::fs::metadata(&auth).await {
            Ok(meta) => meta.len() > 0,
            Err(_) => false,
        };
        if !has_auth || backup.exists() {
            return Ok(false);
        }

        tokio::fs::copy(&auth, &backup).await?;
        info!("Saved existing auth list to {}", backup.display());
        Ok(true)
    }

    fn details_path(&self) -> PathBuf {
        self.world.join(DETAILS_FILE)
    }
}

async fn save_roster(path: &Path, roster: &Roster) -> Result<(), WrapperError> {
    let content = toml::to_string_pretty(roster).map_err(|e| WrapperError::Directory(e.to_string()))?;
    tokio::fs::write(path, content).await?;
    Ok(())
}

#[async_trait]
impl AuthDirectory for OfflineDirectory {
    async fn resolve_player_by_name(&self, name: &str) -> Result<Option<PlayerRecord>, WrapperError> {
        Ok(self.roster.read().find_by_name(name).map(|p| PlayerRecord {
            id: p.id,
            name: p.name.clone(),
        }))
    }

    async fn current_server_details(&self) -> Result<Option<ServerDetails>, WrapperError> {
        match tokio::fs::read_to_string(self.details_path()).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn send_server_details(&self, details: &ServerDetails) -> Result<(), WrapperError> {
        let json = serde_json::to_string_pretty(details)?;
        tokio::fs::write(self.details_path(), json).await?;

        if let Some(import) = &details.whitelist_import {
            if import.is_file() {
                let snapshot = {
                    let mut roster = self.roster.write();
                    roster.whitelist_imported = true;
                    roster.clone()
                };
                save_roster(&self.roster_path, &snapshot).await?;
                info!("Auth list {} marked as imported", import.display());
            }
        }
        Ok(())
    }

    fn server_join_url(&self) -> String {
        self.roster.read().join_url.clone()
    }

    fn founder_name(&self) -> String {
        self.roster.read().founder.clone()
    }

    fn whitelist_imported(&self) -> bool {
        self.roster.read().whitelist_imported
    }

    async fn update_local_auth(&self) -> Result<(), WrapperError> {
        let auth_txt = self.roster.read().auth_txt();
        let shadow = self.world.join(AUTH_SHADOW_FILE);
        tokio::fs::write(&shadow, auth_txt).await?;
        tokio::fs::copy(&shadow, self.world.join(AUTH_FILE)).await?;
        Ok(())
    }
}

/// Scheduled roster reconciliation.
pub struct RosterTasks {
    directory: Arc<OfflineDirectory>,
    enforce: bool,
    kicked: Mutex<HashSet<Uuid>>,
}

impl RosterTasks {
    pub fn new(directory: Arc<OfflineDirectory>, enforce: bool) -> Self {
        Self {
            directory,
            enforce,
            kicked: Mutex::new(HashSet::new()),
        }
    }
}

#[async_trait]
impl GameserverTasks for RosterTasks {
    async fn run_tasks(&self, control: &ServerControl) -> Result<(), WrapperError> {
        if self.directory.refresh().await? {
            info!("Roster changed");
            control.update_and_reload_local_auth().await?;
        }

        if !self.enforce {
            return Ok(());
        }

        let current = control.current_players();
        let mut to_kick = Vec::new();
        {
            let mut kicked = self.kicked.lock();
            kicked.retain(|id| current.contains_key(id));
            for (id, name) in &current {
                if !self.directory.contains(id) && kicked.insert(*id) {
                    to_kick.push((*id, name.clone()));
                }
            }
        }

        for (id, name) in to_kick {
            warn!("Player {} is not on the roster", name);
            let message = format!(
                "You do not have a pass for this server. Please signup at: {}",
                self.directory.server_join_url()
            );
            control.kick_player(&id, &message)?;
        }
        Ok(())
    }
}
