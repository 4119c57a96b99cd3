//! Shared wrapper state.
//!
//! Facts discovered from the server log are stored here and read by the
//! scheduled tasks and the command layer. Every field is updated with a single
//! atomic operation, so no caller ever needs to hold a lock across calls.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Process-lifetime fact store shared by the dispatcher and the task loop.
#[derive(Debug, Default)]
pub struct SharedState {
    /// Player name to id, as resolved on login. Never cleared by logout.
    player_ids: DashMap<String, Uuid>,
    /// Player id to name, the reverse of `player_ids`.
    player_names: DashMap<Uuid, String>,
    /// Players currently online, keyed by name since log events use names.
    current_players: DashMap<String, Uuid>,
    /// Mods announced at startup, name to version (empty when not reported).
    mods: DashMap<String, String>,
    server_version: RwLock<Option<String>>,
    started: AtomicBool,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    // --- lifecycle --------------------------------------------------------

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Flips the started flag. Returns `true` only for the call that
    /// performed the transition.
    pub fn mark_started(&self) -> bool {
        self.started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn mark_stopped(&self) {
        self.started.store(false, Ordering::Release);
    }

    // --- server facts -----------------------------------------------------

    pub fn server_version(&self) -> Option<String> {
        self.server_version.read().clone()
    }

    pub fn set_server_version(&self, version: impl Into<String>) {
        *self.server_version.write() = Some(version.into());
    }

    pub fn record_mod(&self, name: impl Into<String>, version: impl Into<String>) {
        self.mods.insert(name.into(), version.into());
    }

    pub fn has_mod(&self, name: &str) -> bool {
        self.mods.contains_key(name)
    }

    /// Snapshot of announced mods, sorted by name.
    pub fn mods(&self) -> Vec<(String, String)> {
        let mut mods: Vec<(String, String)> = self
            .mods
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        mods.sort();
        mods
    }

    // --- players ----------------------------------------------------------

    /// Caches the name/id pair in both directions.
    pub fn cache_player(&self, name: &str, id: Uuid) {
        self.player_names.insert(id, name.to_string());
        self.player_ids.insert(name.to_string(), id);
    }

    pub fn player_id(&self, name: &str) -> Option<Uuid> {
        self.player_ids.get(name).map(|e| *e.value())
    }

    pub fn player_name(&self, id: &Uuid) -> Option<String> {
        self.player_names.get(id).map(|e| e.value().clone())
    }

    pub fn player_joined(&self, name: &str, id: Uuid) {
        self.current_players.insert(name.to_string(), id);
    }

    /// Removes a player from the online set. Returns the id they had.
    pub fn player_left(&self, name: &str) -> Option<Uuid> {
        self.current_players.remove(name).map(|(_, id)| id)
    }

    pub fn is_online(&self, name: &str) -> bool {
        self.current_players.contains_key(name)
    }

    pub fn online_count(&self) -> usize {
        self.current_players.len()
    }

    /// Current players keyed by id, the shape the scheduled tasks work with.
    pub fn current_players_by_id(&self) -> HashMap<Uuid, String> {
        self.current_players
            .iter()
            .map(|e| (*e.value(), e.key().clone()))
            .collect()
    }
}
