//! Drives the dispatcher end to end through its line channel.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;
use wrapper_core::{
    shutdown_channel, AuthDirectory, DispatchEnd, Dispatcher, EventMatcher, LifecycleHook, LineOutcome,
    MatchContext, MatcherKind, PlayerRecord, ServerDetails, SharedState, WrapperError,
};

struct RosterDirectory {
    players: Vec<PlayerRecord>,
    lookups: Mutex<Vec<String>>,
}

#[async_trait]
impl AuthDirectory for RosterDirectory {
    async fn resolve_player_by_name(&self, name: &str) -> Result<Option<PlayerRecord>, WrapperError> {
        self.lookups.lock().push(name.to_string());
        Ok(self
            .players
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn current_server_details(&self) -> Result<Option<ServerDetails>, WrapperError> {
        Ok(None)
    }

    async fn send_server_details(&self, _details: &ServerDetails) -> Result<(), WrapperError> {
        Ok(())
    }

    fn server_join_url(&self) -> String {
        "https://minepass.net/join/it".to_string()
    }

    fn founder_name(&self) -> String {
        "founder".to_string()
    }

    fn whitelist_imported(&self) -> bool {
        true
    }

    async fn update_local_auth(&self) -> Result<(), WrapperError> {
        Ok(())
    }
}

/// Records the server version and mod count seen at activation.
#[derive(Default)]
struct SnapshotHook {
    calls: AtomicUsize,
    seen: Mutex<Option<(Option<String>, usize)>>,
}

#[async_trait]
impl LifecycleHook for SnapshotHook {
    async fn server_started(&self, state: &SharedState) -> Result<(), WrapperError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen.lock() = Some((state.server_version(), state.mods().len()));
        Ok(())
    }
}

fn context(players: Vec<PlayerRecord>) -> (MatchContext, Arc<SnapshotHook>, Arc<RosterDirectory>) {
    let hook = Arc::new(SnapshotHook::default());
    let directory = Arc::new(RosterDirectory {
        players,
        lookups: Mutex::new(Vec::new()),
    });
    let ctx = MatchContext {
        state: Arc::new(SharedState::new()),
        directory: directory.clone(),
        hook: hook.clone(),
        wrapper_version: "1.2.0".to_string(),
        login_delay: Duration::ZERO,
    };
    (ctx, hook, directory)
}

fn action(thread: &str, msg: &str) -> String {
    format!("2024-03-02 10:15:01: ACTION[{thread}]: {msg}")
}

async fn feed(dispatcher: Dispatcher, lines: Vec<String>) -> DispatchEnd {
    let (tx, rx) = mpsc::channel(lines.len().max(1));
    let (_trigger, signal) = shutdown_channel();
    for line in lines {
        tx.send(line).await.expect("send");
    }
    drop(tx);
    tokio::time::timeout(Duration::from_secs(5), dispatcher.run(rx, signal))
        .await
        .expect("dispatcher should finish")
}

#[tokio::test]
async fn startup_sequence_activates_once() {
    let (ctx, hook, _) = context(vec![]);
    let state = ctx.state.clone();

    let end = feed(
        Dispatcher::new(ctx, 100),
        vec![
            "Minetest 5.4.1 (Linux)".to_string(),
            action("Main", "MinePass plugin v1.2.0"),
            action("Main", "Server: version=5.4.1, uptime=0"),
            action("Main", "[Mod] minepass"),
            action("Main", "[Mod] mesecons"),
            action("Main", "MinePass plugin loaded"),
            // A second sentinel after start must not activate again.
            action("Main", "MinePass plugin v1.2.0"),
            action("Main", "MinePass plugin loaded"),
        ],
    )
    .await;

    assert_eq!(end, DispatchEnd::StreamClosed);
    assert!(state.is_started());
    assert_eq!(state.server_version().as_deref(), Some("5.4.1"));
    assert!(state.has_mod("minepass"));
    assert!(state.has_mod("mesecons"));
    assert_eq!(hook.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*hook.seen.lock(), Some((Some("5.4.1".to_string()), 2)));
}

#[tokio::test]
async fn login_and_logout_track_players() {
    let alice = Uuid::new_v4();
    let (ctx, _, directory) = context(vec![PlayerRecord {
        id: alice,
        name: "Alice".to_string(),
    }]);
    let state = ctx.state.clone();

    feed(
        Dispatcher::new(ctx, 100),
        vec![
            action("Main", "MinePass plugin v1.2.0"),
            action("Main", "MinePass plugin loaded"),
            action("Server", "Alice [127.0.0.1] joins game. List of players: Alice"),
            action("Server", "bob [127.0.0.1] joins game. List of players: Alice, bob"),
            action("Server", "Alice leaves game. List of players: bob"),
        ],
    )
    .await;

    assert_eq!(state.player_id("Alice"), Some(alice));
    assert!(!state.is_online("Alice"));
    assert!(state.is_online("bob"));
    assert_eq!(state.online_count(), 1);

    let bob = state.player_id("bob").expect("bob cached");
    assert_eq!(state.player_name(&bob).as_deref(), Some("bob"));
    assert_eq!(*directory.lookups.lock(), vec!["Alice", "bob"]);
}

#[tokio::test]
async fn unknown_player_gets_generated_id() {
    let (ctx, _, directory) = context(vec![]);
    let state = ctx.state.clone();

    feed(
        Dispatcher::new(ctx, 100),
        vec![
            action("Main", "MinePass plugin v1.2.0"),
            action("Main", "MinePass plugin loaded"),
            action("Server", "carol joins game"),
        ],
    )
    .await;

    let id = state.player_id("carol").expect("cached");
    assert_eq!(id.get_version_num(), 4);
    assert_eq!(state.current_players_by_id().get(&id).map(String::as_str), Some("carol"));
    assert_eq!(*directory.lookups.lock(), vec!["carol"]);
}

#[tokio::test]
async fn login_before_start_changes_nothing() {
    let (ctx, _, directory) = context(vec![]);
    let mut dispatcher = Dispatcher::new(ctx, 100);

    let outcome = dispatcher.dispatch_line(&action("Server", "erin joins game")).await;

    assert_eq!(outcome, LineOutcome::Dropped);
    assert_eq!(dispatcher.context().state.online_count(), 0);
    assert!(directory.lookups.lock().is_empty());
}

#[tokio::test]
async fn only_first_matching_matcher_handles() {
    let (ctx, _, _) = context(vec![]);
    ctx.state.mark_started();
    let matchers = vec![
        EventMatcher::new(MatcherKind::Logout),
        EventMatcher::new(MatcherKind::Login),
    ];
    let mut dispatcher = Dispatcher::with_matchers(ctx, matchers, 100);

    dispatcher
        .dispatch_line(&action("Server", "frank joins game"))
        .await;
    let outcome = dispatcher
        .dispatch_line(&action("Server", "frank leaves game, then joins game"))
        .await;

    assert_eq!(outcome, LineOutcome::Handled(MatcherKind::Logout));
    assert!(!dispatcher.context().state.is_online("frank"));
}

#[tokio::test]
async fn held_thread_lines_skip_other_matchers() {
    let (ctx, _, directory) = context(vec![]);
    let state = ctx.state.clone();

    feed(
        Dispatcher::new(ctx, 100),
        vec![
            action("Main", "MinePass plugin v1.2.0"),
            // Would be a login if it went through the scan.
            action("Main", "ghost joins game"),
            action("Main", "MinePass plugin loaded"),
        ],
    )
    .await;

    assert!(state.is_started());
    assert_eq!(state.player_id("ghost"), None);
    assert!(directory.lookups.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn login_waits_for_delay_before_lookup() {
    let alice = Uuid::new_v4();
    let (mut ctx, _, directory) = context(vec![PlayerRecord {
        id: alice,
        name: "alice".to_string(),
    }]);
    ctx.login_delay = Duration::from_millis(1500);
    ctx.state.mark_started();
    let state = ctx.state.clone();
    let mut dispatcher = Dispatcher::new(ctx, 100);

    let started = tokio::time::Instant::now();
    let handle = tokio::spawn(async move {
        dispatcher
            .dispatch_line(&action("Server", "alice [127.0.0.1] joins game. List of players: alice"))
            .await
    });

    tokio::time::sleep(Duration::from_millis(1499)).await;
    assert!(directory.lookups.lock().is_empty());
    assert!(!state.is_online("alice"));
    assert!(state.current_players_by_id().is_empty());

    let outcome = handle.await.expect("dispatch task");
    assert_eq!(outcome, LineOutcome::Handled(MatcherKind::Login));
    assert!(started.elapsed() >= Duration::from_millis(1500));
    assert_eq!(*directory.lookups.lock(), vec!["alice"]);
    assert_eq!(state.current_players_by_id().get(&alice).map(String::as_str), Some("alice"));
}
