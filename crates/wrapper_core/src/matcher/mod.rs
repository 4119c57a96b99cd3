//! Log event matchers.
//!
//! Each matcher owns one pattern and the handler that runs when a message
//! matches it. A handler may answer [`MatchStatus::Hold`], after which the
//! dispatcher routes every following line of the same server thread back to
//! that matcher as a continuation until it lets go.
//!
//! The matcher set is fixed: [`MatcherKind`] is a closed enum and
//! [`EventMatcher::accept`] is the single entry point the dispatcher uses.

mod login;
mod logout;
mod startup;

use async_trait::async_trait;
use regex::{Captures, Regex};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthDirectory;
use crate::error::WrapperError;
use crate::log_line::LogLevel;
use crate::state::SharedState;

/// Result of offering a message to a matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    /// The message is not for this matcher.
    Ignored,
    /// The message was consumed and the event is complete.
    Handled,
    /// Keep sending this thread's lines to the same matcher.
    Hold,
}

/// Receives the one-time notification that the server finished starting.
#[async_trait]
pub trait LifecycleHook: Send + Sync {
    async fn server_started(&self, state: &SharedState) -> Result<(), WrapperError>;
}

/// Everything a matcher handler may touch.
#[derive(Clone)]
pub struct MatchContext {
    pub state: Arc<SharedState>,
    pub directory: Arc<dyn AuthDirectory>,
    pub hook: Arc<dyn LifecycleHook>,
    /// Version of this wrapper, compared against the server-side mod.
    pub wrapper_version: String,
    /// Pause before resolving a login, so a kick does not race the
    /// connection handshake.
    pub login_delay: Duration,
}

/// The built-in event types, in dispatch priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatcherKind {
    Startup,
    Login,
    Logout,
}

impl MatcherKind {
    pub const ALL: [MatcherKind; 3] = [MatcherKind::Startup, MatcherKind::Login, MatcherKind::Logout];

    pub fn name(&self) -> &'static str {
        match self {
            MatcherKind::Startup => "startup",
            MatcherKind::Login => "login",
            MatcherKind::Logout => "logout",
        }
    }

    /// Pattern source for the given server version. The version may be
    /// unknown when matchers are first compiled.
    fn pattern_for(&self, version: Option<&str>) -> String {
        match self {
            MatcherKind::Startup => startup::pattern_for(version),
            MatcherKind::Login => login::pattern_for(version),
            MatcherKind::Logout => logout::pattern_for(version),
        }
    }

    fn is_enabled(&self, state: &SharedState) -> bool {
        match self {
            MatcherKind::Startup => !state.is_started(),
            MatcherKind::Login | MatcherKind::Logout => state.is_started(),
        }
    }
}

struct CompiledPattern {
    version: Option<String>,
    regex: Regex,
}

/// One matcher instance, owned by the dispatcher for the process lifetime.
pub struct EventMatcher {
    kind: MatcherKind,
    compiled: Option<CompiledPattern>,
}

impl EventMatcher {
    pub fn new(kind: MatcherKind) -> Self {
        Self { kind, compiled: None }
    }

    /// The standard matcher list in priority order.
    pub fn standard_set() -> Vec<EventMatcher> {
        MatcherKind::ALL.into_iter().map(EventMatcher::new).collect()
    }

    pub fn kind(&self) -> MatcherKind {
        self.kind
    }

    pub fn is_enabled(&self, state: &SharedState) -> bool {
        self.kind.is_enabled(state)
    }

    pub fn accepts_level(&self, _level: &LogLevel) -> bool {
        true
    }

    /// Server thread naming changes between releases, so no matcher
    /// restricts on it yet.
    pub fn accepts_thread(&self, _thread: &str) -> bool {
        true
    }

    /// Returns the pattern compiled for `version`, compiling it on first use
    /// and again whenever the detected server version changes.
    fn pattern(&mut self, version: Option<String>) -> Result<&Regex, WrapperError> {
        let stale = match &self.compiled {
            Some(compiled) => compiled.version != version,
            None => true,
        };
        if stale {
            let regex = Regex::new(&self.kind.pattern_for(version.as_deref()))?;
            self.compiled = Some(CompiledPattern { version, regex });
        }
        match &self.compiled {
            Some(compiled) => Ok(&compiled.regex),
            None => Err(WrapperError::Matcher(format!("{} pattern unavailable", self.kind.name()))),
        }
    }

    /// Offers a message to this matcher.
    ///
    /// With `continued == false` the message is matched against the pattern
    /// and the handler runs on a match. With `continued == true` the matcher
    /// currently holds the thread and decides whether to keep holding.
    pub async fn accept(
        &mut self,
        message: &str,
        continued: bool,
        ctx: &MatchContext,
    ) -> Result<MatchStatus, WrapperError> {
        if continued {
            return if self.continued_input(message, ctx).await? {
                Ok(MatchStatus::Hold)
            } else {
                Ok(MatchStatus::Handled)
            };
        }

        let captures = self.pattern(ctx.state.server_version())?.captures(message);
        match captures {
            Some(caps) => self.run(&caps, ctx).await,
            None => Ok(MatchStatus::Ignored),
        }
    }

    async fn run(&self, caps: &Captures<'_>, ctx: &MatchContext) -> Result<MatchStatus, WrapperError> {
        match self.kind {
            MatcherKind::Startup => startup::run(caps, ctx),
            MatcherKind::Login => login::run(caps, ctx).await,
            MatcherKind::Logout => logout::run(caps, ctx),
        }
    }

    async fn continued_input(&self, message: &str, ctx: &MatchContext) -> Result<bool, WrapperError> {
        match self.kind {
            MatcherKind::Startup => startup::continued_input(message, ctx).await,
            MatcherKind::Login | MatcherKind::Logout => Ok(false),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::{PlayerRecord, ServerDetails};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    /// Directory that knows a fixed set of players.
    pub(crate) struct FixedDirectory {
        pub players: Vec<PlayerRecord>,
    }

    #[async_trait]
    impl AuthDirectory for FixedDirectory {
        async fn resolve_player_by_name(&self, name: &str) -> Result<Option<PlayerRecord>, WrapperError> {
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
            "https://minepass.net/join/test".to_string()
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

    #[derive(Default)]
    pub(crate) struct CountingHook {
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl LifecycleHook for CountingHook {
        async fn server_started(&self, _state: &SharedState) -> Result<(), WrapperError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    pub(crate) fn test_context(players: Vec<PlayerRecord>) -> (MatchContext, Arc<CountingHook>) {
        let hook = Arc::new(CountingHook::default());
        let ctx = MatchContext {
            state: Arc::new(SharedState::new()),
            directory: Arc::new(FixedDirectory { players }),
            hook: hook.clone(),
            wrapper_version: "1.2.0".to_string(),
            login_delay: Duration::ZERO,
        };
        (ctx, hook)
    }

    #[test]
    fn test_enabled_gating() {
        let state = SharedState::new();
        let [startup, login, logout] = MatcherKind::ALL.map(EventMatcher::new);

        assert!(startup.is_enabled(&state));
        assert!(!login.is_enabled(&state));
        assert!(!logout.is_enabled(&state));

        state.mark_started();
        assert!(!startup.is_enabled(&state));
        assert!(login.is_enabled(&state));
        assert!(logout.is_enabled(&state));
    }

    #[tokio::test]
    async fn test_non_matching_message_is_ignored() {
        let (ctx, _) = test_context(vec![]);
        let mut login = EventMatcher::new(MatcherKind::Login);
        let status = login.accept("Server for gameid=\"minetest\" listening", false, &ctx).await;
        assert!(matches!(status, Ok(MatchStatus::Ignored)));
    }

    #[tokio::test]
    async fn test_login_uses_directory_id() {
        let id = Uuid::new_v4();
        let (ctx, _) = test_context(vec![PlayerRecord { id, name: "Alice".to_string() }]);
        let mut login = EventMatcher::new(MatcherKind::Login);

        let status = login
            .accept("alice [127.0.0.1] joins game. List of players: alice", false, &ctx)
            .await
            .expect("login should succeed");

        assert_eq!(status, MatchStatus::Handled);
        assert_eq!(ctx.state.player_id("alice"), Some(id));
        assert!(ctx.state.is_online("alice"));
    }

    #[tokio::test]
    async fn test_login_miss_generates_fresh_id() {
        let (ctx, _) = test_context(vec![]);
        let mut login = EventMatcher::new(MatcherKind::Login);

        login.accept("bob joins game", false, &ctx).await.expect("login should succeed");
        let first = ctx.state.player_id("bob").expect("bob should be cached");
        assert_eq!(ctx.state.player_name(&first), Some("bob".to_string()));

        login.accept("bob joins game", false, &ctx).await.expect("login should succeed");
        let second = ctx.state.player_id("bob").expect("bob should be cached");
        assert_ne!(first, second);
        assert_eq!(ctx.state.current_players_by_id().get(&second), Some(&"bob".to_string()));
    }

    #[tokio::test]
    async fn test_logout_keeps_cache() {
        let (ctx, _) = test_context(vec![]);
        let mut login = EventMatcher::new(MatcherKind::Login);
        let mut logout = EventMatcher::new(MatcherKind::Logout);

        login.accept("carol joins game", false, &ctx).await.expect("login should succeed");
        let status = logout.accept("carol leaves game. List of players:", false, &ctx).await;

        assert!(matches!(status, Ok(MatchStatus::Handled)));
        assert!(!ctx.state.is_online("carol"));
        assert!(ctx.state.player_id("carol").is_some());
    }

    #[tokio::test]
    async fn test_pattern_recompiles_on_version_change() {
        let (ctx, _) = test_context(vec![]);
        let mut logout = EventMatcher::new(MatcherKind::Logout);

        logout.accept("nobody here", false, &ctx).await.expect("match should run");
        assert_eq!(logout.compiled.as_ref().and_then(|c| c.version.clone()), None);

        ctx.state.set_server_version("5.4.1");
        logout.accept("nobody here", false, &ctx).await.expect("match should run");
        assert_eq!(
            logout.compiled.as_ref().and_then(|c| c.version.clone()),
            Some("5.4.1".to_string())
        );
    }
}
