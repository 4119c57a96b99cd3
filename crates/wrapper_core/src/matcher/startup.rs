//! Server startup.
//!
//! The MinePass mod prints its version banner early in startup. From there
//! the matcher holds the thread and collects the server version and the mod
//! list until the mod reports that it has loaded.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::cmp::Ordering;
use tracing::{error, info};

use super::{MatchContext, MatchStatus};
use crate::error::WrapperError;
use crate::version::compare_versions;

lazy_static! {
    static ref SERVER_INFO: Regex = Regex::new(r"Server: version=(?P<version>[^,]+),").expect("server info pattern is valid");
    static ref SERVER_MOD: Regex = Regex::new(r"\[Mod\] (?P<name>.+)$").expect("server mod pattern is valid");
    static ref SERVER_LOADED: Regex = Regex::new(r"MinePass plugin loaded").expect("loaded pattern is valid");
}

pub(super) fn pattern_for(_version: Option<&str>) -> String {
    r"MinePass plugin v(?P<version>[0-9]+(\.[0-9]+)+)".to_string()
}

pub(super) fn run(caps: &Captures<'_>, ctx: &MatchContext) -> Result<MatchStatus, WrapperError> {
    let mod_version = &caps["version"];

    let mismatch = !matches!(compare_versions(&ctx.wrapper_version, mod_version), Ok(Ordering::Equal));
    if mismatch {
        error!("Mod/Wrapper version mismatch: {} <> {}", ctx.wrapper_version, mod_version);
        error!("Please update the minepass mod in your game folder.");
    }

    Ok(MatchStatus::Hold)
}

/// Returns `true` to keep holding the thread.
pub(super) async fn continued_input(message: &str, ctx: &MatchContext) -> Result<bool, WrapperError> {
    if let Some(caps) = SERVER_INFO.captures(message) {
        let version = caps["version"].to_string();
        info!("Detected server version {}", version);
        ctx.state.set_server_version(version);
        return Ok(true);
    }

    if let Some(caps) = SERVER_MOD.captures(message) {
        ctx.state.record_mod(&caps["name"], "");
        return Ok(true);
    }

    if SERVER_LOADED.is_match(message) {
        if ctx.state.mark_started() {
            ctx.hook.server_started(&ctx.state).await?;
        }
        return Ok(false);
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::super::tests::test_context;
    use super::super::{EventMatcher, MatcherKind};
    use super::*;
    use std::sync::atomic::Ordering as AtomicOrdering;

    #[tokio::test]
    async fn test_startup_sequence() {
        let (ctx, hook) = test_context(vec![]);
        let mut startup = EventMatcher::new(MatcherKind::Startup);

        let first = startup.accept("MinePass plugin v1.2.0", false, &ctx).await;
        assert!(matches!(first, Ok(MatchStatus::Hold)));

        for line in ["Server: version=5.4.1, uptime=0", "[Mod] minepass", "Loading textures"] {
            let status = startup.accept(line, true, &ctx).await;
            assert!(matches!(status, Ok(MatchStatus::Hold)), "{line}");
        }
        assert!(!ctx.state.is_started());

        let last = startup.accept("MinePass plugin loaded", true, &ctx).await;
        assert!(matches!(last, Ok(MatchStatus::Handled)));
        assert!(ctx.state.is_started());
        assert_eq!(ctx.state.server_version(), Some("5.4.1".to_string()));
        assert!(ctx.state.has_mod("minepass"));
        assert_eq!(hook.calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_version_mismatch_still_holds() {
        let (ctx, _) = test_context(vec![]);
        let mut startup = EventMatcher::new(MatcherKind::Startup);
        let status = startup.accept("MinePass plugin v0.9.3", false, &ctx).await;
        assert!(matches!(status, Ok(MatchStatus::Hold)));
    }

    #[tokio::test]
    async fn test_sentinel_fires_hook_once() {
        let (ctx, hook) = test_context(vec![]);
        continued_input("MinePass plugin loaded", &ctx).await.expect("sentinel should succeed");
        continued_input("MinePass plugin loaded", &ctx).await.expect("sentinel should succeed");
        assert_eq!(hook.calls.load(AtomicOrdering::SeqCst), 1);
    }
}
