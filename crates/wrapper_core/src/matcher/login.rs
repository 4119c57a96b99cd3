//! Player login: `<name> [address] joins game. List of players: ...`

use regex::Captures;
use tracing::debug;
use uuid::Uuid;

use super::{MatchContext, MatchStatus};
use crate::error::WrapperError;

pub(super) fn pattern_for(_version: Option<&str>) -> String {
    r"(?P<name>[^ ]+).*joins game".to_string()
}

pub(super) async fn run(caps: &Captures<'_>, ctx: &MatchContext) -> Result<MatchStatus, WrapperError> {
    let name = caps["name"].to_string();

    if !ctx.login_delay.is_zero() {
        tokio::time::sleep(ctx.login_delay).await;
    }

    debug!("Player login event: {}", name);

    // A lookup miss is not an error; the player gets a fresh id.
    let id = match ctx.directory.resolve_player_by_name(&name).await? {
        Some(record) => record.id,
        None => Uuid::new_v4(),
    };

    ctx.state.cache_player(&name, id);
    ctx.state.player_joined(&name, id);

    Ok(MatchStatus::Handled)
}
