//! Player logout: `<name> leaves game. List of players: ...`

use regex::Captures;
use tracing::debug;

use super::{MatchContext, MatchStatus};
use crate::error::WrapperError;

pub(super) fn pattern_for(_version: Option<&str>) -> String {
    r"(?P<name>[^ ]+).*leaves game".to_string()
}

pub(super) fn run(caps: &Captures<'_>, ctx: &MatchContext) -> Result<MatchStatus, WrapperError> {
    let name = &caps["name"];
    debug!("Player logout event: {}", name);
    ctx.state.player_left(name);
    Ok(MatchStatus::Handled)
}
