//! Bye selection for odd-sized fields.

use std::collections::HashSet;

use super::errors::{TournamentError, TournamentResult};
use super::models::{MatchRecord, PlayerId, Standing, TournamentId};

/// Players already credited with a bye in this history
pub fn bye_recipients(matches: &[MatchRecord]) -> HashSet<PlayerId> {
    matches.iter().filter_map(MatchRecord::bye_recipient).collect()
}

/// The history a pending round was paired from: everything except the bye
/// that round awarded to `recipient`.
pub fn without_bye_of(matches: &[MatchRecord], recipient: PlayerId) -> Vec<MatchRecord> {
    matches
        .iter()
        .filter(|m| m.bye_recipient() != Some(recipient))
        .cloned()
        .collect()
}

/// Walk the standings from the top and return the first player who has not
/// had a bye yet.
///
/// Fails with [`TournamentError::ByeExhausted`] when every ranked player
/// already received one.
pub fn select_bye<'a>(
    tournament_id: TournamentId,
    standings: &'a [Standing],
    matches: &[MatchRecord],
) -> TournamentResult<&'a Standing> {
    let previous = bye_recipients(matches);
    standings
        .iter()
        .find(|s| !previous.contains(&s.player_id))
        .ok_or(TournamentError::ByeExhausted(tournament_id))
}
