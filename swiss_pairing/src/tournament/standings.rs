//! Standings calculation.
//!
//! Standings are never stored. They are recomputed from the registration list
//! and the full match history, so they always agree with the last recorded
//! match.

use std::collections::{BTreeSet, HashMap};

use super::models::{MatchRecord, Player, PlayerId, Slot, Standing};

#[derive(Default)]
struct Tally {
    wins: u32,
    matches_played: u32,
    opponents: BTreeSet<PlayerId>,
}

/// Rank the registrants of one tournament.
///
/// * wins and matches played count every match the player appears in; a bye
///   credits its recipient one win and one match
/// * `omw` sums the wins of each distinct real opponent, the bye excluded
/// * order is descending by `(wins, omw)`; remaining ties keep registration
///   order
///
/// Matches naming players outside `registrations` only contribute to the
/// registered side.
pub fn compute_standings(registrations: &[Player], matches: &[MatchRecord]) -> Vec<Standing> {
    let mut tallies: HashMap<PlayerId, Tally> = registrations
        .iter()
        .map(|p| (p.id, Tally::default()))
        .collect();

    for record in matches {
        for slot in [record.player_1, record.player_2] {
            let Slot::Player(id) = slot else { continue };
            if let Some(tally) = tallies.get_mut(&id) {
                tally.matches_played += 1;
                if record.winner == Some(id) {
                    tally.wins += 1;
                }
            }
        }

        if let (Slot::Player(a), Slot::Player(b)) = (record.player_1, record.player_2) {
            if tallies.contains_key(&b) {
                if let Some(tally) = tallies.get_mut(&a) {
                    tally.opponents.insert(b);
                }
            }
            if tallies.contains_key(&a) {
                if let Some(tally) = tallies.get_mut(&b) {
                    tally.opponents.insert(a);
                }
            }
        }
    }

    let mut standings: Vec<Standing> = registrations
        .iter()
        .map(|player| {
            let tally = &tallies[&player.id];
            let omw = tally
                .opponents
                .iter()
                .map(|opponent| tallies[opponent].wins)
                .sum();
            Standing {
                player_id: player.id,
                name: player.name.clone(),
                wins: tally.wins,
                matches_played: tally.matches_played,
                omw,
            }
        })
        .collect();

    // sort_by is stable: equal (wins, omw) keep registration order
    standings.sort_by(|a, b| b.wins.cmp(&a.wins).then_with(|| b.omw.cmp(&a.omw)));
    standings
}
