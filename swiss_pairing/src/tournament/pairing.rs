//! Pairing generation.
//!
//! Greedy adjacent pairing over the ranked standings: rank 1 meets rank 2,
//! rank 3 meets rank 4, and so on. Rematches are not avoided; the only
//! history-aware rule is the bye.

use std::collections::HashMap;

use super::errors::{TournamentError, TournamentResult};
use super::models::{Pairing, PlayerId, Standing};

/// Pair the ranked field for the next round.
///
/// `bye` must be a member of `standings` when given; it is emitted first as a
/// bye entry and removed from the pool. The remaining pool must be even.
pub fn pair_adjacent(
    standings: &[Standing],
    bye: Option<&Standing>,
) -> TournamentResult<Vec<Pairing>> {
    let mut pairings = Vec::with_capacity(standings.len().div_ceil(2));

    if let Some(recipient) = bye {
        if !standings.iter().any(|s| s.player_id == recipient.player_id) {
            return Err(TournamentError::PairingMismatch(format!(
                "bye recipient {} is not in the standings",
                recipient.player_id
            )));
        }
        pairings.push(Pairing::bye(recipient));
    }

    let pool: Vec<&Standing> = standings
        .iter()
        .filter(|s| bye.is_none_or(|b| b.player_id != s.player_id))
        .collect();

    if pool.len() % 2 != 0 {
        return Err(TournamentError::PairingMismatch(format!(
            "{} players left to pair after the bye",
            pool.len()
        )));
    }

    pairings.extend(
        pool.chunks_exact(2)
            .map(|pair| Pairing::between(pair[0], pair[1])),
    );

    verify_pairings(standings, &pairings)?;
    Ok(pairings)
}

/// Check that every ranked player appears in exactly one entry and that the
/// round has `ceil(N / 2)` entries.
pub fn verify_pairings(standings: &[Standing], pairings: &[Pairing]) -> TournamentResult<()> {
    let expected = standings.len().div_ceil(2);
    if pairings.len() != expected {
        return Err(TournamentError::PairingMismatch(format!(
            "expected {expected} entries for {} players, got {}",
            standings.len(),
            pairings.len()
        )));
    }

    let mut seen: HashMap<PlayerId, usize> =
        standings.iter().map(|s| (s.player_id, 0)).collect();
    for id in pairings.iter().flat_map(|p| p.player_ids()) {
        match seen.get_mut(&id) {
            Some(count) => *count += 1,
            None => {
                return Err(TournamentError::PairingMismatch(format!(
                    "player {id} is paired but not ranked"
                )));
            }
        }
    }

    if let Some((id, count)) = seen.iter().find(|(_, count)| **count != 1) {
        return Err(TournamentError::PairingMismatch(format!(
            "player {id} appears {count} times"
        )));
    }

    let byes = pairings.iter().filter(|p| p.is_bye()).count();
    if byes != standings.len() % 2 {
        return Err(TournamentError::PairingMismatch(format!(
            "{byes} bye entries for {} players",
            standings.len()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::Slot;

    fn ranked(ids: &[PlayerId]) -> Vec<Standing> {
        ids.iter()
            .map(|&id| Standing {
                player_id: id,
                name: format!("P{id}"),
                wins: 0,
                matches_played: 0,
                omw: 0,
            })
            .collect()
    }

    #[test]
    fn test_even_field_pairs_adjacent_ranks() {
        let standings = ranked(&[1, 3, 2, 4]);
        let pairings = pair_adjacent(&standings, None).unwrap();

        assert_eq!(pairings.len(), 2);
        assert_eq!(pairings[0].player_1_id, 1);
        assert_eq!(pairings[0].player_2, Slot::Player(3));
        assert_eq!(pairings[0].player_2_name, "P3");
        assert_eq!(pairings[1].player_1_id, 2);
        assert_eq!(pairings[1].player_2, Slot::Player(4));
    }

    #[test]
    fn test_bye_entry_comes_first() {
        let standings = ranked(&[5, 6, 7]);
        let pairings = pair_adjacent(&standings, Some(&standings[1])).unwrap();

        assert_eq!(pairings.len(), 2);
        assert!(pairings[0].is_bye());
        assert_eq!(pairings[0].player_1_id, 6);
        assert_eq!(pairings[1].player_1_id, 5);
        assert_eq!(pairings[1].player_2, Slot::Player(7));
    }

    #[test]
    fn test_empty_field() {
        assert!(pair_adjacent(&[], None).unwrap().is_empty());
    }

    #[test]
    fn test_odd_pool_without_bye_is_rejected() {
        let standings = ranked(&[1, 2, 3]);
        let err = pair_adjacent(&standings, None).unwrap_err();
        assert!(matches!(err, TournamentError::PairingMismatch(_)));
    }

    #[test]
    fn test_unknown_bye_recipient_is_rejected() {
        let standings = ranked(&[1, 2, 3]);
        let outsider = ranked(&[9]);
        let err = pair_adjacent(&standings, Some(&outsider[0])).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_verify_detects_duplicates() {
        let standings = ranked(&[1, 2, 3, 4]);
        let duplicated = vec![
            Pairing::between(&standings[0], &standings[1]),
            Pairing::between(&standings[0], &standings[2]),
        ];
        let err = verify_pairings(&standings, &duplicated).unwrap_err();
        assert!(matches!(err, TournamentError::PairingMismatch(_)));
    }

    #[test]
    fn test_verify_detects_missing_entries() {
        let standings = ranked(&[1, 2, 3, 4]);
        let short = vec![Pairing::between(&standings[0], &standings[1])];
        assert!(verify_pairings(&standings, &short).is_err());
    }
}
