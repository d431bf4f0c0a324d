//! Match validation.
//!
//! Turns a reported result into the [`NewMatch`] that gets appended to the
//! history. Nothing here writes; the manager commits the match only after both
//! checks pass.

use super::bye::bye_recipients;
use super::errors::{TournamentError, TournamentResult};
use super::models::{MatchRecord, NewMatch, Outcome, Player, Slot, TournamentId};

/// Validate the shape of a result and resolve its winner.
///
/// A bye match is normalized so the real player sits in `player_1`.
pub fn build_match(
    tournament_id: TournamentId,
    player_1: Slot,
    player_2: Slot,
    outcome: Outcome,
) -> TournamentResult<NewMatch> {
    if player_1 == player_2 {
        return Err(TournamentError::SelfPairing);
    }

    let winner = match outcome {
        Outcome::Player1Wins => Some(player_1.player_id().ok_or(TournamentError::ByeCannotWin)?),
        Outcome::Player2Wins => Some(player_2.player_id().ok_or(TournamentError::ByeCannotWin)?),
        Outcome::Tie if player_1.is_bye() || player_2.is_bye() => {
            return Err(TournamentError::ByeCannotWin);
        }
        Outcome::Tie => None,
    };

    let (player_1, player_2) = if player_1.is_bye() {
        (player_2, player_1)
    } else {
        (player_1, player_2)
    };

    Ok(NewMatch {
        tournament_id,
        player_1,
        player_2,
        winner,
    })
}

/// Check a match against the current roster and history: every real player
/// must be registered and nobody receives a second bye.
pub fn check_against_history(
    new_match: &NewMatch,
    registrations: &[Player],
    history: &[MatchRecord],
) -> TournamentResult<()> {
    for player in [new_match.player_1, new_match.player_2]
        .into_iter()
        .filter_map(Slot::player_id)
    {
        if !registrations.iter().any(|p| p.id == player) {
            return Err(TournamentError::NotRegistered {
                tournament: new_match.tournament_id,
                player,
            });
        }
    }

    if new_match.player_2.is_bye() {
        if let Some(recipient) = new_match.player_1.player_id() {
            if bye_recipients(history).contains(&recipient) {
                return Err(TournamentError::DuplicateBye {
                    tournament: new_match.tournament_id,
                    player: recipient,
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn roster() -> Vec<Player> {
        (1..=3)
            .map(|id| Player {
                id,
                name: format!("P{id}"),
            })
            .collect()
    }

    #[test]
    fn test_decisive_results_name_the_winner() {
        let m = build_match(1, Slot::Player(1), Slot::Player(2), Outcome::Player1Wins).unwrap();
        assert_eq!(m.winner, Some(1));

        let m = build_match(1, Slot::Player(1), Slot::Player(2), Outcome::Player2Wins).unwrap();
        assert_eq!(m.winner, Some(2));
    }

    #[test]
    fn test_tie_has_no_winner() {
        let m = build_match(1, Slot::Player(1), Slot::Player(2), Outcome::Tie).unwrap();
        assert_eq!(m.winner, None);
    }

    #[test]
    fn test_self_pairing_is_rejected() {
        let err = build_match(1, Slot::Player(4), Slot::Player(4), Outcome::Tie).unwrap_err();
        assert!(matches!(err, TournamentError::SelfPairing));

        let err = build_match(1, Slot::Bye, Slot::Bye, Outcome::Tie).unwrap_err();
        assert!(matches!(err, TournamentError::SelfPairing));
    }

    #[test]
    fn test_bye_must_credit_the_player() {
        let err = build_match(1, Slot::Player(1), Slot::Bye, Outcome::Player2Wins).unwrap_err();
        assert!(matches!(err, TournamentError::ByeCannotWin));

        let err = build_match(1, Slot::Player(1), Slot::Bye, Outcome::Tie).unwrap_err();
        assert!(matches!(err, TournamentError::ByeCannotWin));
    }

    #[test]
    fn test_bye_is_normalized_to_second_slot() {
        let m = build_match(1, Slot::Bye, Slot::Player(3), Outcome::Player2Wins).unwrap();
        assert_eq!(m.player_1, Slot::Player(3));
        assert_eq!(m.player_2, Slot::Bye);
        assert_eq!(m.winner, Some(3));
    }

    #[test]
    fn test_unregistered_player_is_rejected() {
        let m = build_match(1, Slot::Player(1), Slot::Player(9), Outcome::Tie).unwrap();
        let err = check_against_history(&m, &roster(), &[]).unwrap_err();
        assert!(matches!(
            err,
            TournamentError::NotRegistered {
                tournament: 1,
                player: 9
            }
        ));
    }

    #[test]
    fn test_second_bye_is_rejected() {
        let history = vec![MatchRecord {
            id: 1,
            tournament_id: 1,
            player_1: Slot::Player(2),
            player_2: Slot::Bye,
            winner: Some(2),
            recorded_at: Utc::now(),
        }];

        let again = build_match(1, Slot::Player(2), Slot::Bye, Outcome::Player1Wins).unwrap();
        let err = check_against_history(&again, &roster(), &history).unwrap_err();
        assert!(matches!(err, TournamentError::DuplicateBye { player: 2, .. }));

        let other = build_match(1, Slot::Player(3), Slot::Bye, Outcome::Player1Wins).unwrap();
        assert!(check_against_history(&other, &roster(), &history).is_ok());
    }
}
