//! Integration tests for the Swiss pairing engine
//!
//! These tests drive [`TournamentManager`] end to end against the in-memory
//! repository: registration, standings, results, byes and pairings.

use std::collections::HashSet;
use std::sync::Arc;

use swiss_pairing::db::{MemoryRepository, TournamentRepository};
use swiss_pairing::tournament::{
    ErrorKind, Outcome, Pairing, PlayerId, Slot, TournamentError, TournamentId, TournamentManager,
    BYE_NAME,
};

fn manager() -> TournamentManager<MemoryRepository> {
    TournamentManager::new(Arc::new(MemoryRepository::new()))
}

async fn field(
    mgr: &TournamentManager<MemoryRepository>,
    tournament: TournamentId,
    names: &[&str],
) -> Vec<PlayerId> {
    let mut ids = Vec::new();
    for name in names {
        ids.push(mgr.register_player(tournament, name).await.unwrap());
    }
    ids
}

async fn win(
    mgr: &TournamentManager<MemoryRepository>,
    tournament: TournamentId,
    winner: PlayerId,
    loser: PlayerId,
) {
    mgr.record_match(
        tournament,
        Slot::Player(winner),
        Slot::Player(loser),
        Outcome::Player1Wins,
    )
    .await
    .unwrap();
}

fn pair_sets(pairings: &[Pairing]) -> HashSet<(Slot, Slot)> {
    pairings
        .iter()
        .map(|p| {
            let a = Slot::Player(p.player_1_id);
            let b = p.player_2;
            if a <= b { (a, b) } else { (b, a) }
        })
        .collect()
}

async fn bye_count(mgr: &TournamentManager<MemoryRepository>, tournament: TournamentId) -> usize {
    mgr.repository()
        .get_matches(tournament)
        .await
        .unwrap()
        .iter()
        .filter(|m| m.is_bye())
        .count()
}

#[tokio::test]
async fn test_count_players() {
    let mgr = manager();
    let t = mgr.create_tournament(None, "Counting").await.unwrap();
    assert_eq!(mgr.count_players(t).await.unwrap(), 0);

    field(&mgr, t, &["Chandra Nalaar", "Jace Beleren", "Liliana Vess"]).await;
    assert_eq!(mgr.count_players(t).await.unwrap(), 3);

    // The bye slot never counts as a player
    mgr.next_round_pairings(t).await.unwrap();
    assert_eq!(mgr.count_players(t).await.unwrap(), 3);

    mgr.delete_tournament(t).await.unwrap();
    let err = mgr.count_players(t).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_standings_before_matches() {
    let mgr = manager();
    let t = mgr.create_tournament(None, "Fresh").await.unwrap();
    field(&mgr, t, &["Melpomene Murray", "Randy Schwartz"]).await;

    let standings = mgr.standings(t).await.unwrap();
    assert_eq!(standings.len(), 2);
    assert_eq!(standings[0].name, "Melpomene Murray");
    assert_eq!(standings[1].name, "Randy Schwartz");
    for s in &standings {
        assert_eq!((s.wins, s.matches_played, s.omw), (0, 0, 0));
    }
}

#[tokio::test]
async fn test_report_matches() {
    let mgr = manager();
    let t = mgr.create_tournament(None, "Reports").await.unwrap();
    let ids = field(
        &mgr,
        t,
        &["Bruno Walton", "Boots O'Neal", "Cathy Burton", "Diane Grant"],
    )
    .await;

    win(&mgr, t, ids[0], ids[1]).await;
    win(&mgr, t, ids[2], ids[3]).await;

    let standings = mgr.standings(t).await.unwrap();
    for s in &standings {
        assert_eq!(s.matches_played, 1);
        if s.player_id == ids[0] || s.player_id == ids[2] {
            assert_eq!(s.wins, 1);
        } else {
            assert_eq!(s.wins, 0);
        }
    }
}

#[tokio::test]
async fn test_pairings_after_one_round() {
    let mgr = manager();
    let t = mgr.create_tournament(None, "Pairings").await.unwrap();
    let ids = field(
        &mgr,
        t,
        &["Twilight Sparkle", "Fluttershy", "Applejack", "Pinkie Pie"],
    )
    .await;

    win(&mgr, t, ids[0], ids[1]).await;
    win(&mgr, t, ids[2], ids[3]).await;

    let pairings = mgr.next_round_pairings(t).await.unwrap();
    assert_eq!(pairings.len(), 2);

    let expected: HashSet<_> = [
        (Slot::Player(ids[0]), Slot::Player(ids[2])),
        (Slot::Player(ids[1]), Slot::Player(ids[3])),
    ]
    .into_iter()
    .collect();
    assert_eq!(pair_sets(&pairings), expected);
}

#[tokio::test]
async fn test_odd_field_never_repeats_a_bye() {
    let mgr = manager();
    let t = mgr.create_tournament(None, "Odd").await.unwrap();
    let ids = field(&mgr, t, &["Rock", "Paper", "Scissors"]).await;
    let (rock, paper, scissors) = (ids[0], ids[1], ids[2]);

    // Round 1: everyone on zero, the top of the table sits out
    let round = mgr.next_round_pairings(t).await.unwrap();
    assert_eq!(round.len(), 2);
    assert!(round[0].is_bye());
    assert_eq!(round[0].player_1_id, rock);
    assert_eq!(round[0].player_2_name, BYE_NAME);
    assert_eq!(round[1].player_ids().collect::<Vec<_>>(), vec![paper, scissors]);
    win(&mgr, t, paper, scissors).await;

    // Round 2: rock already had the bye, paper is next in line
    let round = mgr.next_round_pairings(t).await.unwrap();
    assert_eq!(round[0].player_1_id, paper);
    assert!(round[0].is_bye());
    assert_eq!(round[1].player_ids().collect::<Vec<_>>(), vec![rock, scissors]);
    win(&mgr, t, rock, scissors).await;

    // Round 3: only scissors is still eligible
    let round = mgr.next_round_pairings(t).await.unwrap();
    assert_eq!(round[0].player_1_id, scissors);
    assert_eq!(round[1].player_ids().collect::<Vec<_>>(), vec![rock, paper]);
    win(&mgr, t, rock, paper).await;

    let err = mgr.next_round_pairings(t).await.unwrap_err();
    assert!(matches!(err, TournamentError::ByeExhausted(id) if id == t));
    assert_eq!(err.kind(), ErrorKind::InvariantViolation);

    let standings = mgr.standings(t).await.unwrap();
    assert_eq!(standings[0].player_id, rock);
    assert_eq!(standings[0].wins, 3);
    assert_eq!(bye_count(&mgr, t).await, 3);
}

#[tokio::test]
async fn test_bye_counts_as_a_win() {
    let mgr = manager();
    let t = mgr.create_tournament(None, "Solo").await.unwrap();
    let ids = field(&mgr, t, &["Lonely"]).await;

    let round = mgr.next_round_pairings(t).await.unwrap();
    assert_eq!(round.len(), 1);
    assert!(round[0].is_bye());

    let standings = mgr.standings(t).await.unwrap();
    assert_eq!(standings[0].player_id, ids[0]);
    assert_eq!((standings[0].wins, standings[0].matches_played), (1, 1));
    assert!(mgr.get_tournament(t).await.unwrap().bye_registered);
}

#[tokio::test]
async fn test_lone_player_runs_out_of_byes() {
    let mgr = manager();
    let t = mgr.create_tournament(None, "Solo").await.unwrap();
    field(&mgr, t, &["Lonely"]).await;

    mgr.next_round_pairings(t).await.unwrap();
    let err = mgr.next_round_pairings(t).await.unwrap_err();
    assert!(matches!(err, TournamentError::ByeExhausted(id) if id == t));
    assert!(err.is_fatal());
    assert_eq!(bye_count(&mgr, t).await, 1);
}

#[tokio::test]
async fn test_manual_bye_is_not_treated_as_a_paired_round() {
    let mgr = manager();
    let t = mgr.create_tournament(None, "By hand").await.unwrap();
    let ids = field(&mgr, t, &["A", "B", "C"]).await;
    let (a, b, c) = (ids[0], ids[1], ids[2]);

    // Round 1 reported entirely by hand, bye last
    win(&mgr, t, a, b).await;
    mgr.record_match(t, Slot::Player(c), Slot::Bye, Outcome::Player1Wins)
        .await
        .unwrap();

    let round = mgr.next_round_pairings(t).await.unwrap();
    assert!(round[0].is_bye());
    assert_ne!(round[0].player_1_id, c);
    assert_eq!(round[0].player_1_id, a);
    assert_eq!(round[1].player_ids().collect::<Vec<_>>(), vec![c, b]);

    let matches = mgr.repository().get_matches(t).await.unwrap();
    let recipients: Vec<_> = matches.iter().filter_map(|m| m.bye_recipient()).collect();
    assert_eq!(recipients, vec![c, a]);
}

#[tokio::test]
async fn test_repeated_pairing_request_is_idempotent() {
    let mgr = manager();
    let t = mgr.create_tournament(None, "Again").await.unwrap();
    field(&mgr, t, &["A", "B", "C", "D", "E"]).await;

    let first = mgr.next_round_pairings(t).await.unwrap();
    let second = mgr.next_round_pairings(t).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(bye_count(&mgr, t).await, 1);
    assert_eq!(mgr.repository().get_matches(t).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_resolve_bye_matches_pairing() {
    let mgr = manager();
    let t = mgr.create_tournament(None, "Preview").await.unwrap();
    field(&mgr, t, &["A", "B", "C"]).await;

    let preview = mgr.resolve_bye(t).await.unwrap().unwrap();
    let round = mgr.next_round_pairings(t).await.unwrap();
    assert_eq!(round[0].player_1_id, preview.player_id);

    // Once recorded, resolving again reports the same recipient
    let again = mgr.resolve_bye(t).await.unwrap().unwrap();
    assert_eq!(again.player_id, preview.player_id);
}

#[tokio::test]
async fn test_tied_match() {
    let mgr = manager();
    let t = mgr.create_tournament(None, "Ties").await.unwrap();
    let ids = field(&mgr, t, &["Goku", "Freeza"]).await;

    mgr.record_match(t, Slot::Player(ids[0]), Slot::Player(ids[1]), Outcome::Tie)
        .await
        .unwrap();

    let standings = mgr.standings(t).await.unwrap();
    for s in &standings {
        assert_eq!(s.wins, 0);
        assert_eq!(s.matches_played, 1);
    }
    let matches = mgr.repository().get_matches(t).await.unwrap();
    assert_eq!(matches[0].winner, None);
}

#[tokio::test]
async fn test_tournaments_are_isolated() {
    let mgr = manager();
    let golf = mgr.create_tournament(None, "Golf").await.unwrap();
    let chess = mgr.create_tournament(None, "Chess").await.unwrap();

    let ids = field(&mgr, golf, &["Alice", "Bob"]).await;
    for &id in &ids {
        mgr.enter_tournament(chess, id).await.unwrap();
    }

    win(&mgr, golf, ids[1], ids[0]).await;

    let golf_standings = mgr.standings(golf).await.unwrap();
    assert_eq!(golf_standings[0].player_id, ids[1]);
    assert_eq!(golf_standings[0].wins, 1);

    let chess_standings = mgr.standings(chess).await.unwrap();
    assert_eq!(chess_standings[0].player_id, ids[0]);
    assert!(chess_standings.iter().all(|s| s.matches_played == 0));
}

#[tokio::test]
async fn test_create_tournament_with_explicit_id_is_idempotent() {
    let mgr = manager();
    let first = mgr.create_tournament(Some(3), "League").await.unwrap();
    let again = mgr.create_tournament(Some(3), "Renamed?").await.unwrap();
    assert_eq!(first, 3);
    assert_eq!(again, 3);
    assert_eq!(mgr.get_tournament(3).await.unwrap().name, "League");
    assert_eq!(mgr.list_tournaments().await.unwrap().len(), 1);

    // Generated ids never collide with explicit ones
    let next = mgr.create_tournament(None, "Cup").await.unwrap();
    assert!(next > 3);
}

#[tokio::test]
async fn test_omw_breaks_ties() {
    let mgr = manager();
    let t = mgr.create_tournament(None, "Dragon Ball").await.unwrap();
    let ids = field(
        &mgr,
        t,
        &[
            "Goku",
            "Freeza",
            "Piccolo",
            "Cell",
            "Vegeta",
            "Android 18",
            "Yamcha",
            "Tien",
            "Trunks",
            "Gohan",
        ],
    )
    .await;
    let p = |n: usize| ids[n - 1];

    for (w, l) in [
        (1, 6),
        (2, 7),
        (3, 8),
        (4, 9),
        (5, 10),
        (1, 3),
        (2, 4),
        (5, 6),
        (7, 9),
        (8, 10),
        (1, 4),
        (2, 6),
        (3, 10),
        (5, 7),
        (8, 9),
    ] {
        win(&mgr, t, p(w), p(l)).await;
    }

    let standings = mgr.standings(t).await.unwrap();
    let order: Vec<_> = standings.iter().map(|s| s.player_id).collect();
    let expected: Vec<_> = [1, 2, 5, 3, 8, 4, 7, 6, 10, 9].into_iter().map(p).collect();
    assert_eq!(order, expected);
}

#[tokio::test]
async fn test_invalid_reports_write_nothing() {
    let mgr = manager();
    let t = mgr.create_tournament(None, "Strict").await.unwrap();
    let ids = field(&mgr, t, &["A", "B"]).await;
    let other = mgr.create_tournament(None, "Elsewhere").await.unwrap();
    let outsider = mgr.register_player(other, "Outsider").await.unwrap();

    let err = mgr
        .record_match(t, Slot::Player(ids[0]), Slot::Player(outsider), Outcome::Tie)
        .await
        .unwrap_err();
    assert!(matches!(err, TournamentError::NotRegistered { .. }));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = mgr
        .record_match(t, Slot::Player(ids[0]), Slot::Player(ids[0]), Outcome::Player1Wins)
        .await
        .unwrap_err();
    assert!(matches!(err, TournamentError::SelfPairing));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = mgr
        .record_match(t, Slot::Player(ids[0]), Slot::Bye, Outcome::Player2Wins)
        .await
        .unwrap_err();
    assert!(matches!(err, TournamentError::ByeCannotWin));

    assert!(mgr.repository().get_matches(t).await.unwrap().is_empty());
    assert!(!mgr.get_tournament(t).await.unwrap().bye_registered);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pairing_requests_award_one_bye() {
    let mgr = manager();
    let t = mgr.create_tournament(None, "Rush").await.unwrap();
    field(&mgr, t, &["A", "B", "C", "D", "E", "F", "G"]).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let mgr = mgr.clone();
        handles.push(tokio::spawn(async move { mgr.next_round_pairings(t).await }));
    }

    let mut rounds = Vec::new();
    for handle in handles {
        rounds.push(handle.await.unwrap().unwrap());
    }

    assert!(rounds.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(bye_count(&mgr, t).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reports_are_all_recorded() {
    let mgr = manager();
    let t = mgr.create_tournament(None, "Busy").await.unwrap();
    let ids = field(&mgr, t, &["A", "B", "C", "D", "E", "F", "G", "H"]).await;

    let round = mgr.next_round_pairings(t).await.unwrap();
    let mut handles = Vec::new();
    for pairing in round {
        let mgr = mgr.clone();
        handles.push(tokio::spawn(async move {
            mgr.record_match(
                t,
                Slot::Player(pairing.player_1_id),
                pairing.player_2,
                Outcome::Player1Wins,
            )
            .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let standings = mgr.standings(t).await.unwrap();
    assert_eq!(standings.len(), ids.len());
    assert_eq!(standings.iter().map(|s| s.wins).sum::<u32>(), 4);
    assert!(standings.iter().all(|s| s.matches_played == 1));
}
