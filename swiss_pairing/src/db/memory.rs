//! In-memory implementation of [`TournamentRepository`].
//!
//! Mirrors the PostgreSQL semantics (insert-if-absent tournaments, idempotent
//! registrations, cascading deletes, append-only matches) without a database.
//! Used by the test suites and for embedding the engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::errors::{StoreError, StoreResult};
use super::repository::{RoundEffect, TournamentRepository};
use crate::tournament::models::{
    MatchId, MatchRecord, NewMatch, Player, PlayerId, Slot, Tournament, TournamentId,
};

#[derive(Default)]
struct State {
    tournaments: BTreeMap<TournamentId, Tournament>,
    players: HashMap<PlayerId, Player>,
    registrations: HashMap<TournamentId, Vec<PlayerId>>,
    matches: Vec<MatchRecord>,
    next_tournament_id: TournamentId,
    next_player_id: PlayerId,
    next_match_id: MatchId,
}

impl State {
    fn new() -> Self {
        Self {
            next_tournament_id: 1,
            next_player_id: 1,
            next_match_id: 1,
            ..Default::default()
        }
    }
}

/// Repository backed by process memory
#[derive(Clone)]
pub struct MemoryRepository {
    state: Arc<RwLock<State>>,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::new())),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    async fn write_match(&self, new_match: &NewMatch, effect: RoundEffect) -> StoreResult<MatchId> {
        let mut state = self.state.write().await;

        let (player_1, player_2) = match (new_match.player_1, new_match.player_2) {
            (Slot::Bye, other) => (other, Slot::Bye),
            pair => pair,
        };
        let Some(recipient) = player_1.player_id() else {
            return Err(StoreError::Unavailable(
                "match has no real player".to_string(),
            ));
        };

        let Some(tournament) = state.tournaments.get_mut(&new_match.tournament_id) else {
            return Err(StoreError::Unavailable(format!(
                "tournament {} does not exist",
                new_match.tournament_id
            )));
        };
        match effect {
            RoundEffect::CloseRound => tournament.pending_bye = None,
            RoundEffect::ManualBye => tournament.bye_registered = true,
            RoundEffect::OpenRound => {
                tournament.bye_registered = true;
                tournament.pending_bye = Some(recipient);
            }
        }

        let id = state.next_match_id;
        state.next_match_id += 1;
        state.matches.push(MatchRecord {
            id,
            tournament_id: new_match.tournament_id,
            player_1,
            player_2,
            winner: new_match.winner,
            recorded_at: Self::now(),
        });
        Ok(id)
    }
}

#[async_trait]
impl TournamentRepository for MemoryRepository {
    async fn tournament_exists(&self, tournament_id: TournamentId) -> StoreResult<bool> {
        Ok(self.state.read().await.tournaments.contains_key(&tournament_id))
    }

    async fn get_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Option<Tournament>> {
        Ok(self.state.read().await.tournaments.get(&tournament_id).cloned())
    }

    async fn list_tournaments(&self) -> StoreResult<Vec<Tournament>> {
        Ok(self.state.read().await.tournaments.values().cloned().collect())
    }

    async fn create_tournament(
        &self,
        tournament_id: Option<TournamentId>,
        name: &str,
    ) -> StoreResult<TournamentId> {
        let mut state = self.state.write().await;
        let id = match tournament_id {
            Some(id) => id,
            None => state.next_tournament_id,
        };

        if !state.tournaments.contains_key(&id) {
            state.tournaments.insert(
                id,
                Tournament {
                    id,
                    name: name.to_string(),
                    bye_registered: false,
                    pending_bye: None,
                    created_at: Self::now(),
                },
            );
        }
        state.next_tournament_id = state.next_tournament_id.max(id + 1);

        Ok(id)
    }

    async fn rename_tournament(
        &self,
        tournament_id: TournamentId,
        name: &str,
    ) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        match state.tournaments.get_mut(&tournament_id) {
            Some(tournament) => {
                tournament.name = name.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_tournament(&self, tournament_id: TournamentId) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if state.tournaments.remove(&tournament_id).is_none() {
            return Ok(false);
        }
        state.registrations.remove(&tournament_id);
        state.matches.retain(|m| m.tournament_id != tournament_id);
        Ok(true)
    }

    async fn create_player(&self, name: &str) -> StoreResult<PlayerId> {
        let mut state = self.state.write().await;
        let id = state.next_player_id;
        state.next_player_id += 1;
        state.players.insert(
            id,
            Player {
                id,
                name: name.to_string(),
            },
        );
        Ok(id)
    }

    async fn get_player(&self, player_id: PlayerId) -> StoreResult<Option<Player>> {
        Ok(self.state.read().await.players.get(&player_id).cloned())
    }

    async fn get_registrations(&self, tournament_id: TournamentId) -> StoreResult<Vec<Player>> {
        let state = self.state.read().await;
        let Some(entered) = state.registrations.get(&tournament_id) else {
            return Ok(Vec::new());
        };

        entered
            .iter()
            .map(|id| {
                state.players.get(id).cloned().ok_or_else(|| {
                    StoreError::Unavailable(format!("registration references unknown player {id}"))
                })
            })
            .collect()
    }

    async fn is_registered(&self, tournament_id: TournamentId, slot: Slot) -> StoreResult<bool> {
        let state = self.state.read().await;
        Ok(match slot {
            Slot::Player(player_id) => state
                .registrations
                .get(&tournament_id)
                .is_some_and(|entered| entered.contains(&player_id)),
            Slot::Bye => state
                .tournaments
                .get(&tournament_id)
                .is_some_and(|t| t.bye_registered),
        })
    }

    async fn insert_registration(
        &self,
        tournament_id: TournamentId,
        slot: Slot,
    ) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if !state.tournaments.contains_key(&tournament_id) {
            return Err(StoreError::Unavailable(format!(
                "tournament {tournament_id} does not exist"
            )));
        }

        match slot {
            Slot::Player(player_id) => {
                if !state.players.contains_key(&player_id) {
                    return Err(StoreError::Unavailable(format!(
                        "player {player_id} does not exist"
                    )));
                }
                let entered = state.registrations.entry(tournament_id).or_default();
                if entered.contains(&player_id) {
                    return Ok(false);
                }
                entered.push(player_id);
                Ok(true)
            }
            Slot::Bye => {
                let Some(tournament) = state.tournaments.get_mut(&tournament_id) else {
                    return Ok(false);
                };
                let inserted = !tournament.bye_registered;
                tournament.bye_registered = true;
                Ok(inserted)
            }
        }
    }

    async fn get_matches(&self, tournament_id: TournamentId) -> StoreResult<Vec<MatchRecord>> {
        Ok(self
            .state
            .read()
            .await
            .matches
            .iter()
            .filter(|m| m.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn insert_match(&self, new_match: &NewMatch) -> StoreResult<MatchId> {
        self.write_match(new_match, RoundEffect::of(new_match)).await
    }

    async fn open_round_with_bye(&self, bye_match: &NewMatch) -> StoreResult<MatchId> {
        self.write_match(bye_match, RoundEffect::OpenRound).await
    }
}
