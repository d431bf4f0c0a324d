//! Tournament manager: registration, standings, byes, pairings and results
//! for any number of concurrently running tournaments.

use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::bye;
use super::config::EngineConfig;
use super::errors::{TournamentError, TournamentResult};
use super::models::{
    MatchId, MatchRecord, Outcome, Pairing, Player, PlayerId, Slot, Standing, Tournament,
    TournamentId,
};
use super::pairing::pair_adjacent;
use super::recorder;
use super::standings::compute_standings;
use crate::db::{StoreResult, TournamentRepository};

/// Tournament manager
///
/// Every operation on a tournament runs under that tournament's lock, so a
/// pairing request, its bye award and any concurrent result report are
/// serialized. Different tournaments never contend.
pub struct TournamentManager<R> {
    /// Storage collaborator
    repo: Arc<R>,

    /// Engine configuration
    config: EngineConfig,

    /// One lock per tournament touched so far
    locks: Arc<RwLock<HashMap<TournamentId, Arc<Mutex<()>>>>>,

    /// Cached standings, dropped on every write to the tournament
    standings_cache: Arc<RwLock<HashMap<TournamentId, Vec<Standing>>>>,
}

impl<R> Clone for TournamentManager<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            config: self.config.clone(),
            locks: Arc::clone(&self.locks),
            standings_cache: Arc::clone(&self.standings_cache),
        }
    }
}

impl<R: TournamentRepository> TournamentManager<R> {
    /// Create a new tournament manager with the default configuration
    pub fn new(repo: Arc<R>) -> Self {
        Self::with_config(repo, EngineConfig::default())
    }

    /// Create a new tournament manager
    ///
    /// # Arguments
    ///
    /// * `repo` - Storage collaborator
    /// * `config` - Engine configuration
    pub fn with_config(repo: Arc<R>, config: EngineConfig) -> Self {
        Self {
            repo,
            config,
            locks: Arc::new(RwLock::new(HashMap::new())),
            standings_cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create a tournament, or return the existing one when `tournament_id`
    /// is already taken.
    pub async fn create_tournament(
        &self,
        tournament_id: Option<TournamentId>,
        name: &str,
    ) -> TournamentResult<TournamentId> {
        let name = non_empty(name)?;
        let id = self.repo.create_tournament(tournament_id, name).await?;
        info!("Tournament {} ready: {}", id, name);
        Ok(id)
    }

    pub async fn rename_tournament(
        &self,
        tournament_id: TournamentId,
        name: &str,
    ) -> TournamentResult<()> {
        let name = non_empty(name)?;
        let _guard = self.lock_tournament(tournament_id).await;

        if !self.repo.rename_tournament(tournament_id, name).await? {
            return Err(TournamentError::TournamentNotFound(tournament_id));
        }
        self.invalidate(tournament_id).await;

        info!("Tournament {} renamed to {}", tournament_id, name);
        Ok(())
    }

    /// Delete a tournament together with its registrations and matches
    pub async fn delete_tournament(&self, tournament_id: TournamentId) -> TournamentResult<()> {
        {
            let _guard = self.lock_tournament(tournament_id).await;

            if !self.repo.delete_tournament(tournament_id).await? {
                return Err(TournamentError::TournamentNotFound(tournament_id));
            }
            self.invalidate(tournament_id).await;
        }
        // Callers still queued on the old lock hold their own Arc and will
        // find the tournament gone.
        self.locks.write().await.remove(&tournament_id);

        info!("Tournament {} deleted", tournament_id);
        Ok(())
    }

    pub async fn get_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        self.read_with_retry("tournament", || self.repo.get_tournament(tournament_id))
            .await?
            .ok_or(TournamentError::TournamentNotFound(tournament_id))
    }

    pub async fn list_tournaments(&self) -> TournamentResult<Vec<Tournament>> {
        self.read_with_retry("tournaments", || self.repo.list_tournaments())
            .await
    }

    /// Create a player and enter them into a tournament
    ///
    /// # Returns
    ///
    /// * `TournamentResult<PlayerId>` - ID of the new player
    pub async fn register_player(
        &self,
        tournament_id: TournamentId,
        name: &str,
    ) -> TournamentResult<PlayerId> {
        let name = non_empty(name)?;
        let _guard = self.lock_tournament(tournament_id).await;
        self.ensure_exists(tournament_id).await?;

        let player_id = self.repo.create_player(name).await?;
        self.repo
            .insert_registration(tournament_id, Slot::Player(player_id))
            .await?;
        self.invalidate(tournament_id).await;

        info!(
            "Player {} ({}) registered to tournament {}",
            player_id, name, tournament_id
        );
        Ok(player_id)
    }

    /// Enter an existing player into a tournament
    ///
    /// # Errors
    ///
    /// * `TournamentError::PlayerNotFound` - Unknown player
    /// * `TournamentError::AlreadyRegistered` - Player already entered
    pub async fn enter_tournament(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<()> {
        let _guard = self.lock_tournament(tournament_id).await;
        self.ensure_exists(tournament_id).await?;

        if self
            .read_with_retry("player", || self.repo.get_player(player_id))
            .await?
            .is_none()
        {
            return Err(TournamentError::PlayerNotFound(player_id));
        }

        let slot = Slot::Player(player_id);
        if self
            .read_with_retry("registration", || self.repo.is_registered(tournament_id, slot))
            .await?
        {
            return Err(TournamentError::AlreadyRegistered {
                tournament: tournament_id,
                player: player_id,
            });
        }

        self.repo.insert_registration(tournament_id, slot).await?;
        self.invalidate(tournament_id).await;

        info!(
            "Player {} entered tournament {}",
            player_id, tournament_id
        );
        Ok(())
    }

    /// Number of real players entered in a tournament
    pub async fn count_players(&self, tournament_id: TournamentId) -> TournamentResult<usize> {
        let _guard = self.lock_tournament(tournament_id).await;
        self.ensure_exists(tournament_id).await?;
        Ok(self.registrations(tournament_id).await?.len())
    }

    /// Ranked standings of a tournament
    pub async fn standings(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Standing>> {
        let _guard = self.lock_tournament(tournament_id).await;
        self.ensure_exists(tournament_id).await?;

        if self.config.cache_standings {
            if let Some(cached) = self.standings_cache.read().await.get(&tournament_id) {
                debug!("Standings cache hit for tournament {}", tournament_id);
                return Ok(cached.clone());
            }
        }

        let registrations = self.registrations(tournament_id).await?;
        let matches = self.matches(tournament_id).await?;
        let standings = compute_standings(&registrations, &matches);
        debug!(
            "Computed standings for tournament {} from {} matches",
            tournament_id,
            matches.len()
        );

        if self.config.cache_standings {
            self.standings_cache
                .write()
                .await
                .insert(tournament_id, standings.clone());
        }
        Ok(standings)
    }

    /// Decide who sits out the next round.
    ///
    /// Returns `None` for an even field. For an odd field the bye slot is
    /// entered into the tournament (once) and the recipient is returned; the
    /// bye match itself is recorded by [`next_round_pairings`](Self::next_round_pairings).
    pub async fn resolve_bye(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Option<Standing>> {
        let _guard = self.lock_tournament(tournament_id).await;
        let tournament = self.get_tournament(tournament_id).await?;

        let registrations = self.registrations(tournament_id).await?;
        if registrations.len() % 2 == 0 {
            return Ok(None);
        }
        self.enter_bye_slot(tournament_id).await?;

        let matches = self.matches(tournament_id).await?;
        let (standings, pending) = round_view(&registrations, &matches, tournament.pending_bye);
        let recipient = choose_bye(tournament_id, &standings, &matches, pending)?;
        Ok(Some(recipient.clone()))
    }

    /// Generate the next round.
    ///
    /// For an odd field the bye is resolved and its match recorded before the
    /// rest of the field is paired. The tournament then carries a pending
    /// round marker until the first real result is reported; calling this
    /// again in between returns the same round without awarding another bye.
    /// A lone player's round has nothing left to report and is never pending.
    pub async fn next_round_pairings(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Pairing>> {
        let _guard = self.lock_tournament(tournament_id).await;
        let tournament = self.get_tournament(tournament_id).await?;

        let registrations = self.registrations(tournament_id).await?;
        let matches = self.matches(tournament_id).await?;
        let (standings, pending) = round_view(&registrations, &matches, tournament.pending_bye);

        let bye = if standings.len() % 2 == 1 {
            let recipient = choose_bye(tournament_id, &standings, &matches, pending)
                .inspect_err(|e| error!("Bye resolution failed: {}", e))?;
            match pending {
                Some(_) => debug!(
                    "Round in tournament {} already paired; reusing bye for player {}",
                    tournament_id, recipient.player_id
                ),
                None => {
                    let opens_round = standings.len() > 1;
                    self.award_bye(tournament_id, recipient, opens_round).await?;
                }
            }
            Some(recipient)
        } else {
            None
        };

        let pairings = pair_adjacent(&standings, bye)
            .inspect_err(|e| error!("Pairing failed for tournament {}: {}", tournament_id, e))?;

        info!(
            "Paired {} entries for tournament {}",
            pairings.len(),
            tournament_id
        );
        Ok(pairings)
    }

    /// Record the result of one match.
    ///
    /// Either slot may be [`Slot::Bye`] to report a bye by hand; the real
    /// player must then be credited the win. A manual bye enters the bye slot
    /// in the same write as its match and never opens a pending round.
    pub async fn record_match(
        &self,
        tournament_id: TournamentId,
        player_1: Slot,
        player_2: Slot,
        outcome: Outcome,
    ) -> TournamentResult<MatchId> {
        let _guard = self.lock_tournament(tournament_id).await;
        self.ensure_exists(tournament_id).await?;

        let new_match = recorder::build_match(tournament_id, player_1, player_2, outcome)?;
        let registrations = self.registrations(tournament_id).await?;
        let matches = self.matches(tournament_id).await?;
        recorder::check_against_history(&new_match, &registrations, &matches)?;

        let match_id = self.repo.insert_match(&new_match).await?;
        self.invalidate(tournament_id).await;

        info!(
            "Recorded match {} in tournament {}: {} vs {} ({})",
            match_id, tournament_id, new_match.player_1, new_match.player_2, outcome
        );
        Ok(match_id)
    }

    async fn award_bye(
        &self,
        tournament_id: TournamentId,
        recipient: &Standing,
        opens_round: bool,
    ) -> TournamentResult<()> {
        let bye_match = recorder::build_match(
            tournament_id,
            Slot::Player(recipient.player_id),
            Slot::Bye,
            Outcome::Player1Wins,
        )?;
        if opens_round {
            self.repo.open_round_with_bye(&bye_match).await?;
        } else {
            self.repo.insert_match(&bye_match).await?;
        }
        self.invalidate(tournament_id).await;

        info!(
            "Bye awarded to player {} ({}) in tournament {}",
            recipient.player_id, recipient.name, tournament_id
        );
        Ok(())
    }

    async fn enter_bye_slot(&self, tournament_id: TournamentId) -> TournamentResult<()> {
        if self
            .repo
            .insert_registration(tournament_id, Slot::Bye)
            .await?
        {
            info!("Bye slot entered into tournament {}", tournament_id);
        }
        Ok(())
    }

    async fn lock_tournament(&self, tournament_id: TournamentId) -> OwnedMutexGuard<()> {
        let existing = self.locks.read().await.get(&tournament_id).cloned();
        let lock = match existing {
            Some(lock) => lock,
            None => self
                .locks
                .write()
                .await
                .entry(tournament_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone(),
        };
        lock.lock_owned().await
    }

    async fn invalidate(&self, tournament_id: TournamentId) {
        self.standings_cache.write().await.remove(&tournament_id);
    }

    async fn ensure_exists(&self, tournament_id: TournamentId) -> TournamentResult<()> {
        if self
            .read_with_retry("tournament", || self.repo.tournament_exists(tournament_id))
            .await?
        {
            Ok(())
        } else {
            Err(TournamentError::TournamentNotFound(tournament_id))
        }
    }

    async fn registrations(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Player>> {
        self.read_with_retry("registrations", || {
            self.repo.get_registrations(tournament_id)
        })
        .await
    }

    async fn matches(&self, tournament_id: TournamentId) -> TournamentResult<Vec<MatchRecord>> {
        self.read_with_retry("matches", || self.repo.get_matches(tournament_id))
            .await
    }

    /// Run a pure read, retrying transient store failures.
    /// Writes must never go through here.
    async fn read_with_retry<T, F, Fut>(&self, what: &str, mut op: F) -> TournamentResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.config.read_retries => {
                    attempt += 1;
                    warn!(
                        "Retrying {} read ({}/{}): {}",
                        what, attempt, self.config.read_retries, e
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Standings the next round is paired from, plus the recipient of a bye that
/// was already recorded for that round.
///
/// A pending bye is left out of the standings so repeated calls see the same
/// ranking the round was first paired from. The marker only applies while
/// the field is still odd.
fn round_view(
    registrations: &[Player],
    matches: &[MatchRecord],
    marker: Option<PlayerId>,
) -> (Vec<Standing>, Option<PlayerId>) {
    match marker {
        Some(recipient) if registrations.len() % 2 == 1 => (
            compute_standings(registrations, &bye::without_bye_of(matches, recipient)),
            Some(recipient),
        ),
        _ => (compute_standings(registrations, matches), None),
    }
}

fn choose_bye<'a>(
    tournament_id: TournamentId,
    standings: &'a [Standing],
    matches: &[MatchRecord],
    pending: Option<PlayerId>,
) -> TournamentResult<&'a Standing> {
    match pending {
        Some(id) => standings
            .iter()
            .find(|s| s.player_id == id)
            .ok_or_else(|| {
                TournamentError::PairingMismatch(format!(
                    "pending bye recipient {id} is not registered"
                ))
            }),
        None => bye::select_bye(tournament_id, standings, matches),
    }
}

fn non_empty(name: &str) -> TournamentResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        Err(TournamentError::EmptyName)
    } else {
        Ok(name)
    }
}
