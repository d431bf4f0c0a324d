//! Repository trait definitions for testability and dependency injection.
//!
//! The engine never talks to a connection directly. Every tournament operation
//! receives a [`TournamentRepository`], so the PostgreSQL store and the
//! in-memory store are interchangeable.

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::time::Duration;

use super::errors::{StoreError, StoreResult};
use super::timeouts::{DEFAULT_QUERY_TIMEOUT, with_timeout};
use crate::tournament::models::{
    MatchId, MatchRecord, NewMatch, Player, PlayerId, Slot, Tournament, TournamentId,
};

/// Schema applied by [`PgTournamentRepository::migrate`]
pub const SCHEMA: &str = include_str!("../../migrations/0001_swiss.sql");

/// Trait for tournament storage operations
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Check whether a tournament exists
    async fn tournament_exists(&self, tournament_id: TournamentId) -> StoreResult<bool>;

    /// Find tournament by ID
    async fn get_tournament(&self, tournament_id: TournamentId)
    -> StoreResult<Option<Tournament>>;

    /// All tournaments, ordered by ID
    async fn list_tournaments(&self) -> StoreResult<Vec<Tournament>>;

    /// Create a tournament.
    ///
    /// With an explicit ID this is insert-if-absent: an existing tournament
    /// keeps its name and the ID is returned unchanged.
    async fn create_tournament(
        &self,
        tournament_id: Option<TournamentId>,
        name: &str,
    ) -> StoreResult<TournamentId>;

    /// Rename a tournament. Returns false if it does not exist.
    async fn rename_tournament(&self, tournament_id: TournamentId, name: &str)
    -> StoreResult<bool>;

    /// Delete a tournament with its registrations and matches.
    /// Returns false if it did not exist.
    async fn delete_tournament(&self, tournament_id: TournamentId) -> StoreResult<bool>;

    /// Create a new player
    async fn create_player(&self, name: &str) -> StoreResult<PlayerId>;

    /// Find player by ID
    async fn get_player(&self, player_id: PlayerId) -> StoreResult<Option<Player>>;

    /// Real players entered in a tournament, in registration order
    async fn get_registrations(&self, tournament_id: TournamentId) -> StoreResult<Vec<Player>>;

    /// Check whether a slot is entered in a tournament
    async fn is_registered(&self, tournament_id: TournamentId, slot: Slot) -> StoreResult<bool>;

    /// Enter a slot into a tournament. Idempotent; returns whether a new
    /// registration was created.
    async fn insert_registration(
        &self,
        tournament_id: TournamentId,
        slot: Slot,
    ) -> StoreResult<bool>;

    /// Match history of a tournament, in insertion order
    async fn get_matches(&self, tournament_id: TournamentId) -> StoreResult<Vec<MatchRecord>>;

    /// Append one reported match.
    ///
    /// Applied atomically with its effect on the tournament row: a bye match
    /// also enters the bye slot, any other match closes the pending round.
    async fn insert_match(&self, new_match: &NewMatch) -> StoreResult<MatchId>;

    /// Record the bye of a freshly paired round and mark that round pending
    /// on the recipient, in one atomic write.
    async fn open_round_with_bye(&self, bye_match: &NewMatch) -> StoreResult<MatchId>;
}

/// How a match write touches the tournament row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RoundEffect {
    /// A real result closes any pending round
    CloseRound,
    /// A bye reported by hand only enters the bye slot
    ManualBye,
    /// A bye awarded by pairing also marks its round pending
    OpenRound,
}

impl RoundEffect {
    pub(crate) fn of(new_match: &NewMatch) -> Self {
        if new_match.player_1.is_bye() || new_match.player_2.is_bye() {
            RoundEffect::ManualBye
        } else {
            RoundEffect::CloseRound
        }
    }
}

/// Default PostgreSQL implementation of `TournamentRepository`
#[derive(Clone)]
pub struct PgTournamentRepository {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgTournamentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Override the per-query timeout
    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    async fn write_match(&self, new_match: &NewMatch, effect: RoundEffect) -> StoreResult<MatchId> {
        // The recipient of a bye is always stored in player_1
        let (first, second) = match (new_match.player_1, new_match.player_2) {
            (Slot::Bye, other) => (other, Slot::Bye),
            pair => pair,
        };
        let player_1 = first
            .player_id()
            .ok_or_else(|| StoreError::Unavailable("match has no real player".to_string()))?;

        let mut tx = with_timeout(self.query_timeout, self.pool.begin()).await?;

        let row = with_timeout(
            self.query_timeout,
            sqlx::query(
                r#"
                INSERT INTO matches (tournament_id, player_1, player_2, winner)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(new_match.tournament_id)
            .bind(player_1)
            .bind(second.player_id())
            .bind(new_match.winner)
            .fetch_one(&mut *tx),
        )
        .await?;

        let update = match effect {
            RoundEffect::CloseRound => {
                sqlx::query("UPDATE tournaments SET pending_bye = NULL WHERE id = $1")
                    .bind(new_match.tournament_id)
            }
            RoundEffect::ManualBye => {
                sqlx::query("UPDATE tournaments SET bye_registered = TRUE WHERE id = $1")
                    .bind(new_match.tournament_id)
            }
            RoundEffect::OpenRound => sqlx::query(
                "UPDATE tournaments SET bye_registered = TRUE, pending_bye = $2 WHERE id = $1",
            )
            .bind(new_match.tournament_id)
            .bind(player_1),
        };
        with_timeout(self.query_timeout, update.execute(&mut *tx)).await?;

        with_timeout(self.query_timeout, tx.commit()).await?;
        Ok(row.get("id"))
    }

    /// Apply the bundled schema. Safe to run repeatedly.
    pub async fn migrate(&self) -> StoreResult<()> {
        with_timeout(self.query_timeout, sqlx::raw_sql(SCHEMA).execute(&self.pool)).await?;
        Ok(())
    }
}

fn tournament_from_row(r: &PgRow) -> Tournament {
    Tournament {
        id: r.get("id"),
        name: r.get("name"),
        bye_registered: r.get("bye_registered"),
        pending_bye: r.get("pending_bye"),
        created_at: r.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    }
}

fn match_from_row(r: &PgRow) -> MatchRecord {
    MatchRecord {
        id: r.get("id"),
        tournament_id: r.get("tournament_id"),
        player_1: Slot::Player(r.get("player_1")),
        player_2: r
            .get::<Option<i64>, _>("player_2")
            .map_or(Slot::Bye, Slot::Player),
        winner: r.get("winner"),
        recorded_at: r.get::<chrono::NaiveDateTime, _>("recorded_at").and_utc(),
    }
}

#[async_trait]
impl TournamentRepository for PgTournamentRepository {
    async fn tournament_exists(&self, tournament_id: TournamentId) -> StoreResult<bool> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query("SELECT EXISTS (SELECT 1 FROM tournaments WHERE id = $1) AS found")
                .bind(tournament_id)
                .fetch_one(&self.pool),
        )
        .await?;

        Ok(row.get("found"))
    }

    async fn get_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Option<Tournament>> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(
                "SELECT id, name, bye_registered, pending_bye, created_at
                 FROM tournaments WHERE id = $1",
            )
            .bind(tournament_id)
            .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(tournament_from_row))
    }

    async fn list_tournaments(&self) -> StoreResult<Vec<Tournament>> {
        let rows = with_timeout(
            self.query_timeout,
            sqlx::query(
                "SELECT id, name, bye_registered, pending_bye, created_at
                 FROM tournaments ORDER BY id",
            )
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.iter().map(tournament_from_row).collect())
    }

    async fn create_tournament(
        &self,
        tournament_id: Option<TournamentId>,
        name: &str,
    ) -> StoreResult<TournamentId> {
        let Some(id) = tournament_id else {
            let row = with_timeout(
                self.query_timeout,
                sqlx::query("INSERT INTO tournaments (name) VALUES ($1) RETURNING id")
                    .bind(name)
                    .fetch_one(&self.pool),
            )
            .await?;
            return Ok(row.get("id"));
        };

        let mut tx = with_timeout(self.query_timeout, self.pool.begin()).await?;

        with_timeout(
            self.query_timeout,
            sqlx::query(
                "INSERT INTO tournaments (id, name) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
            )
            .bind(id)
            .bind(name)
            .execute(&mut *tx),
        )
        .await?;

        // Explicit IDs bypass the serial sequence; keep it ahead of them
        with_timeout(
            self.query_timeout,
            sqlx::query(
                "SELECT setval(pg_get_serial_sequence('tournaments', 'id'),
                               GREATEST((SELECT MAX(id) FROM tournaments), 1))",
            )
            .execute(&mut *tx),
        )
        .await?;

        with_timeout(self.query_timeout, tx.commit()).await?;
        Ok(id)
    }

    async fn rename_tournament(
        &self,
        tournament_id: TournamentId,
        name: &str,
    ) -> StoreResult<bool> {
        let result = with_timeout(
            self.query_timeout,
            sqlx::query("UPDATE tournaments SET name = $1 WHERE id = $2")
                .bind(name)
                .bind(tournament_id)
                .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_tournament(&self, tournament_id: TournamentId) -> StoreResult<bool> {
        // registrations and matches go with it through ON DELETE CASCADE
        let result = with_timeout(
            self.query_timeout,
            sqlx::query("DELETE FROM tournaments WHERE id = $1")
                .bind(tournament_id)
                .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_player(&self, name: &str) -> StoreResult<PlayerId> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query("INSERT INTO players (name) VALUES ($1) RETURNING id")
                .bind(name)
                .fetch_one(&self.pool),
        )
        .await?;

        Ok(row.get("id"))
    }

    async fn get_player(&self, player_id: PlayerId) -> StoreResult<Option<Player>> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query("SELECT id, name FROM players WHERE id = $1")
                .bind(player_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.map(|r| Player {
            id: r.get("id"),
            name: r.get("name"),
        }))
    }

    async fn get_registrations(&self, tournament_id: TournamentId) -> StoreResult<Vec<Player>> {
        let rows = with_timeout(
            self.query_timeout,
            sqlx::query(
                r#"
                SELECT p.id, p.name
                FROM registrations r
                JOIN players p ON p.id = r.player_id
                WHERE r.tournament_id = $1
                ORDER BY r.seq
                "#,
            )
            .bind(tournament_id)
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Player {
                id: r.get("id"),
                name: r.get("name"),
            })
            .collect())
    }

    async fn is_registered(&self, tournament_id: TournamentId, slot: Slot) -> StoreResult<bool> {
        let query = match slot {
            Slot::Player(player_id) => sqlx::query(
                "SELECT EXISTS (SELECT 1 FROM registrations
                                WHERE tournament_id = $1 AND player_id = $2) AS found",
            )
            .bind(tournament_id)
            .bind(player_id),
            Slot::Bye => sqlx::query(
                "SELECT EXISTS (SELECT 1 FROM tournaments
                                WHERE id = $1 AND bye_registered) AS found",
            )
            .bind(tournament_id),
        };

        let row = with_timeout(self.query_timeout, query.fetch_one(&self.pool)).await?;
        Ok(row.get("found"))
    }

    async fn insert_registration(
        &self,
        tournament_id: TournamentId,
        slot: Slot,
    ) -> StoreResult<bool> {
        let query = match slot {
            Slot::Player(player_id) => sqlx::query(
                "INSERT INTO registrations (tournament_id, player_id) VALUES ($1, $2)
                 ON CONFLICT (tournament_id, player_id) DO NOTHING",
            )
            .bind(tournament_id)
            .bind(player_id),
            Slot::Bye => sqlx::query(
                "UPDATE tournaments SET bye_registered = TRUE
                 WHERE id = $1 AND NOT bye_registered",
            )
            .bind(tournament_id),
        };

        let result = with_timeout(self.query_timeout, query.execute(&self.pool)).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_matches(&self, tournament_id: TournamentId) -> StoreResult<Vec<MatchRecord>> {
        let rows = with_timeout(
            self.query_timeout,
            sqlx::query(
                r#"
                SELECT id, tournament_id, player_1, player_2, winner, recorded_at
                FROM matches
                WHERE tournament_id = $1
                ORDER BY id
                "#,
            )
            .bind(tournament_id)
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.iter().map(match_from_row).collect())
    }

    async fn insert_match(&self, new_match: &NewMatch) -> StoreResult<MatchId> {
        self.write_match(new_match, RoundEffect::of(new_match)).await
    }

    async fn open_round_with_bye(&self, bye_match: &NewMatch) -> StoreResult<MatchId> {
        self.write_match(bye_match, RoundEffect::OpenRound).await
    }
}
