//! # Swiss Pairing
//!
//! A Swiss-system tournament pairing engine backed by PostgreSQL.
//!
//! Players are ranked by wins, ties broken by opponent match wins (OMW), and
//! each round pairs adjacent ranks. Odd fields give one player a bye, worth a
//! win, and nobody gets more than one per tournament.
//!
//! ## Core Modules
//!
//! - [`tournament`]: Standings, byes, pairings and the [`TournamentManager`]
//! - [`db`]: Connection pooling and the [`TournamentRepository`] stores
//!
//! ## Example
//!
//! ```no_run
//! use swiss_pairing::{Database, DatabaseConfig, TournamentManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::from_env()).await?;
//!     let repo = db.repository();
//!     repo.migrate().await?;
//!
//!     let manager = TournamentManager::new(Arc::new(repo));
//!     let tournament = manager.create_tournament(Some(1), "Spring Open").await?;
//!     for pairing in manager.next_round_pairings(tournament).await? {
//!         println!("{} vs {}", pairing.player_1_name, pairing.player_2_name);
//!     }
//!     Ok(())
//! }
//! ```

/// Storage: connection pool, repository trait and its implementations.
pub mod db;

/// Swiss-system engine.
pub mod tournament;

pub use db::{
    Database, DatabaseConfig, MemoryRepository, PgTournamentRepository, StoreError,
    TournamentRepository,
};
pub use tournament::{
    EngineConfig, ErrorKind, Outcome, Pairing, Slot, Standing, TournamentError,
    TournamentManager, TournamentResult,
};
