//! Swiss-system tournament engine.
//!
//! This module provides:
//! - Standings ranked by wins, then opponent match wins (OMW)
//! - Bye resolution for odd-sized fields, at most one bye per player
//! - Adjacent-rank pairing of the next round
//! - Match validation and recording
//!
//! ## Example
//!
//! ```
//! use swiss_pairing::db::MemoryRepository;
//! use swiss_pairing::tournament::{Outcome, Slot, TournamentManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = TournamentManager::new(Arc::new(MemoryRepository::new()));
//!
//!     let tournament = manager.create_tournament(None, "Friday Chess").await?;
//!     let alice = manager.register_player(tournament, "Alice").await?;
//!     let bob = manager.register_player(tournament, "Bob").await?;
//!
//!     let round = manager.next_round_pairings(tournament).await?;
//!     assert_eq!(round.len(), 1);
//!
//!     manager
//!         .record_match(tournament, Slot::Player(alice), Slot::Player(bob), Outcome::Player1Wins)
//!         .await?;
//!     assert_eq!(manager.standings(tournament).await?[0].player_id, alice);
//!
//!     Ok(())
//! }
//! ```

pub mod bye;
pub mod config;
pub mod errors;
pub mod manager;
pub mod models;
pub mod pairing;
pub mod recorder;
pub mod standings;

pub use config::EngineConfig;
pub use errors::{ErrorKind, TournamentError, TournamentResult};
pub use manager::TournamentManager;
pub use models::{
    BYE_NAME, MatchId, MatchRecord, NewMatch, Outcome, Pairing, Player, PlayerId, Slot, Standing,
    Tournament, TournamentId,
};
pub use pairing::{pair_adjacent, verify_pairings};
pub use standings::compute_standings;
