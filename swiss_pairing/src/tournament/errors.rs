//! Tournament error types.

use thiserror::Error;

use super::models::{PlayerId, TournamentId};
use crate::db::StoreError;

/// Broad classification of a [`TournamentError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown tournament or player reference
    NotFound,
    /// Rejected input; nothing was written
    Validation,
    /// Internal consistency failure; always fatal
    InvariantViolation,
    /// Repository failure, propagated unchanged
    Store,
}

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    /// Tournament not found
    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    /// Player not found
    #[error("Player not found: {0}")]
    PlayerNotFound(PlayerId),

    /// Player is not entered in the tournament
    #[error("Player {player} is not registered to tournament {tournament}")]
    NotRegistered {
        tournament: TournamentId,
        player: PlayerId,
    },

    /// Player already entered in the tournament
    #[error("Player {player} is already registered to tournament {tournament}")]
    AlreadyRegistered {
        tournament: TournamentId,
        player: PlayerId,
    },

    /// Both slots of a match name the same contestant
    #[error("A match needs two distinct players")]
    SelfPairing,

    /// Unknown outcome tag
    #[error("Invalid outcome: {0}")]
    InvalidOutcome(String),

    /// Unparseable player slot
    #[error("Invalid player slot: {0}")]
    InvalidSlot(String),

    /// A bye was reported as a tie or as won by the bye slot
    #[error("A bye must be credited to the real player")]
    ByeCannotWin,

    /// The player already had the bye in this tournament
    #[error("Player {player} already received a bye in tournament {tournament}")]
    DuplicateBye {
        tournament: TournamentId,
        player: PlayerId,
    },

    /// Blank tournament or player name
    #[error("Name must not be empty")]
    EmptyName,

    /// Every ranked player already had a bye
    #[error("Every player in tournament {0} has already received a bye")]
    ByeExhausted(TournamentId),

    /// Generated pairings do not cover the field exactly once
    #[error("Pairing invariant violated: {0}")]
    PairingMismatch(String),

    /// Repository error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl TournamentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TournamentError::TournamentNotFound(_)
            | TournamentError::PlayerNotFound(_)
            | TournamentError::NotRegistered { .. } => ErrorKind::NotFound,
            TournamentError::AlreadyRegistered { .. }
            | TournamentError::SelfPairing
            | TournamentError::InvalidOutcome(_)
            | TournamentError::InvalidSlot(_)
            | TournamentError::ByeCannotWin
            | TournamentError::DuplicateBye { .. }
            | TournamentError::EmptyName => ErrorKind::Validation,
            TournamentError::ByeExhausted(_) | TournamentError::PairingMismatch(_) => {
                ErrorKind::InvariantViolation
            }
            TournamentError::Store(_) => ErrorKind::Store,
        }
    }

    /// Invariant violations indicate a bug and must never be corrected silently
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::InvariantViolation
    }

    /// Get a client-safe error message that doesn't leak store internals
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Store(_) => "Internal storage error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;
