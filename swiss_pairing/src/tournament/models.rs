//! Tournament data models for Swiss-system events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::TournamentError;

/// Tournament ID type
pub type TournamentId = i64;

/// Player ID type
pub type PlayerId = i64;

/// Match ID type
pub type MatchId = i64;

/// Display name used for the bye slot in pairings.
pub const BYE_NAME: &str = "bye round";

/// One side of a match or pairing.
///
/// The bye is a distinguished variant rather than a reserved player id, so it
/// can never be ranked or tallied by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    /// A registered contestant
    Player(PlayerId),
    /// The unopposed round
    Bye,
}

impl Slot {
    /// The contestant behind this slot, if any
    pub fn player_id(self) -> Option<PlayerId> {
        match self {
            Slot::Player(id) => Some(id),
            Slot::Bye => None,
        }
    }

    pub fn is_bye(self) -> bool {
        matches!(self, Slot::Bye)
    }
}

impl From<PlayerId> for Slot {
    fn from(id: PlayerId) -> Self {
        Slot::Player(id)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Player(id) => write!(f, "{id}"),
            Slot::Bye => write!(f, "bye"),
        }
    }
}

impl FromStr for Slot {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("bye") {
            return Ok(Slot::Bye);
        }
        s.parse::<PlayerId>()
            .map(Slot::Player)
            .map_err(|_| TournamentError::InvalidSlot(s.to_string()))
    }
}

/// Result of a single contest, from the point of view of `player_1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Player1Wins,
    Player2Wins,
    Tie,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Player1Wins => write!(f, "p1"),
            Outcome::Player2Wins => write!(f, "p2"),
            Outcome::Tie => write!(f, "tie"),
        }
    }
}

impl FromStr for Outcome {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "p1" | "player1" | "1" => Ok(Outcome::Player1Wins),
            "p2" | "player2" | "2" => Ok(Outcome::Player2Wins),
            "tie" | "draw" => Ok(Outcome::Tie),
            other => Err(TournamentError::InvalidOutcome(other.to_string())),
        }
    }
}

/// Tournament record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    /// Tournament ID
    pub id: TournamentId,
    /// Display name
    pub name: String,
    /// Whether the bye slot has been entered into this tournament
    pub bye_registered: bool,
    /// Recipient of the bye in a round that was paired but has no reported
    /// result yet
    pub pending_bye: Option<PlayerId>,
    /// Created at timestamp
    pub created_at: DateTime<Utc>,
}

/// Player record (global, not tournament scoped)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

/// A recorded match. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Match ID
    pub id: MatchId,
    /// Owning tournament
    pub tournament_id: TournamentId,
    /// First slot
    pub player_1: Slot,
    /// Second slot
    pub player_2: Slot,
    /// Winner, `None` for a tie
    pub winner: Option<PlayerId>,
    /// Recorded at timestamp
    pub recorded_at: DateTime<Utc>,
}

impl MatchRecord {
    /// The real player credited by this match if it is a bye
    pub fn bye_recipient(&self) -> Option<PlayerId> {
        match (self.player_1, self.player_2) {
            (Slot::Player(id), Slot::Bye) | (Slot::Bye, Slot::Player(id)) => Some(id),
            _ => None,
        }
    }

    pub fn is_bye(&self) -> bool {
        self.bye_recipient().is_some()
    }

    pub fn involves(&self, player_id: PlayerId) -> bool {
        self.player_1 == Slot::Player(player_id) || self.player_2 == Slot::Player(player_id)
    }
}

/// Insert payload for a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMatch {
    pub tournament_id: TournamentId,
    pub player_1: Slot,
    pub player_2: Slot,
    pub winner: Option<PlayerId>,
}

/// Derived per-player ranking row. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    /// Player ID
    pub player_id: PlayerId,
    /// Player name
    pub name: String,
    /// Matches won, including a bye
    pub wins: u32,
    /// Matches played, including a bye
    pub matches_played: u32,
    /// Opponent match wins: sum of the wins of every distinct opponent faced
    pub omw: u32,
}

/// One entry of a round's pairings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    pub player_1_id: PlayerId,
    pub player_1_name: String,
    pub player_2: Slot,
    pub player_2_name: String,
}

impl Pairing {
    /// A pairing between two ranked players
    pub fn between(first: &Standing, second: &Standing) -> Self {
        Self {
            player_1_id: first.player_id,
            player_1_name: first.name.clone(),
            player_2: Slot::Player(second.player_id),
            player_2_name: second.name.clone(),
        }
    }

    /// The placeholder entry for a bye
    pub fn bye(recipient: &Standing) -> Self {
        Self {
            player_1_id: recipient.player_id,
            player_1_name: recipient.name.clone(),
            player_2: Slot::Bye,
            player_2_name: BYE_NAME.to_string(),
        }
    }

    pub fn is_bye(&self) -> bool {
        self.player_2.is_bye()
    }

    /// Real players in this entry
    pub fn player_ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        std::iter::once(self.player_1_id).chain(self.player_2.player_id())
    }
}
