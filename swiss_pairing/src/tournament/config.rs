//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::db::config::parse_env_or;

/// Tuning knobs for [`TournamentManager`](super::TournamentManager)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Extra attempts for pure reads that hit a transient store error
    pub read_retries: u32,

    /// Keep computed standings per tournament until the next write
    pub cache_standings: bool,

    /// Per-query timeout for the PostgreSQL repository, in seconds
    pub query_timeout_secs: u64,
}

impl EngineConfig {
    /// Load from `SWISS_READ_RETRIES`, `SWISS_CACHE_STANDINGS` and
    /// `SWISS_QUERY_TIMEOUT_SECS`, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            read_retries: parse_env_or("SWISS_READ_RETRIES", defaults.read_retries),
            cache_standings: parse_env_or("SWISS_CACHE_STANDINGS", defaults.cache_standings),
            query_timeout_secs: parse_env_or(
                "SWISS_QUERY_TIMEOUT_SECS",
                defaults.query_timeout_secs,
            ),
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            read_retries: 1,
            cache_standings: true,
            query_timeout_secs: 5,
        }
    }
}
