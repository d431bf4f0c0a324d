//! Storage layer: the [`TournamentRepository`] seam, its PostgreSQL and
//! in-memory implementations, and the connection pool they run on.

use log::info;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub mod config;
pub mod errors;
pub mod memory;
pub mod repository;
pub mod timeouts;

pub use config::DatabaseConfig;
pub use errors::{StoreError, StoreResult};
pub use memory::MemoryRepository;
pub use repository::{PgTournamentRepository, TournamentRepository};

/// PostgreSQL pool shared by every repository built from it
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Open a pool sized and timed by `config`.
    ///
    /// ```no_run
    /// use swiss_pairing::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), sqlx::Error> {
    ///     let db = Database::new(&DatabaseConfig::from_env()).await?;
    ///     let _repo = db.repository();
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        info!(
            "Tournament store pool open ({}-{} connections)",
            config.min_connections, config.max_connections
        );
        Ok(Self { pool })
    }

    /// Build a tournament repository on this pool
    pub fn repository(&self) -> PgTournamentRepository {
        PgTournamentRepository::new(self.pool.clone())
    }

    /// Round-trip a trivial query so a dead server is reported before any
    /// tournament operation starts.
    pub async fn health_check(&self, limit: Duration) -> StoreResult<()> {
        timeouts::with_timeout(limit, sqlx::query("SELECT 1").execute(&self.pool)).await?;
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
