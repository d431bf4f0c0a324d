//! Command line front end for the Swiss pairing engine.
//!
//! Each invocation connects to PostgreSQL, runs one subcommand through the
//! tournament manager and exits.

mod commands;
mod config;
mod logging;

use std::sync::Arc;

use anyhow::{Error, anyhow};
use pico_args::Arguments;
use rand::SeedableRng;
use rand::rngs::StdRng;
use swiss_pairing::{Database, TournamentError, TournamentManager};
use tracing::{error, info};

use commands::Command;
use config::CliConfig;

const HELP: &str = "\
Run Swiss-system tournaments backed by PostgreSQL

USAGE:
  swiss [OPTIONS] <SUBCOMMAND>

SUBCOMMANDS:
  migrate                                Apply the database schema
  create-tournament [--id N] NAME        Create a tournament (existing IDs are kept)
  rename-tournament ID NAME              Rename a tournament
  delete-tournament ID                   Delete a tournament and its history
  tournaments                            List tournaments
  register ID NAME...                    Create players and enter them
  enter ID PLAYER_ID                     Enter an existing player
  standings ID [--json]                  Show ranked standings
  pairings ID [--json]                   Pair the next round
  report ID P1 P2 [--outcome p1|p2|tie]  Record a result (P1 or P2 may be 'bye')
  simulate ID [--rounds N]               Pair and report random results

OPTIONS:
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  DATABASE_URL             PostgreSQL connection string
  DB_MAX_CONNECTIONS       Connection pool size
  SWISS_READ_RETRIES       Retries for reads that hit a transient store error
  SWISS_CACHE_STANDINGS    Cache standings between writes (true/false)
  SWISS_QUERY_TIMEOUT_SECS Per-query timeout
  RUST_LOG                 Log filter (default: info,sqlx=warn)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;
    let command = Command::parse(pargs)?;

    logging::init();

    let config = CliConfig::from_env(database_url);
    config.validate()?;

    let db = Database::new(&config.database)
        .await
        .map_err(|e| anyhow!("Failed to connect to database: {}", e))?;
    db.health_check(config.engine.query_timeout())
        .await
        .map_err(|e| anyhow!("Database health check failed: {}", e))?;
    let repo = db
        .repository()
        .with_query_timeout(config.engine.query_timeout());

    let result = if command == Command::Migrate {
        repo.migrate().await.map_err(Error::from).inspect(|_| {
            info!("Schema applied");
        })
    } else {
        let manager = TournamentManager::with_config(Arc::new(repo), config.engine.clone());
        let mut rng = StdRng::from_os_rng();
        commands::run(&manager, command, &mut std::io::stdout(), &mut rng).await
    };

    db.close().await;

    if let Err(e) = result {
        if let Some(engine) = e.downcast_ref::<TournamentError>() {
            error!(kind = ?engine.kind(), "{}", engine);
            eprintln!("error: {}", engine.client_message());
            std::process::exit(1);
        }
        return Err(e);
    }
    Ok(())
}
