//! Subcommand parsing and execution.

use anyhow::{Error, anyhow, bail};
use pico_args::Arguments;
use rand::Rng;
use std::io::Write;
use std::time::Instant;
use swiss_pairing::tournament::{Outcome, Pairing, PlayerId, Slot, Standing, TournamentId};
use swiss_pairing::{TournamentManager, TournamentRepository};

use crate::logging::log_operation;

/// One invocation of the CLI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Migrate,
    CreateTournament {
        id: Option<TournamentId>,
        name: String,
    },
    RenameTournament {
        id: TournamentId,
        name: String,
    },
    DeleteTournament {
        id: TournamentId,
    },
    Tournaments,
    Register {
        id: TournamentId,
        names: Vec<String>,
    },
    Enter {
        id: TournamentId,
        player: PlayerId,
    },
    Standings {
        id: TournamentId,
        json: bool,
    },
    Pairings {
        id: TournamentId,
        json: bool,
    },
    Report {
        id: TournamentId,
        player_1: Slot,
        player_2: Slot,
        outcome: Outcome,
    },
    Simulate {
        id: TournamentId,
        rounds: u32,
    },
}

impl Command {
    /// Parse the subcommand and its arguments. Options are read before free
    /// arguments, so they may appear anywhere on the line.
    pub fn parse(mut pargs: Arguments) -> Result<Self, Error> {
        let Some(subcommand) = pargs.subcommand()? else {
            bail!("No subcommand given, see --help");
        };

        let command = match subcommand.as_str() {
            "migrate" => Command::Migrate,
            "create-tournament" => {
                let id = pargs.opt_value_from_str("--id")?;
                let name = rest(pargs)?.join(" ");
                if name.is_empty() {
                    bail!("create-tournament needs a NAME");
                }
                return Ok(Command::CreateTournament { id, name });
            }
            "rename-tournament" => {
                let id = pargs.free_from_str()?;
                let name = rest(pargs)?.join(" ");
                if name.is_empty() {
                    bail!("rename-tournament needs a NAME");
                }
                return Ok(Command::RenameTournament { id, name });
            }
            "delete-tournament" => Command::DeleteTournament {
                id: pargs.free_from_str()?,
            },
            "tournaments" => Command::Tournaments,
            "register" => {
                let id = pargs.free_from_str()?;
                let names = rest(pargs)?;
                if names.is_empty() {
                    bail!("register needs at least one NAME");
                }
                return Ok(Command::Register { id, names });
            }
            "enter" => Command::Enter {
                id: pargs.free_from_str()?,
                player: pargs.free_from_str()?,
            },
            "standings" => {
                let json = pargs.contains("--json");
                Command::Standings {
                    id: pargs.free_from_str()?,
                    json,
                }
            }
            "pairings" => {
                let json = pargs.contains("--json");
                Command::Pairings {
                    id: pargs.free_from_str()?,
                    json,
                }
            }
            "report" => {
                let outcome = pargs
                    .opt_value_from_str("--outcome")?
                    .unwrap_or(Outcome::Player1Wins);
                Command::Report {
                    id: pargs.free_from_str()?,
                    player_1: pargs.free_from_str()?,
                    player_2: pargs.free_from_str()?,
                    outcome,
                }
            }
            "simulate" => {
                let rounds = pargs.opt_value_from_str("--rounds")?.unwrap_or(1);
                Command::Simulate {
                    id: pargs.free_from_str()?,
                    rounds,
                }
            }
            other => bail!("Unknown subcommand: {other}"),
        };

        let leftover = pargs.finish();
        if !leftover.is_empty() {
            bail!("Unexpected arguments: {:?}", leftover);
        }
        Ok(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Migrate => "migrate",
            Command::CreateTournament { .. } => "create-tournament",
            Command::RenameTournament { .. } => "rename-tournament",
            Command::DeleteTournament { .. } => "delete-tournament",
            Command::Tournaments => "tournaments",
            Command::Register { .. } => "register",
            Command::Enter { .. } => "enter",
            Command::Standings { .. } => "standings",
            Command::Pairings { .. } => "pairings",
            Command::Report { .. } => "report",
            Command::Simulate { .. } => "simulate",
        }
    }

    pub fn tournament_id(&self) -> Option<TournamentId> {
        match self {
            Command::Migrate | Command::Tournaments => None,
            Command::CreateTournament { id, .. } => *id,
            Command::RenameTournament { id, .. }
            | Command::DeleteTournament { id }
            | Command::Register { id, .. }
            | Command::Enter { id, .. }
            | Command::Standings { id, .. }
            | Command::Pairings { id, .. }
            | Command::Report { id, .. }
            | Command::Simulate { id, .. } => Some(*id),
        }
    }
}

/// Remaining free arguments as UTF-8 strings
fn rest(pargs: Arguments) -> Result<Vec<String>, Error> {
    pargs
        .finish()
        .into_iter()
        .map(|arg| {
            arg.into_string()
                .map_err(|arg| anyhow!("Argument is not valid UTF-8: {:?}", arg))
        })
        .collect()
}

/// Execute a command against the engine, writing results to `out`.
///
/// `migrate` needs the PostgreSQL store directly and is handled by the caller.
pub async fn run<R, W, G>(
    manager: &TournamentManager<R>,
    command: Command,
    out: &mut W,
    rng: &mut G,
) -> Result<(), Error>
where
    R: TournamentRepository,
    W: Write,
    G: Rng,
{
    let start = Instant::now();
    let operation = command.name();
    let tournament_id = command.tournament_id();

    match command {
        Command::Migrate => bail!("migrate must run against the PostgreSQL store"),
        Command::CreateTournament { id, name } => {
            let id = manager.create_tournament(id, &name).await?;
            writeln!(out, "{id}")?;
        }
        Command::RenameTournament { id, name } => {
            manager.rename_tournament(id, &name).await?;
        }
        Command::DeleteTournament { id } => {
            manager.delete_tournament(id).await?;
        }
        Command::Tournaments => {
            for t in manager.list_tournaments().await? {
                writeln!(
                    out,
                    "{}\t{}\t{}",
                    t.id,
                    t.name,
                    t.created_at.format("%Y-%m-%d %H:%M")
                )?;
            }
        }
        Command::Register { id, names } => {
            for name in names {
                let player = manager.register_player(id, &name).await?;
                writeln!(out, "{player}\t{name}")?;
            }
        }
        Command::Enter { id, player } => {
            manager.enter_tournament(id, player).await?;
        }
        Command::Standings { id, json } => {
            let standings = manager.standings(id).await?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&standings)?)?;
            } else {
                write_standings(out, &standings)?;
            }
        }
        Command::Pairings { id, json } => {
            let pairings = manager.next_round_pairings(id).await?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&pairings)?)?;
            } else {
                write_pairings(out, &pairings)?;
            }
        }
        Command::Report {
            id,
            player_1,
            player_2,
            outcome,
        } => {
            let match_id = manager.record_match(id, player_1, player_2, outcome).await?;
            writeln!(out, "{match_id}")?;
        }
        Command::Simulate { id, rounds } => {
            for round in 1..=rounds {
                let pairings = manager.next_round_pairings(id).await?;
                writeln!(out, "Round {round}")?;
                for pairing in &pairings {
                    if pairing.is_bye() {
                        writeln!(out, "  {} has the bye", pairing.player_1_name)?;
                        continue;
                    }
                    let outcome = random_outcome(rng);
                    manager
                        .record_match(
                            id,
                            Slot::Player(pairing.player_1_id),
                            pairing.player_2,
                            outcome,
                        )
                        .await?;
                    writeln!(
                        out,
                        "  {} vs {}: {}",
                        pairing.player_1_name, pairing.player_2_name, outcome
                    )?;
                }
            }
            write_standings(out, &manager.standings(id).await?)?;
        }
    }

    log_operation(operation, tournament_id, start.elapsed().as_millis() as u64);
    Ok(())
}

fn random_outcome<G: Rng>(rng: &mut G) -> Outcome {
    match rng.random_range(0..3) {
        0 => Outcome::Player1Wins,
        1 => Outcome::Player2Wins,
        _ => Outcome::Tie,
    }
}

fn write_standings<W: Write>(out: &mut W, standings: &[Standing]) -> std::io::Result<()> {
    writeln!(
        out,
        "{:>4}  {:>6}  {:<24}  {:>4}  {:>6}  {:>4}",
        "RANK", "ID", "NAME", "WINS", "PLAYED", "OMW"
    )?;
    for (rank, s) in standings.iter().enumerate() {
        writeln!(
            out,
            "{:>4}  {:>6}  {:<24}  {:>4}  {:>6}  {:>4}",
            rank + 1,
            s.player_id,
            s.name,
            s.wins,
            s.matches_played,
            s.omw
        )?;
    }
    Ok(())
}

fn write_pairings<W: Write>(out: &mut W, pairings: &[Pairing]) -> std::io::Result<()> {
    for p in pairings {
        writeln!(
            out,
            "{}\t{}\t{}\t{}",
            p.player_1_id, p.player_1_name, p.player_2, p.player_2_name
        )?;
    }
    Ok(())
}
