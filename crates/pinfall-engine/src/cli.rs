//! Command-line interface definitions and command dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use pinfall_core::config::EngineConfig;
use pinfall_core::orchestrator::Orchestrator;
use pinfall_core::store::SeasonStore;
use pinfall_db::{PgSeasonStore, PostgresConfig, PostgresPool};
use pinfall_types::{ClubId, LeagueId, SeasonId};
use tracing::info;
use uuid::Uuid;

use crate::demo::{self, DemoArgs};
use crate::error::EngineError;
use crate::output;

/// Pinfall - bowling league season scheduling and match-day simulation.
#[derive(Parser, Debug)]
#[command(name = "pinfall-engine")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "pinfall-config.yaml")]
    pub config: PathBuf,

    /// Use JSON log format instead of pretty
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands of `pinfall-engine`.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate league round robins and first cup rounds
    Prepare(SeasonArg),

    /// Build and store the season calendar
    BuildCalendar(SeasonArg),

    /// Simulate the next calendar day
    Advance(AdvanceArgs),

    /// Simulate days until the season completes
    Run(RunArgs),

    /// Show season phase and the next calendar day
    Status(SeasonArg),

    /// List fixtures due on a date
    Fixtures(DateArgs),

    /// Show the rosters a club would field on a date
    Availability(AvailabilityArgs),

    /// Show a league table
    Table(TableArgs),

    /// Generate and run a season in memory
    Demo(DemoArgs),
}

/// Season selection shared by most commands.
#[derive(Args, Debug, Clone, Copy)]
pub struct SeasonArg {
    /// Season id (defaults to the current season)
    #[arg(short, long)]
    pub season: Option<Uuid>,
}

/// Arguments for the `advance` subcommand.
#[derive(Args, Debug)]
pub struct AdvanceArgs {
    /// Seasons to advance by one day each (defaults to the current season)
    #[arg(short, long)]
    pub season: Vec<Uuid>,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub season: SeasonArg,

    /// Stop after this many days
    #[arg(long)]
    pub max_days: Option<u32>,
}

/// Arguments for the `fixtures` subcommand.
#[derive(Args, Debug)]
pub struct DateArgs {
    #[command(flatten)]
    pub season: SeasonArg,

    /// Calendar date (YYYY-MM-DD)
    #[arg(short, long)]
    pub date: NaiveDate,
}

/// Arguments for the `availability` subcommand.
#[derive(Args, Debug)]
pub struct AvailabilityArgs {
    #[command(flatten)]
    pub season: SeasonArg,

    /// Club id
    #[arg(long)]
    pub club: Uuid,

    /// Calendar date (YYYY-MM-DD)
    #[arg(short, long)]
    pub date: NaiveDate,
}

/// Arguments for the `table` subcommand.
#[derive(Args, Debug)]
pub struct TableArgs {
    #[command(flatten)]
    pub season: SeasonArg,

    /// League id
    #[arg(long)]
    pub league: Uuid,
}

/// Execute a parsed command.
pub async fn execute(cli: Cli, config: EngineConfig) -> Result<(), EngineError> {
    let json = cli.json;
    if let Commands::Demo(args) = &cli.command {
        return demo::execute(args, config, json).await;
    }

    let pool = PostgresPool::connect(&PostgresConfig::from_infrastructure(&config.infrastructure))
        .await?;
    pool.run_migrations().await?;
    let store = Arc::new(PgSeasonStore::new(pool.clone()));
    let orchestrator = Orchestrator::new(store, config);

    let result = dispatch(&orchestrator, cli.command, json).await;
    pool.close().await;
    result
}

/// Run one command against an orchestrator.
pub async fn dispatch<S: SeasonStore + 'static>(
    orchestrator: &Orchestrator<S>,
    command: Commands,
    json: bool,
) -> Result<(), EngineError> {
    match command {
        Commands::Prepare(arg) => {
            let season_id = resolve_season(orchestrator, arg).await?;
            let outcome = orchestrator.prepare_season(season_id).await?;
            output::prepared(season_id, &outcome, json)
        }
        Commands::BuildCalendar(arg) => {
            let season_id = resolve_season(orchestrator, arg).await?;
            let outcome = orchestrator.build_calendar(season_id).await?;
            output::calendar(season_id, &outcome, json)
        }
        Commands::Advance(args) => {
            let season_ids = if args.season.is_empty() {
                vec![resolve_season(orchestrator, SeasonArg { season: None }).await?]
            } else {
                args.season.into_iter().map(SeasonId::from).collect()
            };
            let mut first_error = None;
            for (season_id, result) in orchestrator.advance_seasons(&season_ids).await {
                match result {
                    Ok(summary) => output::advanced(season_id, summary.as_ref(), json)?,
                    Err(err) => {
                        output::failure(season_id, &err);
                        first_error.get_or_insert(err);
                    }
                }
            }
            first_error.map_or(Ok(()), |err| Err(err.into()))
        }
        Commands::Run(args) => {
            let season_id = resolve_season(orchestrator, args.season).await?;
            let run = orchestrator.run_season(season_id, args.max_days).await?;
            output::season_run(season_id, &run, json)
        }
        Commands::Status(arg) => {
            let season_id = resolve_season(orchestrator, arg).await?;
            let snapshot = orchestrator.store().load_season(season_id).await?;
            output::status(&snapshot, json)
        }
        Commands::Fixtures(args) => {
            let season_id = resolve_season(orchestrator, args.season).await?;
            let due = orchestrator.fixtures_for_date(season_id, args.date).await?;
            output::due_fixtures(args.date, &due, json)
        }
        Commands::Availability(args) => {
            let season_id = resolve_season(orchestrator, args.season).await?;
            let rosters = orchestrator
                .resolve_availability(season_id, ClubId::from(args.club), args.date)
                .await?;
            output::rosters(args.date, &rosters, json)
        }
        Commands::Table(args) => {
            let season_id = resolve_season(orchestrator, args.season).await?;
            let rows = orchestrator
                .league_table(season_id, LeagueId::from(args.league))
                .await?;
            output::table(&rows, json)
        }
        Commands::Demo(args) => demo::execute(&args, orchestrator.config().clone(), json).await,
    }
}

/// The season named on the command line, or the current season.
async fn resolve_season<S: SeasonStore + 'static>(
    orchestrator: &Orchestrator<S>,
    arg: SeasonArg,
) -> Result<SeasonId, EngineError> {
    if let Some(id) = arg.season {
        return Ok(SeasonId::from(id));
    }
    let season = orchestrator
        .store()
        .current_season()
        .await?
        .ok_or(EngineError::NoCurrentSeason)?;
    info!(season_id = %season.id, name = %season.name, "using current season");
    Ok(season.id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn advance_accepts_several_seasons() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let cli = Cli::try_parse_from([
            "pinfall-engine",
            "advance",
            "--season",
            &a.to_string(),
            "--season",
            &b.to_string(),
        ])
        .unwrap();
        let Commands::Advance(args) = cli.command else {
            panic!("expected advance");
        };
        assert_eq!(args.season, vec![a, b]);
    }

    #[test]
    fn dates_parse_as_iso() {
        let cli = Cli::try_parse_from(["pinfall-engine", "fixtures", "--date", "2026-09-05"])
            .unwrap();
        let Commands::Fixtures(args) = cli.command else {
            panic!("expected fixtures");
        };
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2026, 9, 5).unwrap());
        assert!(args.season.season.is_none());
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["pinfall-engine", "status", "--json", "-c", "alt.yaml"])
            .unwrap();
        assert!(cli.json);
        assert_eq!(cli.config, PathBuf::from("alt.yaml"));
    }

    #[test]
    fn malformed_date_is_rejected() {
        assert!(Cli::try_parse_from(["pinfall-engine", "fixtures", "--date", "05.09.2026"]).is_err());
    }
}
