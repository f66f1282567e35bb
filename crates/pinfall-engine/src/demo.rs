//! The `demo` command: a generated season run entirely in memory.
//!
//! No database is involved. The season is built with
//! [`SeasonBuilder`], stored in an [`InMemoryStore`], run day by day
//! through the same [`Orchestrator`] the database commands use, and the
//! final league table is printed.

use std::sync::Arc;

use clap::Args;
use pinfall_core::config::EngineConfig;
use pinfall_core::demo::SeasonBuilder;
use pinfall_core::memory_store::InMemoryStore;
use pinfall_core::orchestrator::Orchestrator;
use tracing::info;

use crate::error::EngineError;
use crate::output;

/// Arguments for the `demo` subcommand.
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Teams in the league
    #[arg(long, default_value = "8")]
    pub league_teams: usize,

    /// Teams in the cup (0 for no cup)
    #[arg(long, default_value = "8")]
    pub cup_teams: usize,

    /// Reserve players per club
    #[arg(long, default_value = "2")]
    pub reserves: usize,

    /// Season seed (defaults to `engine.seed`)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Stop after this many days
    #[arg(long)]
    pub max_days: Option<u32>,
}

/// Build, run and report a demo season.
pub async fn execute(args: &DemoArgs, config: EngineConfig, json: bool) -> Result<(), EngineError> {
    let seed = args.seed.unwrap_or(config.engine.seed);
    let snapshot = SeasonBuilder::new(args.league_teams, args.cup_teams)
        .reserves(args.reserves)
        .seed(seed)
        .calendar(config.calendar.clone())
        .build()?;
    let season_id = snapshot.season.id;
    let league_ids: Vec<_> = snapshot.leagues.iter().map(|l| l.id).collect();
    info!(
        %season_id,
        seed,
        teams = snapshot.teams.len(),
        days = snapshot.calendar.len(),
        "demo season generated"
    );

    let store = Arc::new(InMemoryStore::new());
    store.insert_season(snapshot).await;
    let orchestrator = Orchestrator::new(store, config);

    let run = orchestrator.run_season(season_id, args.max_days).await?;
    output::season_run(season_id, &run, json)?;
    for league_id in league_ids {
        let rows = orchestrator.league_table(season_id, league_id).await?;
        output::table(&rows, json)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_season_runs_without_a_database() {
        let args = DemoArgs {
            league_teams: 4,
            cup_teams: 4,
            reserves: 1,
            seed: Some(7),
            max_days: None,
        };
        execute(&args, EngineConfig::default(), true).await.unwrap();
    }
}
