//! Operator binary for Pinfall.
//!
//! Loads `pinfall-config.yaml`, initializes structured logging, and runs
//! one command: season preparation, calendar build, match-day advancement,
//! or one of the read-only reports. Every command except `demo` works on
//! the `PostgreSQL` store.
//!
//! # Startup Sequence
//!
//! 1. Parse the command line
//! 2. Load configuration (defaults when the file is missing)
//! 3. Initialize structured logging (tracing)
//! 4. Connect to `PostgreSQL` and run migrations (not for `demo`)
//! 5. Execute the command

mod cli;
mod demo;
mod error;
mod output;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use pinfall_core::config::{EngineConfig, LoggingConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::error::EngineError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.logging, cli.json_logs);
    info!(
        engine = config.engine.name,
        seed = config.engine.seed,
        league_legs = config.calendar.league_legs,
        roster_size = config.roster.size,
        "Configuration loaded"
    );

    match cli::execute(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `logging.level`.
fn init_logging(config: &LoggingConfig, json_override: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if config.json || json_override {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load configuration, falling back to defaults when the file is missing.
fn load_config(path: &Path) -> Result<EngineConfig, EngineError> {
    if path.exists() {
        Ok(EngineConfig::from_file(path)?)
    } else {
        EngineConfig::parse("").map_err(EngineError::from)
    }
}
