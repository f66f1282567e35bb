//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes of a command.

use pinfall_core::config::ConfigError;
use pinfall_core::demo::DemoError;
use pinfall_core::orchestrator::OrchestratorError;
use pinfall_core::store::StoreError;
use pinfall_db::DbError;

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can report.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// Connecting to or migrating the database failed.
    #[error("database error: {source}")]
    Database {
        /// The underlying database error.
        #[from]
        source: DbError,
    },

    /// A store read failed outside the orchestrator.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },

    /// A season operation failed.
    #[error("{source}")]
    Orchestrator {
        /// The underlying orchestrator error.
        #[from]
        source: OrchestratorError,
    },

    /// Demo season generation failed.
    #[error("demo error: {source}")]
    Demo {
        /// The underlying demo error.
        #[from]
        source: DemoError,
    },

    /// No `--season` was given and no season is flagged current.
    #[error("no season given and no current season is set")]
    NoCurrentSeason,

    /// Writing JSON output failed.
    #[error("output error: {source}")]
    Output {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}
