//! `PostgreSQL` persistence for Pinfall seasons.
//!
//! The engine talks to storage through [`pinfall_core::store::SeasonStore`];
//! [`PgSeasonStore`] implements it over a [`PostgresPool`]. Reads load a
//! whole season; each write batch (prepared fixtures, a calendar, a
//! simulated day) runs in one transaction.
//!
//! # Architecture
//!
//! ```text
//! Orchestrator
//!     |
//!     +-- load_season ----> PgSeasonStore --> SeasonQueries / CalendarQueries
//!     |                                        RosterQueries / FixtureQueries
//!     +-- commit_day -----> PgSeasonStore --> one transaction:
//!                                              mark day, results, new fixtures,
//!                                              performances, availability, cups
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`pg_store`] -- [`SeasonStore`](pinfall_core::store::SeasonStore) implementation
//! - [`season_store`] -- Seasons and the current-season flag
//! - [`calendar_store`] -- Calendar days
//! - [`roster_store`] -- Competitions, clubs, teams, players, availability
//! - [`fixture_store`] -- Fixtures, results, lineups, performance records
//! - [`rows`] -- Row types and conversions into the domain model
//! - [`error`] -- Shared error types

pub mod calendar_store;
pub mod error;
pub mod fixture_store;
pub mod pg_store;
pub mod postgres;
pub mod roster_store;
pub mod rows;
pub mod season_store;

// Re-export primary types for convenience.
pub use calendar_store::CalendarQueries;
pub use error::DbError;
pub use fixture_store::FixtureQueries;
pub use pg_store::PgSeasonStore;
pub use postgres::{PostgresConfig, PostgresPool};
pub use roster_store::RosterQueries;
pub use season_store::SeasonQueries;
