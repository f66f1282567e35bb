//! Season scheduling and match-day simulation for bowling leagues.
//!
//! The crate plans a season calendar of league and cup days, generates
//! fixtures, and advances the season one calendar day at a time: it picks
//! the day's fixtures, resolves club rosters from player availability,
//! simulates every fixture deterministically, and hands all writes of the
//! day to a store in one commit.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `pinfall-config.yaml` into
//!   strongly-typed structs.
//! - [`calendar`] -- Calendar builder: league, cup and free days.
//! - [`schedule`] -- League round robins and cup brackets.
//! - [`fixtures`] -- Fixture provider: which fixtures are due on a date.
//! - [`availability`] -- Roster resolution from per-competition flags.
//! - [`simulator`] -- Seeded, deterministic match simulation.
//! - [`scoring`] -- [`ScoringRule`] trait and [`TotalPinsRule`].
//! - [`standings`] -- League tables.
//! - [`matchday`] -- Pure planning of one calendar day.
//! - [`season`] -- [`SeasonSnapshot`] and season preparation.
//! - [`store`] -- [`SeasonStore`] persistence port.
//! - [`memory_store`] -- In-memory [`SeasonStore`].
//! - [`orchestrator`] -- Per-season serialized advancement over a store.
//! - [`demo`] -- Generated seasons for demos and tests.
//!
//! [`ScoringRule`]: scoring::ScoringRule
//! [`TotalPinsRule`]: scoring::TotalPinsRule
//! [`SeasonSnapshot`]: season::SeasonSnapshot
//! [`SeasonStore`]: store::SeasonStore

pub mod availability;
pub mod calendar;
pub mod config;
pub mod demo;
pub mod fixtures;
pub mod matchday;
pub mod memory_store;
pub mod orchestrator;
pub mod schedule;
pub mod scoring;
pub mod season;
pub mod simulator;
pub mod standings;
pub mod store;
