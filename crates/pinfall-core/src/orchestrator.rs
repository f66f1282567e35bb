//! Match-day orchestration over a season store.
//!
//! [`Orchestrator`] is the service the binary and any API layer talk to. It
//! serializes writers per season with a lock map, runs the pure planners on
//! the blocking pool, and hands every plan to the store as one commit.
//! Different seasons advance independently.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use pinfall_types::{ClubId, CompetitionKind, LeagueId, SeasonId};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::availability::{self, AvailabilityBook, AvailabilityError, ClubRosters, PlayerPool};
use crate::calendar::CalendarError;
use crate::config::EngineConfig;
use crate::fixtures::{self, DueFixtures, FixtureError};
use crate::matchday::{self, AdvanceError, DaySummary};
use crate::schedule::ScheduleError;
use crate::scoring::{ScoringRule, TotalPinsRule};
use crate::season::{self, SeasonPhase};
use crate::standings::{self, TableRow};
use crate::store::{SeasonStore, StoreError};

/// Errors that can occur while orchestrating a season.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// The store failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying error.
        #[from]
        source: StoreError,
    },

    /// The calendar could not be built.
    #[error("calendar error: {source}")]
    Calendar {
        /// The underlying error.
        #[from]
        source: CalendarError,
    },

    /// Fixtures could not be generated.
    #[error("schedule error: {source}")]
    Schedule {
        /// The underlying error.
        #[from]
        source: ScheduleError,
    },

    /// A match day could not be planned.
    #[error("match day error: {source}")]
    Advance {
        /// The underlying error.
        #[from]
        source: AdvanceError,
    },

    /// A fixture lookup failed.
    #[error("fixture error: {source}")]
    Fixture {
        /// The underlying error.
        #[from]
        source: FixtureError,
    },

    /// Roster resolution failed.
    #[error("availability error: {source}")]
    Availability {
        /// The underlying error.
        #[from]
        source: AvailabilityError,
    },

    /// A blocking planner task panicked or was cancelled.
    #[error("planner task failed: {source}")]
    Join {
        /// The underlying error.
        #[from]
        source: tokio::task::JoinError,
    },

    /// The league does not belong to the season.
    #[error("league {league_id} not found in season {season_id}")]
    UnknownLeague {
        /// The season.
        season_id: SeasonId,
        /// The league.
        league_id: LeagueId,
    },
}

/// Outcome of season preparation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrepareOutcome {
    /// Fixtures generated.
    pub fixtures: usize,
    /// Cups drawn.
    pub cups_drawn: usize,
}

/// Outcome of a calendar build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CalendarOutcome {
    /// A new calendar was stored.
    Built {
        /// League days.
        league_days: u32,
        /// Cup days.
        cup_days: u32,
        /// Free days.
        free_days: u32,
        /// First calendar date.
        first: Option<NaiveDate>,
        /// Last calendar date.
        last: Option<NaiveDate>,
    },
    /// The season already had a calendar; nothing was written.
    AlreadyExists,
}

/// Outcome of running a season forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeasonRun {
    /// Summaries of the days advanced, in order.
    pub days: Vec<DaySummary>,
    /// Phase after the run.
    pub phase: SeasonPhase,
}

/// Drives seasons held in a [`SeasonStore`].
pub struct Orchestrator<S> {
    store: Arc<S>,
    config: Arc<EngineConfig>,
    scoring: Arc<dyn ScoringRule>,
    locks: Mutex<BTreeMap<SeasonId, Arc<Mutex<()>>>>,
}

impl<S> core::fmt::Debug for Orchestrator<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("scoring", &self.scoring.name())
            .finish_non_exhaustive()
    }
}

impl<S: SeasonStore + 'static> Orchestrator<S> {
    /// Create an orchestrator scoring with [`TotalPinsRule`] from the config.
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        let scoring: Arc<dyn ScoringRule> = Arc::new(TotalPinsRule::from_config(&config.scoring));
        Self {
            store,
            config: Arc::new(config),
            scoring,
            locks: Mutex::new(BTreeMap::new()),
        }
    }

    /// Replace the scoring rule.
    #[must_use]
    pub fn with_scoring(mut self, scoring: Arc<dyn ScoringRule>) -> Self {
        self.scoring = scoring;
        self
    }

    /// The underlying store.
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn season_lock(&self, season_id: SeasonId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(season_id).or_default())
    }

    /// Generate league round robins and first cup rounds.
    pub async fn prepare_season(
        &self,
        season_id: SeasonId,
    ) -> Result<PrepareOutcome, OrchestratorError> {
        let lock = self.season_lock(season_id).await;
        let _guard = lock.lock().await;

        let snapshot = self.store.load_season(season_id).await?;
        let prepared = season::prepare_fixtures(&snapshot, &self.config.calendar)?;
        if !prepared.fixtures.is_empty() || !prepared.cups.is_empty() {
            self.store
                .insert_fixtures(season_id, &prepared.fixtures, &prepared.cups)
                .await?;
        }
        Ok(PrepareOutcome {
            fixtures: prepared.fixtures.len(),
            cups_drawn: prepared.cups.len(),
        })
    }

    /// Build and store the season calendar.
    ///
    /// An existing calendar is left untouched and reported as
    /// [`CalendarOutcome::AlreadyExists`].
    pub async fn build_calendar(
        &self,
        season_id: SeasonId,
    ) -> Result<CalendarOutcome, OrchestratorError> {
        let lock = self.season_lock(season_id).await;
        let _guard = lock.lock().await;

        if self.store.calendar_exists(season_id).await? {
            info!(%season_id, "calendar already exists; nothing to do");
            return Ok(CalendarOutcome::AlreadyExists);
        }
        let snapshot = self.store.load_season(season_id).await?;
        let planned = match season::plan_calendar(&snapshot, &self.config.calendar) {
            Ok(planned) => planned,
            Err(CalendarError::AlreadyExists { .. }) => return Ok(CalendarOutcome::AlreadyExists),
            Err(err) => return Err(err.into()),
        };
        self.store
            .insert_calendar(season_id, &planned.days, &planned.fixture_dates)
            .await?;

        let mut outcome = (0_u32, 0_u32, 0_u32);
        for day in &planned.days {
            match day.match_day.competition() {
                Some(CompetitionKind::League) => {
                    outcome.0 = outcome.0.saturating_add(1);
                }
                Some(CompetitionKind::Cup) => {
                    outcome.1 = outcome.1.saturating_add(1);
                }
                None => outcome.2 = outcome.2.saturating_add(1),
            }
        }
        Ok(CalendarOutcome::Built {
            league_days: outcome.0,
            cup_days: outcome.1,
            free_days: outcome.2,
            first: planned.days.first().map(|d| d.date),
            last: planned.days.last().map(|d| d.date),
        })
    }

    /// Simulate the next calendar day of a season.
    ///
    /// Returns `None` when every day is already simulated. Fixture-level
    /// problems do not fail the call; they are listed in the summary.
    pub async fn advance_one_day(
        &self,
        season_id: SeasonId,
    ) -> Result<Option<DaySummary>, OrchestratorError> {
        let lock = self.season_lock(season_id).await;
        let _guard = lock.lock().await;

        let snapshot = self.store.load_season(season_id).await?;
        let config = Arc::clone(&self.config);
        let scoring = Arc::clone(&self.scoring);
        let plan = tokio::task::spawn_blocking(move || {
            matchday::plan_day(&snapshot, &config, scoring.as_ref())
        })
        .await??;

        let Some(plan) = plan else {
            debug!(%season_id, "season complete; no day to advance");
            return Ok(None);
        };
        self.store.commit_day(season_id, &plan).await?;

        if plan.summary.is_partial() {
            warn!(
                %season_id,
                date = %plan.date,
                skipped = plan.summary.skipped.len(),
                "match day committed with skipped fixtures"
            );
        }
        Ok(Some(plan.summary))
    }

    /// Advance a season day by day until it completes or `max_days` days
    /// have been simulated.
    pub async fn run_season(
        &self,
        season_id: SeasonId,
        max_days: Option<u32>,
    ) -> Result<SeasonRun, OrchestratorError> {
        let mut days = Vec::new();
        let limit = max_days.map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));
        while days.len() < limit {
            match self.advance_one_day(season_id).await? {
                Some(summary) => days.push(summary),
                None => break,
            }
        }
        let phase = self.season_phase(season_id).await?;
        info!(%season_id, days = days.len(), ?phase, "season run finished");
        Ok(SeasonRun { days, phase })
    }

    /// Advance several seasons by one day each, concurrently.
    pub async fn advance_seasons(
        &self,
        season_ids: &[SeasonId],
    ) -> Vec<(SeasonId, Result<Option<DaySummary>, OrchestratorError>)> {
        let runs = season_ids.iter().map(|id| async move {
            let result = self.advance_one_day(*id).await;
            (*id, result)
        });
        futures::future::join_all(runs).await
    }

    /// Fixtures due on a date.
    pub async fn fixtures_for_date(
        &self,
        season_id: SeasonId,
        date: NaiveDate,
    ) -> Result<DueFixtures, OrchestratorError> {
        let snapshot = self.store.load_season(season_id).await?;
        Ok(fixtures::fixtures_for_date(
            season_id,
            &snapshot.calendar,
            &snapshot.fixtures,
            &snapshot.cups,
            date,
        )?)
    }

    /// Rosters a club would field on a date, without writing anything.
    pub async fn resolve_availability(
        &self,
        season_id: SeasonId,
        club_id: ClubId,
        date: NaiveDate,
    ) -> Result<ClubRosters, OrchestratorError> {
        let snapshot = self.store.load_season(season_id).await?;
        let due = fixtures::fixtures_for_date(
            season_id,
            &snapshot.calendar,
            &snapshot.fixtures,
            &snapshot.cups,
            date,
        )?;
        let teams: BTreeMap<_, _> = snapshot.teams.iter().map(|t| (t.id, t)).collect();
        let mut summary = DaySummary::new(season_id, date, due.match_day);
        let (_, requests) =
            matchday::club_requests(&snapshot, &teams, due.playable(), &mut summary);
        let club_teams = requests
            .into_iter()
            .find(|r| r.club_id == club_id)
            .map(|r| r.teams)
            .unwrap_or_default();

        let book = AvailabilityBook::new(due.match_day, &snapshot.availability, &snapshot.performances)?;
        let pool = PlayerPool {
            players: &snapshot.players,
            book: &book,
            overrides: &snapshot.overrides,
        };
        Ok(availability::resolve_availability(
            club_id,
            due.match_day,
            &club_teams,
            &pool,
            &self.config.roster,
        )?)
    }

    /// Phase of a season.
    pub async fn season_phase(&self, season_id: SeasonId) -> Result<SeasonPhase, OrchestratorError> {
        Ok(self.store.load_season(season_id).await?.phase())
    }

    /// Current table of a league.
    pub async fn league_table(
        &self,
        season_id: SeasonId,
        league_id: LeagueId,
    ) -> Result<Vec<TableRow>, OrchestratorError> {
        let snapshot = self.store.load_season(season_id).await?;
        let league = snapshot
            .leagues
            .iter()
            .find(|l| l.id == league_id)
            .ok_or(OrchestratorError::UnknownLeague {
                season_id,
                league_id,
            })?;
        Ok(standings::league_table(
            league,
            &snapshot.teams,
            &snapshot.fixtures,
            &self.config.standings,
        ))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::arithmetic_side_effects
)]
mod tests {
    use std::collections::BTreeSet;

    use pinfall_types::{DayType, MatchDay, PerformanceRecord, PlayerId};

    use super::*;
    use crate::demo::SeasonBuilder;
    use crate::memory_store::InMemoryStore;

    async fn setup(league_teams: usize, cup_teams: usize) -> (Orchestrator<InMemoryStore>, SeasonId) {
        let store = Arc::new(InMemoryStore::new());
        let snapshot = SeasonBuilder::new(league_teams, cup_teams).build_unprepared();
        let season_id = snapshot.season.id;
        store.insert_season(snapshot).await;
        let orchestrator = Orchestrator::new(store, EngineConfig::default());
        orchestrator.prepare_season(season_id).await.unwrap();
        (orchestrator, season_id)
    }

    #[tokio::test]
    async fn calendar_build_is_idempotent() {
        let (orchestrator, season_id) = setup(16, 8).await;
        let first = orchestrator.build_calendar(season_id).await.unwrap();
        let CalendarOutcome::Built {
            league_days,
            cup_days,
            ..
        } = first
        else {
            panic!("expected a new calendar");
        };
        assert_eq!(league_days, 15);
        assert_eq!(cup_days, 3);

        let before = orchestrator.store().snapshot(season_id).await.unwrap().calendar;
        let second = orchestrator.build_calendar(season_id).await.unwrap();
        assert_eq!(second, CalendarOutcome::AlreadyExists);
        let after = orchestrator.store().snapshot(season_id).await.unwrap().calendar;
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn advancing_without_calendar_does_nothing() {
        let (orchestrator, season_id) = setup(4, 0).await;
        assert_eq!(
            orchestrator.season_phase(season_id).await.unwrap(),
            SeasonPhase::NoCalendar
        );
        assert!(orchestrator.advance_one_day(season_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn full_season_plays_every_fixture_once() {
        let (orchestrator, season_id) = setup(6, 4).await;
        orchestrator.build_calendar(season_id).await.unwrap();
        let run = orchestrator.run_season(season_id, None).await.unwrap();
        assert_eq!(run.phase, SeasonPhase::Complete);

        let snapshot = orchestrator.store().snapshot(season_id).await.unwrap();
        assert!(snapshot.fixtures.iter().all(|f| f.is_played));
        assert!(snapshot.cups.iter().all(|c| !c.is_active && c.winner.is_some()));
        let calendar_days = snapshot.calendar.len();
        assert_eq!(run.days.len(), calendar_days);

        let mut keys = BTreeSet::new();
        for record in &snapshot.performances {
            assert!(keys.insert((record.fixture_id, record.player_id)));
        }
    }

    #[tokio::test]
    async fn nobody_plays_twice_on_one_date() {
        let (orchestrator, season_id) = setup(8, 8).await;
        orchestrator.build_calendar(season_id).await.unwrap();
        orchestrator.run_season(season_id, None).await.unwrap();
        let snapshot = orchestrator.store().snapshot(season_id).await.unwrap();

        let mut per_date: BTreeMap<(NaiveDate, PlayerId), usize> = BTreeMap::new();
        for record in &snapshot.performances {
            *per_date.entry((record.date.unwrap(), record.player_id)).or_default() += 1;
        }
        assert!(per_date.values().all(|n| *n == 1));
    }

    #[tokio::test]
    async fn played_flags_match_the_last_day_of_each_kind() {
        let (orchestrator, season_id) = setup(4, 4).await;
        orchestrator.build_calendar(season_id).await.unwrap();

        loop {
            let Some(summary) = orchestrator.advance_one_day(season_id).await.unwrap() else {
                break;
            };
            let snapshot = orchestrator.store().snapshot(season_id).await.unwrap();
            let Some(kind) = summary.match_day.competition() else {
                continue;
            };
            let number = summary.match_day_number.unwrap();
            let today: BTreeSet<PlayerId> = snapshot
                .performances
                .iter()
                .filter(|p| p.competition == kind && p.match_day_number == number)
                .map(|p| p.player_id)
                .collect();
            for record in snapshot.availability.iter().filter(|r| r.competition == kind) {
                assert_eq!(
                    record.has_played_current_matchday,
                    today.contains(&record.player_id),
                    "flag mismatch on {}",
                    summary.match_day
                );
            }
        }
    }

    #[tokio::test]
    async fn cup_and_league_numbers_stay_separate() {
        let (orchestrator, season_id) = setup(16, 8).await;
        orchestrator.build_calendar(season_id).await.unwrap();
        let run = orchestrator.run_season(season_id, None).await.unwrap();

        let league_numbers: Vec<u32> = run
            .days
            .iter()
            .filter(|d| d.day_type == DayType::LeagueDay)
            .filter_map(|d| d.match_day_number)
            .collect();
        let cup_numbers: Vec<u32> = run
            .days
            .iter()
            .filter(|d| d.day_type == DayType::CupDay)
            .filter_map(|d| d.match_day_number)
            .collect();
        assert_eq!(league_numbers, (1..=15).collect::<Vec<_>>());
        assert_eq!(cup_numbers, vec![1, 2, 3]);

        let snapshot = orchestrator.store().snapshot(season_id).await.unwrap();
        let cup_records: Vec<&PerformanceRecord> = snapshot
            .performances
            .iter()
            .filter(|p| p.competition == CompetitionKind::Cup)
            .collect();
        assert!(cup_records.iter().all(|p| p.match_day_number <= 3));
    }

    #[tokio::test]
    async fn replaying_a_season_reproduces_every_result() {
        let snapshot = SeasonBuilder::new(6, 0).seed(7).build().unwrap();
        let season_id = snapshot.season.id;
        let mut finals = Vec::new();
        for _ in 0..2 {
            let store = Arc::new(InMemoryStore::new());
            store.insert_season(snapshot.clone()).await;
            let orchestrator = Orchestrator::new(store, EngineConfig::default());
            orchestrator.run_season(season_id, None).await.unwrap();
            finals.push(orchestrator.store().snapshot(season_id).await.unwrap());
        }
        assert_eq!(finals[0].fixtures, finals[1].fixtures);
        assert_eq!(finals[0].performances, finals[1].performances);
        assert!(finals[0].fixtures.iter().all(|f| f.result.is_some()));
    }

    #[tokio::test]
    async fn seasons_advance_independently() {
        let store = Arc::new(InMemoryStore::new());
        let mut ids = Vec::new();
        for _ in 0..3 {
            let snapshot = SeasonBuilder::new(4, 0).build().unwrap();
            ids.push(snapshot.season.id);
            store.insert_season(snapshot).await;
        }
        let orchestrator = Orchestrator::new(store, EngineConfig::default());
        let results = orchestrator.advance_seasons(&ids).await;
        assert_eq!(results.len(), 3);
        for (_, result) in results {
            let summary = result.unwrap().unwrap();
            assert_eq!(summary.match_day, MatchDay::League(1));
            assert_eq!(summary.matches_simulated, 2);
        }
    }

    #[tokio::test]
    async fn concurrent_advances_of_one_season_never_repeat_a_day() {
        let (orchestrator, season_id) = setup(4, 0).await;
        orchestrator.build_calendar(season_id).await.unwrap();
        let results = orchestrator.advance_seasons(&[season_id, season_id]).await;
        let dates: BTreeSet<NaiveDate> = results
            .into_iter()
            .map(|(_, r)| r.unwrap().unwrap().date)
            .collect();
        assert_eq!(dates.len(), 2);
    }

    #[tokio::test]
    async fn diagnostic_reads_do_not_write() {
        let (orchestrator, season_id) = setup(4, 0).await;
        orchestrator.build_calendar(season_id).await.unwrap();
        let before = orchestrator.store().snapshot(season_id).await.unwrap();
        let first = before.next_day().unwrap().date;
        let club = before.clubs[0].id;

        let due = orchestrator.fixtures_for_date(season_id, first).await.unwrap();
        assert_eq!(due.league.len(), 2);
        let rosters = orchestrator
            .resolve_availability(season_id, club, first)
            .await
            .unwrap();
        assert_eq!(rosters.rosters.len(), 1);
        assert!(rosters.rosters[0].is_complete());

        let after = orchestrator.store().snapshot(season_id).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn table_after_season_counts_all_games() {
        let (orchestrator, season_id) = setup(4, 0).await;
        orchestrator.build_calendar(season_id).await.unwrap();
        orchestrator.run_season(season_id, None).await.unwrap();
        let league_id = orchestrator.store().snapshot(season_id).await.unwrap().leagues[0].id;
        let table = orchestrator.league_table(season_id, league_id).await.unwrap();
        assert_eq!(table.len(), 4);
        assert!(table.iter().all(|row| row.played == 3));

        let err = orchestrator
            .league_table(season_id, LeagueId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::UnknownLeague { .. }));
    }
}
