//! Persistence port for seasons.
//!
//! The engine reads a whole [`SeasonSnapshot`] and writes back in three
//! batches: prepared fixtures, the calendar, and one [`DayPlan`] per
//! simulated day. Each batch must be applied atomically by the store.

use std::future::Future;

use chrono::NaiveDate;
use pinfall_types::{CalendarDay, Cup, Fixture, FixtureId, Season, SeasonId};

use crate::matchday::DayPlan;
use crate::season::SeasonSnapshot;

/// Errors surfaced by a season store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A row that must exist was not found.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of entity.
        entity: &'static str,
        /// Its identifier.
        id: String,
    },

    /// The write conflicts with stored state.
    #[error("conflict: {reason}")]
    Conflict {
        /// What conflicted.
        reason: String,
    },

    /// The backing store failed.
    #[error("store backend error: {source}")]
    Backend {
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StoreError {
    /// Wrap a backend error.
    pub fn backend(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend {
            source: Box::new(source),
        }
    }

    /// A missing season.
    pub fn season_not_found(season_id: SeasonId) -> Self {
        Self::NotFound {
            entity: "season",
            id: season_id.to_string(),
        }
    }
}

/// Storage operations for seasons.
pub trait SeasonStore: Send + Sync {
    /// All seasons, newest first.
    fn list_seasons(&self) -> impl Future<Output = Result<Vec<Season>, StoreError>> + Send;

    /// The season flagged current, if any.
    fn current_season(&self) -> impl Future<Output = Result<Option<Season>, StoreError>> + Send {
        async move {
            let seasons = self.list_seasons().await?;
            Ok(seasons.into_iter().find(|s| s.is_current))
        }
    }

    /// Flag one season as current and clear the flag on all others.
    fn set_current_season(
        &self,
        season_id: SeasonId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Load everything the engine reads for a season.
    fn load_season(
        &self,
        season_id: SeasonId,
    ) -> impl Future<Output = Result<SeasonSnapshot, StoreError>> + Send;

    /// Whether a calendar exists for the season.
    fn calendar_exists(
        &self,
        season_id: SeasonId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Insert generated fixtures and the drawn cups.
    fn insert_fixtures(
        &self,
        season_id: SeasonId,
        fixtures: &[Fixture],
        cups: &[Cup],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Insert a calendar and stamp fixture dates.
    ///
    /// Fails with [`StoreError::Conflict`] when the season already has one.
    fn insert_calendar(
        &self,
        season_id: SeasonId,
        days: &[CalendarDay],
        fixture_dates: &[(FixtureId, NaiveDate)],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Commit every write of a simulated day.
    ///
    /// Fails with [`StoreError::Conflict`] when the day was already
    /// simulated; nothing is written in that case.
    fn commit_day(
        &self,
        season_id: SeasonId,
        plan: &DayPlan,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
