//! In-memory season store.
//!
//! Backs the CLI demo and the orchestrator tests. Writes are applied under
//! one lock, which gives the same all-or-nothing behaviour as a database
//! transaction.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use pinfall_types::{CalendarDay, Cup, Fixture, FixtureId, Season, SeasonId};
use tokio::sync::RwLock;

use crate::matchday::DayPlan;
use crate::season::{PreparedFixtures, SeasonSnapshot};
use crate::store::{SeasonStore, StoreError};

/// A season store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    seasons: RwLock<BTreeMap<SeasonId, SeasonSnapshot>>,
}

impl InMemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a season, replacing any season with the same id.
    pub async fn insert_season(&self, snapshot: SeasonSnapshot) {
        let mut seasons = self.seasons.write().await;
        if snapshot.season.is_current {
            for other in seasons.values_mut() {
                other.season.is_current = false;
            }
        }
        seasons.insert(snapshot.season.id, snapshot);
    }

    /// A copy of a stored season.
    pub async fn snapshot(&self, season_id: SeasonId) -> Option<SeasonSnapshot> {
        self.seasons.read().await.get(&season_id).cloned()
    }
}

impl SeasonStore for InMemoryStore {
    async fn list_seasons(&self) -> Result<Vec<Season>, StoreError> {
        let seasons = self.seasons.read().await;
        let mut list: Vec<Season> = seasons.values().map(|s| s.season.clone()).collect();
        list.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(list)
    }

    async fn set_current_season(&self, season_id: SeasonId) -> Result<(), StoreError> {
        let mut seasons = self.seasons.write().await;
        if !seasons.contains_key(&season_id) {
            return Err(StoreError::season_not_found(season_id));
        }
        for (id, snapshot) in seasons.iter_mut() {
            snapshot.season.is_current = *id == season_id;
        }
        Ok(())
    }

    async fn load_season(&self, season_id: SeasonId) -> Result<SeasonSnapshot, StoreError> {
        self.snapshot(season_id)
            .await
            .ok_or_else(|| StoreError::season_not_found(season_id))
    }

    async fn calendar_exists(&self, season_id: SeasonId) -> Result<bool, StoreError> {
        let seasons = self.seasons.read().await;
        let snapshot = seasons
            .get(&season_id)
            .ok_or_else(|| StoreError::season_not_found(season_id))?;
        Ok(!snapshot.calendar.is_empty())
    }

    async fn insert_fixtures(
        &self,
        season_id: SeasonId,
        fixtures: &[Fixture],
        cups: &[Cup],
    ) -> Result<(), StoreError> {
        let mut seasons = self.seasons.write().await;
        let snapshot = seasons
            .get_mut(&season_id)
            .ok_or_else(|| StoreError::season_not_found(season_id))?;
        snapshot.apply_prepared(&PreparedFixtures {
            fixtures: fixtures.to_vec(),
            cups: cups.to_vec(),
        });
        Ok(())
    }

    async fn insert_calendar(
        &self,
        season_id: SeasonId,
        days: &[CalendarDay],
        fixture_dates: &[(FixtureId, NaiveDate)],
    ) -> Result<(), StoreError> {
        let mut seasons = self.seasons.write().await;
        let snapshot = seasons
            .get_mut(&season_id)
            .ok_or_else(|| StoreError::season_not_found(season_id))?;
        if !snapshot.calendar.is_empty() {
            return Err(StoreError::Conflict {
                reason: format!("calendar already exists for season {season_id}"),
            });
        }
        snapshot.apply_calendar(days, fixture_dates);
        Ok(())
    }

    async fn commit_day(&self, season_id: SeasonId, plan: &DayPlan) -> Result<(), StoreError> {
        let mut seasons = self.seasons.write().await;
        let snapshot = seasons
            .get_mut(&season_id)
            .ok_or_else(|| StoreError::season_not_found(season_id))?;
        let day = snapshot
            .calendar
            .iter()
            .find(|d| d.id == plan.calendar_day_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "calendar day",
                id: plan.calendar_day_id.to_string(),
            })?;
        if day.is_simulated {
            return Err(StoreError::Conflict {
                reason: format!("{} is already simulated", plan.date),
            });
        }
        snapshot.apply_day(plan);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::demo::SeasonBuilder;

    #[tokio::test]
    async fn current_flag_is_exclusive() {
        let store = InMemoryStore::new();
        let a = SeasonBuilder::new(2, 0).build_unprepared();
        let b = SeasonBuilder::new(2, 0).build_unprepared();
        let (a_id, b_id) = (a.season.id, b.season.id);
        store.insert_season(a).await;
        store.insert_season(b).await;
        assert_eq!(store.current_season().await.unwrap().unwrap().id, b_id);

        store.set_current_season(a_id).await.unwrap();
        let seasons = store.list_seasons().await.unwrap();
        assert_eq!(seasons.iter().filter(|s| s.is_current).count(), 1);
        assert_eq!(store.current_season().await.unwrap().unwrap().id, a_id);
    }

    #[tokio::test]
    async fn unknown_season_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.load_season(SeasonId::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "season", .. }));
    }

    #[tokio::test]
    async fn second_calendar_conflicts() {
        let store = InMemoryStore::new();
        let snapshot = SeasonBuilder::new(4, 0).build().unwrap();
        let id = snapshot.season.id;
        let days = snapshot.calendar.clone();
        store.insert_season(snapshot).await;
        let err = store.insert_calendar(id, &days, &[]).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }
}
