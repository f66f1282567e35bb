//! [`SeasonStore`] backed by `PostgreSQL`.
//!
//! Every write batch runs in one transaction that first locks the season
//! row, so two writers of the same season queue up in the database even
//! when they run in different processes.

use chrono::NaiveDate;
use pinfall_core::matchday::DayPlan;
use pinfall_core::season::SeasonSnapshot;
use pinfall_core::store::{SeasonStore, StoreError};
use pinfall_types::{CalendarDay, Cup, Fixture, FixtureId, Season, SeasonId};
use sqlx::PgConnection;

use crate::calendar_store::{self, CalendarQueries};
use crate::error::DbError;
use crate::fixture_store::{self, FixtureQueries};
use crate::postgres::PostgresPool;
use crate::roster_store::{self, RosterQueries};
use crate::season_store::{self, SeasonQueries};

/// Season store over a [`PostgresPool`].
#[derive(Debug, Clone)]
pub struct PgSeasonStore {
    pool: PostgresPool,
}

impl PgSeasonStore {
    /// Wrap a connected pool.
    pub const fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }

    /// The wrapped pool.
    pub const fn pool(&self) -> &PostgresPool {
        &self.pool
    }

    /// Write a whole season in one transaction: the season, its
    /// competitions, squads, fixtures, calendar and history.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if any insert fails; nothing is
    /// written in that case.
    pub async fn insert_snapshot(&self, snapshot: &SeasonSnapshot) -> Result<(), DbError> {
        let season_id = snapshot.season.id;
        let mut tx = self.pool.pool().begin().await?;

        season_store::insert_season(&mut tx, &snapshot.season).await?;
        roster_store::insert_leagues(&mut tx, &snapshot.leagues).await?;
        roster_store::insert_clubs(&mut tx, &snapshot.clubs).await?;
        roster_store::insert_teams(&mut tx, &snapshot.teams).await?;
        roster_store::insert_cups(&mut tx, &snapshot.cups).await?;
        roster_store::insert_players(&mut tx, &snapshot.players).await?;
        roster_store::upsert_availability(&mut tx, season_id, &snapshot.availability).await?;
        fixture_store::insert_fixtures(&mut tx, &snapshot.fixtures).await?;
        fixture_store::insert_overrides(&mut tx, &snapshot.overrides).await?;
        calendar_store::insert_days(&mut tx, &snapshot.calendar).await?;
        fixture_store::insert_performances(&mut tx, &snapshot.performances).await?;

        tx.commit().await?;
        tracing::info!(
            %season_id,
            teams = snapshot.teams.len(),
            players = snapshot.players.len(),
            fixtures = snapshot.fixtures.len(),
            "season stored"
        );
        Ok(())
    }

    async fn load(&self, season_id: SeasonId) -> Result<SeasonSnapshot, DbError> {
        let pool = self.pool.pool();
        let season = SeasonQueries::new(pool).get(season_id).await?;
        let rosters = RosterQueries::new(pool);
        let fixtures = FixtureQueries::new(pool);
        let calendar_queries = CalendarQueries::new(pool);

        let (calendar, leagues, cups, clubs, teams, players, availability) = tokio::try_join!(
            calendar_queries.for_season(season_id),
            rosters.leagues(season_id),
            rosters.cups(season_id),
            rosters.clubs(season_id),
            rosters.teams(season_id),
            rosters.players(season_id),
            rosters.availability(season_id),
        )?;
        let (fixture_list, overrides, performances) = tokio::try_join!(
            fixtures.for_season(season_id),
            fixtures.overrides(season_id),
            fixtures.performances(season_id),
        )?;

        tracing::debug!(
            %season_id,
            days = calendar.len(),
            fixtures = fixture_list.len(),
            performances = performances.len(),
            "season loaded"
        );
        Ok(SeasonSnapshot {
            season,
            calendar,
            leagues,
            cups,
            clubs,
            teams,
            players,
            fixtures: fixture_list,
            availability,
            overrides,
            performances,
        })
    }

    async fn write_fixtures(
        &self,
        season_id: SeasonId,
        fixtures: &[Fixture],
        cups: &[Cup],
    ) -> Result<(), DbError> {
        let mut tx = self.pool.pool().begin().await?;
        lock_season(&mut tx, season_id).await?;
        fixture_store::insert_fixtures(&mut tx, fixtures).await?;
        roster_store::update_cups(&mut tx, cups).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn write_calendar(
        &self,
        season_id: SeasonId,
        days: &[CalendarDay],
        fixture_dates: &[(FixtureId, NaiveDate)],
    ) -> Result<(), DbError> {
        let mut tx = self.pool.pool().begin().await?;
        lock_season(&mut tx, season_id).await?;
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM calendar_days WHERE season_id = $1)")
                .bind(season_id.into_inner())
                .fetch_one(&mut *tx)
                .await?;
        if exists {
            return Err(DbError::Conflict(format!(
                "calendar already exists for season {season_id}"
            )));
        }
        calendar_store::insert_days(&mut tx, days).await?;
        fixture_store::set_dates(&mut tx, fixture_dates).await?;
        tx.commit().await?;
        tracing::info!(%season_id, days = days.len(), "calendar stored");
        Ok(())
    }

    async fn write_day(&self, season_id: SeasonId, plan: &DayPlan) -> Result<(), DbError> {
        let mut tx = self.pool.pool().begin().await?;
        lock_season(&mut tx, season_id).await?;
        if !calendar_store::mark_simulated(&mut tx, plan.calendar_day_id).await? {
            return Err(DbError::Conflict(format!("{} is already simulated", plan.date)));
        }
        fixture_store::record_results(&mut tx, &plan.outcomes).await?;
        fixture_store::insert_fixtures(&mut tx, &plan.new_fixtures).await?;
        fixture_store::insert_performances(&mut tx, &plan.performances).await?;
        roster_store::upsert_availability(&mut tx, season_id, &plan.availability).await?;
        roster_store::update_cups(&mut tx, &plan.cups).await?;
        tx.commit().await?;

        tracing::debug!(
            %season_id,
            date = %plan.date,
            outcomes = plan.outcomes.len(),
            performances = plan.performances.len(),
            "match day committed"
        );
        Ok(())
    }
}

/// Lock the season row for the rest of the transaction.
async fn lock_season(conn: &mut PgConnection, season_id: SeasonId) -> Result<(), DbError> {
    sqlx::query_scalar::<_, uuid::Uuid>("SELECT id FROM seasons WHERE id = $1 FOR UPDATE")
        .bind(season_id.into_inner())
        .fetch_optional(&mut *conn)
        .await?
        .map(|_| ())
        .ok_or_else(|| DbError::NotFound {
            entity: "season",
            id: season_id.to_string(),
        })
}

impl SeasonStore for PgSeasonStore {
    async fn list_seasons(&self) -> Result<Vec<Season>, StoreError> {
        Ok(SeasonQueries::new(self.pool.pool()).list().await?)
    }

    async fn set_current_season(&self, season_id: SeasonId) -> Result<(), StoreError> {
        Ok(SeasonQueries::new(self.pool.pool())
            .set_current(season_id)
            .await?)
    }

    async fn load_season(&self, season_id: SeasonId) -> Result<SeasonSnapshot, StoreError> {
        Ok(self.load(season_id).await?)
    }

    async fn calendar_exists(&self, season_id: SeasonId) -> Result<bool, StoreError> {
        SeasonQueries::new(self.pool.pool()).get(season_id).await?;
        Ok(CalendarQueries::new(self.pool.pool())
            .exists(season_id)
            .await?)
    }

    async fn insert_fixtures(
        &self,
        season_id: SeasonId,
        fixtures: &[Fixture],
        cups: &[Cup],
    ) -> Result<(), StoreError> {
        Ok(self.write_fixtures(season_id, fixtures, cups).await?)
    }

    async fn insert_calendar(
        &self,
        season_id: SeasonId,
        days: &[CalendarDay],
        fixture_dates: &[(FixtureId, NaiveDate)],
    ) -> Result<(), StoreError> {
        Ok(self.write_calendar(season_id, days, fixture_dates).await?)
    }

    async fn commit_day(&self, season_id: SeasonId, plan: &DayPlan) -> Result<(), StoreError> {
        Ok(self.write_day(season_id, plan).await?)
    }
}
