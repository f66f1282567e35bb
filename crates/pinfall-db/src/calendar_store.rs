//! Operations on the `calendar_days` table.

use pinfall_types::{CalendarDay, CalendarDayId, SeasonId};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::DbError;
use crate::rows::{CalendarDayRow, match_day_to_db};

/// Read operations on calendars.
pub struct CalendarQueries<'a> {
    pool: &'a PgPool,
}

impl<'a> CalendarQueries<'a> {
    /// Bind to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Calendar of a season, ordered by date.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] for rows whose day type and number
    /// disagree.
    pub async fn for_season(&self, season_id: SeasonId) -> Result<Vec<CalendarDay>, DbError> {
        let rows = sqlx::query_as::<_, CalendarDayRow>(
            r"SELECT id, season_id, date, day_type, match_day_number, is_simulated
              FROM calendar_days
              WHERE season_id = $1
              ORDER BY date",
        )
        .bind(season_id.into_inner())
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(CalendarDay::try_from).collect()
    }

    /// Whether the season has any calendar row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn exists(&self, season_id: SeasonId) -> Result<bool, DbError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM calendar_days WHERE season_id = $1)")
                .bind(season_id.into_inner())
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }
}

/// Batch-insert calendar days with one `UNNEST` insert.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the insert fails, including a unique
/// violation on `(season_id, date)`.
pub async fn insert_days(conn: &mut PgConnection, days: &[CalendarDay]) -> Result<(), DbError> {
    if days.is_empty() {
        return Ok(());
    }
    let len = days.len();
    let mut ids: Vec<Uuid> = Vec::with_capacity(len);
    let mut seasons: Vec<Uuid> = Vec::with_capacity(len);
    let mut dates = Vec::with_capacity(len);
    let mut day_types: Vec<String> = Vec::with_capacity(len);
    let mut numbers: Vec<Option<i32>> = Vec::with_capacity(len);
    let mut simulated = Vec::with_capacity(len);

    for day in days {
        let (day_type, number) = match_day_to_db(day.match_day);
        ids.push(day.id.into_inner());
        seasons.push(day.season_id.into_inner());
        dates.push(day.date);
        day_types.push(day_type.to_owned());
        numbers.push(number);
        simulated.push(day.is_simulated);
    }

    sqlx::query(
        r"INSERT INTO calendar_days (id, season_id, date, day_type, match_day_number, is_simulated)
          SELECT * FROM UNNEST($1::UUID[], $2::UUID[], $3::DATE[], $4::TEXT[], $5::INTEGER[], $6::BOOLEAN[])",
    )
    .bind(&ids)
    .bind(&seasons)
    .bind(&dates)
    .bind(&day_types)
    .bind(&numbers)
    .bind(&simulated)
    .execute(&mut *conn)
    .await?;

    tracing::debug!(count = len, "Inserted calendar days (batch UNNEST)");
    Ok(())
}

/// Flag a calendar day as simulated.
///
/// Returns `false` when the day was already simulated (or does not
/// exist), so callers can reject a repeated commit.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the update fails.
pub async fn mark_simulated(conn: &mut PgConnection, day_id: CalendarDayId) -> Result<bool, DbError> {
    let updated = sqlx::query(
        "UPDATE calendar_days SET is_simulated = TRUE WHERE id = $1 AND NOT is_simulated",
    )
    .bind(day_id.into_inner())
    .execute(&mut *conn)
    .await?
    .rows_affected();
    Ok(updated == 1)
}
