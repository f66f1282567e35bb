//! Operations on the `seasons` table.

use pinfall_types::{Season, SeasonId};
use sqlx::{PgConnection, PgPool};

use crate::error::DbError;
use crate::rows::{SeasonRow, seed_to_db};

/// Read and flag operations on seasons.
pub struct SeasonQueries<'a> {
    pool: &'a PgPool,
}

impl<'a> SeasonQueries<'a> {
    /// Bind to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All seasons, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list(&self) -> Result<Vec<Season>, DbError> {
        let rows = sqlx::query_as::<_, SeasonRow>(
            r"SELECT id, name, start_date, end_date, is_current, seed
              FROM seasons
              ORDER BY start_date DESC, id",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Season::from).collect())
    }

    /// One season.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the season does not exist.
    pub async fn get(&self, season_id: SeasonId) -> Result<Season, DbError> {
        sqlx::query_as::<_, SeasonRow>(
            r"SELECT id, name, start_date, end_date, is_current, seed
              FROM seasons
              WHERE id = $1",
        )
        .bind(season_id.into_inner())
        .fetch_optional(self.pool)
        .await?
        .map(Season::from)
        .ok_or_else(|| DbError::NotFound {
            entity: "season",
            id: season_id.to_string(),
        })
    }

    /// Flag one season as current and every other season as not current,
    /// in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the season does not exist; nothing
    /// changes in that case.
    pub async fn set_current(&self, season_id: SeasonId) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        lock_current_flag(&mut tx).await?;
        sqlx::query("UPDATE seasons SET is_current = FALSE WHERE is_current AND id <> $1")
            .bind(season_id.into_inner())
            .execute(&mut *tx)
            .await?;
        let updated = sqlx::query("UPDATE seasons SET is_current = TRUE WHERE id = $1")
            .bind(season_id.into_inner())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if updated == 0 {
            tx.rollback().await?;
            return Err(DbError::NotFound {
                entity: "season",
                id: season_id.to_string(),
            });
        }
        tx.commit().await?;
        tracing::info!(%season_id, "current season changed");
        Ok(())
    }
}

/// Insert a season row.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the insert fails.
pub async fn insert_season(conn: &mut PgConnection, season: &Season) -> Result<(), DbError> {
    if season.is_current {
        lock_current_flag(&mut *conn).await?;
        sqlx::query("UPDATE seasons SET is_current = FALSE WHERE is_current")
            .execute(&mut *conn)
            .await?;
    }
    sqlx::query(
        r"INSERT INTO seasons (id, name, start_date, end_date, is_current, seed)
          VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(season.id.into_inner())
    .bind(&season.name)
    .bind(season.start_date)
    .bind(season.end_date)
    .bind(season.is_current)
    .bind(seed_to_db(season.seed))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Serialize writers of the current-season flag until the transaction ends.
async fn lock_current_flag(conn: &mut PgConnection) -> Result<(), DbError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext('pinfall.current_season'))")
        .execute(&mut *conn)
        .await?;
    Ok(())
}
