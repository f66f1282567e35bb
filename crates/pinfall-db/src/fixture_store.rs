//! Operations on `fixtures`, `lineup_overrides` and `performance_records`.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use pinfall_core::matchday::FixtureOutcome;
use pinfall_types::{
    CompetitionRef, Fixture, FixtureId, LineupOverride, PerformanceRecord, SeasonId, TeamId,
};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::DbError;
use crate::rows::{FixtureRow, OverrideRow, PerformanceRow, ResultColumns, int};

/// Read operations on fixtures and their outcomes.
pub struct FixtureQueries<'a> {
    pool: &'a PgPool,
}

impl<'a> FixtureQueries<'a> {
    /// Bind to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All fixtures of a season.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] for rows that violate the model.
    pub async fn for_season(&self, season_id: SeasonId) -> Result<Vec<Fixture>, DbError> {
        let rows = sqlx::query_as::<_, FixtureRow>(
            r"SELECT id, season_id, league_id, cup_id, round, match_day_number, bracket_slot,
                     home_team_id, away_team_id, scheduled_date, is_played,
                     home_pins, away_pins, home_points, away_points, winner, decided_by, seed
              FROM fixtures
              WHERE season_id = $1
              ORDER BY match_day_number, bracket_slot, id",
        )
        .bind(season_id.into_inner())
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(Fixture::try_from).collect()
    }

    /// Manual lineups for fixtures of a season.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn overrides(&self, season_id: SeasonId) -> Result<Vec<LineupOverride>, DbError> {
        let rows = sqlx::query_as::<_, OverrideRow>(
            r"SELECT o.fixture_id, o.team_id, o.slot, o.player_id
              FROM lineup_overrides o
              JOIN fixtures f ON f.id = o.fixture_id
              WHERE f.season_id = $1
              ORDER BY o.fixture_id, o.team_id, o.slot",
        )
        .bind(season_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        let mut lineups: BTreeMap<(FixtureId, TeamId), LineupOverride> = BTreeMap::new();
        for row in rows {
            let fixture_id = FixtureId::from(row.fixture_id);
            let team_id = TeamId::from(row.team_id);
            lineups
                .entry((fixture_id, team_id))
                .or_insert_with(|| LineupOverride {
                    fixture_id,
                    team_id,
                    player_ids: Vec::new(),
                })
                .player_ids
                .push(row.player_id.into());
        }
        Ok(lineups.into_values().collect())
    }

    /// Performance history of a season.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] or [`DbError::Serialization`] for rows
    /// that cannot be decoded.
    pub async fn performances(&self, season_id: SeasonId) -> Result<Vec<PerformanceRecord>, DbError> {
        let rows = sqlx::query_as::<_, PerformanceRow>(
            r"SELECT p.fixture_id, p.player_id, p.team_id, p.competition, p.match_day_number,
                     p.date, p.slot, p.lanes, p.total_pins, p.misses, p.points, p.is_stand_in
              FROM performance_records p
              JOIN fixtures f ON f.id = p.fixture_id
              WHERE f.season_id = $1
              ORDER BY p.date, p.fixture_id, p.slot, p.player_id",
        )
        .bind(season_id.into_inner())
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(PerformanceRecord::try_from).collect()
    }
}

/// Batch-insert fixtures (results included, if any).
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the insert fails.
pub async fn insert_fixtures(conn: &mut PgConnection, fixtures: &[Fixture]) -> Result<(), DbError> {
    if fixtures.is_empty() {
        return Ok(());
    }
    let len = fixtures.len();
    let mut ids: Vec<Uuid> = Vec::with_capacity(len);
    let mut seasons: Vec<Uuid> = Vec::with_capacity(len);
    let mut leagues: Vec<Option<Uuid>> = Vec::with_capacity(len);
    let mut cups: Vec<Option<Uuid>> = Vec::with_capacity(len);
    let mut rounds: Vec<i32> = Vec::with_capacity(len);
    let mut numbers: Vec<i32> = Vec::with_capacity(len);
    let mut slots: Vec<i32> = Vec::with_capacity(len);
    let mut homes: Vec<Uuid> = Vec::with_capacity(len);
    let mut aways: Vec<Option<Uuid>> = Vec::with_capacity(len);
    let mut dates: Vec<Option<NaiveDate>> = Vec::with_capacity(len);

    for fixture in fixtures {
        let (league, cup) = match fixture.competition {
            CompetitionRef::League(id) => (Some(id.into_inner()), None),
            CompetitionRef::Cup(id) => (None, Some(id.into_inner())),
        };
        ids.push(fixture.id.into_inner());
        seasons.push(fixture.season_id.into_inner());
        leagues.push(league);
        cups.push(cup);
        rounds.push(int(fixture.round));
        numbers.push(int(fixture.match_day_number));
        slots.push(int(fixture.bracket_slot));
        homes.push(fixture.home_team_id.into_inner());
        aways.push(fixture.away_team_id.map(TeamId::into_inner));
        dates.push(fixture.scheduled_date);
    }

    sqlx::query(
        r"INSERT INTO fixtures (id, season_id, league_id, cup_id, round, match_day_number, bracket_slot,
                               home_team_id, away_team_id, scheduled_date)
          SELECT * FROM UNNEST($1::UUID[], $2::UUID[], $3::UUID[], $4::UUID[], $5::INTEGER[],
                               $6::INTEGER[], $7::INTEGER[], $8::UUID[], $9::UUID[], $10::DATE[])",
    )
    .bind(&ids)
    .bind(&seasons)
    .bind(&leagues)
    .bind(&cups)
    .bind(&rounds)
    .bind(&numbers)
    .bind(&slots)
    .bind(&homes)
    .bind(&aways)
    .bind(&dates)
    .execute(&mut *conn)
    .await?;

    let outcomes: Vec<FixtureOutcome> = fixtures
        .iter()
        .filter_map(|f| {
            f.result.clone().map(|result| FixtureOutcome {
                fixture_id: f.id,
                result,
            })
        })
        .collect();
    record_results(conn, &outcomes).await?;

    tracing::debug!(count = len, "Inserted fixtures (batch UNNEST)");
    Ok(())
}

/// Stamp the informational `scheduled_date` of fixtures.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the update fails.
pub async fn set_dates(
    conn: &mut PgConnection,
    dates: &[(FixtureId, NaiveDate)],
) -> Result<(), DbError> {
    if dates.is_empty() {
        return Ok(());
    }
    let ids: Vec<Uuid> = dates.iter().map(|(id, _)| id.into_inner()).collect();
    let days: Vec<NaiveDate> = dates.iter().map(|(_, date)| *date).collect();
    sqlx::query(
        r"UPDATE fixtures f SET scheduled_date = u.date
          FROM UNNEST($1::UUID[], $2::DATE[]) AS u(id, date)
          WHERE f.id = u.id",
    )
    .bind(&ids)
    .bind(&days)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Write fixture results and flag the fixtures as played.
///
/// # Errors
///
/// Returns [`DbError::Conflict`] if a fixture was already played or does
/// not exist; the caller's transaction must then be rolled back.
pub async fn record_results(
    conn: &mut PgConnection,
    outcomes: &[FixtureOutcome],
) -> Result<(), DbError> {
    if outcomes.is_empty() {
        return Ok(());
    }
    let len = outcomes.len();
    let mut ids: Vec<Uuid> = Vec::with_capacity(len);
    let mut home_pins: Vec<i32> = Vec::with_capacity(len);
    let mut away_pins: Vec<i32> = Vec::with_capacity(len);
    let mut home_points: Vec<Decimal> = Vec::with_capacity(len);
    let mut away_points: Vec<Decimal> = Vec::with_capacity(len);
    let mut winners: Vec<Option<String>> = Vec::with_capacity(len);
    let mut decided: Vec<String> = Vec::with_capacity(len);
    let mut seeds: Vec<i64> = Vec::with_capacity(len);

    for outcome in outcomes {
        let columns = ResultColumns::from(&outcome.result);
        ids.push(outcome.fixture_id.into_inner());
        home_pins.push(columns.home_pins);
        away_pins.push(columns.away_pins);
        home_points.push(columns.home_points);
        away_points.push(columns.away_points);
        winners.push(columns.winner.map(str::to_owned));
        decided.push(columns.decided_by.to_owned());
        seeds.push(columns.seed);
    }

    let updated = sqlx::query(
        r"UPDATE fixtures f SET
              is_played = TRUE,
              home_pins = u.home_pins,
              away_pins = u.away_pins,
              home_points = u.home_points,
              away_points = u.away_points,
              winner = u.winner,
              decided_by = u.decided_by,
              seed = u.seed
          FROM UNNEST($1::UUID[], $2::INTEGER[], $3::INTEGER[], $4::NUMERIC[], $5::NUMERIC[],
                      $6::TEXT[], $7::TEXT[], $8::BIGINT[])
               AS u(id, home_pins, away_pins, home_points, away_points, winner, decided_by, seed)
          WHERE f.id = u.id AND NOT f.is_played",
    )
    .bind(&ids)
    .bind(&home_pins)
    .bind(&away_pins)
    .bind(&home_points)
    .bind(&away_points)
    .bind(&winners)
    .bind(&decided)
    .bind(&seeds)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    let expected = u64::try_from(len).unwrap_or(u64::MAX);
    if updated != expected {
        return Err(DbError::Conflict(format!(
            "{} of {len} fixtures were already played or missing",
            expected.saturating_sub(updated)
        )));
    }
    Ok(())
}

/// Batch-insert performance records.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] on a duplicate `(fixture_id, player_id)`.
pub async fn insert_performances(
    conn: &mut PgConnection,
    records: &[PerformanceRecord],
) -> Result<(), DbError> {
    if records.is_empty() {
        return Ok(());
    }
    let len = records.len();
    let mut fixtures: Vec<Uuid> = Vec::with_capacity(len);
    let mut players: Vec<Uuid> = Vec::with_capacity(len);
    let mut teams: Vec<Uuid> = Vec::with_capacity(len);
    let mut competitions: Vec<String> = Vec::with_capacity(len);
    let mut numbers: Vec<i32> = Vec::with_capacity(len);
    let mut dates: Vec<Option<NaiveDate>> = Vec::with_capacity(len);
    let mut slots: Vec<i16> = Vec::with_capacity(len);
    let mut lanes: Vec<serde_json::Value> = Vec::with_capacity(len);
    let mut totals: Vec<i32> = Vec::with_capacity(len);
    let mut misses: Vec<i32> = Vec::with_capacity(len);
    let mut points: Vec<Decimal> = Vec::with_capacity(len);
    let mut stand_ins: Vec<bool> = Vec::with_capacity(len);

    for record in records {
        fixtures.push(record.fixture_id.into_inner());
        players.push(record.player_id.into_inner());
        teams.push(record.team_id.into_inner());
        competitions.push(record.competition.as_str().to_owned());
        numbers.push(int(record.match_day_number));
        dates.push(record.date);
        slots.push(i16::from(record.slot));
        lanes.push(serde_json::to_value(&record.lanes)?);
        totals.push(int(record.total_pins));
        misses.push(int(record.misses));
        points.push(record.points);
        stand_ins.push(record.is_stand_in);
    }

    sqlx::query(
        r"INSERT INTO performance_records (fixture_id, player_id, team_id, competition, match_day_number,
                                          date, slot, lanes, total_pins, misses, points, is_stand_in)
          SELECT * FROM UNNEST($1::UUID[], $2::UUID[], $3::UUID[], $4::TEXT[], $5::INTEGER[],
                               $6::DATE[], $7::SMALLINT[], $8::JSONB[], $9::INTEGER[], $10::INTEGER[],
                               $11::NUMERIC[], $12::BOOLEAN[])",
    )
    .bind(&fixtures)
    .bind(&players)
    .bind(&teams)
    .bind(&competitions)
    .bind(&numbers)
    .bind(&dates)
    .bind(&slots)
    .bind(&lanes)
    .bind(&totals)
    .bind(&misses)
    .bind(&points)
    .bind(&stand_ins)
    .execute(&mut *conn)
    .await?;

    tracing::debug!(count = len, "Inserted performance records (batch UNNEST)");
    Ok(())
}

/// Insert manual lineups, one row per slot.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the insert fails.
pub async fn insert_overrides(
    conn: &mut PgConnection,
    overrides: &[LineupOverride],
) -> Result<(), DbError> {
    let mut fixtures: Vec<Uuid> = Vec::new();
    let mut teams: Vec<Uuid> = Vec::new();
    let mut slots: Vec<i16> = Vec::new();
    let mut players: Vec<Uuid> = Vec::new();
    for lineup in overrides {
        for (slot, player_id) in (1_i16..).zip(&lineup.player_ids) {
            fixtures.push(lineup.fixture_id.into_inner());
            teams.push(lineup.team_id.into_inner());
            slots.push(slot);
            players.push(player_id.into_inner());
        }
    }
    if fixtures.is_empty() {
        return Ok(());
    }
    sqlx::query(
        r"INSERT INTO lineup_overrides (fixture_id, team_id, slot, player_id)
          SELECT * FROM UNNEST($1::UUID[], $2::UUID[], $3::SMALLINT[], $4::UUID[])",
    )
    .bind(&fixtures)
    .bind(&teams)
    .bind(&slots)
    .bind(&players)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
