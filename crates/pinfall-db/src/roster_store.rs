//! Operations on competitions, clubs, teams, players and availability.
//!
//! Clubs, teams and players outlive a season; leagues, cups and
//! availability records belong to one. A season's teams are the teams of
//! its leagues plus the participants of its cups.

use pinfall_types::{Club, Cup, League, Player, PlayerAvailability, SeasonId, Team};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::DbError;
use crate::rows::{AvailabilityRow, ClubRow, CupRow, LeagueRow, PlayerRow, TeamRow, int};

/// `teams` ids that take part in a season, as a CTE body.
const SEASON_TEAMS: &str = r"
    season_teams AS (
        SELECT t.id FROM teams t
        JOIN leagues l ON l.id = t.league_id
        WHERE l.season_id = $1
        UNION
        SELECT p.team_id FROM cup_participants p
        JOIN cups c ON c.id = p.cup_id
        WHERE c.season_id = $1
    )";

/// Read operations on the squads and competitions of a season.
pub struct RosterQueries<'a> {
    pool: &'a PgPool,
}

impl<'a> RosterQueries<'a> {
    /// Bind to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Leagues of a season, by tier.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] for out-of-range tiers or ages.
    pub async fn leagues(&self, season_id: SeasonId) -> Result<Vec<League>, DbError> {
        let rows = sqlx::query_as::<_, LeagueRow>(
            r"SELECT id, season_id, name, tier, min_age, max_age
              FROM leagues
              WHERE season_id = $1
              ORDER BY tier, name, id",
        )
        .bind(season_id.into_inner())
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(League::try_from).collect()
    }

    /// Cups of a season with participants in entry order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] for negative round counters.
    pub async fn cups(&self, season_id: SeasonId) -> Result<Vec<Cup>, DbError> {
        let rows = sqlx::query_as::<_, CupRow>(
            r"SELECT c.id, c.season_id, c.name, c.current_round_number, c.total_rounds,
                     c.is_active, c.winner_team_id,
                     COALESCE(
                         ARRAY_AGG(p.team_id ORDER BY p.position) FILTER (WHERE p.team_id IS NOT NULL),
                         '{}'
                     ) AS participants
              FROM cups c
              LEFT JOIN cup_participants p ON p.cup_id = c.id
              WHERE c.season_id = $1
              GROUP BY c.id
              ORDER BY c.name, c.id",
        )
        .bind(season_id.into_inner())
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(Cup::try_from).collect()
    }

    /// Teams taking part in a season.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] for out-of-range ranks or ratings.
    pub async fn teams(&self, season_id: SeasonId) -> Result<Vec<Team>, DbError> {
        let sql = format!(
            r"WITH {SEASON_TEAMS}
              SELECT t.id, t.club_id, t.league_id, t.name, t.squad_rank, t.rating
              FROM teams t
              JOIN season_teams s ON s.id = t.id
              ORDER BY t.club_id, t.squad_rank, t.id"
        );
        let rows = sqlx::query_as::<_, TeamRow>(&sql)
            .bind(season_id.into_inner())
            .fetch_all(self.pool)
            .await?;
        rows.into_iter().map(Team::try_from).collect()
    }

    /// Clubs with at least one team in a season.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn clubs(&self, season_id: SeasonId) -> Result<Vec<Club>, DbError> {
        let sql = format!(
            r"WITH {SEASON_TEAMS}
              SELECT DISTINCT c.id, c.name
              FROM clubs c
              JOIN teams t ON t.club_id = c.id
              JOIN season_teams s ON s.id = t.id
              ORDER BY c.name, c.id"
        );
        let rows = sqlx::query_as::<_, ClubRow>(&sql)
            .bind(season_id.into_inner())
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Club::from).collect())
    }

    /// Players of the clubs in a season.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] for out-of-range skills.
    pub async fn players(&self, season_id: SeasonId) -> Result<Vec<Player>, DbError> {
        let sql = format!(
            r"WITH {SEASON_TEAMS},
              season_clubs AS (
                  SELECT DISTINCT t.club_id FROM teams t JOIN season_teams s ON s.id = t.id
              )
              SELECT p.id, p.club_id, p.name, p.age, p.strength, p.consistency,
                     p.pressure_resistance, p.technique_full_pins, p.technique_clearing,
                     p.is_available, p.is_reserve
              FROM players p
              JOIN season_clubs c ON c.club_id = p.club_id
              ORDER BY p.club_id, p.id"
        );
        let rows = sqlx::query_as::<_, PlayerRow>(&sql)
            .bind(season_id.into_inner())
            .fetch_all(self.pool)
            .await?;
        rows.into_iter().map(Player::try_from).collect()
    }

    /// Availability records of a season.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] for unknown competition kinds.
    pub async fn availability(
        &self,
        season_id: SeasonId,
    ) -> Result<Vec<PlayerAvailability>, DbError> {
        let rows = sqlx::query_as::<_, AvailabilityRow>(
            r"SELECT player_id, competition, is_available_current_matchday,
                     has_played_current_matchday, last_played_matchday
              FROM player_availability
              WHERE season_id = $1
              ORDER BY player_id, competition",
        )
        .bind(season_id.into_inner())
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(PlayerAvailability::try_from).collect()
    }
}

// =========================================================================
// Writes
// =========================================================================

/// Insert leagues.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the insert fails.
pub async fn insert_leagues(conn: &mut PgConnection, leagues: &[League]) -> Result<(), DbError> {
    if leagues.is_empty() {
        return Ok(());
    }
    let ids: Vec<Uuid> = leagues.iter().map(|l| l.id.into_inner()).collect();
    let seasons: Vec<Uuid> = leagues.iter().map(|l| l.season_id.into_inner()).collect();
    let names: Vec<String> = leagues.iter().map(|l| l.name.clone()).collect();
    let tiers: Vec<i16> = leagues.iter().map(|l| i16::from(l.tier)).collect();
    let min_ages: Vec<Option<i16>> = leagues
        .iter()
        .map(|l| l.age_class.and_then(|a| a.min_age).map(i16::from))
        .collect();
    let max_ages: Vec<Option<i16>> = leagues
        .iter()
        .map(|l| l.age_class.and_then(|a| a.max_age).map(i16::from))
        .collect();

    sqlx::query(
        r"INSERT INTO leagues (id, season_id, name, tier, min_age, max_age)
          SELECT * FROM UNNEST($1::UUID[], $2::UUID[], $3::TEXT[], $4::SMALLINT[], $5::SMALLINT[], $6::SMALLINT[])",
    )
    .bind(&ids)
    .bind(&seasons)
    .bind(&names)
    .bind(&tiers)
    .bind(&min_ages)
    .bind(&max_ages)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Insert cups and their participant lists.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the insert fails.
pub async fn insert_cups(conn: &mut PgConnection, cups: &[Cup]) -> Result<(), DbError> {
    for cup in cups {
        sqlx::query(
            r"INSERT INTO cups (id, season_id, name, current_round_number, total_rounds, is_active, winner_team_id)
              VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(cup.id.into_inner())
        .bind(cup.season_id.into_inner())
        .bind(&cup.name)
        .bind(int(cup.current_round_number))
        .bind(int(cup.total_rounds))
        .bind(cup.is_active)
        .bind(cup.winner.map(Into::<Uuid>::into))
        .execute(&mut *conn)
        .await?;

        let teams: Vec<Uuid> = cup.participants.iter().map(|t| t.into_inner()).collect();
        let positions: Vec<i32> = (0_i32..).take(teams.len()).collect();
        sqlx::query(
            r"INSERT INTO cup_participants (cup_id, team_id, position)
              SELECT $1, * FROM UNNEST($2::UUID[], $3::INTEGER[])",
        )
        .bind(cup.id.into_inner())
        .bind(&teams)
        .bind(&positions)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Write the round counters, activity flag and winner of cups.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if a cup does not exist.
pub async fn update_cups(conn: &mut PgConnection, cups: &[Cup]) -> Result<(), DbError> {
    for cup in cups {
        let updated = sqlx::query(
            r"UPDATE cups
              SET current_round_number = $2, total_rounds = $3, is_active = $4, winner_team_id = $5
              WHERE id = $1",
        )
        .bind(cup.id.into_inner())
        .bind(int(cup.current_round_number))
        .bind(int(cup.total_rounds))
        .bind(cup.is_active)
        .bind(cup.winner.map(Into::<Uuid>::into))
        .execute(&mut *conn)
        .await?
        .rows_affected();
        if updated == 0 {
            return Err(DbError::NotFound {
                entity: "cup",
                id: cup.id.to_string(),
            });
        }
    }
    Ok(())
}

/// Insert clubs; clubs already stored are kept as they are.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the insert fails.
pub async fn insert_clubs(conn: &mut PgConnection, clubs: &[Club]) -> Result<(), DbError> {
    if clubs.is_empty() {
        return Ok(());
    }
    let ids: Vec<Uuid> = clubs.iter().map(|c| c.id.into_inner()).collect();
    let names: Vec<String> = clubs.iter().map(|c| c.name.clone()).collect();
    sqlx::query(
        r"INSERT INTO clubs (id, name)
          SELECT * FROM UNNEST($1::UUID[], $2::TEXT[])
          ON CONFLICT (id) DO NOTHING",
    )
    .bind(&ids)
    .bind(&names)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Insert teams; a stored team moves to the given league.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the insert fails.
pub async fn insert_teams(conn: &mut PgConnection, teams: &[Team]) -> Result<(), DbError> {
    if teams.is_empty() {
        return Ok(());
    }
    let ids: Vec<Uuid> = teams.iter().map(|t| t.id.into_inner()).collect();
    let clubs: Vec<Uuid> = teams.iter().map(|t| t.club_id.into_inner()).collect();
    let leagues: Vec<Option<Uuid>> = teams
        .iter()
        .map(|t| t.league_id.map(Into::<Uuid>::into))
        .collect();
    let names: Vec<String> = teams.iter().map(|t| t.name.clone()).collect();
    let ranks: Vec<i16> = teams.iter().map(|t| i16::from(t.squad_rank)).collect();
    let ratings: Vec<i32> = teams.iter().map(|t| i32::from(t.rating)).collect();

    sqlx::query(
        r"INSERT INTO teams (id, club_id, league_id, name, squad_rank, rating)
          SELECT * FROM UNNEST($1::UUID[], $2::UUID[], $3::UUID[], $4::TEXT[], $5::SMALLINT[], $6::INTEGER[])
          ON CONFLICT (id) DO UPDATE SET league_id = EXCLUDED.league_id",
    )
    .bind(&ids)
    .bind(&clubs)
    .bind(&leagues)
    .bind(&names)
    .bind(&ranks)
    .bind(&ratings)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Insert players; players already stored are kept as they are.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the insert fails.
pub async fn insert_players(conn: &mut PgConnection, players: &[Player]) -> Result<(), DbError> {
    if players.is_empty() {
        return Ok(());
    }
    let len = players.len();
    let mut ids: Vec<Uuid> = Vec::with_capacity(len);
    let mut clubs: Vec<Uuid> = Vec::with_capacity(len);
    let mut names: Vec<String> = Vec::with_capacity(len);
    let mut ages: Vec<i16> = Vec::with_capacity(len);
    let mut strength: Vec<i16> = Vec::with_capacity(len);
    let mut consistency: Vec<i16> = Vec::with_capacity(len);
    let mut pressure: Vec<i16> = Vec::with_capacity(len);
    let mut full_pins: Vec<i16> = Vec::with_capacity(len);
    let mut clearing: Vec<i16> = Vec::with_capacity(len);
    let mut available: Vec<bool> = Vec::with_capacity(len);
    let mut reserve: Vec<bool> = Vec::with_capacity(len);

    for player in players {
        let skills = &player.skills;
        ids.push(player.id.into_inner());
        clubs.push(player.club_id.into_inner());
        names.push(player.name.clone());
        ages.push(i16::from(player.age));
        strength.push(i16::from(skills.strength));
        consistency.push(i16::from(skills.consistency));
        pressure.push(i16::from(skills.pressure_resistance));
        full_pins.push(i16::from(skills.technique.full_pins));
        clearing.push(i16::from(skills.technique.clearing));
        available.push(player.is_available);
        reserve.push(player.is_reserve);
    }

    sqlx::query(
        r"INSERT INTO players (id, club_id, name, age, strength, consistency, pressure_resistance,
                              technique_full_pins, technique_clearing, is_available, is_reserve)
          SELECT * FROM UNNEST($1::UUID[], $2::UUID[], $3::TEXT[], $4::SMALLINT[], $5::SMALLINT[],
                               $6::SMALLINT[], $7::SMALLINT[], $8::SMALLINT[], $9::SMALLINT[],
                               $10::BOOLEAN[], $11::BOOLEAN[])
          ON CONFLICT (id) DO NOTHING",
    )
    .bind(&ids)
    .bind(&clubs)
    .bind(&names)
    .bind(&ages)
    .bind(&strength)
    .bind(&consistency)
    .bind(&pressure)
    .bind(&full_pins)
    .bind(&clearing)
    .bind(&available)
    .bind(&reserve)
    .execute(&mut *conn)
    .await?;

    tracing::debug!(count = len, "Inserted players (batch UNNEST)");
    Ok(())
}

/// Insert or overwrite availability records of a season.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the upsert fails.
pub async fn upsert_availability(
    conn: &mut PgConnection,
    season_id: SeasonId,
    records: &[PlayerAvailability],
) -> Result<(), DbError> {
    if records.is_empty() {
        return Ok(());
    }
    let players: Vec<Uuid> = records.iter().map(|r| r.player_id.into_inner()).collect();
    let kinds: Vec<String> = records
        .iter()
        .map(|r| r.competition.as_str().to_owned())
        .collect();
    let available: Vec<bool> = records
        .iter()
        .map(|r| r.is_available_current_matchday)
        .collect();
    let played: Vec<bool> = records
        .iter()
        .map(|r| r.has_played_current_matchday)
        .collect();
    let last: Vec<Option<i32>> = records
        .iter()
        .map(|r| r.last_played_matchday.map(int))
        .collect();

    sqlx::query(
        r"INSERT INTO player_availability (season_id, player_id, competition,
                                          is_available_current_matchday,
                                          has_played_current_matchday, last_played_matchday)
          SELECT $1, * FROM UNNEST($2::UUID[], $3::TEXT[], $4::BOOLEAN[], $5::BOOLEAN[], $6::INTEGER[])
          ON CONFLICT (season_id, player_id, competition) DO UPDATE SET
              is_available_current_matchday = EXCLUDED.is_available_current_matchday,
              has_played_current_matchday = EXCLUDED.has_played_current_matchday,
              last_played_matchday = EXCLUDED.last_played_matchday",
    )
    .bind(season_id.into_inner())
    .bind(&players)
    .bind(&kinds)
    .bind(&available)
    .bind(&played)
    .bind(&last)
    .execute(&mut *conn)
    .await?;

    tracing::debug!(%season_id, count = records.len(), "Upserted availability records");
    Ok(())
}
