//! Row types and their conversion into the domain model.
//!
//! Rows use the database's signed integer types; conversions check ranges
//! and reject rows that violate the model (an unnumbered league day, a
//! fixture with both a league and a cup) with [`DbError::Decode`].

use chrono::NaiveDate;
use pinfall_types::{
    AgeClass, CalendarDay, Club, CompetitionKind, CompetitionRef, Cup, DayType, DecidedBy, Fixture,
    FixtureResult, LaneScore, League, MatchDay, PerformanceRecord, Player, PlayerAvailability,
    Season, Side, SkillProfile, Team, Technique,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::DbError;

// =========================================================================
// Integer helpers
// =========================================================================

/// Store a `u64` seed in a `BIGINT` without losing bits.
pub const fn seed_to_db(seed: u64) -> i64 {
    i64::from_ne_bytes(seed.to_ne_bytes())
}

/// Read a `u64` seed back from a `BIGINT`.
pub const fn seed_from_db(raw: i64) -> u64 {
    u64::from_ne_bytes(raw.to_ne_bytes())
}

/// Saturating `u32` to `INTEGER`.
pub fn int(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn unsigned<T: TryFrom<i64>>(table: &'static str, field: &str, raw: i64) -> Result<T, DbError> {
    T::try_from(raw)
        .ok()
        .ok_or_else(|| DbError::decode(table, format!("{field} out of range: {raw}")))
}

const fn side_to_db(side: Side) -> &'static str {
    match side {
        Side::Home => "home",
        Side::Away => "away",
    }
}

fn side_from_db(raw: &str) -> Option<Side> {
    match raw {
        "home" => Some(Side::Home),
        "away" => Some(Side::Away),
        _ => None,
    }
}

// =========================================================================
// Seasons and calendar
// =========================================================================

/// A row from `seasons`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SeasonRow {
    /// Season id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// First date.
    pub start_date: NaiveDate,
    /// Last date.
    pub end_date: NaiveDate,
    /// Current-season flag.
    pub is_current: bool,
    /// Seed stored bit-for-bit.
    pub seed: i64,
}

impl From<SeasonRow> for Season {
    fn from(row: SeasonRow) -> Self {
        Self {
            id: row.id.into(),
            name: row.name,
            start_date: row.start_date,
            end_date: row.end_date,
            is_current: row.is_current,
            seed: seed_from_db(row.seed),
        }
    }
}

/// A row from `calendar_days`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CalendarDayRow {
    /// Day id.
    pub id: Uuid,
    /// Season id.
    pub season_id: Uuid,
    /// Date.
    pub date: NaiveDate,
    /// `LEAGUE_DAY`, `CUP_DAY` or `FREE_DAY`.
    pub day_type: String,
    /// Number within the day type's sequence.
    pub match_day_number: Option<i32>,
    /// Simulated flag.
    pub is_simulated: bool,
}

impl TryFrom<CalendarDayRow> for CalendarDay {
    type Error = DbError;

    fn try_from(row: CalendarDayRow) -> Result<Self, Self::Error> {
        const TABLE: &str = "calendar_days";
        let day_type = DayType::parse(&row.day_type)
            .ok_or_else(|| DbError::decode(TABLE, format!("unknown day type {}", row.day_type)))?;
        let number = row
            .match_day_number
            .map(|n| unsigned::<u32>(TABLE, "match_day_number", i64::from(n)))
            .transpose()?;
        let match_day = MatchDay::from_parts(day_type, number).ok_or_else(|| {
            DbError::decode(TABLE, format!("{day_type} cannot carry number {number:?}"))
        })?;
        Ok(Self {
            id: row.id.into(),
            season_id: row.season_id.into(),
            date: row.date,
            match_day,
            is_simulated: row.is_simulated,
        })
    }
}

/// Database columns of a match day: `(day_type, match_day_number)`.
pub fn match_day_to_db(match_day: MatchDay) -> (&'static str, Option<i32>) {
    (match_day.day_type().as_str(), match_day.number().map(int))
}

// =========================================================================
// Competitions
// =========================================================================

/// A row from `leagues`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LeagueRow {
    /// League id.
    pub id: Uuid,
    /// Season id.
    pub season_id: Uuid,
    /// Name.
    pub name: String,
    /// Tier.
    pub tier: i16,
    /// Youngest admitted age.
    pub min_age: Option<i16>,
    /// Oldest admitted age.
    pub max_age: Option<i16>,
}

impl TryFrom<LeagueRow> for League {
    type Error = DbError;

    fn try_from(row: LeagueRow) -> Result<Self, Self::Error> {
        const TABLE: &str = "leagues";
        let age = |field: &str, raw: Option<i16>| {
            raw.map(|v| unsigned::<u8>(TABLE, field, i64::from(v)))
                .transpose()
        };
        let min_age = age("min_age", row.min_age)?;
        let max_age = age("max_age", row.max_age)?;
        let age_class = (min_age.is_some() || max_age.is_some()).then_some(AgeClass { min_age, max_age });
        Ok(Self {
            id: row.id.into(),
            season_id: row.season_id.into(),
            name: row.name,
            tier: unsigned(TABLE, "tier", i64::from(row.tier))?,
            age_class,
        })
    }
}

/// A row from `cups`, with participants aggregated in draw order.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CupRow {
    /// Cup id.
    pub id: Uuid,
    /// Season id.
    pub season_id: Uuid,
    /// Name.
    pub name: String,
    /// Round being played.
    pub current_round_number: i32,
    /// Rounds in the bracket.
    pub total_rounds: i32,
    /// Whether the cup is running.
    pub is_active: bool,
    /// Winner once finished.
    pub winner_team_id: Option<Uuid>,
    /// Participants in entry order.
    pub participants: Vec<Uuid>,
}

impl TryFrom<CupRow> for Cup {
    type Error = DbError;

    fn try_from(row: CupRow) -> Result<Self, Self::Error> {
        const TABLE: &str = "cups";
        Ok(Self {
            id: row.id.into(),
            season_id: row.season_id.into(),
            name: row.name,
            participants: row.participants.into_iter().map(Into::into).collect(),
            current_round_number: unsigned(
                TABLE,
                "current_round_number",
                i64::from(row.current_round_number),
            )?,
            total_rounds: unsigned(TABLE, "total_rounds", i64::from(row.total_rounds))?,
            is_active: row.is_active,
            winner: row.winner_team_id.map(Into::into),
        })
    }
}

// =========================================================================
// Clubs, teams, players
// =========================================================================

/// A row from `clubs`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClubRow {
    /// Club id.
    pub id: Uuid,
    /// Name.
    pub name: String,
}

impl From<ClubRow> for Club {
    fn from(row: ClubRow) -> Self {
        Self {
            id: row.id.into(),
            name: row.name,
        }
    }
}

/// A row from `teams`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TeamRow {
    /// Team id.
    pub id: Uuid,
    /// Club id.
    pub club_id: Uuid,
    /// League, if any.
    pub league_id: Option<Uuid>,
    /// Name.
    pub name: String,
    /// Position within the club.
    pub squad_rank: i16,
    /// Seeding rating.
    pub rating: i32,
}

impl TryFrom<TeamRow> for Team {
    type Error = DbError;

    fn try_from(row: TeamRow) -> Result<Self, Self::Error> {
        const TABLE: &str = "teams";
        Ok(Self {
            id: row.id.into(),
            club_id: row.club_id.into(),
            league_id: row.league_id.map(Into::into),
            name: row.name,
            squad_rank: unsigned(TABLE, "squad_rank", i64::from(row.squad_rank))?,
            rating: unsigned(TABLE, "rating", i64::from(row.rating))?,
        })
    }
}

/// A row from `players`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlayerRow {
    /// Player id.
    pub id: Uuid,
    /// Club id.
    pub club_id: Uuid,
    /// Name.
    pub name: String,
    /// Age in years.
    pub age: i16,
    /// Strength.
    pub strength: i16,
    /// Consistency.
    pub consistency: i16,
    /// Pressure resistance.
    pub pressure_resistance: i16,
    /// Full-rack technique.
    pub technique_full_pins: i16,
    /// Clearing technique.
    pub technique_clearing: i16,
    /// Persistent availability.
    pub is_available: bool,
    /// Registered reserve.
    pub is_reserve: bool,
}

impl TryFrom<PlayerRow> for Player {
    type Error = DbError;

    fn try_from(row: PlayerRow) -> Result<Self, Self::Error> {
        const TABLE: &str = "players";
        let small = |field: &str, raw: i16| unsigned::<u8>(TABLE, field, i64::from(raw));
        Ok(Self {
            id: row.id.into(),
            club_id: row.club_id.into(),
            name: row.name,
            age: small("age", row.age)?,
            skills: SkillProfile {
                strength: small("strength", row.strength)?,
                consistency: small("consistency", row.consistency)?,
                pressure_resistance: small("pressure_resistance", row.pressure_resistance)?,
                technique: Technique {
                    full_pins: small("technique_full_pins", row.technique_full_pins)?,
                    clearing: small("technique_clearing", row.technique_clearing)?,
                },
            },
            is_available: row.is_available,
            is_reserve: row.is_reserve,
        })
    }
}

/// A row from `player_availability`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AvailabilityRow {
    /// Player id.
    pub player_id: Uuid,
    /// `league` or `cup`.
    pub competition: String,
    /// Free for the current match day of the kind.
    pub is_available_current_matchday: bool,
    /// Competed on the current match day of the kind.
    pub has_played_current_matchday: bool,
    /// Last match day of the kind the player competed on.
    pub last_played_matchday: Option<i32>,
}

impl TryFrom<AvailabilityRow> for PlayerAvailability {
    type Error = DbError;

    fn try_from(row: AvailabilityRow) -> Result<Self, Self::Error> {
        const TABLE: &str = "player_availability";
        Ok(Self {
            player_id: row.player_id.into(),
            competition: competition_from_db(TABLE, &row.competition)?,
            is_available_current_matchday: row.is_available_current_matchday,
            has_played_current_matchday: row.has_played_current_matchday,
            last_played_matchday: row
                .last_played_matchday
                .map(|n| unsigned(TABLE, "last_played_matchday", i64::from(n)))
                .transpose()?,
        })
    }
}

fn competition_from_db(table: &'static str, raw: &str) -> Result<CompetitionKind, DbError> {
    CompetitionKind::parse(raw)
        .ok_or_else(|| DbError::decode(table, format!("unknown competition {raw}")))
}

// =========================================================================
// Fixtures and results
// =========================================================================

/// A row from `fixtures`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FixtureRow {
    /// Fixture id.
    pub id: Uuid,
    /// Season id.
    pub season_id: Uuid,
    /// League, for league fixtures.
    pub league_id: Option<Uuid>,
    /// Cup, for cup fixtures.
    pub cup_id: Option<Uuid>,
    /// Round.
    pub round: i32,
    /// Match-day number within the kind.
    pub match_day_number: i32,
    /// Bracket position.
    pub bracket_slot: i32,
    /// Home team.
    pub home_team_id: Uuid,
    /// Away team, `None` for a bye.
    pub away_team_id: Option<Uuid>,
    /// Informational date.
    pub scheduled_date: Option<NaiveDate>,
    /// Played flag.
    pub is_played: bool,
    /// Home pins.
    pub home_pins: Option<i32>,
    /// Away pins.
    pub away_pins: Option<i32>,
    /// Home match points.
    pub home_points: Option<Decimal>,
    /// Away match points.
    pub away_points: Option<Decimal>,
    /// `home`, `away`, or `None` for a draw.
    pub winner: Option<String>,
    /// `simulation`, `bye` or `walkover`.
    pub decided_by: Option<String>,
    /// Simulation seed.
    pub seed: Option<i64>,
}

impl TryFrom<FixtureRow> for Fixture {
    type Error = DbError;

    fn try_from(row: FixtureRow) -> Result<Self, Self::Error> {
        const TABLE: &str = "fixtures";
        let competition = match (row.league_id, row.cup_id) {
            (Some(league), None) => CompetitionRef::League(league.into()),
            (None, Some(cup)) => CompetitionRef::Cup(cup.into()),
            _ => {
                return Err(DbError::decode(
                    TABLE,
                    format!("fixture {} needs exactly one competition", row.id),
                ));
            }
        };

        let result = match row.decided_by.as_deref() {
            None => None,
            Some(raw) => {
                let decided_by = DecidedBy::parse(raw)
                    .ok_or_else(|| DbError::decode(TABLE, format!("unknown decided_by {raw}")))?;
                let winner = row
                    .winner
                    .as_deref()
                    .map(|w| {
                        side_from_db(w)
                            .ok_or_else(|| DbError::decode(TABLE, format!("unknown winner {w}")))
                    })
                    .transpose()?;
                Some(FixtureResult {
                    home_pins: unsigned(TABLE, "home_pins", i64::from(row.home_pins.unwrap_or(0)))?,
                    away_pins: unsigned(TABLE, "away_pins", i64::from(row.away_pins.unwrap_or(0)))?,
                    home_points: row.home_points.unwrap_or(Decimal::ZERO),
                    away_points: row.away_points.unwrap_or(Decimal::ZERO),
                    winner,
                    decided_by,
                    seed: row.seed.map_or(0, seed_from_db),
                })
            }
        };

        Ok(Self {
            id: row.id.into(),
            season_id: row.season_id.into(),
            competition,
            round: unsigned(TABLE, "round", i64::from(row.round))?,
            match_day_number: unsigned(TABLE, "match_day_number", i64::from(row.match_day_number))?,
            bracket_slot: unsigned(TABLE, "bracket_slot", i64::from(row.bracket_slot))?,
            home_team_id: row.home_team_id.into(),
            away_team_id: row.away_team_id.map(Into::into),
            scheduled_date: row.scheduled_date,
            is_played: row.is_played,
            result,
        })
    }
}

/// Result columns of a fixture, ready to bind.
#[derive(Debug, Clone)]
pub struct ResultColumns {
    /// Home pins.
    pub home_pins: i32,
    /// Away pins.
    pub away_pins: i32,
    /// Home match points.
    pub home_points: Decimal,
    /// Away match points.
    pub away_points: Decimal,
    /// Winner, `None` for a draw.
    pub winner: Option<&'static str>,
    /// How the result came about.
    pub decided_by: &'static str,
    /// Seed stored bit-for-bit.
    pub seed: i64,
}

impl From<&FixtureResult> for ResultColumns {
    fn from(result: &FixtureResult) -> Self {
        Self {
            home_pins: int(result.home_pins),
            away_pins: int(result.away_pins),
            home_points: result.home_points,
            away_points: result.away_points,
            winner: result.winner.map(side_to_db),
            decided_by: result.decided_by.as_str(),
            seed: seed_to_db(result.seed),
        }
    }
}

/// A row from `lineup_overrides`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OverrideRow {
    /// Fixture id.
    pub fixture_id: Uuid,
    /// Team id.
    pub team_id: Uuid,
    /// Slot (1-based).
    pub slot: i16,
    /// Player id.
    pub player_id: Uuid,
}

/// A row from `performance_records`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PerformanceRow {
    /// Fixture id.
    pub fixture_id: Uuid,
    /// Player id.
    pub player_id: Uuid,
    /// Team id.
    pub team_id: Uuid,
    /// `league` or `cup`.
    pub competition: String,
    /// Match-day number within the kind.
    pub match_day_number: i32,
    /// Calendar date played.
    pub date: Option<NaiveDate>,
    /// Roster slot.
    pub slot: i16,
    /// Lane scores as JSON.
    pub lanes: serde_json::Value,
    /// Total pins.
    pub total_pins: i32,
    /// Misses.
    pub misses: i32,
    /// Player points.
    pub points: Decimal,
    /// Stand-in flag.
    pub is_stand_in: bool,
}

impl TryFrom<PerformanceRow> for PerformanceRecord {
    type Error = DbError;

    fn try_from(row: PerformanceRow) -> Result<Self, Self::Error> {
        const TABLE: &str = "performance_records";
        let lanes: Vec<LaneScore> = serde_json::from_value(row.lanes)?;
        Ok(Self {
            fixture_id: row.fixture_id.into(),
            player_id: row.player_id.into(),
            team_id: row.team_id.into(),
            competition: competition_from_db(TABLE, &row.competition)?,
            match_day_number: unsigned(TABLE, "match_day_number", i64::from(row.match_day_number))?,
            date: row.date,
            slot: unsigned(TABLE, "slot", i64::from(row.slot))?,
            lanes,
            total_pins: unsigned(TABLE, "total_pins", i64::from(row.total_pins))?,
            misses: unsigned(TABLE, "misses", i64::from(row.misses))?,
            points: row.points,
            is_stand_in: row.is_stand_in,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn day_row(day_type: &str, number: Option<i32>) -> CalendarDayRow {
        CalendarDayRow {
            id: Uuid::now_v7(),
            season_id: Uuid::now_v7(),
            date: NaiveDate::from_ymd_opt(2026, 9, 5).unwrap(),
            day_type: day_type.to_owned(),
            match_day_number: number,
            is_simulated: false,
        }
    }

    #[test]
    fn seeds_keep_every_bit() {
        for seed in [0, 1, u64::MAX, 1 << 63, 0xDEAD_BEEF_CAFE_F00D] {
            assert_eq!(seed_from_db(seed_to_db(seed)), seed);
        }
    }

    #[test]
    fn calendar_rows_decode_into_match_days() {
        let day = CalendarDay::try_from(day_row("CUP_DAY", Some(2))).unwrap();
        assert_eq!(day.match_day, MatchDay::Cup(2));
        let free = CalendarDay::try_from(day_row("FREE_DAY", None)).unwrap();
        assert_eq!(free.match_day, MatchDay::Free);
        assert_eq!(match_day_to_db(MatchDay::League(3)), ("LEAGUE_DAY", Some(3)));
    }

    #[test]
    fn inconsistent_calendar_rows_are_rejected() {
        assert!(CalendarDay::try_from(day_row("LEAGUE_DAY", None)).is_err());
        assert!(CalendarDay::try_from(day_row("FREE_DAY", Some(1))).is_err());
        assert!(CalendarDay::try_from(day_row("LEAGUE_DAY", Some(-1))).is_err());
        assert!(CalendarDay::try_from(day_row("HOLIDAY", None)).is_err());
    }

    #[test]
    fn fixture_needs_one_competition() {
        let row = FixtureRow {
            id: Uuid::now_v7(),
            season_id: Uuid::now_v7(),
            league_id: Some(Uuid::now_v7()),
            cup_id: Some(Uuid::now_v7()),
            round: 1,
            match_day_number: 1,
            bracket_slot: 0,
            home_team_id: Uuid::now_v7(),
            away_team_id: None,
            scheduled_date: None,
            is_played: false,
            home_pins: None,
            away_pins: None,
            home_points: None,
            away_points: None,
            winner: None,
            decided_by: None,
            seed: None,
        };
        assert!(Fixture::try_from(row.clone()).is_err());
        let league_only = FixtureRow { cup_id: None, ..row };
        let fixture = Fixture::try_from(league_only).unwrap();
        assert!(fixture.result.is_none());
        assert!(fixture.is_bye());
    }

    #[test]
    fn result_columns_carry_winner_and_kind() {
        let result = FixtureResult {
            home_pins: 3120,
            away_pins: 3050,
            home_points: Decimal::TWO,
            away_points: Decimal::ZERO,
            winner: Some(Side::Home),
            decided_by: DecidedBy::Simulation,
            seed: u64::MAX,
        };
        let columns = ResultColumns::from(&result);
        assert_eq!(columns.winner, Some("home"));
        assert_eq!(columns.decided_by, "simulation");
        assert_eq!(seed_from_db(columns.seed), u64::MAX);
    }
}
