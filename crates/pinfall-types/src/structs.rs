//! Core record structs of the league model.
//!
//! Covers seasons, the calendar, competitions, clubs, teams, players and
//! their per-competition availability records, fixtures, lineups, and
//! performance records.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{CompetitionKind, CompetitionRef, DayType, DecidedBy, MatchDay, Side};
use crate::ids::{CalendarDayId, ClubId, CupId, FixtureId, LeagueId, PlayerId, SeasonId, TeamId};

// ---------------------------------------------------------------------------
// Season and calendar
// ---------------------------------------------------------------------------

/// A season: the container for one year's leagues, cups, and calendar.
///
/// Exactly one season is flagged `is_current` at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Season {
    /// Unique identifier.
    pub id: SeasonId,
    /// Display name, e.g. "2025/26".
    pub name: String,
    /// First date on which a match day may be placed.
    pub start_date: NaiveDate,
    /// Last date on which a match day may be placed.
    pub end_date: NaiveDate,
    /// Whether this is the season currently being played.
    pub is_current: bool,
    /// Base seed from which every fixture seed of the season is derived.
    pub seed: u64,
}

/// One labeled date of a season's calendar.
///
/// At most one row exists per `(season, date)`. The label is fixed at
/// calendar-build time; only `is_simulated` ever changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CalendarDay {
    /// Unique identifier.
    pub id: CalendarDayId,
    /// Owning season.
    pub season_id: SeasonId,
    /// Calendar date.
    pub date: NaiveDate,
    /// Day label with its type-scoped match-day number.
    pub match_day: MatchDay,
    /// Whether the orchestrator has already played this day.
    pub is_simulated: bool,
}

impl CalendarDay {
    /// Return the storage tag of this day.
    pub const fn day_type(&self) -> DayType {
        self.match_day.day_type()
    }

    /// Return the type-scoped match-day number (`None` on free days).
    pub const fn match_day_number(&self) -> Option<u32> {
        self.match_day.number()
    }
}

// ---------------------------------------------------------------------------
// Competitions
// ---------------------------------------------------------------------------

/// Age-category constraint on the players a league may field (Altersklasse).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgeClass {
    /// Minimum age (inclusive), if bounded below.
    pub min_age: Option<u8>,
    /// Maximum age (inclusive), if bounded above.
    pub max_age: Option<u8>,
}

impl AgeClass {
    /// Whether a player of the given age may play in this class.
    pub fn admits(&self, age: u8) -> bool {
        self.min_age.is_none_or(|min| age >= min) && self.max_age.is_none_or(|max| age <= max)
    }
}

/// A round-robin league scoped to a season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct League {
    /// Unique identifier.
    pub id: LeagueId,
    /// Owning season.
    pub season_id: SeasonId,
    /// Display name.
    pub name: String,
    /// League tier (1 = top flight).
    pub tier: u8,
    /// Optional age restriction on fielded players.
    pub age_class: Option<AgeClass>,
}

/// A single-elimination cup scoped to a season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Cup {
    /// Unique identifier.
    pub id: CupId,
    /// Owning season.
    pub season_id: SeasonId,
    /// Display name.
    pub name: String,
    /// Teams entered into the cup.
    pub participants: Vec<TeamId>,
    /// Round currently being played (1-based; 0 before the draw).
    pub current_round_number: u32,
    /// Number of rounds, `ceil(log2(participants))`.
    pub total_rounds: u32,
    /// Whether the cup still has rounds to play.
    pub is_active: bool,
    /// The cup winner once the final has been played.
    pub winner: Option<TeamId>,
}

// ---------------------------------------------------------------------------
// Clubs, teams, players
// ---------------------------------------------------------------------------

/// A club owning teams and players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Club {
    /// Unique identifier.
    pub id: ClubId,
    /// Display name.
    pub name: String,
}

/// A team fielded by a club.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Team {
    /// Unique identifier.
    pub id: TeamId,
    /// Owning club.
    pub club_id: ClubId,
    /// League the team plays in (`None` for cup-only or youth structures).
    pub league_id: Option<LeagueId>,
    /// Display name.
    pub name: String,
    /// Position within the club (1 = first team). Lower ranks draw players first.
    pub squad_rank: u8,
    /// Strength rating used for cup seeding.
    pub rating: u16,
}

/// Technique components of a player's skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Technique {
    /// Accuracy on full-rack throws (0..=100).
    pub full_pins: u8,
    /// Accuracy on clearing throws (0..=100).
    pub clearing: u8,
}

/// Skill attributes driving match simulation, all on a 0..=100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SkillProfile {
    /// Overall strength; also the ranking key for roster selection.
    pub strength: u8,
    /// Consistency; narrows the variance band.
    pub consistency: u8,
    /// Resistance to away/cup pressure.
    pub pressure_resistance: u8,
    /// Technique components.
    pub technique: Technique,
}

/// A player registered with a club.
///
/// Players belong to clubs, not teams: the team a player plays for is
/// decided per match day by roster assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Player {
    /// Unique identifier.
    pub id: PlayerId,
    /// Owning club.
    pub club_id: ClubId,
    /// Display name.
    pub name: String,
    /// Age in years.
    pub age: u8,
    /// Skill attributes.
    pub skills: SkillProfile,
    /// Persistent availability (false while injured or absent).
    pub is_available: bool,
    /// Registered stand-in, drawn only when the regular pool runs out.
    pub is_reserve: bool,
}

/// Per-player, per-competition-kind match-day flags.
///
/// League and cup records are separate so that the two independent
/// match-day sequences can never reset each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PlayerAvailability {
    /// The player.
    pub player_id: PlayerId,
    /// Competition kind whose match-day sequence this record tracks.
    pub competition: CompetitionKind,
    /// Whether the player may be rostered on the current match day.
    pub is_available_current_matchday: bool,
    /// Whether the player has competed on the current match day.
    pub has_played_current_matchday: bool,
    /// Match-day number (of this kind) on which the player last competed.
    pub last_played_matchday: Option<u32>,
}

impl PlayerAvailability {
    /// A fresh record for a player who has not yet competed in this kind.
    pub const fn fresh(player_id: PlayerId, competition: CompetitionKind) -> Self {
        Self {
            player_id,
            competition,
            is_available_current_matchday: true,
            has_played_current_matchday: false,
            last_played_matchday: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Fixtures, lineups, performances
// ---------------------------------------------------------------------------

/// Final result of a fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FixtureResult {
    /// Total pins of the home team.
    pub home_pins: u32,
    /// Total pins of the away team.
    pub away_pins: u32,
    /// Match points of the home team.
    #[ts(as = "String")]
    pub home_points: Decimal,
    /// Match points of the away team.
    #[ts(as = "String")]
    pub away_points: Decimal,
    /// Winning side (`None` for a league draw).
    pub winner: Option<Side>,
    /// How the result came about.
    pub decided_by: DecidedBy,
    /// Seed the simulation ran with (0 for byes and walkovers).
    pub seed: u64,
}

/// A league match or cup tie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Fixture {
    /// Unique identifier.
    pub id: FixtureId,
    /// Owning season.
    pub season_id: SeasonId,
    /// League or cup the fixture belongs to.
    pub competition: CompetitionRef,
    /// Round-robin round or cup round (1-based).
    pub round: u32,
    /// Match-day number within the competition kind's sequence.
    pub match_day_number: u32,
    /// Position within the round; cup winners are paired by adjacent slots.
    pub bracket_slot: u32,
    /// Home team.
    pub home_team_id: TeamId,
    /// Away team (`None` = bye).
    pub away_team_id: Option<TeamId>,
    /// Date stamped from the calendar (informational).
    pub scheduled_date: Option<NaiveDate>,
    /// Whether the fixture has a result.
    pub is_played: bool,
    /// The result once played.
    pub result: Option<FixtureResult>,
}

impl Fixture {
    /// Whether this fixture is a bye.
    pub const fn is_bye(&self) -> bool {
        self.away_team_id.is_none()
    }

    /// The match day this fixture is due on.
    pub const fn match_day(&self) -> MatchDay {
        MatchDay::for_competition(self.competition.kind(), self.match_day_number)
    }

    /// Return the team on the given side.
    pub const fn team(&self, side: Side) -> Option<TeamId> {
        match side {
            Side::Home => Some(self.home_team_id),
            Side::Away => self.away_team_id,
        }
    }

    /// Return the winning team, if the fixture is played and decided.
    pub fn winning_team(&self) -> Option<TeamId> {
        let side = self.result.as_ref()?.winner?;
        self.team(side)
    }
}

/// A manually pre-set lineup for one team in one fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LineupOverride {
    /// The fixture.
    pub fixture_id: FixtureId,
    /// The team the lineup is for.
    pub team_id: TeamId,
    /// Players in slot order.
    pub player_ids: Vec<PlayerId>,
}

/// Pins on one lane (one set) of a player's game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LaneScore {
    /// Lane number (1-based).
    pub lane: u8,
    /// Pins scored on full-rack throws.
    pub full: u16,
    /// Pins scored on clearing throws.
    pub clearance: u16,
    /// Throws that hit no pin.
    pub misses: u8,
}

impl LaneScore {
    /// Total pins on this lane.
    pub const fn total(&self) -> u16 {
        self.full.saturating_add(self.clearance)
    }
}

/// One player's performance in one fixture. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PerformanceRecord {
    /// The fixture.
    pub fixture_id: FixtureId,
    /// The player.
    pub player_id: PlayerId,
    /// The team the player was rostered for.
    pub team_id: TeamId,
    /// Competition kind of the fixture.
    pub competition: CompetitionKind,
    /// Match-day number within that kind's sequence.
    pub match_day_number: u32,
    /// Date of play.
    pub date: Option<NaiveDate>,
    /// Roster slot (1-based).
    pub slot: u8,
    /// Per-lane scores.
    pub lanes: Vec<LaneScore>,
    /// Total pins over all lanes.
    pub total_pins: u32,
    /// Total missed throws over all lanes.
    pub misses: u32,
    /// Points earned under the competition's scoring rule.
    #[ts(as = "String")]
    pub points: Decimal,
    /// Whether the player was drafted in as a stand-in.
    pub is_stand_in: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_class_bounds_are_inclusive() {
        let youth = AgeClass {
            min_age: None,
            max_age: Some(18),
        };
        assert!(youth.admits(18));
        assert!(!youth.admits(19));

        let seniors = AgeClass {
            min_age: Some(50),
            max_age: None,
        };
        assert!(seniors.admits(50));
        assert!(!seniors.admits(49));
    }

    #[test]
    fn bye_fixture_has_no_away_team() {
        let fixture = Fixture {
            id: FixtureId::new(),
            season_id: SeasonId::new(),
            competition: CompetitionRef::Cup(CupId::new()),
            round: 1,
            match_day_number: 1,
            bracket_slot: 0,
            home_team_id: TeamId::new(),
            away_team_id: None,
            scheduled_date: None,
            is_played: false,
            result: None,
        };
        assert!(fixture.is_bye());
        assert_eq!(fixture.match_day(), MatchDay::Cup(1));
        assert_eq!(fixture.team(Side::Away), None);
        assert_eq!(fixture.winning_team(), None);
    }

    #[test]
    fn lane_total_adds_full_and_clearance() {
        let lane = LaneScore {
            lane: 1,
            full: 95,
            clearance: 48,
            misses: 1,
        };
        assert_eq!(lane.total(), 143);
    }
}
