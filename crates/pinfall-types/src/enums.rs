//! Enumeration types for the league model.
//!
//! The central type here is [`MatchDay`], the closed tagged variant carried
//! everywhere a "day type" is passed. League and cup match-day numbers are
//! independent sequences, so a bare number is never enough to identify a
//! match day: it is always paired with its competition kind.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{CupId, LeagueId};

// ---------------------------------------------------------------------------
// Calendar day types
// ---------------------------------------------------------------------------

/// Storage tag for a calendar day.
///
/// Persisted alongside an optional match-day number. In memory the pair is
/// always lifted into a [`MatchDay`] via [`MatchDay::from_parts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayType {
    /// A day on which league fixtures are played.
    LeagueDay,
    /// A day on which cup fixtures are played.
    CupDay,
    /// A rest day with no fixtures.
    FreeDay,
}

impl DayType {
    /// Return the database / wire representation of this day type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LeagueDay => "LEAGUE_DAY",
            Self::CupDay => "CUP_DAY",
            Self::FreeDay => "FREE_DAY",
        }
    }

    /// Parse the database / wire representation of a day type.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "LEAGUE_DAY" => Some(Self::LeagueDay),
            "CUP_DAY" => Some(Self::CupDay),
            "FREE_DAY" => Some(Self::FreeDay),
            _ => None,
        }
    }
}

impl core::fmt::Display for DayType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A labeled calendar day: the competition it belongs to and its number
/// within that competition's own match-day sequence.
///
/// Numbers start at 1. `League(3)` and `Cup(3)` are unrelated days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum MatchDay {
    /// League match day `n`.
    League(u32),
    /// Cup match day `n`.
    Cup(u32),
    /// A free day.
    Free,
}

impl MatchDay {
    /// Build a match day from its stored parts.
    ///
    /// Returns `None` for inconsistent pairs: a numbered free day, a
    /// competition day without a number, or number 0.
    pub const fn from_parts(day_type: DayType, number: Option<u32>) -> Option<Self> {
        match (day_type, number) {
            (DayType::LeagueDay, Some(n)) if n > 0 => Some(Self::League(n)),
            (DayType::CupDay, Some(n)) if n > 0 => Some(Self::Cup(n)),
            (DayType::FreeDay, None) => Some(Self::Free),
            _ => None,
        }
    }

    /// Build a competition match day of the given kind.
    pub const fn for_competition(kind: CompetitionKind, number: u32) -> Self {
        match kind {
            CompetitionKind::League => Self::League(number),
            CompetitionKind::Cup => Self::Cup(number),
        }
    }

    /// Return the storage tag of this day.
    pub const fn day_type(self) -> DayType {
        match self {
            Self::League(_) => DayType::LeagueDay,
            Self::Cup(_) => DayType::CupDay,
            Self::Free => DayType::FreeDay,
        }
    }

    /// Return the match-day number within this day's own sequence.
    pub const fn number(self) -> Option<u32> {
        match self {
            Self::League(n) | Self::Cup(n) => Some(n),
            Self::Free => None,
        }
    }

    /// Return the competition kind played on this day, if any.
    pub const fn competition(self) -> Option<CompetitionKind> {
        match self {
            Self::League(_) => Some(CompetitionKind::League),
            Self::Cup(_) => Some(CompetitionKind::Cup),
            Self::Free => None,
        }
    }
}

impl core::fmt::Display for MatchDay {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::League(n) => write!(f, "league day {n}"),
            Self::Cup(n) => write!(f, "cup day {n}"),
            Self::Free => f.write_str("free day"),
        }
    }
}

// ---------------------------------------------------------------------------
// Competitions
// ---------------------------------------------------------------------------

/// The two competition kinds a club can play in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum CompetitionKind {
    /// Round-robin league play.
    League,
    /// Single-elimination cup play.
    Cup,
}

impl CompetitionKind {
    /// Return the database representation of this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::League => "league",
            Self::Cup => "cup",
        }
    }

    /// Parse the database representation of a competition kind.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "league" => Some(Self::League),
            "cup" => Some(Self::Cup),
            _ => None,
        }
    }
}

/// Reference to the competition a fixture belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum CompetitionRef {
    /// A league fixture.
    League(LeagueId),
    /// A cup fixture.
    Cup(CupId),
}

impl CompetitionRef {
    /// Return the kind of the referenced competition.
    pub const fn kind(self) -> CompetitionKind {
        match self {
            Self::League(_) => CompetitionKind::League,
            Self::Cup(_) => CompetitionKind::Cup,
        }
    }
}

// ---------------------------------------------------------------------------
// Fixtures and results
// ---------------------------------------------------------------------------

/// One side of a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Side {
    /// The home team.
    Home,
    /// The away team.
    Away,
}

impl Side {
    /// Return the opposite side.
    pub const fn opponent(self) -> Self {
        match self {
            Self::Home => Self::Away,
            Self::Away => Self::Home,
        }
    }
}

/// How a fixture result came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum DecidedBy {
    /// Both rosters were simulated.
    Simulation,
    /// The fixture had no opponent; the home side advanced.
    Bye,
    /// One side could not field a roster; the other side was awarded the tie.
    Walkover,
}

impl DecidedBy {
    /// Return the database representation of this value.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Simulation => "simulation",
            Self::Bye => "bye",
            Self::Walkover => "walkover",
        }
    }

    /// Parse the database representation.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "simulation" => Some(Self::Simulation),
            "bye" => Some(Self::Bye),
            "walkover" => Some(Self::Walkover),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// Availability of a player for one match day of one competition kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum AvailabilityState {
    /// The player may be rostered today.
    Available,
    /// The player cannot be rostered (injured, absent, wrong age class).
    Unavailable,
    /// The player already competed on this match day.
    Played,
}

// ---------------------------------------------------------------------------
// League tables
// ---------------------------------------------------------------------------

/// Table zone of a league position at season end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum TableZone {
    /// Promoted to the tier above.
    Promotion,
    /// Stays in the league.
    Safe,
    /// Relegated to the tier below.
    Relegation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_day_from_parts_rejects_inconsistent_pairs() {
        assert_eq!(
            MatchDay::from_parts(DayType::LeagueDay, Some(5)),
            Some(MatchDay::League(5))
        );
        assert_eq!(
            MatchDay::from_parts(DayType::CupDay, Some(1)),
            Some(MatchDay::Cup(1))
        );
        assert_eq!(MatchDay::from_parts(DayType::FreeDay, None), Some(MatchDay::Free));
        assert_eq!(MatchDay::from_parts(DayType::FreeDay, Some(2)), None);
        assert_eq!(MatchDay::from_parts(DayType::LeagueDay, None), None);
        assert_eq!(MatchDay::from_parts(DayType::CupDay, Some(0)), None);
    }

    #[test]
    fn league_and_cup_days_with_same_number_differ() {
        let league = MatchDay::League(3);
        let cup = MatchDay::Cup(3);
        assert_ne!(league, cup);
        assert_eq!(league.number(), cup.number());
        assert_ne!(league.competition(), cup.competition());
    }

    #[test]
    fn day_type_string_roundtrip() {
        for day_type in [DayType::LeagueDay, DayType::CupDay, DayType::FreeDay] {
            assert_eq!(DayType::parse(day_type.as_str()), Some(day_type));
        }
        assert_eq!(DayType::parse("league_day"), None);
    }

    #[test]
    fn side_opponent_flips() {
        assert_eq!(Side::Home.opponent(), Side::Away);
        assert_eq!(Side::Away.opponent(), Side::Home);
    }
}
