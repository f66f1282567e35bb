//! Shared type definitions for the Pinfall league scheduling engine.
//!
//! This crate is the single source of truth for the league data model used
//! across the workspace. Types flow downstream to `TypeScript` via `ts-rs`
//! for the (external) web layer.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all record identifiers
//! - [`enums`] -- Day labels, competition kinds, sides, availability states
//! - [`structs`] -- Seasons, calendar days, competitions, clubs, teams,
//!   players, fixtures, lineups, and performance records

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    AvailabilityState, CompetitionKind, CompetitionRef, DayType, DecidedBy, MatchDay, Side,
    TableZone,
};
pub use ids::{CalendarDayId, ClubId, CupId, FixtureId, LeagueId, PlayerId, SeasonId, TeamId};
pub use structs::{
    AgeClass, CalendarDay, Club, Cup, Fixture, FixtureResult, LaneScore, League, LineupOverride,
    PerformanceRecord, Player, PlayerAvailability, Season, SkillProfile, Team, Technique,
};

#[cfg(test)]
mod tests {
    //! Integration tests for type exports and `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs generates TypeScript bindings when types with
        // #[ts(export)] are used. The files are written to the `bindings/`
        // directory relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::SeasonId::export_all();
        let _ = crate::ids::LeagueId::export_all();
        let _ = crate::ids::CupId::export_all();
        let _ = crate::ids::ClubId::export_all();
        let _ = crate::ids::TeamId::export_all();
        let _ = crate::ids::PlayerId::export_all();
        let _ = crate::ids::FixtureId::export_all();
        let _ = crate::ids::CalendarDayId::export_all();

        // Enums
        let _ = crate::enums::DayType::export_all();
        let _ = crate::enums::MatchDay::export_all();
        let _ = crate::enums::CompetitionKind::export_all();
        let _ = crate::enums::CompetitionRef::export_all();
        let _ = crate::enums::Side::export_all();
        let _ = crate::enums::DecidedBy::export_all();
        let _ = crate::enums::AvailabilityState::export_all();
        let _ = crate::enums::TableZone::export_all();

        // Structs
        let _ = crate::structs::Season::export_all();
        let _ = crate::structs::CalendarDay::export_all();
        let _ = crate::structs::AgeClass::export_all();
        let _ = crate::structs::League::export_all();
        let _ = crate::structs::Cup::export_all();
        let _ = crate::structs::Club::export_all();
        let _ = crate::structs::Team::export_all();
        let _ = crate::structs::Technique::export_all();
        let _ = crate::structs::SkillProfile::export_all();
        let _ = crate::structs::Player::export_all();
        let _ = crate::structs::PlayerAvailability::export_all();
        let _ = crate::structs::FixtureResult::export_all();
        let _ = crate::structs::Fixture::export_all();
        let _ = crate::structs::LineupOverride::export_all();
        let _ = crate::structs::LaneScore::export_all();
        let _ = crate::structs::PerformanceRecord::export_all();
    }
}
