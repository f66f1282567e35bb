//! Fixture Provider: which fixtures are due on a date.
//!
//! The calendar label for the date is the only source of truth. A fixture is
//! due on `League(n)` when it belongs to a league and carries match-day
//! number `n`; it is due on `Cup(n)` when it belongs to an active cup and
//! carries cup match-day number `n`. The fixture's stored `scheduled_date` is
//! informational and never consulted, so stale dates cannot pull fixtures
//! onto the wrong day.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use pinfall_types::{CalendarDay, CompetitionRef, Cup, CupId, Fixture, MatchDay, SeasonId};
use tracing::{debug, warn};

/// Errors raised by the fixture provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FixtureError {
    /// The date has no calendar row.
    #[error("no calendar day on {date} for season {season_id}")]
    NoCalendarDay {
        /// The season.
        season_id: SeasonId,
        /// The requested date.
        date: NaiveDate,
    },
}

/// Fixtures due on one calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueFixtures {
    /// The calendar label of the date.
    pub match_day: MatchDay,
    /// Unplayed league fixtures of the day, in bracket order.
    pub league: Vec<Fixture>,
    /// Unplayed cup fixtures of the day (byes included), in bracket order.
    pub cup: Vec<Fixture>,
}

impl DueFixtures {
    /// An empty result for a free day.
    pub const fn free() -> Self {
        Self {
            match_day: MatchDay::Free,
            league: Vec::new(),
            cup: Vec::new(),
        }
    }

    /// Cup byes, which resolve without simulation.
    pub fn byes(&self) -> impl Iterator<Item = &Fixture> {
        self.cup.iter().filter(|f| f.is_bye())
    }

    /// Fixtures with two sides, ready for roster resolution.
    pub fn playable(&self) -> impl Iterator<Item = &Fixture> {
        self.league
            .iter()
            .chain(self.cup.iter())
            .filter(|f| !f.is_bye())
    }

    /// Total number of due fixtures, byes included.
    pub fn len(&self) -> usize {
        self.league.len().saturating_add(self.cup.len())
    }

    /// Whether nothing is due.
    pub fn is_empty(&self) -> bool {
        self.league.is_empty() && self.cup.is_empty()
    }
}

/// Return the fixtures due on `date`.
///
/// Free days return an empty set. Played fixtures are never returned, which
/// makes a retried day safe to recompute.
pub fn fixtures_for_date(
    season_id: SeasonId,
    calendar: &[CalendarDay],
    fixtures: &[Fixture],
    cups: &[Cup],
    date: NaiveDate,
) -> Result<DueFixtures, FixtureError> {
    let day = calendar
        .iter()
        .find(|day| day.date == date)
        .ok_or(FixtureError::NoCalendarDay { season_id, date })?;

    let due = due_on(day.match_day, fixtures, cups);

    let drifted = fixtures
        .iter()
        .filter(|f| !f.is_played && f.scheduled_date == Some(date))
        .filter(|f| f.match_day() != day.match_day)
        .count();
    if drifted > 0 {
        warn!(
            %date,
            match_day = %day.match_day,
            drifted,
            "fixtures carry this date but belong to another match day; calendar label wins"
        );
    }

    debug!(
        %date,
        match_day = %day.match_day,
        league = due.league.len(),
        cup = due.cup.len(),
        "fixtures resolved for date"
    );
    Ok(due)
}

/// Return the fixtures due on a labeled match day.
pub fn due_on(match_day: MatchDay, fixtures: &[Fixture], cups: &[Cup]) -> DueFixtures {
    let (number, want_league) = match match_day {
        MatchDay::Free => return DueFixtures::free(),
        MatchDay::League(n) => (n, true),
        MatchDay::Cup(n) => (n, false),
    };

    let active_cups: BTreeSet<CupId> = cups
        .iter()
        .filter(|cup| cup.is_active)
        .map(|cup| cup.id)
        .collect();

    let mut due: Vec<Fixture> = fixtures
        .iter()
        .filter(|f| !f.is_played && f.match_day_number == number)
        .filter(|f| match f.competition {
            CompetitionRef::League(_) => want_league,
            CompetitionRef::Cup(cup_id) => !want_league && active_cups.contains(&cup_id),
        })
        .cloned()
        .collect();
    due.sort_by_key(|f| (f.competition, f.round, f.bracket_slot, f.id));

    if want_league {
        DueFixtures {
            match_day,
            league: due,
            cup: Vec::new(),
        }
    } else {
        DueFixtures {
            match_day,
            league: Vec::new(),
            cup: due,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use pinfall_types::{CalendarDayId, FixtureId, LeagueId, TeamId};

    use super::*;

    fn fixture(season_id: SeasonId, competition: CompetitionRef, number: u32) -> Fixture {
        Fixture {
            id: FixtureId::new(),
            season_id,
            competition,
            round: number,
            match_day_number: number,
            bracket_slot: 0,
            home_team_id: TeamId::new(),
            away_team_id: Some(TeamId::new()),
            scheduled_date: None,
            is_played: false,
            result: None,
        }
    }

    fn cup(season_id: SeasonId, active: bool) -> Cup {
        Cup {
            id: CupId::new(),
            season_id,
            name: "Pokal".to_owned(),
            participants: Vec::new(),
            current_round_number: 1,
            total_rounds: 3,
            is_active: active,
            winner: None,
        }
    }

    fn day(season_id: SeasonId, date: &str, match_day: MatchDay) -> CalendarDay {
        CalendarDay {
            id: CalendarDayId::new(),
            season_id,
            date: date.parse().unwrap(),
            match_day,
            is_simulated: false,
        }
    }

    #[test]
    fn league_day_returns_only_league_fixtures_of_that_number() {
        let season_id = SeasonId::new();
        let league = CompetitionRef::League(LeagueId::new());
        let cup = cup(season_id, true);
        let fixtures = vec![
            fixture(season_id, league, 3),
            fixture(season_id, league, 4),
            fixture(season_id, CompetitionRef::Cup(cup.id), 3),
        ];
        let calendar = vec![day(season_id, "2025-10-04", MatchDay::League(3))];

        let due = fixtures_for_date(
            season_id,
            &calendar,
            &fixtures,
            &[cup],
            "2025-10-04".parse().unwrap(),
        )
        .unwrap();
        assert_eq!(due.league.len(), 1);
        assert!(due.cup.is_empty());
        assert_eq!(due.league[0].match_day_number, 3);
    }

    #[test]
    fn cup_day_ignores_inactive_cups() {
        let season_id = SeasonId::new();
        let active = cup(season_id, true);
        let finished = cup(season_id, false);
        let fixtures = vec![
            fixture(season_id, CompetitionRef::Cup(active.id), 2),
            fixture(season_id, CompetitionRef::Cup(finished.id), 2),
        ];
        let due = due_on(MatchDay::Cup(2), &fixtures, &[active, finished]);
        assert_eq!(due.cup.len(), 1);
    }

    #[test]
    fn free_day_is_empty() {
        let season_id = SeasonId::new();
        let fixtures = vec![fixture(season_id, CompetitionRef::League(LeagueId::new()), 1)];
        let calendar = vec![day(season_id, "2025-10-05", MatchDay::Free)];
        let due = fixtures_for_date(
            season_id,
            &calendar,
            &fixtures,
            &[],
            "2025-10-05".parse().unwrap(),
        )
        .unwrap();
        assert!(due.is_empty());
        assert_eq!(due.match_day, MatchDay::Free);
    }

    #[test]
    fn stored_dates_do_not_override_calendar_label() {
        let season_id = SeasonId::new();
        let mut drifted = fixture(season_id, CompetitionRef::League(LeagueId::new()), 7);
        drifted.scheduled_date = Some("2025-10-04".parse().unwrap());
        let calendar = vec![day(season_id, "2025-10-04", MatchDay::League(3))];
        let due = fixtures_for_date(
            season_id,
            &calendar,
            &[drifted],
            &[],
            "2025-10-04".parse().unwrap(),
        )
        .unwrap();
        assert!(due.is_empty());
    }

    #[test]
    fn byes_are_separated_from_playable_fixtures() {
        let season_id = SeasonId::new();
        let cup = cup(season_id, true);
        let mut bye = fixture(season_id, CompetitionRef::Cup(cup.id), 1);
        bye.away_team_id = None;
        let tie = fixture(season_id, CompetitionRef::Cup(cup.id), 1);
        let due = due_on(MatchDay::Cup(1), &[bye, tie], &[cup]);
        assert_eq!(due.len(), 2);
        assert_eq!(due.byes().count(), 1);
        assert_eq!(due.playable().count(), 1);
    }

    #[test]
    fn played_fixtures_are_not_due() {
        let season_id = SeasonId::new();
        let mut played = fixture(season_id, CompetitionRef::League(LeagueId::new()), 1);
        played.is_played = true;
        let due = due_on(MatchDay::League(1), &[played], &[]);
        assert!(due.is_empty());
    }

    #[test]
    fn missing_calendar_day_is_an_error() {
        let season_id = SeasonId::new();
        let date: NaiveDate = "2025-10-04".parse().unwrap();
        let result = fixtures_for_date(season_id, &[], &[], &[], date);
        assert_eq!(result, Err(FixtureError::NoCalendarDay { season_id, date }));
    }
}
