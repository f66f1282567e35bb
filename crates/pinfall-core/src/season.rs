//! The in-memory view of one season and its preparation.
//!
//! A [`SeasonSnapshot`] is everything the engine reads for a season. Stores
//! load it, the planners compute against it, and the in-memory store keeps
//! it up to date by applying the same plans the database store commits.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use pinfall_types::{
    CalendarDay, Club, CompetitionKind, CompetitionRef, Cup, Fixture, FixtureId, League,
    LineupOverride, PerformanceRecord, Player, PlayerAvailability, PlayerId, Season, Team,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::calendar::{self, CalendarDemand, CalendarError};
use crate::config::CalendarConfig;
use crate::matchday::DayPlan;
use crate::schedule::{self, ScheduleError};

/// Where a season stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonPhase {
    /// No calendar has been built.
    NoCalendar,
    /// A calendar exists and no day has been simulated.
    NotStarted,
    /// Some days are simulated.
    InProgress,
    /// Every calendar day is simulated.
    Complete,
}

/// Everything the engine reads for one season.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonSnapshot {
    /// The season.
    pub season: Season,
    /// Calendar days, ordered by date.
    pub calendar: Vec<CalendarDay>,
    /// Leagues of the season.
    pub leagues: Vec<League>,
    /// Cups of the season.
    pub cups: Vec<Cup>,
    /// Clubs with teams in the season.
    pub clubs: Vec<Club>,
    /// Teams of those clubs.
    pub teams: Vec<Team>,
    /// Players of those clubs.
    pub players: Vec<Player>,
    /// All fixtures.
    pub fixtures: Vec<Fixture>,
    /// Availability records, one per player and competition kind.
    pub availability: Vec<PlayerAvailability>,
    /// Manual lineups.
    pub overrides: Vec<LineupOverride>,
    /// Performance history of the season.
    pub performances: Vec<PerformanceRecord>,
}

impl SeasonSnapshot {
    /// The earliest calendar day not yet simulated.
    pub fn next_day(&self) -> Option<&CalendarDay> {
        self.calendar
            .iter()
            .filter(|day| !day.is_simulated)
            .min_by_key(|day| day.date)
    }

    /// Current phase of the season.
    pub fn phase(&self) -> SeasonPhase {
        if self.calendar.is_empty() {
            return SeasonPhase::NoCalendar;
        }
        let simulated = self.calendar.iter().filter(|d| d.is_simulated).count();
        if simulated == 0 {
            SeasonPhase::NotStarted
        } else if simulated == self.calendar.len() {
            SeasonPhase::Complete
        } else {
            SeasonPhase::InProgress
        }
    }

    /// Whether fixtures were already generated.
    pub fn has_fixtures(&self) -> bool {
        !self.fixtures.is_empty()
    }

    /// Add prepared fixtures and the drawn cups.
    pub fn apply_prepared(&mut self, prepared: &PreparedFixtures) {
        self.fixtures.extend(prepared.fixtures.iter().cloned());
        self.replace_cups(&prepared.cups);
    }

    /// Install a calendar and stamp fixture dates.
    pub fn apply_calendar(&mut self, days: &[CalendarDay], dates: &[(FixtureId, NaiveDate)]) {
        self.calendar = days.to_vec();
        self.calendar.sort_by_key(|d| d.date);
        let dates: BTreeMap<FixtureId, NaiveDate> = dates.iter().copied().collect();
        for fixture in &mut self.fixtures {
            if let Some(date) = dates.get(&fixture.id) {
                fixture.scheduled_date = Some(*date);
            }
        }
    }

    /// Apply every write of a simulated day.
    pub fn apply_day(&mut self, plan: &DayPlan) {
        for day in &mut self.calendar {
            if day.id == plan.calendar_day_id {
                day.is_simulated = true;
            }
        }

        let outcomes: BTreeMap<FixtureId, _> = plan
            .outcomes
            .iter()
            .map(|o| (o.fixture_id, &o.result))
            .collect();
        for fixture in &mut self.fixtures {
            if let Some(result) = outcomes.get(&fixture.id) {
                fixture.is_played = true;
                fixture.result = Some((*result).clone());
            }
        }
        self.fixtures.extend(plan.new_fixtures.iter().cloned());
        self.performances.extend(plan.performances.iter().cloned());
        self.replace_cups(&plan.cups);

        let mut records: BTreeMap<(PlayerId, CompetitionKind), PlayerAvailability> = self
            .availability
            .iter()
            .map(|r| ((r.player_id, r.competition), *r))
            .collect();
        for record in &plan.availability {
            records.insert((record.player_id, record.competition), *record);
        }
        self.availability = records.into_values().collect();
    }

    fn replace_cups(&mut self, cups: &[Cup]) {
        for cup in cups {
            match self.cups.iter_mut().find(|c| c.id == cup.id) {
                Some(existing) => *existing = cup.clone(),
                None => self.cups.push(cup.clone()),
            }
        }
    }
}

/// Fixtures generated for a season.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreparedFixtures {
    /// League round robins and first cup rounds.
    pub fixtures: Vec<Fixture>,
    /// Cups with their rounds set.
    pub cups: Vec<Cup>,
}

/// Generate league round robins and first cup rounds.
///
/// Competitions that already have fixtures are left alone, so preparing a
/// season twice adds nothing.
pub fn prepare_fixtures(
    snapshot: &SeasonSnapshot,
    config: &CalendarConfig,
) -> Result<PreparedFixtures, ScheduleError> {
    let season_id = snapshot.season.id;
    let demand = CalendarDemand::for_season(
        &snapshot.leagues,
        &snapshot.teams,
        &snapshot.cups,
        config.league_legs,
    );
    let has_fixtures = |competition: CompetitionRef| {
        snapshot
            .fixtures
            .iter()
            .any(|f| f.competition == competition)
    };

    let mut prepared = PreparedFixtures::default();
    for league in &snapshot.leagues {
        if has_fixtures(CompetitionRef::League(league.id)) {
            continue;
        }
        let team_ids = schedule::league_team_ids(league.id, &snapshot.teams);
        if team_ids.len() < 2 {
            debug!(league_id = %league.id, teams = team_ids.len(), "league too small; no fixtures");
            continue;
        }
        let fixtures =
            schedule::generate_league_fixtures(season_id, league, &team_ids, config.league_legs)?;
        prepared.fixtures.extend(fixtures);
    }

    for cup in snapshot.cups.iter().filter(|c| c.is_active || c.total_rounds == 0) {
        if has_fixtures(CompetitionRef::Cup(cup.id)) {
            continue;
        }
        let draw = schedule::draw_cup(cup, &snapshot.teams, demand.cup_days)?;
        prepared.fixtures.extend(draw.fixtures);
        prepared.cups.push(draw.cup);
    }

    info!(
        %season_id,
        fixtures = prepared.fixtures.len(),
        cups = prepared.cups.len(),
        "season fixtures prepared"
    );
    Ok(prepared)
}

/// A calendar and the fixture dates it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCalendar {
    /// Calendar days, ordered by date.
    pub days: Vec<CalendarDay>,
    /// Date of every fixture with a calendar day.
    pub fixture_dates: Vec<(FixtureId, NaiveDate)>,
}

/// Build the calendar of a season from its competitions.
///
/// Fails with [`CalendarError::AlreadyExists`] when the snapshot already
/// carries a calendar.
pub fn plan_calendar(
    snapshot: &SeasonSnapshot,
    config: &CalendarConfig,
) -> Result<PlannedCalendar, CalendarError> {
    if !snapshot.calendar.is_empty() {
        return Err(CalendarError::AlreadyExists {
            season_id: snapshot.season.id,
        });
    }
    let demand = CalendarDemand::for_season(
        &snapshot.leagues,
        &snapshot.teams,
        &snapshot.cups,
        config.league_legs,
    );
    let days = calendar::build_calendar(&snapshot.season, demand, config)?;
    let fixture_dates = calendar::fixture_dates(&days, &snapshot.fixtures);
    Ok(PlannedCalendar {
        days,
        fixture_dates,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pinfall_types::MatchDay;

    use super::*;
    use crate::demo::SeasonBuilder;

    #[test]
    fn phases_follow_simulated_days() {
        let mut snapshot = SeasonBuilder::new(4, 0).build().unwrap();
        assert_eq!(snapshot.phase(), SeasonPhase::NotStarted);
        let first = snapshot.next_day().unwrap().id;
        for day in &mut snapshot.calendar {
            if day.id == first {
                day.is_simulated = true;
            }
        }
        assert_eq!(snapshot.phase(), SeasonPhase::InProgress);
        for day in &mut snapshot.calendar {
            day.is_simulated = true;
        }
        assert_eq!(snapshot.phase(), SeasonPhase::Complete);
        assert!(snapshot.next_day().is_none());

        snapshot.calendar.clear();
        assert_eq!(snapshot.phase(), SeasonPhase::NoCalendar);
    }

    #[test]
    fn preparing_twice_adds_nothing() {
        let snapshot = SeasonBuilder::new(4, 4).build().unwrap();
        let again = prepare_fixtures(&snapshot, &CalendarConfig::default()).unwrap();
        assert!(again.fixtures.is_empty());
        assert!(again.cups.is_empty());
    }

    #[test]
    fn second_calendar_is_rejected() {
        let snapshot = SeasonBuilder::new(4, 0).build().unwrap();
        let err = plan_calendar(&snapshot, &CalendarConfig::default()).unwrap_err();
        assert!(matches!(err, CalendarError::AlreadyExists { .. }));
    }

    #[test]
    fn every_fixture_is_dated_on_its_label() {
        let snapshot = SeasonBuilder::new(6, 4).build().unwrap();
        for fixture in &snapshot.fixtures {
            let date = fixture.scheduled_date.unwrap();
            let day = snapshot.calendar.iter().find(|d| d.date == date).unwrap();
            assert_eq!(day.match_day, fixture.match_day());
            assert_ne!(day.match_day, MatchDay::Free);
        }
    }
}
