//! Calendar Builder: lays a season's league and cup match days onto dates.
//!
//! The calendar is built once per season. It interleaves the league and cup
//! match days onto distinct dates, numbers each competition kind's days in
//! its own sequence, and fills the gaps between competition days with free
//! days. Once built, a date's label never changes; the orchestrator only
//! flips `is_simulated`.
//!
//! Everything here is pure. Persistence (and the "already exists" check)
//! belongs to the orchestrator and the store.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use pinfall_types::{
    CalendarDay, CalendarDayId, CompetitionKind, Cup, DayType, Fixture, FixtureId, League,
    MatchDay, Season, SeasonId, Team,
};
use tracing::{debug, info, warn};

use crate::config::CalendarConfig;

/// Errors raised while building or validating a calendar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    /// A calendar already exists for the season. Not fatal: callers treat
    /// this as an idempotent no-op.
    #[error("calendar already exists for season {season_id}")]
    AlreadyExists {
        /// The season.
        season_id: SeasonId,
    },

    /// Two calendar rows would share the same date.
    #[error("calendar date collision on {date}")]
    DateCollision {
        /// The doubly-booked date.
        date: NaiveDate,
    },

    /// The season range cannot hold every competition day.
    #[error("season needs {needed} competition days but only {available} dates are usable")]
    Capacity {
        /// Competition days required.
        needed: u32,
        /// Usable dates in the season range.
        available: u32,
    },

    /// The season ends before it starts.
    #[error("season range {start} .. {end} is empty")]
    InvalidRange {
        /// Season start date.
        start: NaiveDate,
        /// Season end date.
        end: NaiveDate,
    },

    /// Match-day numbering is not strictly increasing within a day type.
    #[error("{day_type} numbering broken at {date}: expected {expected}, found {found:?}")]
    Numbering {
        /// The day type whose sequence is broken.
        day_type: DayType,
        /// Date of the offending row.
        date: NaiveDate,
        /// The number that should have been there.
        expected: u32,
        /// The number found.
        found: Option<u32>,
    },
}

/// Number of competition days each kind needs in a season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CalendarDemand {
    /// League match days (round-robin rounds of the largest league).
    pub league_days: u32,
    /// Cup match days (rounds of the deepest active cup).
    pub cup_days: u32,
}

impl CalendarDemand {
    /// Derive the demand from a season's leagues, teams, and cups.
    pub fn for_season(leagues: &[League], teams: &[Team], cups: &[Cup], legs: u32) -> Self {
        let league_days = leagues
            .iter()
            .map(|league| {
                let size = teams
                    .iter()
                    .filter(|team| team.league_id == Some(league.id))
                    .count();
                league_days_required(size, legs)
            })
            .max()
            .unwrap_or(0);
        let cup_days = cups
            .iter()
            .filter(|cup| cup.is_active)
            .map(|cup| cup_days_required(cup.participants.len()))
            .max()
            .unwrap_or(0);
        Self {
            league_days,
            cup_days,
        }
    }

    /// Total competition days.
    pub const fn total(self) -> u32 {
        self.league_days.saturating_add(self.cup_days)
    }
}

/// League match days needed by a round robin of `team_count` teams.
///
/// An even field plays `n - 1` rounds per leg; an odd field is padded with a
/// bye and plays `n` rounds.
pub fn league_days_required(team_count: usize, legs: u32) -> u32 {
    if team_count < 2 {
        return 0;
    }
    let rounds = if team_count % 2 == 0 {
        team_count.saturating_sub(1)
    } else {
        team_count
    };
    u32::try_from(rounds)
        .unwrap_or(u32::MAX)
        .saturating_mul(legs)
}

/// Cup match days needed by a knock-out of `participants` teams:
/// `ceil(log2(participants))`.
pub fn cup_days_required(participants: usize) -> u32 {
    if participants < 2 {
        return 0;
    }
    participants
        .checked_next_power_of_two()
        .map_or(usize::BITS, usize::trailing_zeros)
}

/// Order in which league and cup days follow each other.
///
/// Cup day `i` (1-based) of `C` lands on slot `round(i * N / (C + 1))` of
/// the `N` competition slots, moving to the next free slot on a clash.
pub fn interleave(demand: CalendarDemand) -> Vec<CompetitionKind> {
    let total = usize::try_from(demand.total()).unwrap_or(0);
    let mut slots: Vec<Option<CompetitionKind>> = vec![None; total];
    let cup_days = u64::from(demand.cup_days);
    let divisor = cup_days.saturating_add(1);
    let n = u64::from(demand.total());

    for i in 1..=cup_days {
        // round(i * n / divisor) with integer math
        let scaled = i.saturating_mul(n).saturating_mul(2).saturating_add(divisor);
        let target = scaled
            .checked_div(divisor.saturating_mul(2))
            .and_then(|t| usize::try_from(t).ok())
            .unwrap_or(0)
            .min(total.saturating_sub(1));
        let free = (target..total)
            .chain(0..target)
            .find(|&idx| slots.get(idx).is_some_and(Option::is_none));
        if let Some(slot) = free.and_then(|idx| slots.get_mut(idx)) {
            *slot = Some(CompetitionKind::Cup);
        }
    }

    slots
        .into_iter()
        .map(|slot| slot.unwrap_or(CompetitionKind::League))
        .collect()
}

/// Build the calendar for a season.
///
/// Competition days are spread across the usable dates of the season with
/// `min(rest_days, slack / (days - 1))` free days between them. Every date
/// between the first and last competition day that is not a competition day
/// becomes a free day. The result is validated before it is returned.
pub fn build_calendar(
    season: &Season,
    demand: CalendarDemand,
    config: &CalendarConfig,
) -> Result<Vec<CalendarDay>, CalendarError> {
    if season.end_date < season.start_date {
        return Err(CalendarError::InvalidRange {
            start: season.start_date,
            end: season.end_date,
        });
    }

    let blackout: BTreeSet<NaiveDate> = config.blackout_dates.iter().copied().collect();
    let usable: Vec<NaiveDate> = season
        .start_date
        .iter_days()
        .take_while(|date| *date <= season.end_date)
        .filter(|date| !blackout.contains(date))
        .collect();

    let needed = demand.total();
    let available = u32::try_from(usable.len()).unwrap_or(u32::MAX);
    if needed > available {
        return Err(CalendarError::Capacity { needed, available });
    }
    if needed == 0 {
        info!(season_id = %season.id, "season has no competition days");
        return Ok(Vec::new());
    }

    let gaps = needed.saturating_sub(1);
    let slack = available.saturating_sub(needed);
    let gap = slack.checked_div(gaps).unwrap_or(slack).min(config.rest_days);
    if gap == 0 && gaps > 0 {
        warn!(
            season_id = %season.id,
            needed,
            available,
            "season range too short for rest days, competition days are adjacent"
        );
    }
    let stride = usize::try_from(gap.saturating_add(1)).unwrap_or(1);

    let order = interleave(demand);
    let mut league_no: u32 = 0;
    let mut cup_no: u32 = 0;
    let mut competition_days: BTreeMap<NaiveDate, MatchDay> = BTreeMap::new();

    for (position, kind) in order.into_iter().enumerate() {
        let date = position
            .checked_mul(stride)
            .and_then(|idx| usable.get(idx))
            .copied()
            .ok_or(CalendarError::Capacity { needed, available })?;
        let match_day = match kind {
            CompetitionKind::League => {
                league_no = league_no.saturating_add(1);
                MatchDay::League(league_no)
            }
            CompetitionKind::Cup => {
                cup_no = cup_no.saturating_add(1);
                MatchDay::Cup(cup_no)
            }
        };
        if competition_days.insert(date, match_day).is_some() {
            return Err(CalendarError::DateCollision { date });
        }
    }

    let (Some(first), Some(last)) = (
        competition_days.keys().next().copied(),
        competition_days.keys().next_back().copied(),
    ) else {
        return Ok(Vec::new());
    };

    let days: Vec<CalendarDay> = first
        .iter_days()
        .take_while(|date| *date <= last)
        .map(|date| CalendarDay {
            id: CalendarDayId::new(),
            season_id: season.id,
            date,
            match_day: competition_days.get(&date).copied().unwrap_or(MatchDay::Free),
            is_simulated: false,
        })
        .collect();

    validate_calendar(&days)?;

    info!(
        season_id = %season.id,
        league_days = league_no,
        cup_days = cup_no,
        rest_days = gap,
        first = %first,
        last = %last,
        "calendar planned"
    );
    Ok(days)
}

/// Check the calendar invariants: one row per date, and match-day numbers
/// that start at 1 and increase by one within each day type in date order.
pub fn validate_calendar(days: &[CalendarDay]) -> Result<(), CalendarError> {
    let mut seen = BTreeSet::new();
    for day in days {
        if !seen.insert(day.date) {
            return Err(CalendarError::DateCollision { date: day.date });
        }
    }

    let mut ordered: Vec<&CalendarDay> = days.iter().collect();
    ordered.sort_by_key(|day| day.date);

    let mut league_no: u32 = 0;
    let mut cup_no: u32 = 0;
    for day in ordered {
        let counter = match day.match_day {
            MatchDay::League(_) => &mut league_no,
            MatchDay::Cup(_) => &mut cup_no,
            MatchDay::Free => continue,
        };
        let expected = counter.saturating_add(1);
        if day.match_day_number() != Some(expected) {
            return Err(CalendarError::Numbering {
                day_type: day.day_type(),
                date: day.date,
                expected,
                found: day.match_day_number(),
            });
        }
        *counter = expected;
    }
    Ok(())
}

/// Date of the given match day in the calendar.
pub fn date_of(calendar: &[CalendarDay], match_day: MatchDay) -> Option<NaiveDate> {
    if match_day == MatchDay::Free {
        return None;
    }
    calendar
        .iter()
        .find(|day| day.match_day == match_day)
        .map(|day| day.date)
}

/// Scheduled dates for fixtures, looked up from the calendar by match day.
///
/// Fixtures whose match day is not in the calendar are left out.
pub fn fixture_dates(calendar: &[CalendarDay], fixtures: &[Fixture]) -> Vec<(FixtureId, NaiveDate)> {
    let by_day: BTreeMap<MatchDay, NaiveDate> = calendar
        .iter()
        .filter(|day| day.match_day != MatchDay::Free)
        .map(|day| (day.match_day, day.date))
        .collect();
    fixtures
        .iter()
        .filter_map(|fixture| {
            let date = by_day.get(&fixture.match_day()).copied();
            if date.is_none() {
                debug!(fixture_id = %fixture.id, match_day = %fixture.match_day(), "no calendar day for fixture");
            }
            date.map(|date| (fixture.id, date))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn season(start: &str, end: &str) -> Season {
        Season {
            id: SeasonId::new(),
            name: "2025/26".to_owned(),
            start_date: start.parse().unwrap(),
            end_date: end.parse().unwrap(),
            is_current: true,
            seed: 1,
        }
    }

    fn count(days: &[CalendarDay], day_type: DayType) -> usize {
        days.iter().filter(|d| d.day_type() == day_type).count()
    }

    #[test]
    fn league_days_follow_round_robin_rounds() {
        assert_eq!(league_days_required(16, 1), 15);
        assert_eq!(league_days_required(16, 2), 30);
        assert_eq!(league_days_required(7, 1), 7);
        assert_eq!(league_days_required(1, 1), 0);
    }

    #[test]
    fn cup_days_are_ceil_log2() {
        assert_eq!(cup_days_required(8), 3);
        assert_eq!(cup_days_required(9), 4);
        assert_eq!(cup_days_required(2), 1);
        assert_eq!(cup_days_required(1), 0);
    }

    #[test]
    fn sixteen_team_league_and_eight_team_cup() {
        let season = season("2025-09-01", "2026-05-31");
        let demand = CalendarDemand {
            league_days: league_days_required(16, 1),
            cup_days: cup_days_required(8),
        };
        let days = build_calendar(&season, demand, &CalendarConfig::default()).unwrap();

        assert_eq!(count(&days, DayType::LeagueDay), 15);
        assert_eq!(count(&days, DayType::CupDay), 3);

        let dates: BTreeSet<_> = days.iter().map(|d| d.date).collect();
        assert_eq!(dates.len(), days.len());
        assert!(validate_calendar(&days).is_ok());
    }

    #[test]
    fn numbering_is_independent_per_day_type() {
        let season = season("2025-09-01", "2026-05-31");
        let demand = CalendarDemand {
            league_days: 5,
            cup_days: 2,
        };
        let days = build_calendar(&season, demand, &CalendarConfig::default()).unwrap();
        let league: Vec<u32> = days
            .iter()
            .filter_map(|d| match d.match_day {
                MatchDay::League(n) => Some(n),
                _ => None,
            })
            .collect();
        let cup: Vec<u32> = days
            .iter()
            .filter_map(|d| match d.match_day {
                MatchDay::Cup(n) => Some(n),
                _ => None,
            })
            .collect();
        assert_eq!(league, vec![1, 2, 3, 4, 5]);
        assert_eq!(cup, vec![1, 2]);
    }

    #[test]
    fn cup_days_are_spread_between_league_days() {
        let order = interleave(CalendarDemand {
            league_days: 15,
            cup_days: 3,
        });
        assert_eq!(order.len(), 18);
        assert_ne!(order[0], CompetitionKind::Cup);
        assert_ne!(order[17], CompetitionKind::Cup);
        let cup_slots: Vec<usize> = order
            .iter()
            .enumerate()
            .filter(|(_, k)| **k == CompetitionKind::Cup)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(cup_slots.len(), 3);
    }

    #[test]
    fn cup_only_season_is_all_cup_days() {
        let order = interleave(CalendarDemand {
            league_days: 0,
            cup_days: 3,
        });
        assert_eq!(order, vec![CompetitionKind::Cup; 3]);
    }

    #[test]
    fn rest_days_are_respected_when_range_allows() {
        let season = season("2025-09-01", "2026-05-31");
        let config = CalendarConfig {
            rest_days: 6,
            ..CalendarConfig::default()
        };
        let days = build_calendar(
            &season,
            CalendarDemand {
                league_days: 4,
                cup_days: 0,
            },
            &config,
        )
        .unwrap();
        let competition: Vec<NaiveDate> = days
            .iter()
            .filter(|d| d.match_day != MatchDay::Free)
            .map(|d| d.date)
            .collect();
        for pair in competition.windows(2) {
            assert_eq!((pair[1] - pair[0]).num_days(), 7);
        }
        assert_eq!(count(&days, DayType::FreeDay), 18);
    }

    #[test]
    fn short_range_compresses_gaps() {
        let season = season("2025-09-01", "2025-09-05");
        let days = build_calendar(
            &season,
            CalendarDemand {
                league_days: 5,
                cup_days: 0,
            },
            &CalendarConfig::default(),
        )
        .unwrap();
        assert_eq!(days.len(), 5);
        assert_eq!(count(&days, DayType::FreeDay), 0);
    }

    #[test]
    fn capacity_error_when_range_too_short() {
        let season = season("2025-09-01", "2025-09-03");
        let result = build_calendar(
            &season,
            CalendarDemand {
                league_days: 3,
                cup_days: 1,
            },
            &CalendarConfig::default(),
        );
        assert_eq!(
            result,
            Err(CalendarError::Capacity {
                needed: 4,
                available: 3
            })
        );
    }

    #[test]
    fn blackout_dates_are_never_competition_days() {
        let season = season("2025-09-01", "2025-09-10");
        let blackout: NaiveDate = "2025-09-02".parse().unwrap();
        let config = CalendarConfig {
            rest_days: 0,
            blackout_dates: vec![blackout],
            ..CalendarConfig::default()
        };
        let days = build_calendar(
            &season,
            CalendarDemand {
                league_days: 3,
                cup_days: 0,
            },
            &config,
        )
        .unwrap();
        let on_blackout = days.iter().find(|d| d.date == blackout).unwrap();
        assert_eq!(on_blackout.match_day, MatchDay::Free);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let season = season("2025-09-10", "2025-09-01");
        let result = build_calendar(&season, CalendarDemand::default(), &CalendarConfig::default());
        assert!(matches!(result, Err(CalendarError::InvalidRange { .. })));
    }

    #[test]
    fn validate_detects_duplicate_dates() {
        let season_id = SeasonId::new();
        let date: NaiveDate = "2025-09-01".parse().unwrap();
        let days = vec![
            CalendarDay {
                id: CalendarDayId::new(),
                season_id,
                date,
                match_day: MatchDay::League(1),
                is_simulated: false,
            },
            CalendarDay {
                id: CalendarDayId::new(),
                season_id,
                date,
                match_day: MatchDay::Cup(1),
                is_simulated: false,
            },
        ];
        assert_eq!(
            validate_calendar(&days),
            Err(CalendarError::DateCollision { date })
        );
    }

    #[test]
    fn validate_detects_gaps_in_numbering() {
        let season_id = SeasonId::new();
        let days = vec![
            CalendarDay {
                id: CalendarDayId::new(),
                season_id,
                date: "2025-09-01".parse().unwrap(),
                match_day: MatchDay::League(1),
                is_simulated: false,
            },
            CalendarDay {
                id: CalendarDayId::new(),
                season_id,
                date: "2025-09-08".parse().unwrap(),
                match_day: MatchDay::League(3),
                is_simulated: false,
            },
        ];
        assert!(matches!(
            validate_calendar(&days),
            Err(CalendarError::Numbering { expected: 2, .. })
        ));
    }
}
