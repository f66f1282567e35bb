//! One match day, computed purely from a season snapshot.
//!
//! [`plan_day`] runs the phases of a day against an immutable snapshot:
//!
//! 1. **Select** -- the earliest calendar day not yet simulated.
//! 2. **Due** -- fixtures from the fixture provider (calendar label wins).
//! 3. **Byes** -- cup byes resolve as home advances.
//! 4. **Rosters** -- clubs resolved in parallel by the availability resolver.
//! 5. **Play** -- fully rostered fixtures simulated in parallel; walkovers
//!    and skips recorded.
//! 6. **Cups** -- completed cup rounds paired into the next round.
//! 7. **Flags** -- availability records of today's kind updated.
//!
//! The result is a [`DayPlan`] holding every write of the day. Nothing is
//! mutated here; the store commits the plan as one transaction, so a crash
//! can never leave a day half-simulated.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use pinfall_types::{
    CalendarDayId, CompetitionKind, CompetitionRef, Cup, CupId, DayType, DecidedBy, Fixture,
    FixtureId, FixtureResult, MatchDay, PerformanceRecord, Player, PlayerAvailability, PlayerId,
    SeasonId, Side, Team, TeamId,
};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::availability::{
    self, AvailabilityBook, AvailabilityError, ClubRequest, PlayerPool, TeamFixture, TeamRoster,
};
use crate::config::EngineConfig;
use crate::fixtures::{self, FixtureError};
use crate::schedule::{self, CupProgress, ScheduleError};
use crate::scoring::ScoringRule;
use crate::simulator::{self, RosterEntry, SimulationResult};
use crate::season::SeasonSnapshot;

/// Errors that abort a whole day.
///
/// Fixture-level problems never surface here; they are contained and
/// listed in the [`DaySummary`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdvanceError {
    /// The fixture provider failed.
    #[error("fixture lookup failed: {source}")]
    Fixture {
        /// The underlying error.
        #[from]
        source: FixtureError,
    },

    /// Roster resolution failed.
    #[error("roster resolution failed: {source}")]
    Availability {
        /// The underlying error.
        #[from]
        source: AvailabilityError,
    },

    /// Cup progression failed.
    #[error("cup progression failed: {source}")]
    Schedule {
        /// The underlying error.
        #[from]
        source: ScheduleError,
    },
}

/// Why a fixture was not played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// At least one side could not field a full roster.
    InsufficientRoster {
        /// Empty home slots.
        home_shortfall: u8,
        /// Empty away slots.
        away_shortfall: u8,
    },
    /// A team is due in two fixtures on the same date.
    TeamDoubleBooked {
        /// The team.
        team_id: TeamId,
    },
    /// A fixture references a team that does not exist.
    UnknownTeam {
        /// The team.
        team_id: TeamId,
    },
    /// The simulator rejected the fixture.
    SimulationFailed {
        /// The simulator's error message.
        message: String,
    },
}

/// A fixture that was left unplayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFixture {
    /// The fixture.
    pub fixture_id: FixtureId,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// What happened on a day, for operators and the API layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySummary {
    /// The season.
    pub season_id: SeasonId,
    /// The date played.
    pub date: NaiveDate,
    /// The day's label.
    pub match_day: MatchDay,
    /// Storage tag of the day.
    pub day_type: DayType,
    /// Match-day number within the day's own sequence.
    pub match_day_number: Option<u32>,
    /// Fixtures decided by simulation.
    pub matches_simulated: u32,
    /// Cup byes resolved.
    pub byes_resolved: u32,
    /// Cup fixtures decided by walkover.
    pub walkovers: Vec<FixtureId>,
    /// Fixtures left unplayed.
    pub skipped: Vec<SkippedFixture>,
    /// Stale availability records corrected.
    pub stale_corrections: u32,
    /// Reserve players drafted in as stand-ins.
    pub stand_ins: u32,
    /// Cups whose round completed and whose next round was paired.
    pub cups_advanced: Vec<CupId>,
    /// Cups whose final was played today.
    pub cups_finished: Vec<CupId>,
}

impl DaySummary {
    pub(crate) const fn new(season_id: SeasonId, date: NaiveDate, match_day: MatchDay) -> Self {
        Self {
            season_id,
            date,
            match_day,
            day_type: match_day.day_type(),
            match_day_number: match_day.number(),
            matches_simulated: 0,
            byes_resolved: 0,
            walkovers: Vec::new(),
            skipped: Vec::new(),
            stale_corrections: 0,
            stand_ins: 0,
            cups_advanced: Vec::new(),
            cups_finished: Vec::new(),
        }
    }

    /// Whether any fixture was left unplayed.
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// The result of one fixture, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureOutcome {
    /// The fixture.
    pub fixture_id: FixtureId,
    /// Its result.
    pub result: FixtureResult,
}

/// Every write of one match day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayPlan {
    /// The season.
    pub season_id: SeasonId,
    /// The calendar row to flag as simulated.
    pub calendar_day_id: CalendarDayId,
    /// Date of the day.
    pub date: NaiveDate,
    /// Label of the day.
    pub match_day: MatchDay,
    /// Fixture results (simulated, byes, walkovers).
    pub outcomes: Vec<FixtureOutcome>,
    /// New performance records.
    pub performances: Vec<PerformanceRecord>,
    /// Availability records to upsert.
    pub availability: Vec<PlayerAvailability>,
    /// Cups whose state changed.
    pub cups: Vec<Cup>,
    /// Newly paired cup fixtures.
    pub new_fixtures: Vec<Fixture>,
    /// Summary of the day.
    pub summary: DaySummary,
}

/// Compute the next match day of a season.
///
/// Returns `Ok(None)` when every calendar day is simulated.
pub fn plan_day(
    snapshot: &SeasonSnapshot,
    config: &EngineConfig,
    scoring: &dyn ScoringRule,
) -> Result<Option<DayPlan>, AdvanceError> {
    let Some(day) = snapshot.next_day() else {
        return Ok(None);
    };
    let season = &snapshot.season;
    let match_day = day.match_day;
    let mut summary = DaySummary::new(season.id, day.date, match_day);
    let mut plan = DayPlan {
        season_id: season.id,
        calendar_day_id: day.id,
        date: day.date,
        match_day,
        outcomes: Vec::new(),
        performances: Vec::new(),
        availability: Vec::new(),
        cups: Vec::new(),
        new_fixtures: Vec::new(),
        summary: summary.clone(),
    };

    let (Some(kind), Some(number)) = (match_day.competition(), match_day.number()) else {
        debug!(season_id = %season.id, date = %day.date, "free day");
        return Ok(Some(plan));
    };

    let due = fixtures::fixtures_for_date(
        season.id,
        &snapshot.calendar,
        &snapshot.fixtures,
        &snapshot.cups,
        day.date,
    )?;

    // Phase 3: byes
    for bye in due.byes() {
        plan.outcomes.push(FixtureOutcome {
            fixture_id: bye.id,
            result: bye_result(),
        });
        summary.byes_resolved = summary.byes_resolved.saturating_add(1);
    }

    // Phase 4: rosters
    let teams: BTreeMap<TeamId, &Team> = snapshot.teams.iter().map(|t| (t.id, t)).collect();
    let (playable, requests) = club_requests(snapshot, &teams, due.playable(), &mut summary);

    let book = AvailabilityBook::new(match_day, &snapshot.availability, &snapshot.performances)?;
    let pool = PlayerPool {
        players: &snapshot.players,
        book: &book,
        overrides: &snapshot.overrides,
    };
    let clubs = availability::resolve_day(match_day, &requests, &pool, &config.roster)?;
    let rosters: BTreeMap<TeamId, &TeamRoster> = clubs
        .iter()
        .flat_map(|club| club.rosters.iter())
        .map(|roster| (roster.team_id, roster))
        .collect();
    let corrections: BTreeMap<PlayerId, Option<u32>> = clubs
        .iter()
        .flat_map(|club| club.corrections.iter())
        .map(|c| (c.player_id, c.derived))
        .collect();
    summary.stale_corrections = count(corrections.len());

    // Phase 5: play
    let players: BTreeMap<PlayerId, &Player> =
        snapshot.players.iter().map(|p| (p.id, p)).collect();
    let mut games: Vec<(&Fixture, Vec<RosterEntry<'_>>, Vec<RosterEntry<'_>>)> = Vec::new();
    for fixture in playable {
        let home = rosters.get(&fixture.home_team_id).copied();
        let away = fixture
            .away_team_id
            .and_then(|id| rosters.get(&id))
            .copied();
        let home_ok = home.is_some_and(TeamRoster::is_complete);
        let away_ok = away.is_some_and(TeamRoster::is_complete);

        match (home, away) {
            (Some(home), Some(away)) if home_ok && away_ok => {
                games.push((fixture, entries(home, &players), entries(away, &players)));
            }
            _ if kind == CompetitionKind::Cup
                && config.cup.walkover_on_shortfall
                && home_ok != away_ok =>
            {
                let winner = if home_ok { Side::Home } else { Side::Away };
                warn!(fixture_id = %fixture.id, ?winner, "cup tie decided by walkover");
                plan.outcomes.push(FixtureOutcome {
                    fixture_id: fixture.id,
                    result: walkover_result(winner, config),
                });
                summary.walkovers.push(fixture.id);
            }
            _ => {
                let home_shortfall = home.map_or(config.roster.size, |r| r.shortfall);
                let away_shortfall = away.map_or(config.roster.size, |r| r.shortfall);
                warn!(
                    fixture_id = %fixture.id,
                    home_shortfall,
                    away_shortfall,
                    "fixture skipped: insufficient roster"
                );
                summary.skipped.push(SkippedFixture {
                    fixture_id: fixture.id,
                    reason: SkipReason::InsufficientRoster {
                        home_shortfall,
                        away_shortfall,
                    },
                });
            }
        }
    }

    let results: Vec<(FixtureId, Result<SimulationResult, simulator::SimulationError>)> = games
        .par_iter()
        .map(|(fixture, home, away)| {
            let seed = simulator::fixture_seed(season.seed, fixture.id);
            let result =
                simulator::simulate(fixture, home, away, seed, &config.simulation, scoring);
            (fixture.id, result)
        })
        .collect();

    for (fixture_id, result) in results {
        match result {
            Ok(result) => {
                plan.outcomes.push(FixtureOutcome {
                    fixture_id,
                    result: result.fixture_result(),
                });
                for mut record in result.records {
                    record.date = Some(day.date);
                    if record.is_stand_in {
                        summary.stand_ins = summary.stand_ins.saturating_add(1);
                    }
                    plan.performances.push(record);
                }
                summary.matches_simulated = summary.matches_simulated.saturating_add(1);
            }
            Err(err) => {
                warn!(%fixture_id, error = %err, "fixture skipped: simulation failed");
                summary.skipped.push(SkippedFixture {
                    fixture_id,
                    reason: SkipReason::SimulationFailed {
                        message: err.to_string(),
                    },
                });
            }
        }
    }

    // Phase 6: cups
    if kind == CompetitionKind::Cup {
        advance_cups(snapshot, &mut plan, &mut summary)?;
    }

    // Phase 7: flags
    plan.availability = availability_updates(snapshot, &book, &plan.performances, &corrections, number);

    info!(
        season_id = %season.id,
        date = %day.date,
        %match_day,
        matches = summary.matches_simulated,
        byes = summary.byes_resolved,
        walkovers = summary.walkovers.len(),
        skipped = summary.skipped.len(),
        "match day planned"
    );
    plan.summary = summary;
    Ok(Some(plan))
}

/// Group today's playable fixtures by club.
///
/// Fixtures whose teams are unknown or already due elsewhere today are
/// skipped here and never reach roster resolution.
pub(crate) fn club_requests<'a>(
    snapshot: &SeasonSnapshot,
    teams: &BTreeMap<TeamId, &Team>,
    due: impl Iterator<Item = &'a Fixture>,
    summary: &mut DaySummary,
) -> (Vec<&'a Fixture>, Vec<ClubRequest>) {
    let age_classes: BTreeMap<_, _> = snapshot
        .leagues
        .iter()
        .map(|l| (l.id, l.age_class))
        .collect();
    let mut booked: BTreeSet<TeamId> = BTreeSet::new();
    let mut playable = Vec::new();
    let mut by_club: BTreeMap<_, Vec<TeamFixture>> = BTreeMap::new();

    'fixtures: for fixture in due {
        let sides = [Some(fixture.home_team_id), fixture.away_team_id];
        let mut found: Vec<&Team> = Vec::with_capacity(2);
        for team_id in sides.into_iter().flatten() {
            let reason = match teams.get(&team_id) {
                None => Some(SkipReason::UnknownTeam { team_id }),
                Some(_) if booked.contains(&team_id) => {
                    Some(SkipReason::TeamDoubleBooked { team_id })
                }
                Some(team) => {
                    found.push(team);
                    None
                }
            };
            if let Some(reason) = reason {
                warn!(fixture_id = %fixture.id, ?reason, "fixture skipped");
                summary.skipped.push(SkippedFixture {
                    fixture_id: fixture.id,
                    reason,
                });
                continue 'fixtures;
            }
        }

        let age_class = match fixture.competition {
            CompetitionRef::League(league_id) => age_classes.get(&league_id).copied().flatten(),
            CompetitionRef::Cup(_) => None,
        };
        for team in found {
            booked.insert(team.id);
            by_club.entry(team.club_id).or_default().push(TeamFixture {
                team_id: team.id,
                squad_rank: team.squad_rank,
                fixture_id: fixture.id,
                age_class,
            });
        }
        playable.push(fixture);
    }

    let requests = by_club
        .into_iter()
        .map(|(club_id, teams)| ClubRequest { club_id, teams })
        .collect();
    (playable, requests)
}

fn entries<'a>(roster: &TeamRoster, players: &BTreeMap<PlayerId, &'a Player>) -> Vec<RosterEntry<'a>> {
    roster
        .slots
        .iter()
        .filter_map(|slot| {
            players.get(&slot.player_id).map(|player| RosterEntry {
                player,
                slot: slot.slot,
                is_stand_in: slot.is_stand_in,
            })
        })
        .collect()
}

/// Pair completed cup rounds and close finished cups.
fn advance_cups(
    snapshot: &SeasonSnapshot,
    plan: &mut DayPlan,
    summary: &mut DaySummary,
) -> Result<(), ScheduleError> {
    let results: BTreeMap<FixtureId, &FixtureResult> = plan
        .outcomes
        .iter()
        .map(|o| (o.fixture_id, &o.result))
        .collect();
    let cup_days = count(
        snapshot
            .calendar
            .iter()
            .filter(|d| matches!(d.match_day, MatchDay::Cup(_)))
            .count(),
    );

    for cup in snapshot.cups.iter().filter(|c| c.is_active) {
        let view: Vec<Fixture> = snapshot
            .fixtures
            .iter()
            .filter(|f| f.competition == CompetitionRef::Cup(cup.id))
            .map(|f| match results.get(&f.id) {
                Some(result) => Fixture {
                    is_played: true,
                    result: Some((*result).clone()),
                    ..f.clone()
                },
                None => f.clone(),
            })
            .collect();

        match schedule::advance_cup_round(cup, &view, cup_days, &snapshot.calendar)? {
            CupProgress::RoundOpen => {}
            CupProgress::NextRound { cup, fixtures } => {
                summary.cups_advanced.push(cup.id);
                plan.new_fixtures.extend(fixtures);
                plan.cups.push(cup);
            }
            CupProgress::Finished { cup } => {
                summary.cups_finished.push(cup.id);
                plan.cups.push(cup);
            }
        }
    }
    Ok(())
}

/// Availability records of today's kind after the day.
///
/// Players who competed get `has_played = true` and today's number; every
/// other player of the kind has the played flag cleared and availability
/// taken from the player. Records of the other kind are not touched. Only
/// changed records are returned.
fn availability_updates(
    snapshot: &SeasonSnapshot,
    book: &AvailabilityBook,
    performances: &[PerformanceRecord],
    corrections: &BTreeMap<PlayerId, Option<u32>>,
    number: u32,
) -> Vec<PlayerAvailability> {
    let played: BTreeSet<PlayerId> = performances.iter().map(|p| p.player_id).collect();
    snapshot
        .players
        .iter()
        .filter_map(|player| {
            let current = book.record(player.id);
            let target = if played.contains(&player.id) {
                PlayerAvailability {
                    is_available_current_matchday: false,
                    has_played_current_matchday: true,
                    last_played_matchday: Some(number),
                    ..current
                }
            } else {
                PlayerAvailability {
                    is_available_current_matchday: player.is_available,
                    has_played_current_matchday: false,
                    last_played_matchday: corrections
                        .get(&player.id)
                        .copied()
                        .unwrap_or(current.last_played_matchday),
                    ..current
                }
            };
            (target != current).then_some(target)
        })
        .collect()
}

const fn bye_result() -> FixtureResult {
    FixtureResult {
        home_pins: 0,
        away_pins: 0,
        home_points: Decimal::ZERO,
        away_points: Decimal::ZERO,
        winner: Some(Side::Home),
        decided_by: DecidedBy::Bye,
        seed: 0,
    }
}

const fn walkover_result(winner: Side, config: &EngineConfig) -> FixtureResult {
    let (home_points, away_points) = match winner {
        Side::Home => (config.scoring.points_for_win, config.scoring.points_for_loss),
        Side::Away => (config.scoring.points_for_loss, config.scoring.points_for_win),
    };
    FixtureResult {
        home_pins: 0,
        away_pins: 0,
        home_points,
        away_points,
        winner: Some(winner),
        decided_by: DecidedBy::Walkover,
        seed: 0,
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::demo::SeasonBuilder;
    use crate::scoring::TotalPinsRule;

    fn sample_season(league_teams: usize, cup_teams: usize) -> SeasonSnapshot {
        SeasonBuilder::new(league_teams, cup_teams).build().unwrap()
    }

    fn plan(snapshot: &SeasonSnapshot) -> DayPlan {
        plan_day(snapshot, &EngineConfig::default(), &TotalPinsRule::default())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn first_day_simulates_all_league_fixtures() {
        let snapshot = sample_season(4, 0);
        let plan = plan(&snapshot);
        assert_eq!(plan.match_day, MatchDay::League(1));
        assert_eq!(plan.summary.matches_simulated, 2);
        assert!(plan.summary.skipped.is_empty());
        assert_eq!(plan.performances.len(), 24);
    }

    #[test]
    fn players_who_played_are_flagged_with_todays_number() {
        let snapshot = sample_season(4, 0);
        let plan = plan(&snapshot);
        let played: BTreeSet<PlayerId> = plan.performances.iter().map(|p| p.player_id).collect();
        for record in plan.availability.iter().filter(|r| played.contains(&r.player_id)) {
            assert!(record.has_played_current_matchday);
            assert_eq!(record.last_played_matchday, Some(1));
            assert_eq!(record.competition, CompetitionKind::League);
        }
        let flagged = plan
            .availability
            .iter()
            .filter(|r| r.has_played_current_matchday)
            .count();
        assert_eq!(flagged, played.len());
    }

    #[test]
    fn plan_is_deterministic() {
        let snapshot = sample_season(4, 0);
        let a = plan(&snapshot);
        let b = plan(&snapshot);
        assert_eq!(a.outcomes, b.outcomes);
        assert_eq!(a.performances, b.performances);
    }

    #[test]
    fn short_squad_skips_fixture_without_blocking_siblings() {
        let snapshot = SeasonBuilder::new(4, 0).short_club(0, 5).build().unwrap();
        let plan = plan(&snapshot);
        assert_eq!(plan.summary.skipped.len(), 1);
        assert!(matches!(
            plan.summary.skipped[0].reason,
            SkipReason::InsufficientRoster { .. }
        ));
        assert_eq!(plan.summary.matches_simulated, 1);
        assert!(plan.summary.is_partial());
    }

    #[test]
    fn completed_season_has_no_plan() {
        let mut snapshot = sample_season(2, 0);
        for day in &mut snapshot.calendar {
            day.is_simulated = true;
        }
        let result = plan_day(&snapshot, &EngineConfig::default(), &TotalPinsRule::default());
        assert_eq!(result.unwrap(), None);
    }

    #[test]
    fn cup_byes_resolve_and_round_advances() {
        // Three cup teams: one bye, one tie.
        let mut snapshot = sample_season(0, 3);
        let plan = plan(&snapshot);
        assert_eq!(plan.match_day, MatchDay::Cup(1));
        assert_eq!(plan.summary.byes_resolved, 1);
        assert_eq!(plan.summary.matches_simulated, 1);
        assert_eq!(plan.summary.cups_advanced.len(), 1);
        assert_eq!(plan.new_fixtures.len(), 1);
        assert_eq!(plan.new_fixtures[0].match_day_number, 2);
        snapshot.apply_day(&plan);
        assert_eq!(snapshot.cups[0].current_round_number, 2);
    }

    #[test]
    fn short_cup_side_skips_the_tie_by_default() {
        let snapshot = SeasonBuilder::new(0, 2).short_club(1, 3).build().unwrap();
        let plan = plan(&snapshot);
        assert!(plan.summary.walkovers.is_empty());
        assert_eq!(plan.summary.skipped.len(), 1);
        assert!(matches!(
            plan.summary.skipped[0].reason,
            SkipReason::InsufficientRoster {
                home_shortfall: 0,
                away_shortfall: 3
            } | SkipReason::InsufficientRoster {
                home_shortfall: 3,
                away_shortfall: 0
            }
        ));
        assert!(plan.outcomes.is_empty());
        assert!(plan.summary.cups_finished.is_empty());
        assert!(plan.cups.iter().all(|cup| cup.is_active && cup.winner.is_none()));
    }

    #[test]
    fn cup_walkover_when_one_side_is_short() {
        let snapshot = SeasonBuilder::new(0, 2).short_club(1, 3).build().unwrap();
        let mut config = EngineConfig::default();
        config.cup.walkover_on_shortfall = true;
        let plan = plan_day(&snapshot, &config, &TotalPinsRule::default())
            .unwrap()
            .unwrap();
        assert!(plan.summary.skipped.is_empty());
        assert_eq!(plan.summary.walkovers.len(), 1);
        assert_eq!(plan.summary.matches_simulated, 0);
        assert_eq!(plan.summary.cups_finished.len(), 1);
        let cup = &plan.cups[0];
        assert!(!cup.is_active);
        assert!(cup.winner.is_some());
        assert!(plan.performances.is_empty());
    }
}
