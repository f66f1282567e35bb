//! Match Simulator: pins from skill attributes, deterministic per seed.
//!
//! Every player bowls `sets_per_player` lanes. Each lane is split into
//! full-rack throws and clearing throws; the expected pins per throw rise
//! with strength and the matching technique component, and every throw
//! carries bounded uniform variance that narrows with consistency. Away
//! sides in league play and both sides in cup play lose pins to pressure
//! unless they resist it.
//!
//! The random stream is a [`ChaCha8Rng`] seeded from the fixture seed and
//! consumed in slot order (home first), so identical inputs always give
//! byte-identical results.

use pinfall_types::{
    CompetitionKind, DecidedBy, Fixture, FixtureId, FixtureResult, LaneScore, PerformanceRecord,
    Player, Side, TeamId,
};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::config::SimulationParams;
use crate::scoring::{PlayerLine, ScoringRule};

/// Highest pin count a single throw can score.
const MAX_PINS_PER_THROW: f64 = 9.0;

/// Errors raised by the simulator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    /// Byes resolve without simulation.
    #[error("fixture {fixture_id} is a bye")]
    ByeFixture {
        /// The fixture.
        fixture_id: FixtureId,
    },

    /// One side has nobody to bowl.
    #[error("fixture {fixture_id}: {side:?} roster is empty")]
    EmptyRoster {
        /// The fixture.
        fixture_id: FixtureId,
        /// The empty side.
        side: Side,
    },

    /// The parameters cannot produce a game.
    #[error("invalid simulation parameters: {reason}")]
    InvalidParameters {
        /// What is wrong.
        reason: String,
    },
}

/// A rostered player handed to the simulator.
#[derive(Debug, Clone, Copy)]
pub struct RosterEntry<'a> {
    /// The player.
    pub player: &'a Player,
    /// Roster slot (1-based).
    pub slot: u8,
    /// Whether the player is a stand-in.
    pub is_stand_in: bool,
}

/// Aggregate of one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SideScore {
    /// The team.
    pub team_id: TeamId,
    /// Total pins.
    pub total_pins: u32,
    /// Match points.
    pub points: Decimal,
    /// Best single player total on this side.
    pub best_player_pins: u32,
}

/// Outcome of one simulated fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationResult {
    /// The fixture.
    pub fixture_id: FixtureId,
    /// Seed the game ran with.
    pub seed: u64,
    /// Home side aggregate.
    pub home: SideScore,
    /// Away side aggregate.
    pub away: SideScore,
    /// Winning side (`None` only for a league draw).
    pub winner: Option<Side>,
    /// One record per participating player, home first, in slot order.
    pub records: Vec<PerformanceRecord>,
}

impl SimulationResult {
    /// The stored form of the result.
    pub fn fixture_result(&self) -> FixtureResult {
        FixtureResult {
            home_pins: self.home.total_pins,
            away_pins: self.away.total_pins,
            home_points: self.home.points,
            away_points: self.away.points,
            winner: self.winner,
            decided_by: DecidedBy::Simulation,
            seed: self.seed,
        }
    }
}

/// Derive the seed of a fixture from the season seed and the fixture id.
///
/// The fixture id selects an independent `ChaCha` stream, so seeds do not
/// depend on the order in which fixtures are simulated.
pub fn fixture_seed(season_seed: u64, fixture_id: FixtureId) -> u64 {
    let (high, low) = fixture_id.into_inner().as_u64_pair();
    let mut rng = ChaCha8Rng::seed_from_u64(season_seed);
    rng.set_stream(high ^ low);
    rng.next_u64()
}

/// Simulate one fixture.
///
/// Pure: the result depends only on the arguments.
pub fn simulate(
    fixture: &Fixture,
    home: &[RosterEntry<'_>],
    away: &[RosterEntry<'_>],
    seed: u64,
    params: &SimulationParams,
    scoring: &dyn ScoringRule,
) -> Result<SimulationResult, SimulationError> {
    let Some(away_team_id) = fixture.away_team_id else {
        return Err(SimulationError::ByeFixture {
            fixture_id: fixture.id,
        });
    };
    for (side, roster) in [(Side::Home, home), (Side::Away, away)] {
        if roster.is_empty() {
            return Err(SimulationError::EmptyRoster {
                fixture_id: fixture.id,
                side,
            });
        }
    }
    if params.sets_per_player == 0 || params.throws_per_set < 2 {
        return Err(SimulationError::InvalidParameters {
            reason: "need at least one set of two throws".to_owned(),
        });
    }

    let competition = fixture.competition.kind();
    let knockout = competition == CompetitionKind::Cup;
    let (home_pressure, away_pressure) = if knockout {
        (params.cup_pressure, params.cup_pressure)
    } else {
        (0.0, params.league_away_pressure)
    };

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let home_games = play_side(home, home_pressure, &mut rng, params);
    let away_games = play_side(away, away_pressure, &mut rng, params);

    let home_lines = lines(&home_games);
    let away_lines = lines(&away_games);
    let score = scoring.score(&home_lines, &away_lines);

    let home_score = side_score(fixture.home_team_id, &home_lines, score.home_points);
    let away_score = side_score(away_team_id, &away_lines, score.away_points);
    let winner = decide(&home_score, &away_score, knockout);

    let records = home_games
        .into_iter()
        .map(|game| (fixture.home_team_id, game))
        .chain(away_games.into_iter().map(|game| (away_team_id, game)))
        .map(|(team_id, game)| {
            let total_pins = game.total_pins();
            let misses = game
                .lanes
                .iter()
                .map(|lane| u32::from(lane.misses))
                .fold(0, u32::saturating_add);
            PerformanceRecord {
                fixture_id: fixture.id,
                player_id: game.entry.player.id,
                team_id,
                competition,
                match_day_number: fixture.match_day_number,
                date: fixture.scheduled_date,
                slot: game.entry.slot,
                lanes: game.lanes,
                total_pins,
                misses,
                points: score
                    .player_points
                    .get(&game.entry.player.id)
                    .copied()
                    .unwrap_or(Decimal::ZERO),
                is_stand_in: game.entry.is_stand_in,
            }
        })
        .collect();

    debug!(
        fixture_id = %fixture.id,
        seed,
        rule = scoring.name(),
        home_pins = home_score.total_pins,
        away_pins = away_score.total_pins,
        ?winner,
        "fixture simulated"
    );

    Ok(SimulationResult {
        fixture_id: fixture.id,
        seed,
        home: home_score,
        away: away_score,
        winner,
        records,
    })
}

struct PlayerGame<'a> {
    entry: RosterEntry<'a>,
    lanes: Vec<LaneScore>,
}

impl PlayerGame<'_> {
    fn total_pins(&self) -> u32 {
        self.lanes
            .iter()
            .map(|lane| u32::from(lane.total()))
            .fold(0, u32::saturating_add)
    }
}

fn play_side<'a>(
    roster: &[RosterEntry<'a>],
    pressure: f64,
    rng: &mut ChaCha8Rng,
    params: &SimulationParams,
) -> Vec<PlayerGame<'a>> {
    let mut ordered = roster.to_vec();
    ordered.sort_by_key(|entry| (entry.slot, entry.player.id));
    ordered
        .into_iter()
        .map(|entry| PlayerGame {
            entry,
            lanes: play_game(entry.player, pressure, rng, params),
        })
        .collect()
}

/// Bowl all lanes of one player.
fn play_game(
    player: &Player,
    pressure: f64,
    rng: &mut ChaCha8Rng,
    params: &SimulationParams,
) -> Vec<LaneScore> {
    let skills = &player.skills;
    let full_throws = params.throws_per_set / 2;
    let clearing_throws = params.throws_per_set.saturating_sub(full_throws);

    let full_skill = skill(skills.strength, skills.technique.full_pins);
    let clearing_skill = skill(skills.strength, skills.technique.clearing);
    let shakiness = f64::from(100_u8.saturating_sub(skills.consistency)) / 100.0;
    let spread = params.throw_variance * shakiness;
    let miss_chance = (params.miss_rate * shakiness).clamp(0.0, 1.0);

    let exposure = f64::from(100_u8.saturating_sub(skills.pressure_resistance)) / 100.0;
    let penalty = pressure.clamp(0.0, 1.0) * exposure * params.pressure_penalty_per_set
        / f64::from(params.throws_per_set);

    let full_mean = lerp(params.full_pins_floor, params.full_pins_ceiling, full_skill) - penalty;
    let clearing_mean =
        lerp(params.clearing_floor, params.clearing_ceiling, clearing_skill) - penalty;

    (1..=params.sets_per_player)
        .map(|lane| {
            let (full, full_misses) = throws(rng, full_throws, full_mean, spread, miss_chance);
            let (clearance, clearing_misses) =
                throws(rng, clearing_throws, clearing_mean, spread, miss_chance);
            LaneScore {
                lane,
                full,
                clearance,
                misses: full_misses.saturating_add(clearing_misses),
            }
        })
        .collect()
}

/// Bowl `count` throws; returns pins and misses.
fn throws(rng: &mut ChaCha8Rng, count: u8, mean: f64, spread: f64, miss_chance: f64) -> (u16, u8) {
    let mut pins: u16 = 0;
    let mut misses: u8 = 0;
    for _ in 0..count {
        let knocked = if rng.random_bool(miss_chance) {
            0
        } else {
            to_pins(mean + rng.random_range(-spread..=spread))
        };
        if knocked == 0 {
            misses = misses.saturating_add(1);
        }
        pins = pins.saturating_add(knocked);
    }
    (pins, misses)
}

fn skill(strength: u8, technique: u8) -> f64 {
    (f64::from(strength.min(100)) + f64::from(technique.min(100))) / 200.0
}

fn lerp(floor: f64, ceiling: f64, t: f64) -> f64 {
    (ceiling - floor).mul_add(t, floor)
}

fn to_pins(value: f64) -> u16 {
    let clamped = value.round().clamp(0.0, MAX_PINS_PER_THROW);
    // Clamped to 0..=9, so the cast is exact.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pins = clamped as u16;
    pins
}

fn lines(games: &[PlayerGame<'_>]) -> Vec<PlayerLine> {
    games
        .iter()
        .map(|game| PlayerLine {
            player_id: game.entry.player.id,
            slot: game.entry.slot,
            total_pins: game.total_pins(),
        })
        .collect()
}

fn side_score(team_id: TeamId, lines: &[PlayerLine], points: Decimal) -> SideScore {
    SideScore {
        team_id,
        total_pins: lines
            .iter()
            .map(|line| line.total_pins)
            .fold(0, u32::saturating_add),
        points,
        best_player_pins: lines.iter().map(|line| line.total_pins).max().unwrap_or(0),
    }
}

/// Pick the winner. Knock-out ties fall back to total pins, then the best
/// single player, then the home side.
fn decide(home: &SideScore, away: &SideScore, knockout: bool) -> Option<Side> {
    let by_points = home.points.cmp(&away.points);
    let ordering = if knockout {
        by_points
            .then(home.total_pins.cmp(&away.total_pins))
            .then(home.best_player_pins.cmp(&away.best_player_pins))
    } else {
        by_points
    };
    match ordering {
        core::cmp::Ordering::Greater => Some(Side::Home),
        core::cmp::Ordering::Less => Some(Side::Away),
        core::cmp::Ordering::Equal if knockout => Some(Side::Home),
        core::cmp::Ordering::Equal => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use pinfall_types::{
        ClubId, CompetitionRef, CupId, LeagueId, PlayerId, SeasonId, SkillProfile, Technique,
    };

    use super::*;
    use crate::scoring::TotalPinsRule;

    fn player(strength: u8, consistency: u8) -> Player {
        Player {
            id: PlayerId::new(),
            club_id: ClubId::new(),
            name: "Bowler".to_owned(),
            age: 28,
            skills: SkillProfile {
                strength,
                consistency,
                pressure_resistance: 50,
                technique: Technique {
                    full_pins: strength,
                    clearing: strength,
                },
            },
            is_available: true,
            is_reserve: false,
        }
    }

    fn fixture(competition: CompetitionRef) -> Fixture {
        Fixture {
            id: FixtureId::new(),
            season_id: SeasonId::new(),
            competition,
            round: 1,
            match_day_number: 1,
            bracket_slot: 0,
            home_team_id: TeamId::new(),
            away_team_id: Some(TeamId::new()),
            scheduled_date: None,
            is_played: false,
            result: None,
        }
    }

    fn roster(players: &[Player]) -> Vec<RosterEntry<'_>> {
        players
            .iter()
            .enumerate()
            .map(|(i, player)| RosterEntry {
                player,
                slot: u8::try_from(i + 1).unwrap(),
                is_stand_in: false,
            })
            .collect()
    }

    fn team(strength: u8) -> Vec<Player> {
        (0..6).map(|_| player(strength, 70)).collect()
    }

    #[test]
    fn same_seed_gives_byte_identical_result() {
        let fixture = fixture(CompetitionRef::League(LeagueId::new()));
        let home = team(60);
        let away = team(55);
        let params = SimulationParams::default();
        let rule = TotalPinsRule::default();

        let first = simulate(&fixture, &roster(&home), &roster(&away), 99, &params, &rule).unwrap();
        let second =
            simulate(&fixture, &roster(&home), &roster(&away), 99, &params, &rule).unwrap();
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[test]
    fn different_seeds_differ() {
        let fixture = fixture(CompetitionRef::League(LeagueId::new()));
        let home = team(60);
        let away = team(60);
        let params = SimulationParams::default();
        let rule = TotalPinsRule::default();
        let a = simulate(&fixture, &roster(&home), &roster(&away), 1, &params, &rule).unwrap();
        let b = simulate(&fixture, &roster(&home), &roster(&away), 2, &params, &rule).unwrap();
        assert_ne!(a.records, b.records);
    }

    #[test]
    fn one_record_per_player_with_bounded_lanes() {
        let fixture = fixture(CompetitionRef::League(LeagueId::new()));
        let home = team(70);
        let away = team(40);
        let params = SimulationParams::default();
        let result = simulate(
            &fixture,
            &roster(&home),
            &roster(&away),
            7,
            &params,
            &TotalPinsRule::default(),
        )
        .unwrap();

        assert_eq!(result.records.len(), 12);
        let max_lane = u16::from(params.throws_per_set) * 9;
        for record in &result.records {
            assert_eq!(record.lanes.len(), usize::from(params.sets_per_player));
            assert!(record.lanes.iter().all(|lane| lane.total() <= max_lane));
            let sum: u32 = record.lanes.iter().map(|l| u32::from(l.total())).sum();
            assert_eq!(sum, record.total_pins);
        }
        let home_sum: u32 = result
            .records
            .iter()
            .filter(|r| r.team_id == fixture.home_team_id)
            .map(|r| r.total_pins)
            .sum();
        assert_eq!(home_sum, result.home.total_pins);
    }

    #[test]
    fn much_stronger_side_wins() {
        let params = SimulationParams::default();
        let rule = TotalPinsRule::default();
        let strong = team(90);
        let weak = team(15);
        for seed in 0..10 {
            let fixture = fixture(CompetitionRef::League(LeagueId::new()));
            let result =
                simulate(&fixture, &roster(&weak), &roster(&strong), seed, &params, &rule).unwrap();
            assert_eq!(result.winner, Some(Side::Away));
            assert_eq!(result.fixture_result().away_points, Decimal::TWO);
        }
    }

    #[test]
    fn cup_ties_always_have_a_winner() {
        let params = SimulationParams {
            throw_variance: 0.0,
            miss_rate: 0.0,
            ..SimulationParams::default()
        };
        let fixture = fixture(CompetitionRef::Cup(CupId::new()));
        let home = team(50);
        let away: Vec<Player> = home
            .iter()
            .map(|p| Player {
                id: PlayerId::new(),
                ..p.clone()
            })
            .collect();
        let result = simulate(
            &fixture,
            &roster(&home),
            &roster(&away),
            3,
            &params,
            &TotalPinsRule::default(),
        )
        .unwrap();
        // Identical sides without variance tie on everything; home advances.
        assert_eq!(result.home.total_pins, result.away.total_pins);
        assert_eq!(result.winner, Some(Side::Home));
    }

    #[test]
    fn bye_cannot_be_simulated() {
        let mut fixture = fixture(CompetitionRef::Cup(CupId::new()));
        fixture.away_team_id = None;
        let home = team(50);
        let result = simulate(
            &fixture,
            &roster(&home),
            &[],
            1,
            &SimulationParams::default(),
            &TotalPinsRule::default(),
        );
        assert_eq!(
            result.unwrap_err(),
            SimulationError::ByeFixture {
                fixture_id: fixture.id
            }
        );
    }

    #[test]
    fn empty_roster_is_rejected() {
        let fixture = fixture(CompetitionRef::League(LeagueId::new()));
        let home = team(50);
        let result = simulate(
            &fixture,
            &roster(&home),
            &[],
            1,
            &SimulationParams::default(),
            &TotalPinsRule::default(),
        );
        assert!(matches!(
            result,
            Err(SimulationError::EmptyRoster {
                side: Side::Away,
                ..
            })
        ));
    }

    #[test]
    fn stand_in_flag_reaches_record() {
        let fixture = fixture(CompetitionRef::League(LeagueId::new()));
        let home = team(50);
        let away = team(50);
        let mut home_roster = roster(&home);
        if let Some(last) = home_roster.last_mut() {
            last.is_stand_in = true;
        }
        let result = simulate(
            &fixture,
            &home_roster,
            &roster(&away),
            5,
            &SimulationParams::default(),
            &TotalPinsRule::default(),
        )
        .unwrap();
        let stand_ins = result.records.iter().filter(|r| r.is_stand_in).count();
        assert_eq!(stand_ins, 1);
    }

    #[test]
    fn fixture_seed_is_stable_and_fixture_specific() {
        let a = FixtureId::new();
        let b = FixtureId::new();
        assert_eq!(fixture_seed(42, a), fixture_seed(42, a));
        assert_ne!(fixture_seed(42, a), fixture_seed(42, b));
        assert_ne!(fixture_seed(42, a), fixture_seed(43, a));
    }
}
