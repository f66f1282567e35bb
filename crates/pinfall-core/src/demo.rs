//! A generated season for demos and tests.
//!
//! Creates one league and optionally one cup, with one team per club and a
//! squad of regulars plus reserves for every club. Player skills are drawn
//! from a seeded RNG, so the same builder settings always produce the same
//! squads. Fixtures and the calendar are generated the same way the engine
//! prepares a stored season.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use pinfall_types::{
    Club, ClubId, Cup, CupId, League, LeagueId, Player, PlayerId, Season, SeasonId, SkillProfile,
    Team, TeamId, Technique,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::calendar::CalendarError;
use crate::config::{CalendarConfig, EngineConfig};
use crate::schedule::ScheduleError;
use crate::season::{self, SeasonSnapshot};

/// Errors raised while generating a season.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DemoError {
    /// Fixture generation failed.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    /// Calendar construction failed.
    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

const CLUB_NAMES: &[&str] = &[
    "KSC Eintracht",
    "SKV Rot-Weiss",
    "KV Gut Holz",
    "SG Kegelfreunde",
    "TSV Alle Neune",
    "SV Blau-Gelb",
    "KC Vorwaerts",
    "ESV Lokomotive",
    "SKC Victoria",
    "KSV Germania",
    "TuS Bahnfrei",
    "KF Concordia",
];

/// Builder for a generated season.
#[derive(Debug, Clone)]
pub struct SeasonBuilder {
    league_teams: usize,
    cup_teams: usize,
    squad_size: usize,
    reserves: usize,
    short: BTreeMap<usize, usize>,
    seed: u64,
    start: NaiveDate,
    calendar: CalendarConfig,
}

impl SeasonBuilder {
    /// A season with `league_teams` teams in one league and a cup of
    /// `cup_teams` teams.
    ///
    /// Cup entrants are the first league teams; when the league is smaller
    /// than the cup, the remaining entrants are clubs without a league team.
    pub fn new(league_teams: usize, cup_teams: usize) -> Self {
        let calendar = EngineConfig::default().calendar;
        Self {
            league_teams,
            cup_teams,
            squad_size: 6,
            reserves: 2,
            short: BTreeMap::new(),
            seed: 42,
            start: NaiveDate::from_ymd_opt(2026, 9, 5).unwrap_or_default(),
            calendar,
        }
    }

    /// Regular players per club.
    #[must_use]
    pub const fn squad_size(mut self, players: usize) -> Self {
        self.squad_size = players;
        self
    }

    /// Reserve players per club.
    #[must_use]
    pub const fn reserves(mut self, players: usize) -> Self {
        self.reserves = players;
        self
    }

    /// Give the club at `index` only `players` players, all regulars.
    #[must_use]
    pub fn short_club(mut self, index: usize, players: usize) -> Self {
        self.short.insert(index, players);
        self
    }

    /// Season seed, also used for player generation.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// First day of the season.
    #[must_use]
    pub const fn start(mut self, date: NaiveDate) -> Self {
        self.start = date;
        self
    }

    /// Calendar rules.
    #[must_use]
    pub fn calendar(mut self, calendar: CalendarConfig) -> Self {
        self.calendar = calendar;
        self
    }

    /// Generate the season with fixtures and calendar.
    pub fn build(&self) -> Result<SeasonSnapshot, DemoError> {
        let mut snapshot = self.build_unprepared();
        let prepared = season::prepare_fixtures(&snapshot, &self.calendar)?;
        snapshot.apply_prepared(&prepared);
        let planned = season::plan_calendar(&snapshot, &self.calendar)?;
        snapshot.apply_calendar(&planned.days, &planned.fixture_dates);
        Ok(snapshot)
    }

    /// Generate clubs, teams, players and competitions only.
    pub fn build_unprepared(&self) -> SeasonSnapshot {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let season_id = SeasonId::new();
        let season = Season {
            id: season_id,
            name: format!("Season {}", self.start.format("%Y")),
            start_date: self.start,
            end_date: self.start.checked_add_days(Days::new(300)).unwrap_or(self.start),
            is_current: true,
            seed: self.seed,
        };

        let league = League {
            id: LeagueId::new(),
            season_id,
            name: "Bezirksliga".to_owned(),
            tier: 2,
            age_class: None,
        };

        let club_count = self.league_teams.max(self.cup_teams);
        let mut clubs = Vec::with_capacity(club_count);
        let mut teams = Vec::with_capacity(club_count);
        let mut players = Vec::new();

        for index in 0..club_count {
            let name = CLUB_NAMES
                .get(index.checked_rem(CLUB_NAMES.len()).unwrap_or(0))
                .copied()
                .unwrap_or("KSC");
            let generation = index
                .checked_div(CLUB_NAMES.len())
                .unwrap_or(0)
                .saturating_add(1);
            let club = Club {
                id: ClubId::new(),
                name: format!("{name} {generation}"),
            };
            let rating = rng.random_range(900_u16..=1100);
            teams.push(Team {
                id: TeamId::new(),
                club_id: club.id,
                league_id: (index < self.league_teams).then_some(league.id),
                name: format!("{} I", club.name),
                squad_rank: 1,
                rating,
            });

            let (regulars, reserves) = self
                .short
                .get(&index)
                .map_or((self.squad_size, self.reserves), |n| (*n, 0));
            for n in 0..regulars.saturating_add(reserves) {
                players.push(generate_player(&mut rng, club.id, n, n >= regulars));
            }
            clubs.push(club);
        }

        let leagues = if self.league_teams > 0 {
            vec![league]
        } else {
            Vec::new()
        };
        let cups = if self.cup_teams > 0 {
            vec![Cup {
                id: CupId::new(),
                season_id,
                name: "Bezirkspokal".to_owned(),
                participants: teams.iter().take(self.cup_teams).map(|t| t.id).collect(),
                current_round_number: 0,
                total_rounds: 0,
                is_active: true,
                winner: None,
            }]
        } else {
            Vec::new()
        };

        SeasonSnapshot {
            season,
            calendar: Vec::new(),
            leagues,
            cups,
            clubs,
            teams,
            players,
            fixtures: Vec::new(),
            availability: Vec::new(),
            overrides: Vec::new(),
            performances: Vec::new(),
        }
    }
}

fn generate_player(rng: &mut ChaCha8Rng, club_id: ClubId, n: usize, is_reserve: bool) -> Player {
    let base: u8 = if is_reserve {
        rng.random_range(35..=55)
    } else {
        rng.random_range(50..=85)
    };
    let spread = |rng: &mut ChaCha8Rng| base.saturating_add(rng.random_range(0..=10)).min(100);
    Player {
        id: PlayerId::new(),
        club_id,
        name: format!("Player {}", n.saturating_add(1)),
        age: rng.random_range(18..=55),
        skills: SkillProfile {
            strength: base,
            consistency: spread(rng),
            pressure_resistance: spread(rng),
            technique: Technique {
                full_pins: spread(rng),
                clearing: spread(rng),
            },
        },
        is_available: true,
        is_reserve,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn builds_league_and_cup() {
        let snapshot = SeasonBuilder::new(6, 4).build().unwrap();
        assert_eq!(snapshot.clubs.len(), 6);
        assert_eq!(snapshot.players.len(), 6 * 8);
        // 6 teams: 5 rounds of 3; cup of 4: 2 ties.
        assert_eq!(snapshot.fixtures.len(), 15 + 2);
        assert_eq!(snapshot.cups[0].total_rounds, 2);
        assert!(!snapshot.calendar.is_empty());
    }

    #[test]
    fn same_seed_same_squads() {
        let a = SeasonBuilder::new(4, 0).build_unprepared();
        let b = SeasonBuilder::new(4, 0).build_unprepared();
        let skills = |s: &SeasonSnapshot| s.players.iter().map(|p| p.skills).collect::<Vec<_>>();
        assert_eq!(skills(&a), skills(&b));
    }

    #[test]
    fn short_club_has_no_reserves() {
        let snapshot = SeasonBuilder::new(2, 0).short_club(1, 3).build_unprepared();
        let club = snapshot.clubs.get(1).unwrap().id;
        let squad: Vec<_> = snapshot.players.iter().filter(|p| p.club_id == club).collect();
        assert_eq!(squad.len(), 3);
        assert!(squad.iter().all(|p| !p.is_reserve));
    }
}
