//! League tables from played fixtures.

use std::collections::BTreeMap;

use pinfall_types::{CompetitionRef, Fixture, League, Side, TableZone, Team, TeamId};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::StandingsConfig;

/// One row of a league table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    /// Position (1-based).
    pub position: u32,
    /// The team.
    pub team_id: TeamId,
    /// Fixtures played.
    pub played: u32,
    /// Fixtures won.
    pub won: u32,
    /// Fixtures drawn.
    pub drawn: u32,
    /// Fixtures lost.
    pub lost: u32,
    /// Pins scored.
    pub pins_for: u64,
    /// Pins conceded.
    pub pins_against: u64,
    /// Match points.
    pub points: Decimal,
    /// Zone of the position.
    pub zone: TableZone,
}

impl TableRow {
    /// Pins scored minus pins conceded.
    pub fn pin_difference(&self) -> i128 {
        i128::from(self.pins_for).saturating_sub(i128::from(self.pins_against))
    }
}

/// Compute the table of a league.
///
/// Ordered by points, pin difference, pins for, then team id. Promotion
/// zones apply only below the top tier.
pub fn league_table(
    league: &League,
    teams: &[Team],
    fixtures: &[Fixture],
    rules: &StandingsConfig,
) -> Vec<TableRow> {
    let mut rows: BTreeMap<TeamId, TableRow> = teams
        .iter()
        .filter(|t| t.league_id == Some(league.id))
        .map(|t| (t.id, empty_row(t.id)))
        .collect();

    for fixture in fixtures
        .iter()
        .filter(|f| f.competition == CompetitionRef::League(league.id))
    {
        let (Some(result), Some(away_id)) = (&fixture.result, fixture.away_team_id) else {
            continue;
        };
        if !fixture.is_played {
            continue;
        }
        for (side, team_id, pins_for, pins_against, points) in [
            (
                Side::Home,
                fixture.home_team_id,
                result.home_pins,
                result.away_pins,
                result.home_points,
            ),
            (
                Side::Away,
                away_id,
                result.away_pins,
                result.home_pins,
                result.away_points,
            ),
        ] {
            let Some(row) = rows.get_mut(&team_id) else {
                continue;
            };
            row.played = row.played.saturating_add(1);
            match result.winner {
                Some(winner) if winner == side => row.won = row.won.saturating_add(1),
                Some(_) => row.lost = row.lost.saturating_add(1),
                None => row.drawn = row.drawn.saturating_add(1),
            }
            row.pins_for = row.pins_for.saturating_add(u64::from(pins_for));
            row.pins_against = row.pins_against.saturating_add(u64::from(pins_against));
            row.points = row.points.saturating_add(points);
        }
    }

    let mut table: Vec<TableRow> = rows.into_values().collect();
    table.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then(b.pin_difference().cmp(&a.pin_difference()))
            .then(b.pins_for.cmp(&a.pins_for))
            .then(a.team_id.cmp(&b.team_id))
    });

    let size = u32::try_from(table.len()).unwrap_or(u32::MAX);
    let promotion = if league.tier > 1 {
        rules.promotion_spots
    } else {
        0
    };
    let relegation_from = size.saturating_sub(rules.relegation_spots);
    for (position, row) in (1_u32..).zip(table.iter_mut()) {
        row.position = position;
        row.zone = if position <= promotion {
            TableZone::Promotion
        } else if position > relegation_from {
            TableZone::Relegation
        } else {
            TableZone::Safe
        };
    }
    table
}

const fn empty_row(team_id: TeamId) -> TableRow {
    TableRow {
        position: 0,
        team_id,
        played: 0,
        won: 0,
        drawn: 0,
        lost: 0,
        pins_for: 0,
        pins_against: 0,
        points: Decimal::ZERO,
        zone: TableZone::Safe,
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use pinfall_types::{ClubId, DecidedBy, FixtureId, FixtureResult, LeagueId, SeasonId};

    use super::*;

    fn league(tier: u8) -> League {
        League {
            id: LeagueId::new(),
            season_id: SeasonId::new(),
            name: "Kreisliga".to_owned(),
            tier,
            age_class: None,
        }
    }

    fn team(league: &League) -> Team {
        Team {
            id: TeamId::new(),
            club_id: ClubId::new(),
            league_id: Some(league.id),
            name: "Team".to_owned(),
            squad_rank: 1,
            rating: 1000,
        }
    }

    fn played(league: &League, home: TeamId, away: TeamId, pins: (u32, u32)) -> Fixture {
        let (home_points, away_points, winner) = match pins.0.cmp(&pins.1) {
            core::cmp::Ordering::Greater => (Decimal::TWO, Decimal::ZERO, Some(Side::Home)),
            core::cmp::Ordering::Less => (Decimal::ZERO, Decimal::TWO, Some(Side::Away)),
            core::cmp::Ordering::Equal => (Decimal::ONE, Decimal::ONE, None),
        };
        Fixture {
            id: FixtureId::new(),
            season_id: league.season_id,
            competition: CompetitionRef::League(league.id),
            round: 1,
            match_day_number: 1,
            bracket_slot: 0,
            home_team_id: home,
            away_team_id: Some(away),
            scheduled_date: None,
            is_played: true,
            result: Some(FixtureResult {
                home_pins: pins.0,
                away_pins: pins.1,
                home_points,
                away_points,
                winner,
                decided_by: DecidedBy::Simulation,
                seed: 0,
            }),
        }
    }

    #[test]
    fn table_orders_by_points_then_pins() {
        let league = league(2);
        let teams: Vec<Team> = (0..4).map(|_| team(&league)).collect();
        let fixtures = vec![
            played(&league, teams[0].id, teams[1].id, (3100, 3000)),
            played(&league, teams[2].id, teams[3].id, (3050, 3000)),
            played(&league, teams[0].id, teams[2].id, (3000, 3000)),
        ];
        let config = StandingsConfig {
            promotion_spots: 1,
            relegation_spots: 1,
        };
        let table = league_table(&league, &teams, &fixtures, &config);

        assert_eq!(table[0].team_id, teams[0].id);
        assert_eq!(table[0].points, Decimal::from(3));
        assert_eq!(table[0].zone, TableZone::Promotion);
        assert_eq!(table[1].team_id, teams[2].id);
        assert_eq!(table[1].drawn, 1);
        assert_eq!(table[3].zone, TableZone::Relegation);
        assert_eq!(table[3].team_id, teams[1].id);
    }

    #[test]
    fn top_tier_has_no_promotion() {
        let league = league(1);
        let teams: Vec<Team> = (0..3).map(|_| team(&league)).collect();
        let table = league_table(&league, &teams, &[], &StandingsConfig::default());
        assert!(table.iter().all(|row| row.zone != TableZone::Promotion));
        assert_eq!(table.len(), 3);
        assert_eq!(table.iter().filter(|r| r.zone == TableZone::Relegation).count(), 2);
    }

    #[test]
    fn unplayed_and_foreign_fixtures_are_ignored() {
        let other = league(2);
        let league = league(2);
        let teams: Vec<Team> = (0..2).map(|_| team(&league)).collect();
        let mut pending = played(&league, teams[0].id, teams[1].id, (3000, 2000));
        pending.is_played = false;
        let foreign = played(&other, teams[0].id, teams[1].id, (3000, 2000));
        let table = league_table(&league, &teams, &[pending, foreign], &StandingsConfig::default());
        assert!(table.iter().all(|row| row.played == 0));
    }
}
