//! Season preparation: league round robins and cup brackets.
//!
//! League fixtures come from the circle method. Cup brackets are seeded by
//! team rating into a power-of-two draw; the top seeds get byes. Cup round
//! `r` of a cup with `R` rounds is played on cup day `C - R + r`, where `C`
//! is the number of cup days in the season, so every final lands on the
//! last cup day.

use std::collections::{BTreeMap, VecDeque};

use pinfall_types::{
    CalendarDay, CompetitionRef, Cup, CupId, Fixture, FixtureId, League, LeagueId, MatchDay,
    SeasonId, Team, TeamId,
};
use tracing::{debug, info};

use crate::calendar;

/// Errors raised while generating fixtures or advancing cups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// A cup needs at least two teams.
    #[error("cup {cup_id} has {participants} participant(s); at least two are needed")]
    TooFewParticipants {
        /// The cup.
        cup_id: CupId,
        /// Participants entered.
        participants: usize,
    },

    /// A cup participant is not a known team.
    #[error("cup {cup_id} lists unknown team {team_id}")]
    UnknownTeam {
        /// The cup.
        cup_id: CupId,
        /// The unknown team.
        team_id: TeamId,
    },

    /// The season has fewer cup days than the cup has rounds.
    #[error("cup {cup_id} needs {rounds} cup days but the season has {cup_days}")]
    NotEnoughCupDays {
        /// The cup.
        cup_id: CupId,
        /// Rounds the cup needs.
        rounds: u32,
        /// Cup days in the season.
        cup_days: u32,
    },

    /// A played cup fixture has no winner.
    #[error("cup {cup_id} fixture {fixture_id} was played without a winner")]
    UndecidedTie {
        /// The cup.
        cup_id: CupId,
        /// The fixture.
        fixture_id: FixtureId,
    },

    /// The league has fewer than two teams.
    #[error("league {league_id} has too few teams for a round robin")]
    TooFewTeams {
        /// The league.
        league_id: LeagueId,
    },
}

/// Generate the round-robin fixtures of a league.
///
/// An odd field is padded with a bye slot; pairings against it produce no
/// fixture. Home and away alternate by round for the pinned team, and every
/// further leg mirrors the previous one with sides swapped.
pub fn generate_league_fixtures(
    season_id: SeasonId,
    league: &League,
    team_ids: &[TeamId],
    legs: u32,
) -> Result<Vec<Fixture>, ScheduleError> {
    if team_ids.len() < 2 {
        return Err(ScheduleError::TooFewTeams {
            league_id: league.id,
        });
    }

    let mut field: Vec<Option<TeamId>> = team_ids.iter().copied().map(Some).collect();
    if field.len() % 2 == 1 {
        field.push(None);
    }
    let half = field.len() / 2;
    let rounds_per_leg = u32::try_from(field.len().saturating_sub(1)).unwrap_or(u32::MAX);

    let mut rotating: VecDeque<Option<TeamId>> = field.iter().skip(1).copied().collect();
    let pinned = field.first().copied().flatten();
    let mut first_leg: Vec<(u32, u32, TeamId, TeamId)> = Vec::new();

    for round in 1..=rounds_per_leg {
        let row: Vec<Option<TeamId>> = core::iter::once(pinned)
            .chain(rotating.iter().copied())
            .collect();
        let pairs = row.iter().take(half).zip(row.iter().rev().take(half));
        for (slot, (a, b)) in (0_u32..).zip(pairs) {
            let (Some(a), Some(b)) = (*a, *b) else {
                continue;
            };
            let (home, away) = if slot == 0 && round % 2 == 0 {
                (b, a)
            } else {
                (a, b)
            };
            first_leg.push((round, slot, home, away));
        }
        rotating.rotate_right(1);
    }

    let leg_count = usize::try_from(legs).unwrap_or(1);
    let mut fixtures = Vec::with_capacity(first_leg.len().saturating_mul(leg_count));
    for leg in 0..legs {
        let offset = leg.saturating_mul(rounds_per_leg);
        let mirrored = leg % 2 == 1;
        for &(round, slot, home, away) in &first_leg {
            let (home, away) = if mirrored { (away, home) } else { (home, away) };
            let number = offset.saturating_add(round);
            fixtures.push(Fixture {
                id: FixtureId::new(),
                season_id,
                competition: CompetitionRef::League(league.id),
                round: number,
                match_day_number: number,
                bracket_slot: slot,
                home_team_id: home,
                away_team_id: Some(away),
                scheduled_date: None,
                is_played: false,
                result: None,
            });
        }
    }

    info!(
        league_id = %league.id,
        teams = team_ids.len(),
        legs,
        fixtures = fixtures.len(),
        "league fixtures generated"
    );
    Ok(fixtures)
}

/// A drawn cup: the updated cup and its first-round fixtures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CupDraw {
    /// The cup with rounds set and round 1 active.
    pub cup: Cup,
    /// First-round fixtures, byes included.
    pub fixtures: Vec<Fixture>,
}

/// Draw the first round of a cup.
///
/// Participants are seeded by rating (highest first, ties by team id) and
/// placed in standard bracket order so the top two seeds can only meet in
/// the final. Missing low seeds become byes for their opponents.
pub fn draw_cup(cup: &Cup, teams: &[Team], cup_days: u32) -> Result<CupDraw, ScheduleError> {
    let participants = cup.participants.len();
    if participants < 2 {
        return Err(ScheduleError::TooFewParticipants {
            cup_id: cup.id,
            participants,
        });
    }
    let rounds = calendar::cup_days_required(participants);
    if cup_days < rounds {
        return Err(ScheduleError::NotEnoughCupDays {
            cup_id: cup.id,
            rounds,
            cup_days,
        });
    }

    let ratings: BTreeMap<TeamId, u16> = teams.iter().map(|t| (t.id, t.rating)).collect();
    let mut seeds: Vec<(u16, TeamId)> = Vec::with_capacity(participants);
    for team_id in &cup.participants {
        let rating = ratings.get(team_id).ok_or(ScheduleError::UnknownTeam {
            cup_id: cup.id,
            team_id: *team_id,
        })?;
        seeds.push((*rating, *team_id));
    }
    seeds.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let bracket = participants.checked_next_power_of_two().unwrap_or(participants);
    let order = bracket_order(bracket);
    let offset = cup_days.saturating_sub(rounds);
    let first_day = offset.saturating_add(1);

    let mut fixtures = Vec::with_capacity(bracket / 2);
    for (slot, pair) in (0_u32..).zip(order.chunks(2)) {
        let team_at = |seed: Option<&usize>| {
            seed.and_then(|s| s.checked_sub(1))
                .and_then(|idx| seeds.get(idx))
                .map(|(_, id)| *id)
        };
        let (Some(home), away) = (team_at(pair.first()), team_at(pair.get(1))) else {
            continue;
        };
        fixtures.push(Fixture {
            id: FixtureId::new(),
            season_id: cup.season_id,
            competition: CompetitionRef::Cup(cup.id),
            round: 1,
            match_day_number: first_day,
            bracket_slot: slot,
            home_team_id: home,
            away_team_id: away,
            scheduled_date: None,
            is_played: false,
            result: None,
        });
    }

    let byes = fixtures.iter().filter(|f| f.is_bye()).count();
    info!(
        cup_id = %cup.id,
        participants,
        rounds,
        byes,
        first_cup_day = first_day,
        "cup drawn"
    );

    Ok(CupDraw {
        cup: Cup {
            current_round_number: 1,
            total_rounds: rounds,
            is_active: true,
            winner: None,
            ..cup.clone()
        },
        fixtures,
    })
}

/// Seed numbers (1-based) in standard bracket order.
///
/// Built by doubling: each seed `s` of the previous order is followed by
/// its partner `n + 1 - s`, e.g. `[1, 8, 4, 5, 2, 7, 3, 6]` for eight.
fn bracket_order(size: usize) -> Vec<usize> {
    let mut order = vec![1_usize];
    while order.len() < size {
        let n = order.len().saturating_mul(2);
        order = order
            .iter()
            .flat_map(|&s| [s, n.saturating_add(1).saturating_sub(s)])
            .collect();
    }
    order
}

/// Outcome of checking a cup after a match day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CupProgress {
    /// The current round still has unplayed fixtures.
    RoundOpen,
    /// The round is complete and the next round was paired.
    NextRound {
        /// The cup with the round counter advanced.
        cup: Cup,
        /// The next round's fixtures, dated from the calendar.
        fixtures: Vec<Fixture>,
    },
    /// The final was played.
    Finished {
        /// The cup, inactive with its winner recorded.
        cup: Cup,
    },
}

/// Advance a cup once every fixture of its current round is played.
///
/// Winners are paired in bracket order (adjacent slots meet). `fixtures`
/// must hold the cup's fixtures including today's results.
pub fn advance_cup_round(
    cup: &Cup,
    fixtures: &[Fixture],
    cup_days: u32,
    calendar_days: &[CalendarDay],
) -> Result<CupProgress, ScheduleError> {
    let current = cup.current_round_number;
    let mut round: Vec<&Fixture> = fixtures
        .iter()
        .filter(|f| f.competition == CompetitionRef::Cup(cup.id) && f.round == current)
        .collect();
    if !cup.is_active || round.is_empty() || round.iter().any(|f| !f.is_played) {
        return Ok(CupProgress::RoundOpen);
    }
    round.sort_by_key(|f| f.bracket_slot);

    let winners = round
        .iter()
        .map(|f| {
            f.winning_team().ok_or(ScheduleError::UndecidedTie {
                cup_id: cup.id,
                fixture_id: f.id,
            })
        })
        .collect::<Result<Vec<TeamId>, ScheduleError>>()?;

    if current >= cup.total_rounds || winners.len() == 1 {
        let winner = winners.first().copied();
        info!(cup_id = %cup.id, winner = ?winner, "cup final decided");
        return Ok(CupProgress::Finished {
            cup: Cup {
                is_active: false,
                winner,
                ..cup.clone()
            },
        });
    }

    let next = current.saturating_add(1);
    let offset = cup_days.saturating_sub(cup.total_rounds);
    let number = offset.saturating_add(next);
    let date = calendar::date_of(calendar_days, MatchDay::Cup(number));

    let next_fixtures: Vec<Fixture> = (0_u32..)
        .zip(winners.chunks(2))
        .filter_map(|(slot, pair)| {
            let home = *pair.first()?;
            Some(Fixture {
                id: FixtureId::new(),
                season_id: cup.season_id,
                competition: CompetitionRef::Cup(cup.id),
                round: next,
                match_day_number: number,
                bracket_slot: slot,
                home_team_id: home,
                away_team_id: pair.get(1).copied(),
                scheduled_date: date,
                is_played: false,
                result: None,
            })
        })
        .collect();

    debug!(
        cup_id = %cup.id,
        round = next,
        cup_day = number,
        fixtures = next_fixtures.len(),
        "next cup round paired"
    );

    Ok(CupProgress::NextRound {
        cup: Cup {
            current_round_number: next,
            ..cup.clone()
        },
        fixtures: next_fixtures,
    })
}

/// Group a league's teams, in a stable order, for fixture generation.
pub fn league_team_ids(league_id: LeagueId, teams: &[Team]) -> Vec<TeamId> {
    let mut ids: Vec<TeamId> = teams
        .iter()
        .filter(|t| t.league_id == Some(league_id))
        .map(|t| t.id)
        .collect();
    ids.sort();
    ids
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::arithmetic_side_effects
)]
mod tests {
    use std::collections::BTreeSet;

    use pinfall_types::{ClubId, DecidedBy, FixtureResult, Side};
    use rust_decimal::Decimal;

    use super::*;

    fn league() -> League {
        League {
            id: LeagueId::new(),
            season_id: SeasonId::new(),
            name: "Landesliga".to_owned(),
            tier: 2,
            age_class: None,
        }
    }

    fn teams(count: u16) -> Vec<Team> {
        (0..count)
            .map(|i| Team {
                id: TeamId::new(),
                club_id: ClubId::new(),
                league_id: None,
                name: format!("Team {i}"),
                squad_rank: 1,
                rating: 1000_u16.saturating_sub(i),
            })
            .collect()
    }

    fn cup_of(teams: &[Team]) -> Cup {
        Cup {
            id: CupId::new(),
            season_id: SeasonId::new(),
            name: "Pokal".to_owned(),
            participants: teams.iter().map(|t| t.id).collect(),
            current_round_number: 0,
            total_rounds: 0,
            is_active: true,
            winner: None,
        }
    }

    fn home_win(mut fixture: Fixture) -> Fixture {
        fixture.is_played = true;
        fixture.result = Some(FixtureResult {
            home_pins: 3000,
            away_pins: 2900,
            home_points: Decimal::TWO,
            away_points: Decimal::ZERO,
            winner: Some(Side::Home),
            decided_by: DecidedBy::Simulation,
            seed: 1,
        });
        fixture
    }

    #[test]
    fn sixteen_teams_play_fifteen_rounds_once_each() {
        let league = league();
        let ids: Vec<TeamId> = teams(16).iter().map(|t| t.id).collect();
        let fixtures = generate_league_fixtures(league.season_id, &league, &ids, 1).unwrap();

        assert_eq!(fixtures.len(), 120);
        let rounds: BTreeSet<u32> = fixtures.iter().map(|f| f.match_day_number).collect();
        assert_eq!(rounds.len(), 15);

        let pairs: BTreeSet<(TeamId, TeamId)> = fixtures
            .iter()
            .map(|f| {
                let a = f.home_team_id;
                let b = f.away_team_id.unwrap();
                (a.min(b), a.max(b))
            })
            .collect();
        assert_eq!(pairs.len(), 120);

        for round in 1..=15 {
            let playing: Vec<TeamId> = fixtures
                .iter()
                .filter(|f| f.match_day_number == round)
                .flat_map(|f| [f.home_team_id, f.away_team_id.unwrap()])
                .collect();
            let unique: BTreeSet<TeamId> = playing.iter().copied().collect();
            assert_eq!(playing.len(), 16);
            assert_eq!(unique.len(), 16);
        }
    }

    #[test]
    fn odd_league_has_one_team_resting_per_round() {
        let league = league();
        let ids: Vec<TeamId> = teams(5).iter().map(|t| t.id).collect();
        let fixtures = generate_league_fixtures(league.season_id, &league, &ids, 1).unwrap();
        assert_eq!(fixtures.len(), 10);
        assert!(fixtures.iter().all(|f| f.away_team_id.is_some()));
        let rounds: BTreeSet<u32> = fixtures.iter().map(|f| f.match_day_number).collect();
        assert_eq!(rounds.len(), 5);
    }

    #[test]
    fn second_leg_swaps_sides() {
        let league = league();
        let ids: Vec<TeamId> = teams(4).iter().map(|t| t.id).collect();
        let fixtures = generate_league_fixtures(league.season_id, &league, &ids, 2).unwrap();
        assert_eq!(fixtures.len(), 12);
        let first = &fixtures[0];
        let mirror = fixtures
            .iter()
            .find(|f| {
                f.match_day_number == first.match_day_number + 3
                    && f.bracket_slot == first.bracket_slot
            })
            .unwrap();
        assert_eq!(mirror.home_team_id, first.away_team_id.unwrap());
        assert_eq!(mirror.away_team_id, Some(first.home_team_id));
    }

    #[test]
    fn bracket_order_keeps_top_seeds_apart() {
        assert_eq!(bracket_order(8), vec![1, 8, 4, 5, 2, 7, 3, 6]);
        assert_eq!(bracket_order(2), vec![1, 2]);
    }

    #[test]
    fn eight_team_cup_has_three_rounds_and_no_byes() {
        let teams = teams(8);
        let cup = cup_of(&teams);
        let draw = draw_cup(&cup, &teams, 3).unwrap();
        assert_eq!(draw.cup.total_rounds, 3);
        assert_eq!(draw.cup.current_round_number, 1);
        assert_eq!(draw.fixtures.len(), 4);
        assert!(draw.fixtures.iter().all(|f| !f.is_bye()));
        // Top seed meets the lowest seed.
        assert_eq!(draw.fixtures[0].home_team_id, teams[0].id);
        assert_eq!(draw.fixtures[0].away_team_id, Some(teams[7].id));
    }

    #[test]
    fn top_seeds_get_byes() {
        let teams = teams(6);
        let cup = cup_of(&teams);
        let draw = draw_cup(&cup, &teams, 3).unwrap();
        let byes: Vec<TeamId> = draw
            .fixtures
            .iter()
            .filter(|f| f.is_bye())
            .map(|f| f.home_team_id)
            .collect();
        assert_eq!(byes.len(), 2);
        assert!(byes.contains(&teams[0].id));
        assert!(byes.contains(&teams[1].id));
    }

    #[test]
    fn shallow_cup_starts_late_so_final_is_on_last_cup_day() {
        let teams = teams(4);
        let cup = cup_of(&teams);
        let draw = draw_cup(&cup, &teams, 3).unwrap();
        assert_eq!(draw.cup.total_rounds, 2);
        assert!(draw.fixtures.iter().all(|f| f.match_day_number == 2));
    }

    #[test]
    fn not_enough_cup_days_is_an_error() {
        let teams = teams(8);
        let cup = cup_of(&teams);
        assert!(matches!(
            draw_cup(&cup, &teams, 2),
            Err(ScheduleError::NotEnoughCupDays { rounds: 3, .. })
        ));
    }

    #[test]
    fn cup_advances_winners_in_bracket_order() {
        let teams = teams(4);
        let cup = cup_of(&teams);
        let draw = draw_cup(&cup, &teams, 2).unwrap();
        let played: Vec<Fixture> = draw.fixtures.into_iter().map(home_win).collect();

        let progress = advance_cup_round(&draw.cup, &played, 2, &[]).unwrap();
        let CupProgress::NextRound { cup, fixtures } = progress else {
            panic!("expected next round");
        };
        assert_eq!(cup.current_round_number, 2);
        assert_eq!(fixtures.len(), 1);
        assert_eq!(fixtures[0].match_day_number, 2);
        assert_eq!(fixtures[0].home_team_id, teams[0].id);
        assert_eq!(fixtures[0].away_team_id, Some(teams[1].id));

        let final_played = vec![home_win(fixtures[0].clone())];
        let done = advance_cup_round(&cup, &final_played, 2, &[]).unwrap();
        let CupProgress::Finished { cup } = done else {
            panic!("expected finished cup");
        };
        assert!(!cup.is_active);
        assert_eq!(cup.winner, Some(teams[0].id));
    }

    #[test]
    fn open_round_does_not_advance() {
        let teams = teams(4);
        let cup = cup_of(&teams);
        let draw = draw_cup(&cup, &teams, 2).unwrap();
        let mut fixtures = draw.fixtures;
        fixtures[0] = home_win(fixtures[0].clone());
        assert_eq!(
            advance_cup_round(&draw.cup, &fixtures, 2, &[]).unwrap(),
            CupProgress::RoundOpen
        );
    }

    #[test]
    fn unknown_participant_is_rejected() {
        let teams = teams(3);
        let mut cup = cup_of(&teams);
        cup.participants.push(TeamId::new());
        assert!(matches!(
            draw_cup(&cup, &teams, 2),
            Err(ScheduleError::UnknownTeam { .. })
        ));
    }
}
