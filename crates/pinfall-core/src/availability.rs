//! Availability Resolver: who may play today, and for which team.
//!
//! Player availability is tracked per `(player, competition kind)`. A league
//! day only ever reads league records and a cup day only cup records, so the
//! two independent match-day sequences cannot reset or block each other.
//!
//! Roster assignment for a club works top-down: manual lineups first, then
//! regular players by strength for the club's teams in `squad_rank` order,
//! then registered reserves as stand-ins, weakest first so the stronger
//! reserves stay free for later teams. A team that still has empty slots is
//! reported with its shortfall; players are never invented.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use pinfall_types::{
    AgeClass, AvailabilityState, ClubId, CompetitionKind, FixtureId, LineupOverride, MatchDay,
    PerformanceRecord, Player, PlayerAvailability, PlayerId, TeamId,
};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::RosterConfig;

/// Errors raised by the availability resolver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AvailabilityError {
    /// Rosters are only resolved for league or cup days.
    #[error("no rosters are resolved on a free day")]
    NotACompetitionDay,

    /// The availability book was built for another match day.
    #[error("availability book is for {book}, requested {requested}")]
    MatchDayMismatch {
        /// Match day the book was built for.
        book: MatchDay,
        /// Match day requested by the caller.
        requested: MatchDay,
    },

    /// The same team was listed twice for one club.
    #[error("team {team_id} listed twice for club {club_id}")]
    DuplicateTeam {
        /// The club.
        club_id: ClubId,
        /// The duplicated team.
        team_id: TeamId,
    },
}

/// A team of the club that plays today, with the fixture it plays in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamFixture {
    /// The team.
    pub team_id: TeamId,
    /// Position within the club (1 = first team).
    pub squad_rank: u8,
    /// The fixture the team plays today.
    pub fixture_id: FixtureId,
    /// Age restriction of the competition, if any.
    pub age_class: Option<AgeClass>,
}

/// A correction applied to a stale availability record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleFlagCorrection {
    /// The player.
    pub player_id: PlayerId,
    /// Competition kind of the corrected record.
    pub competition: CompetitionKind,
    /// `last_played_matchday` as stored.
    pub recorded: Option<u32>,
    /// `last_played_matchday` re-derived from performance history.
    pub derived: Option<u32>,
}

/// A player's availability on the book's match day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedAvailability {
    /// Resulting state.
    pub state: AvailabilityState,
    /// Last match day of this kind the player competed on.
    pub last_played: Option<u32>,
    /// Correction applied, if the stored record was stale.
    pub correction: Option<StaleFlagCorrection>,
}

/// Availability records and kind-scoped history for one match day.
///
/// Built once per day and shared read-only by every club's resolution.
#[derive(Debug, Clone)]
pub struct AvailabilityBook {
    match_day: MatchDay,
    competition: CompetitionKind,
    number: u32,
    records: BTreeMap<PlayerId, PlayerAvailability>,
    history_last: BTreeMap<PlayerId, u32>,
}

impl AvailabilityBook {
    /// Index the records and history of the match day's competition kind.
    ///
    /// Records and performances of the other kind are ignored.
    pub fn new(
        match_day: MatchDay,
        records: &[PlayerAvailability],
        history: &[PerformanceRecord],
    ) -> Result<Self, AvailabilityError> {
        let (Some(competition), Some(number)) = (match_day.competition(), match_day.number())
        else {
            return Err(AvailabilityError::NotACompetitionDay);
        };

        let records = records
            .iter()
            .filter(|r| r.competition == competition)
            .map(|r| (r.player_id, *r))
            .collect();

        let mut history_last: BTreeMap<PlayerId, u32> = BTreeMap::new();
        for record in history
            .iter()
            .filter(|p| p.competition == competition && p.match_day_number <= number)
        {
            let entry = history_last.entry(record.player_id).or_insert(0);
            *entry = (*entry).max(record.match_day_number);
        }

        Ok(Self {
            match_day,
            competition,
            number,
            records,
            history_last,
        })
    }

    /// The match day this book was built for.
    pub const fn match_day(&self) -> MatchDay {
        self.match_day
    }

    /// The stored record for a player, or a fresh one.
    pub fn record(&self, player_id: PlayerId) -> PlayerAvailability {
        self.records
            .get(&player_id)
            .copied()
            .unwrap_or_else(|| PlayerAvailability::fresh(player_id, self.competition))
    }

    /// Derive a player's state for this match day.
    ///
    /// Flags left over from an earlier day of the same kind are the normal
    /// carry-over and are ignored: a player who sat out or was injured then
    /// is judged by the current `is_available` alone. A record whose last match day
    /// lies ahead of today, or disagrees with the kind-scoped history, is
    /// stale and is corrected from that history.
    pub fn derive(&self, player: &Player) -> DerivedAvailability {
        let record = self.record(player.id);
        let history = self.history_last.get(&player.id).copied();
        let recorded = record.last_played_matchday;

        let stale = recorded.is_some_and(|last| last > self.number) || recorded != history;
        let correction = stale.then(|| {
            warn!(
                player_id = %player.id,
                competition = self.competition.as_str(),
                match_day = %self.match_day,
                recorded = ?recorded,
                derived = ?history,
                "stale availability flag corrected from history"
            );
            StaleFlagCorrection {
                player_id: player.id,
                competition: self.competition,
                recorded,
                derived: history,
            }
        });
        let last_played = if stale { history } else { recorded };

        // The stored flags describe the day they were written on; only a
        // record of today's number can still block the player.
        let state = if last_played == Some(self.number) {
            AvailabilityState::Played
        } else if !player.is_available {
            AvailabilityState::Unavailable
        } else {
            AvailabilityState::Available
        };

        DerivedAvailability {
            state,
            last_played,
            correction,
        }
    }
}

/// Read-only inputs shared by all clubs on a match day.
#[derive(Debug, Clone, Copy)]
pub struct PlayerPool<'a> {
    /// Every player of the season (filtered per club).
    pub players: &'a [Player],
    /// Availability for the match day.
    pub book: &'a AvailabilityBook,
    /// Manual lineups.
    pub overrides: &'a [LineupOverride],
}

/// Why a manually chosen player was dropped from a lineup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideRejection {
    /// The player belongs to another club.
    NotInClub,
    /// The player is unavailable.
    Unavailable,
    /// The player already competed on this match day.
    AlreadyPlayed,
    /// The player was already placed in another lineup today.
    AlreadyAssigned,
    /// The player is outside the competition's age class.
    AgeClass,
    /// The lineup lists more players than the roster size.
    RosterFull,
}

/// A manually chosen player that could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectedOverride {
    /// The fixture of the lineup.
    pub fixture_id: FixtureId,
    /// The team of the lineup.
    pub team_id: TeamId,
    /// The dropped player.
    pub player_id: PlayerId,
    /// Why the player was dropped.
    pub reason: OverrideRejection,
}

/// One filled roster slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterSlot {
    /// The player.
    pub player_id: PlayerId,
    /// Slot number (1-based).
    pub slot: u8,
    /// Whether the player is a reserve drafted in as a stand-in.
    pub is_stand_in: bool,
    /// Whether the slot came from a manual lineup.
    pub from_override: bool,
}

/// The roster of one team for one fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRoster {
    /// The team.
    pub team_id: TeamId,
    /// The fixture.
    pub fixture_id: FixtureId,
    /// Filled slots in slot order.
    pub slots: Vec<RosterSlot>,
    /// Slots that could not be filled.
    pub shortfall: u8,
}

impl TeamRoster {
    /// Whether every slot is filled.
    pub const fn is_complete(&self) -> bool {
        self.shortfall == 0
    }

    /// Rostered players in slot order.
    pub fn player_ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.slots.iter().map(|slot| slot.player_id)
    }
}

/// The result of resolving one club for one match day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClubRosters {
    /// The club.
    pub club_id: ClubId,
    /// The match day.
    pub match_day: MatchDay,
    /// One roster per team playing today, in `squad_rank` order.
    pub rosters: Vec<TeamRoster>,
    /// Eligible players left without a slot.
    pub unused: Vec<PlayerId>,
    /// Stale records corrected while resolving.
    pub corrections: Vec<StaleFlagCorrection>,
    /// Manually chosen players that were dropped.
    pub rejected: Vec<RejectedOverride>,
}

impl ClubRosters {
    /// The roster of a team, if it plays today.
    pub fn roster_for(&self, team_id: TeamId) -> Option<&TeamRoster> {
        self.rosters.iter().find(|r| r.team_id == team_id)
    }

    /// Unfilled slots across all of the club's teams.
    pub fn shortfall(&self) -> u32 {
        self.rosters
            .iter()
            .map(|r| u32::from(r.shortfall))
            .fold(0, u32::saturating_add)
    }
}

/// One club's request for a match day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClubRequest {
    /// The club.
    pub club_id: ClubId,
    /// The club's teams playing today.
    pub teams: Vec<TeamFixture>,
}

/// Resolve rosters for all of a club's teams playing on `match_day`.
pub fn resolve_availability(
    club_id: ClubId,
    match_day: MatchDay,
    teams: &[TeamFixture],
    pool: &PlayerPool<'_>,
    rules: &RosterConfig,
) -> Result<ClubRosters, AvailabilityError> {
    if match_day.competition().is_none() {
        return Err(AvailabilityError::NotACompetitionDay);
    }
    if pool.book.match_day() != match_day {
        return Err(AvailabilityError::MatchDayMismatch {
            book: pool.book.match_day(),
            requested: match_day,
        });
    }

    let mut ordered: Vec<TeamFixture> = teams.to_vec();
    ordered.sort_by_key(|t| (t.squad_rank, t.team_id));
    let mut seen_teams = BTreeSet::new();
    for team in &ordered {
        if !seen_teams.insert(team.team_id) {
            return Err(AvailabilityError::DuplicateTeam {
                club_id,
                team_id: team.team_id,
            });
        }
    }

    let club_players: BTreeMap<PlayerId, &Player> = pool
        .players
        .iter()
        .filter(|p| p.club_id == club_id)
        .map(|p| (p.id, p))
        .collect();

    let mut corrections = Vec::new();
    let mut states: BTreeMap<PlayerId, AvailabilityState> = BTreeMap::new();
    for player in club_players.values() {
        let derived = pool.book.derive(player);
        if let Some(correction) = derived.correction {
            corrections.push(correction);
        }
        states.insert(player.id, derived.state);
    }

    let mut taken: BTreeSet<PlayerId> = BTreeSet::new();
    let mut rejected = Vec::new();
    let mut slots_by_team: BTreeMap<TeamId, Vec<RosterSlot>> = BTreeMap::new();

    // Manual lineups take precedence over automatic assignment.
    for team in &ordered {
        let Some(lineup) = pool
            .overrides
            .iter()
            .find(|o| o.fixture_id == team.fixture_id && o.team_id == team.team_id)
        else {
            continue;
        };
        let slots = slots_by_team.entry(team.team_id).or_default();
        for player_id in &lineup.player_ids {
            let reason = override_rejection(
                *player_id,
                team,
                &club_players,
                &states,
                &taken,
                slots.len(),
                rules.size,
            );
            if let Some(reason) = reason {
                warn!(
                    club_id = %club_id,
                    fixture_id = %team.fixture_id,
                    player_id = %player_id,
                    ?reason,
                    "lineup player dropped"
                );
                rejected.push(RejectedOverride {
                    fixture_id: team.fixture_id,
                    team_id: team.team_id,
                    player_id: *player_id,
                    reason,
                });
                continue;
            }
            taken.insert(*player_id);
            let is_stand_in = club_players.get(player_id).is_some_and(|p| p.is_reserve);
            slots.push(RosterSlot {
                player_id: *player_id,
                slot: next_slot(slots.len()),
                is_stand_in,
                from_override: true,
            });
        }
    }

    let mut eligible: Vec<&Player> = club_players
        .values()
        .copied()
        .filter(|p| states.get(&p.id) == Some(&AvailabilityState::Available))
        .filter(|p| !taken.contains(&p.id))
        .collect();
    eligible.sort_by_key(|p| {
        (
            Reverse(p.skills.strength),
            Reverse(p.skills.consistency),
            p.id,
        )
    });
    let (mut regulars, mut reserves): (Vec<&Player>, Vec<&Player>) =
        eligible.into_iter().partition(|p| !p.is_reserve);
    if rules.allow_stand_ins {
        reserves.reverse();
    } else {
        reserves.clear();
    }

    let mut rosters = Vec::with_capacity(ordered.len());
    for team in &ordered {
        let mut slots = slots_by_team.remove(&team.team_id).unwrap_or_default();
        while slots.len() < usize::from(rules.size) {
            let admitted = |p: &&Player| team.age_class.is_none_or(|class| class.admits(p.age));
            let (player, is_stand_in) = if let Some(idx) = regulars.iter().position(admitted) {
                (regulars.remove(idx), false)
            } else if let Some(idx) = reserves.iter().position(admitted) {
                (reserves.remove(idx), true)
            } else {
                break;
            };
            slots.push(RosterSlot {
                player_id: player.id,
                slot: next_slot(slots.len()),
                is_stand_in,
                from_override: false,
            });
        }

        let filled = u8::try_from(slots.len()).unwrap_or(u8::MAX);
        let shortfall = rules.size.saturating_sub(filled);
        if shortfall > 0 {
            warn!(
                club_id = %club_id,
                team_id = %team.team_id,
                fixture_id = %team.fixture_id,
                shortfall,
                "team cannot field a full roster"
            );
        }
        rosters.push(TeamRoster {
            team_id: team.team_id,
            fixture_id: team.fixture_id,
            slots,
            shortfall,
        });
    }

    let unused: Vec<PlayerId> = regulars
        .iter()
        .chain(reserves.iter())
        .map(|p| p.id)
        .collect();

    debug!(
        club_id = %club_id,
        %match_day,
        teams = rosters.len(),
        unused = unused.len(),
        corrections = corrections.len(),
        "club rosters resolved"
    );

    Ok(ClubRosters {
        club_id,
        match_day,
        rosters,
        unused,
        corrections,
        rejected,
    })
}

/// Resolve every club of the day in parallel.
///
/// Clubs share no players, so each club is an independent partition of the
/// player pool and no player can be booked twice on one date.
pub fn resolve_day(
    match_day: MatchDay,
    requests: &[ClubRequest],
    pool: &PlayerPool<'_>,
    rules: &RosterConfig,
) -> Result<Vec<ClubRosters>, AvailabilityError> {
    requests
        .par_iter()
        .map(|request| {
            resolve_availability(request.club_id, match_day, &request.teams, pool, rules)
        })
        .collect()
}

fn override_rejection(
    player_id: PlayerId,
    team: &TeamFixture,
    club_players: &BTreeMap<PlayerId, &Player>,
    states: &BTreeMap<PlayerId, AvailabilityState>,
    taken: &BTreeSet<PlayerId>,
    filled: usize,
    size: u8,
) -> Option<OverrideRejection> {
    let Some(player) = club_players.get(&player_id) else {
        return Some(OverrideRejection::NotInClub);
    };
    if filled >= usize::from(size) {
        return Some(OverrideRejection::RosterFull);
    }
    if taken.contains(&player_id) {
        return Some(OverrideRejection::AlreadyAssigned);
    }
    match states.get(&player_id) {
        Some(AvailabilityState::Played) => return Some(OverrideRejection::AlreadyPlayed),
        Some(AvailabilityState::Unavailable) | None => {
            return Some(OverrideRejection::Unavailable);
        }
        Some(AvailabilityState::Available) => {}
    }
    if team.age_class.is_some_and(|class| !class.admits(player.age)) {
        return Some(OverrideRejection::AgeClass);
    }
    None
}

fn next_slot(filled: usize) -> u8 {
    u8::try_from(filled).unwrap_or(u8::MAX).saturating_add(1)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use pinfall_types::{FixtureId, SkillProfile, Technique};

    use super::*;

    fn player(club_id: ClubId, strength: u8) -> Player {
        Player {
            id: PlayerId::new(),
            club_id,
            name: format!("Player {strength}"),
            age: 30,
            skills: SkillProfile {
                strength,
                consistency: 50,
                pressure_resistance: 50,
                technique: Technique {
                    full_pins: 50,
                    clearing: 50,
                },
            },
            is_available: true,
            is_reserve: false,
        }
    }

    fn squad(club_id: ClubId, count: u8) -> Vec<Player> {
        (0..count).map(|i| player(club_id, 40 + i)).collect()
    }

    fn two_teams() -> Vec<TeamFixture> {
        vec![
            TeamFixture {
                team_id: TeamId::new(),
                squad_rank: 2,
                fixture_id: FixtureId::new(),
                age_class: None,
            },
            TeamFixture {
                team_id: TeamId::new(),
                squad_rank: 1,
                fixture_id: FixtureId::new(),
                age_class: None,
            },
        ]
    }

    fn resolve(
        club_id: ClubId,
        match_day: MatchDay,
        teams: &[TeamFixture],
        players: &[Player],
        records: &[PlayerAvailability],
        history: &[PerformanceRecord],
        overrides: &[LineupOverride],
    ) -> ClubRosters {
        let book = AvailabilityBook::new(match_day, records, history).unwrap();
        let pool = PlayerPool {
            players,
            book: &book,
            overrides,
        };
        resolve_availability(club_id, match_day, teams, &pool, &RosterConfig::default()).unwrap()
    }

    fn performance(player_id: PlayerId, competition: CompetitionKind, n: u32) -> PerformanceRecord {
        PerformanceRecord {
            fixture_id: FixtureId::new(),
            player_id,
            team_id: TeamId::new(),
            competition,
            match_day_number: n,
            date: None,
            slot: 1,
            lanes: Vec::new(),
            total_pins: 0,
            misses: 0,
            points: rust_decimal::Decimal::ZERO,
            is_stand_in: false,
        }
    }

    #[test]
    fn thirteen_players_fill_two_teams_strongest_first() {
        let club_id = ClubId::new();
        let players = squad(club_id, 13);
        let teams = two_teams();
        let result = resolve(club_id, MatchDay::League(1), &teams, &players, &[], &[], &[]);

        let first = &result.rosters[0];
        let second = &result.rosters[1];
        assert_eq!(first.team_id, teams[1].team_id);
        assert!(first.is_complete());
        assert!(second.is_complete());
        assert_eq!(result.unused.len(), 1);

        let strength = |id: PlayerId| players.iter().find(|p| p.id == id).unwrap().skills.strength;
        let weakest_first = first.player_ids().map(strength).min().unwrap();
        let strongest_second = second.player_ids().map(strength).max().unwrap();
        assert!(weakest_first > strongest_second);
        assert_eq!(strength(result.unused[0]), 40);
    }

    #[test]
    fn eleven_players_leave_lower_team_short_by_one() {
        let club_id = ClubId::new();
        let players = squad(club_id, 11);
        let teams = two_teams();
        let result = resolve(club_id, MatchDay::League(1), &teams, &players, &[], &[], &[]);

        assert!(result.rosters[0].is_complete());
        assert_eq!(result.rosters[1].shortfall, 1);
        assert_eq!(result.rosters[1].slots.len(), 5);
        assert_eq!(result.shortfall(), 1);
        assert!(result.unused.is_empty());
    }

    #[test]
    fn no_player_is_assigned_twice() {
        let club_id = ClubId::new();
        let players = squad(club_id, 12);
        let teams = two_teams();
        let result = resolve(club_id, MatchDay::Cup(2), &teams, &players, &[], &[], &[]);
        let all: Vec<PlayerId> = result.rosters.iter().flat_map(TeamRoster::player_ids).collect();
        let unique: BTreeSet<PlayerId> = all.iter().copied().collect();
        assert_eq!(all.len(), unique.len());
        assert_eq!(all.len(), 12);
    }

    #[test]
    fn league_play_does_not_block_cup_day_with_same_number() {
        let club_id = ClubId::new();
        let players = squad(club_id, 6);
        let teams = vec![two_teams()[1]];
        let records: Vec<PlayerAvailability> = players
            .iter()
            .map(|p| PlayerAvailability {
                player_id: p.id,
                competition: CompetitionKind::League,
                is_available_current_matchday: false,
                has_played_current_matchday: true,
                last_played_matchday: Some(3),
            })
            .collect();
        let history: Vec<PerformanceRecord> = players
            .iter()
            .map(|p| performance(p.id, CompetitionKind::League, 3))
            .collect();

        let result = resolve(club_id, MatchDay::Cup(3), &teams, &players, &records, &history, &[]);
        assert!(result.rosters[0].is_complete());
        assert!(result.corrections.is_empty());
    }

    #[test]
    fn played_today_is_not_assigned_again() {
        let club_id = ClubId::new();
        let players = squad(club_id, 7);
        let teams = vec![two_teams()[1]];
        let strongest = players.last().unwrap().id;
        let records = vec![PlayerAvailability {
            player_id: strongest,
            competition: CompetitionKind::League,
            is_available_current_matchday: false,
            has_played_current_matchday: true,
            last_played_matchday: Some(4),
        }];
        let history = vec![performance(strongest, CompetitionKind::League, 4)];
        let result = resolve(club_id, MatchDay::League(4), &teams, &players, &records, &history, &[]);
        assert!(result.rosters[0].player_ids().all(|id| id != strongest));
        assert!(result.rosters[0].is_complete());
    }

    #[test]
    fn carried_over_flag_from_previous_day_is_ignored() {
        let club_id = ClubId::new();
        let players = squad(club_id, 6);
        let teams = vec![two_teams()[1]];
        let records: Vec<PlayerAvailability> = players
            .iter()
            .map(|p| PlayerAvailability {
                player_id: p.id,
                competition: CompetitionKind::League,
                is_available_current_matchday: false,
                has_played_current_matchday: true,
                last_played_matchday: Some(4),
            })
            .collect();
        let history: Vec<PerformanceRecord> = players
            .iter()
            .map(|p| performance(p.id, CompetitionKind::League, 4))
            .collect();
        let result = resolve(club_id, MatchDay::League(5), &teams, &players, &records, &history, &[]);
        assert!(result.rosters[0].is_complete());
        assert!(result.corrections.is_empty());
    }

    #[test]
    fn stale_record_from_other_sequence_is_corrected() {
        let club_id = ClubId::new();
        let players = squad(club_id, 6);
        let teams = vec![two_teams()[1]];
        // Cup record stamped with a league number: cup day 2 never happened for them.
        let victim = players[0].id;
        let records = vec![PlayerAvailability {
            player_id: victim,
            competition: CompetitionKind::Cup,
            is_available_current_matchday: false,
            has_played_current_matchday: true,
            last_played_matchday: Some(2),
        }];
        let history = vec![performance(victim, CompetitionKind::League, 2)];

        let result = resolve(club_id, MatchDay::Cup(2), &teams, &players, &records, &history, &[]);
        assert!(result.rosters[0].is_complete());
        assert!(result.rosters[0].player_ids().any(|id| id == victim));
        assert_eq!(
            result.corrections,
            vec![StaleFlagCorrection {
                player_id: victim,
                competition: CompetitionKind::Cup,
                recorded: Some(2),
                derived: None,
            }]
        );
    }

    #[test]
    fn lineup_override_takes_precedence() {
        let club_id = ClubId::new();
        let players = squad(club_id, 12);
        let teams = two_teams();
        let lower = teams[0];
        // Put the two strongest players into the lower team by hand.
        let chosen = vec![players[11].id, players[10].id];
        let overrides = vec![LineupOverride {
            fixture_id: lower.fixture_id,
            team_id: lower.team_id,
            player_ids: chosen.clone(),
        }];
        let result = resolve(club_id, MatchDay::League(1), &teams, &players, &[], &[], &overrides);

        let lower_roster = result.roster_for(lower.team_id).unwrap();
        let ids: Vec<PlayerId> = lower_roster.player_ids().collect();
        assert_eq!(ids[..2], chosen[..]);
        assert!(lower_roster.slots[0].from_override);
        assert!(lower_roster.is_complete());
        let upper = result.roster_for(teams[1].team_id).unwrap();
        assert!(upper.player_ids().all(|id| !chosen.contains(&id)));
        assert!(upper.is_complete());
    }

    #[test]
    fn override_from_other_club_is_rejected() {
        let club_id = ClubId::new();
        let players = squad(club_id, 6);
        let outsider = player(ClubId::new(), 99);
        let teams = vec![two_teams()[1]];
        let overrides = vec![LineupOverride {
            fixture_id: teams[0].fixture_id,
            team_id: teams[0].team_id,
            player_ids: vec![outsider.id],
        }];
        let mut all = players;
        all.push(outsider.clone());
        let result = resolve(club_id, MatchDay::League(1), &teams, &all, &[], &[], &overrides);
        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.rejected[0].reason, OverrideRejection::NotInClub);
        assert!(result.rosters[0].player_ids().all(|id| id != outsider.id));
    }

    #[test]
    fn reserves_are_stand_ins_after_regulars() {
        let club_id = ClubId::new();
        let mut players = squad(club_id, 5);
        let mut reserve = player(club_id, 90);
        reserve.is_reserve = true;
        players.push(reserve.clone());
        let teams = vec![two_teams()[1]];
        let result = resolve(club_id, MatchDay::League(1), &teams, &players, &[], &[], &[]);

        let roster = &result.rosters[0];
        assert!(roster.is_complete());
        let last = roster.slots.last().unwrap();
        assert_eq!(last.player_id, reserve.id);
        assert!(last.is_stand_in);
    }

    #[test]
    fn weakest_reserve_stands_in_first() {
        let club_id = ClubId::new();
        let mut players = squad(club_id, 5);
        let mut strong = player(club_id, 95);
        strong.is_reserve = true;
        let mut weak = player(club_id, 20);
        weak.is_reserve = true;
        players.push(strong.clone());
        players.push(weak.clone());
        let teams = vec![two_teams()[1]];
        let result = resolve(club_id, MatchDay::League(1), &teams, &players, &[], &[], &[]);

        let roster = &result.rosters[0];
        assert!(roster.is_complete());
        assert_eq!(roster.slots.last().unwrap().player_id, weak.id);
        assert_eq!(result.unused, vec![strong.id]);
    }

    #[test]
    fn recovered_player_is_available_on_next_day() {
        let club_id = ClubId::new();
        let players = squad(club_id, 6);
        let teams = vec![two_teams()[1]];
        // Written at the end of league day 1 while the player was injured.
        let recovered = players[0].id;
        let records = vec![PlayerAvailability {
            player_id: recovered,
            competition: CompetitionKind::League,
            is_available_current_matchday: false,
            has_played_current_matchday: false,
            last_played_matchday: None,
        }];

        let result = resolve(club_id, MatchDay::League(2), &teams, &players, &records, &[], &[]);
        assert!(result.rosters[0].is_complete());
        assert!(result.rosters[0].player_ids().any(|id| id == recovered));
        assert!(result.corrections.is_empty());
    }

    #[test]
    fn unavailable_and_age_restricted_players_are_skipped() {
        let club_id = ClubId::new();
        let mut players = squad(club_id, 8);
        players[7].is_available = false;
        players[6].age = 40;
        let teams = vec![TeamFixture {
            team_id: TeamId::new(),
            squad_rank: 1,
            fixture_id: FixtureId::new(),
            age_class: Some(AgeClass {
                min_age: None,
                max_age: Some(35),
            }),
        }];
        let result = resolve(club_id, MatchDay::League(1), &teams, &players, &[], &[], &[]);
        let ids: Vec<PlayerId> = result.rosters[0].player_ids().collect();
        assert!(!ids.contains(&players[7].id));
        assert!(!ids.contains(&players[6].id));
        assert!(result.rosters[0].is_complete());
    }

    #[test]
    fn free_day_is_rejected() {
        let result = AvailabilityBook::new(MatchDay::Free, &[], &[]);
        assert_eq!(result.unwrap_err(), AvailabilityError::NotACompetitionDay);
    }

    #[test]
    fn clubs_resolve_in_parallel() {
        let club_a = ClubId::new();
        let club_b = ClubId::new();
        let mut players = squad(club_a, 6);
        players.extend(squad(club_b, 6));
        let book = AvailabilityBook::new(MatchDay::League(1), &[], &[]).unwrap();
        let pool = PlayerPool {
            players: &players,
            book: &book,
            overrides: &[],
        };
        let requests = vec![
            ClubRequest {
                club_id: club_a,
                teams: vec![two_teams()[1]],
            },
            ClubRequest {
                club_id: club_b,
                teams: vec![two_teams()[1]],
            },
        ];
        let result =
            resolve_day(MatchDay::League(1), &requests, &pool, &RosterConfig::default()).unwrap();
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|club| club.shortfall() == 0));
    }
}
