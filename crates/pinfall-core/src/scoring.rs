//! Pluggable match scoring.
//!
//! The simulator produces pins; a [`ScoringRule`] turns pins into match
//! points. Federations score differently, so the rule is injected rather
//! than hard-coded. [`TotalPinsRule`] is the shipped default.

use std::collections::BTreeMap;

use pinfall_types::PlayerId;
use rust_decimal::Decimal;

use crate::config::ScoringConfig;

/// One player's line as seen by a scoring rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerLine {
    /// The player.
    pub player_id: PlayerId,
    /// Roster slot (1-based). Players in equal slots face each other.
    pub slot: u8,
    /// Total pins over all lanes.
    pub total_pins: u32,
}

/// Points awarded for one fixture.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchScore {
    /// Match points of the home team.
    pub home_points: Decimal,
    /// Match points of the away team.
    pub away_points: Decimal,
    /// Points per player (players missing from the map earned zero).
    pub player_points: BTreeMap<PlayerId, Decimal>,
}

/// Converts the pins of both sides into match points.
///
/// Implementations must be pure: the same lines always give the same score.
pub trait ScoringRule: Send + Sync + core::fmt::Debug {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Score a fixture from the player lines of both sides.
    fn score(&self, home: &[PlayerLine], away: &[PlayerLine]) -> MatchScore;
}

/// Team points by total pins, player points by head-to-head slot duels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotalPinsRule {
    win: Decimal,
    draw: Decimal,
    loss: Decimal,
    duel_win: Decimal,
    duel_draw: Decimal,
}

impl TotalPinsRule {
    /// Build the rule from configuration.
    pub const fn from_config(config: &ScoringConfig) -> Self {
        Self {
            win: config.points_for_win,
            draw: config.points_for_draw,
            loss: config.points_for_loss,
            duel_win: config.duel_win,
            duel_draw: config.duel_draw,
        }
    }
}

impl Default for TotalPinsRule {
    fn default() -> Self {
        Self::from_config(&ScoringConfig::default())
    }
}

impl ScoringRule for TotalPinsRule {
    fn name(&self) -> &'static str {
        "total-pins"
    }

    fn score(&self, home: &[PlayerLine], away: &[PlayerLine]) -> MatchScore {
        let home_total = total(home);
        let away_total = total(away);
        let (home_points, away_points) = match home_total.cmp(&away_total) {
            core::cmp::Ordering::Greater => (self.win, self.loss),
            core::cmp::Ordering::Less => (self.loss, self.win),
            core::cmp::Ordering::Equal => (self.draw, self.draw),
        };

        let mut player_points: BTreeMap<PlayerId, Decimal> = home
            .iter()
            .chain(away.iter())
            .map(|line| (line.player_id, Decimal::ZERO))
            .collect();

        for h in home {
            let Some(a) = away.iter().find(|a| a.slot == h.slot) else {
                continue;
            };
            let (hp, ap) = match h.total_pins.cmp(&a.total_pins) {
                core::cmp::Ordering::Greater => (self.duel_win, Decimal::ZERO),
                core::cmp::Ordering::Less => (Decimal::ZERO, self.duel_win),
                core::cmp::Ordering::Equal => (self.duel_draw, self.duel_draw),
            };
            player_points.insert(h.player_id, hp);
            player_points.insert(a.player_id, ap);
        }

        MatchScore {
            home_points,
            away_points,
            player_points,
        }
    }
}

fn total(lines: &[PlayerLine]) -> u32 {
    lines
        .iter()
        .map(|line| line.total_pins)
        .fold(0, u32::saturating_add)
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn line(slot: u8, pins: u32) -> PlayerLine {
        PlayerLine {
            player_id: PlayerId::new(),
            slot,
            total_pins: pins,
        }
    }

    #[test]
    fn more_pins_wins() {
        let home = vec![line(1, 550), line(2, 500)];
        let away = vec![line(1, 520), line(2, 510)];
        let score = TotalPinsRule::default().score(&home, &away);
        assert_eq!(score.home_points, Decimal::TWO);
        assert_eq!(score.away_points, Decimal::ZERO);
    }

    #[test]
    fn equal_pins_is_a_draw() {
        let home = vec![line(1, 500)];
        let away = vec![line(1, 500)];
        let score = TotalPinsRule::default().score(&home, &away);
        assert_eq!(score.home_points, Decimal::ONE);
        assert_eq!(score.away_points, Decimal::ONE);
        assert_eq!(score.player_points.get(&home[0].player_id), Some(&Decimal::new(5, 1)));
    }

    #[test]
    fn duels_pair_equal_slots() {
        let home = vec![line(1, 550), line(2, 500)];
        let away = vec![line(1, 520), line(2, 510)];
        let score = TotalPinsRule::default().score(&home, &away);
        assert_eq!(score.player_points.get(&home[0].player_id), Some(&Decimal::ONE));
        assert_eq!(score.player_points.get(&away[0].player_id), Some(&Decimal::ZERO));
        assert_eq!(score.player_points.get(&home[1].player_id), Some(&Decimal::ZERO));
        assert_eq!(score.player_points.get(&away[1].player_id), Some(&Decimal::ONE));
    }

    #[test]
    fn configured_points_are_used() {
        let config = ScoringConfig {
            points_for_win: Decimal::from(3),
            ..ScoringConfig::default()
        };
        let rule = TotalPinsRule::from_config(&config);
        let score = rule.score(&[line(1, 600)], &[line(1, 400)]);
        assert_eq!(score.home_points, Decimal::from(3));
        assert_eq!(rule.name(), "total-pins");
    }
}
