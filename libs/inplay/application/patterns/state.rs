//! Shared helpers for matchers: bet-name parsing, tip lookup and the
//! set-based scoring state used by volleyball and table tennis

use serde::Serialize;

use super::traits::{PatternError, Result};
use crate::domain::{EventSnapshot, PhaseLine, Scoreboard, Team, Tip, TipGroupSnapshot};

// ============================================================================
// Bet and tip names
// ============================================================================

fn integer_tokens(name: &str) -> impl Iterator<Item = i64> + '_ {
    name.split_whitespace().filter_map(|token| {
        let token = token.trim_end_matches(|c: char| c.is_ascii_alphabetic());
        token.parse::<i64>().ok()
    })
}

/// Phase a group belongs to: first number in its real bet name
/// ("Quarter 2 - Race to 10 Points" -> 2, "1st Set Winner" -> 1)
pub fn group_phase(group: &TipGroupSnapshot) -> Option<i64> {
    let tip = &group.first()?.tip;
    integer_tokens(&tip.bet_group_name_real).next()
}

/// Points goal of a group: last number in its real bet name
/// ("Quarter 2 - Race to 10 Points" -> 10)
pub fn group_goal(group: &TipGroupSnapshot) -> Option<i64> {
    let tip = &group.first()?.tip;
    integer_tokens(&tip.bet_group_name_real).last()
}

/// Line of an over/under tip: second word of its name ("Over 45.5" -> 45.5)
pub fn tip_line(tip: &Tip) -> Option<f64> {
    tip.name.split_whitespace().nth(1)?.parse().ok()
}

pub fn tip_with_prefix<'a>(group: &'a TipGroupSnapshot, prefix: &str) -> Option<&'a Tip> {
    group
        .tips()
        .map(|ts| &ts.tip)
        .find(|tip| tip.name.starts_with(prefix))
}

pub fn tip_named<'a>(group: &'a TipGroupSnapshot, name: &str) -> Option<&'a Tip> {
    group.tips().map(|ts| &ts.tip).find(|tip| tip.name == name)
}

pub fn tip_for_player(group: &TipGroupSnapshot, player_id: Option<i64>) -> Option<&Tip> {
    let player_id = player_id?;
    group
        .tips()
        .map(|ts| &ts.tip)
        .find(|tip| tip.associated_player_id == Some(player_id))
}

/// The only group for a bet, or None when there are zero or several
pub fn single_group<'a>(
    snapshot: &'a EventSnapshot,
    market_group_id: i64,
    bet_group_id: i64,
) -> Option<&'a TipGroupSnapshot> {
    match snapshot.tip_groups(market_group_id, bet_group_id).as_slice() {
        [group] => Some(*group),
        _ => None,
    }
}

/// Group with the smallest value of `key`; groups without one are skipped
pub fn min_group_by<'a>(
    groups: impl IntoIterator<Item = &'a TipGroupSnapshot>,
    key: fn(&TipGroupSnapshot) -> Option<i64>,
) -> Option<(&'a TipGroupSnapshot, i64)> {
    groups
        .into_iter()
        .filter_map(|g| key(g).map(|k| (g, k)))
        .min_by_key(|(_, k)| *k)
}

pub fn scoreboard(snapshot: &EventSnapshot) -> Result<Scoreboard> {
    Scoreboard::from_event_payload(&snapshot.event.raw).ok_or(PatternError::MissingScoreboard {
        event_id: snapshot.event.id,
    })
}

// ============================================================================
// Set-based scoring
// ============================================================================

/// Which side a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SideState {
    pub id: Option<i64>,
    pub name: String,
    pub sets_won: u32,
    pub total_points: u32,
    pub previous_total_points: u32,
    pub set_points: u32,
}

impl SideState {
    fn new(team: &Team) -> Self {
        Self {
            id: team.id,
            name: team.name.clone(),
            sets_won: team.score.unwrap_or(0),
            total_points: 0,
            previous_total_points: 0,
            set_points: 0,
        }
    }

    pub fn has_scored(&self) -> bool {
        self.total_points != self.previous_total_points
    }
}

/// Per-sport constants of a set-based game
#[derive(Debug, Clone, Copy)]
pub struct SetRules {
    /// Points needed to take a regular set
    pub set_target: fn(u32) -> u32,
    /// Both sides at or above this means deuce play (win by two)
    pub margin_from: fn(u32) -> u32,
    /// Set number of a scoreboard line, None when the line is not a set
    pub set_of_line: fn(&PhaseLine) -> Option<u32>,
    /// Points of one set used to bound the remaining match points
    pub points_per_set: i64,
}

/// Match state derived from the scoreboards of two consecutive snapshots
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetState {
    pub current_set: u32,
    pub home: SideState,
    pub away: SideState,
    pub game_total_points: u32,
    pub set_total_points: u32,
    pub set_points_diff: u32,
    pub set_leader: Side,
    pub min_sets_to_win: i64,
    pub is_margin_score: bool,
    pub min_points_to_win_set: i64,
}

impl SetState {
    pub fn derive(new: &EventSnapshot, old: &EventSnapshot, rules: &SetRules) -> Result<Self> {
        let event = &new.event;
        let board = scoreboard(new)?;
        let phase = board
            .current_phase_id()
            .ok_or(PatternError::MissingPhase { event_id: event.id })?;
        if !(1..=5).contains(&phase) {
            return Err(PatternError::PhaseOutOfRange {
                event_id: event.id,
                phase,
            });
        }
        let current_set = phase as u32;

        let mut home = SideState::new(&event.first_team);
        let mut away = SideState::new(&event.second_team);

        for line in &board.lines {
            let Some(set_number) = (rules.set_of_line)(line) else {
                continue;
            };
            let side = if home.id == Some(line.side_id) { &mut home } else { &mut away };
            side.total_points += line.value;
            if set_number == current_set {
                side.set_points = line.value;
            }
        }

        // The previous cycle may predate the scoreboard
        if let Ok(previous) = scoreboard(old) {
            for line in &previous.lines {
                if (rules.set_of_line)(line).is_none() {
                    continue;
                }
                if home.id == Some(line.side_id) {
                    home.previous_total_points += line.value;
                } else {
                    away.previous_total_points += line.value;
                }
            }
        }

        let set_leader = if away.set_points > home.set_points { Side::Away } else { Side::Home };
        let leader_points = match set_leader {
            Side::Home => home.set_points,
            Side::Away => away.set_points,
        };
        let set_points_diff = home.set_points.abs_diff(away.set_points);
        let min_sets_to_win = 3 - home.sets_won.max(away.sets_won) as i64;

        let margin = (rules.margin_from)(current_set);
        let is_margin_score = home.set_points >= margin && away.set_points >= margin;
        let min_points_to_win_set = if is_margin_score {
            2 - set_points_diff as i64
        } else {
            (rules.set_target)(current_set) as i64 - leader_points as i64
        };

        Ok(Self {
            current_set,
            game_total_points: home.total_points + away.total_points,
            set_total_points: home.set_points + away.set_points,
            set_points_diff,
            set_leader,
            min_sets_to_win,
            is_margin_score,
            min_points_to_win_set,
            home,
            away,
        })
    }

    pub fn side(&self, side: Side) -> &SideState {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }

    pub fn leader(&self) -> &SideState {
        self.side(self.set_leader)
    }

    /// Exactly one side scored since the previous cycle
    pub fn single_scorer(&self) -> Option<&SideState> {
        match (self.home.has_scored(), self.away.has_scored()) {
            (true, false) => Some(&self.home),
            (false, true) => Some(&self.away),
            _ => None,
        }
    }

    /// Over the set's total is already guaranteed, or under it is locked in
    pub fn set_total_tip(&self, group: &TipGroupSnapshot) -> Option<Tip> {
        if let Some(over) = tip_with_prefix(group, "Over") {
            if let Some(line) = tip_line(over) {
                let remaining = (line - self.set_total_points as f64).ceil();
                if self.min_points_to_win_set as f64 >= remaining {
                    return Some(over.clone());
                }
            }
        }

        let under = tip_with_prefix(group, "Under")?;
        let line = tip_line(under)?;
        if !self.is_margin_score
            && self.min_points_to_win_set == 0
            && line > self.set_total_points as f64
        {
            return Some(under.clone());
        }
        None
    }

    /// Over on the match total is already guaranteed
    pub fn game_total_over(&self, group: &TipGroupSnapshot, points_per_set: i64) -> Option<Tip> {
        let over = tip_with_prefix(group, "Over")?;
        let line = tip_line(over)?;
        let total = self.game_total_points as f64;

        if self.min_sets_to_win == 0 && total >= line {
            return Some(over.clone());
        }

        let remaining = (line - total).ceil();
        let min_points_to_win_match =
            self.min_points_to_win_set + (1 - self.min_sets_to_win) * points_per_set;
        if min_points_to_win_match as f64 >= remaining {
            return Some(over.clone());
        }
        None
    }

    /// Over on one side's match total, once the match is decided
    pub fn team_total_over(&self, group: &TipGroupSnapshot, side: Side) -> Option<Tip> {
        let over = tip_with_prefix(group, "Over")?;
        let line = tip_line(over)?;
        if self.min_sets_to_win == 0 && self.side(side).total_points as f64 >= line {
            return Some(over.clone());
        }
        None
    }

    /// The side that just scored took the exact-points line
    pub fn points_winner_tip(&self, group: &TipGroupSnapshot) -> Option<Tip> {
        let scorer = self.single_scorer()?;
        let goal = group_goal(group)?;
        if self.set_total_points as i64 == goal {
            return tip_for_player(group, scorer.id).cloned();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_tokens() {
        let numbers: Vec<i64> = integer_tokens("Quarter 2 - Race to 10 Points").collect();
        assert_eq!(numbers, vec![2, 10]);

        let numbers: Vec<i64> = integer_tokens("1st Set - Race to 15 Points").collect();
        assert_eq!(numbers, vec![1, 15]);
    }
}
