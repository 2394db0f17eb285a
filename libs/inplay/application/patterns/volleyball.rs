//! Volleyball pattern matcher
//!
//! Sets go to 25 (15 in the fifth), win by two once both sides reach
//! 24 (14). Best of five.

use serde_json::{json, Value};

use super::state::{
    group_goal, group_phase, min_group_by, single_group, tip_for_player, tip_line,
    tip_with_prefix, SetRules, SetState, Side,
};
use super::traits::{run_checks, NamedCheck, PatternMatcher, Result};
use crate::domain::{sports, EventSnapshot, PhaseLine, Tip};

const TOTAL_GAME_MARKET: i64 = 198;
const TOTAL_GAME_BET: i64 = 2248;
const SET_WINNER_MARKET: i64 = 197;
const SET_WINNER_BET: i64 = 2245;
const TEAM_TOTAL_MARKET: i64 = 189;
const HOME_TOTAL_BET: i64 = 4833;
const AWAY_TOTAL_BET: i64 = 4834;
const SET_MARKET: i64 = 199;

/// Bet ids per set (index 0 = set 1) in the set market
const SET_TOTAL_BETS: [i64; 5] = [2250, 2254, 2258, 2262, 2266];
const SET_POINTS_WINNER_BETS: [i64; 5] = [2252, 2256, 2260, 2264, 2268];
const SET_RACE_BETS: [i64; 5] = [2251, 2255, 2259, 2263, 2267];

fn set_target(set: u32) -> u32 {
    if set == 5 {
        15
    } else {
        25
    }
}

fn margin_from(set: u32) -> u32 {
    if set == 5 {
        14
    } else {
        24
    }
}

/// "2nd Set" -> 2
fn set_of_line(line: &PhaseLine) -> Option<u32> {
    if !line.phase_name.to_lowercase().ends_with("set") {
        return None;
    }
    let digits: String = line
        .phase_name
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

const RULES: SetRules = SetRules {
    set_target,
    margin_from,
    set_of_line,
    points_per_set: 25,
};

pub struct VolleyballMatcher<'a> {
    snapshot: &'a EventSnapshot,
    state: SetState,
}

impl<'a> VolleyballMatcher<'a> {
    pub fn new(new: &'a EventSnapshot, old: &'a EventSnapshot) -> Result<Self> {
        Ok(Self {
            snapshot: new,
            state: SetState::derive(new, old, &RULES)?,
        })
    }

    pub fn state(&self) -> &SetState {
        &self.state
    }

    /// Checks in evaluation order
    fn checks() -> [NamedCheck<Self>; 6] {
        [
            NamedCheck {
                name: "total_set_points",
                run: |m| m.check_total_set_points().into_iter().collect(),
            },
            NamedCheck {
                name: "total_game_points",
                run: |m| m.check_total_game_points().into_iter().collect(),
            },
            NamedCheck {
                name: "team_total_points",
                run: Self::check_team_total_points,
            },
            NamedCheck {
                name: "set_winner",
                run: |m| m.check_set_winner().into_iter().collect(),
            },
            NamedCheck {
                name: "set_points_winner",
                run: |m| m.check_set_points_winner().into_iter().collect(),
            },
            NamedCheck {
                name: "set_race_to_points",
                run: |m| m.check_set_race_to_points().into_iter().collect(),
            },
        ]
    }

    fn set_bet(&self, bets: &[i64; 5]) -> i64 {
        bets[self.state.current_set as usize - 1]
    }

    fn check_total_set_points(&self) -> Option<Tip> {
        let group = single_group(self.snapshot, SET_MARKET, self.set_bet(&SET_TOTAL_BETS))?;
        self.state.set_total_tip(group)
    }

    fn check_total_game_points(&self) -> Option<Tip> {
        let group = single_group(self.snapshot, TOTAL_GAME_MARKET, TOTAL_GAME_BET)?;
        if let Some(over) = self.state.game_total_over(group, RULES.points_per_set) {
            return Some(over);
        }

        // Under is only locked once the deciding set is decided
        let under = tip_with_prefix(group, "Under")?;
        let line = tip_line(under)?;
        let s = &self.state;
        if s.current_set == 5
            && !s.is_margin_score
            && s.min_points_to_win_set == 0
            && line > s.game_total_points as f64
        {
            return Some(under.clone());
        }
        None
    }

    /// Both sides are checked; each may already be past its line
    fn check_team_total_points(&self) -> Vec<Tip> {
        [(HOME_TOTAL_BET, Side::Home), (AWAY_TOTAL_BET, Side::Away)]
            .into_iter()
            .filter_map(|(bet, side)| {
                let group = single_group(self.snapshot, TEAM_TOTAL_MARKET, bet)?;
                self.state.team_total_over(group, side)
            })
            .collect()
    }

    fn check_set_winner(&self) -> Option<Tip> {
        let group = single_group(self.snapshot, SET_WINNER_MARKET, SET_WINNER_BET)?;
        if group_phase(group)? != self.state.current_set as i64 {
            return None;
        }
        if self.state.min_points_to_win_set != 0 {
            return None;
        }
        tip_for_player(group, self.state.leader().id).cloned()
    }

    fn check_set_points_winner(&self) -> Option<Tip> {
        let group = single_group(
            self.snapshot,
            SET_MARKET,
            self.set_bet(&SET_POINTS_WINNER_BETS),
        )?;
        self.state.points_winner_tip(group)
    }

    fn check_set_race_to_points(&self) -> Option<Tip> {
        let groups = self
            .snapshot
            .tip_groups(SET_MARKET, self.set_bet(&SET_RACE_BETS));
        let (group, goal) = min_group_by(groups, group_goal)?;

        let s = &self.state;
        if s.leader().set_points as i64 == goal && s.home.set_points != s.away.set_points {
            return tip_for_player(group, s.leader().id).cloned();
        }
        None
    }
}

impl PatternMatcher for VolleyballMatcher<'_> {
    fn sport_id(&self) -> i64 {
        sports::VOLLEYBALL
    }

    fn check_for_matches(&self) -> Vec<Tip> {
        run_checks(self, self.snapshot.event_id(), &Self::checks())
    }

    fn describe(&self) -> Value {
        let s = &self.state;
        json!({
            "home": s.home,
            "away": s.away,
            "current_set": s.current_set,
            "game_total_points": s.game_total_points,
            "set_total_points": s.set_total_points,
            "set_points_diff": s.set_points_diff,
            "sets_to_win_game": s.min_sets_to_win,
            "points_to_win_set": s.min_points_to_win_set,
            "margin_score": s.is_margin_score,
        })
    }
}
