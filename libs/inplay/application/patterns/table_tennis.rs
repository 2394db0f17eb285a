//! Table tennis pattern matcher
//!
//! Games go to 11, win by two from 10-10. Best of five.

use serde_json::{json, Value};

use super::state::{
    group_goal, group_phase, min_group_by, single_group, tip_for_player, SetRules, SetState, Side,
};
use super::traits::{run_checks, NamedCheck, PatternMatcher, Result};
use crate::domain::{sports, EventSnapshot, PhaseLine, Tip};

const SET_MARKET: i64 = 4;
const SET_TOTAL_BET: i64 = 8555;
const SET_POINTS_WINNER_BET: i64 = 8556;
const HOME_TOTAL_BET: i64 = 8558;
const AWAY_TOTAL_BET: i64 = 8559;
const TOTAL_GAME_MARKET: i64 = 216;
const TOTAL_GAME_BET: i64 = 8438;
const SET_WINNER_MARKET: i64 = 218;
const SET_WINNER_BET: i64 = 8435;

fn set_target(_set: u32) -> u32 {
    11
}

fn margin_from(_set: u32) -> u32 {
    10
}

fn set_of_line(line: &PhaseLine) -> Option<u32> {
    (1..=5).contains(&line.phase_id).then_some(line.phase_id as u32)
}

const RULES: SetRules = SetRules {
    set_target,
    margin_from,
    set_of_line,
    points_per_set: 11,
};

pub struct TableTennisMatcher<'a> {
    snapshot: &'a EventSnapshot,
    state: SetState,
}

impl<'a> TableTennisMatcher<'a> {
    pub fn new(new: &'a EventSnapshot, old: &'a EventSnapshot) -> Result<Self> {
        Ok(Self {
            snapshot: new,
            state: SetState::derive(new, old, &RULES)?,
        })
    }

    pub fn state(&self) -> &SetState {
        &self.state
    }

    fn checks() -> [NamedCheck<Self>; 5] {
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
                name: "set_winner",
                run: |m| m.check_set_winner().into_iter().collect(),
            },
            NamedCheck {
                name: "team_total_points",
                run: Self::check_team_total_points,
            },
            NamedCheck {
                name: "set_points_winner",
                run: |m| m.check_set_points_winner().into_iter().collect(),
            },
        ]
    }

    /// Earliest open set line
    fn check_total_set_points(&self) -> Option<Tip> {
        let groups = self.snapshot.tip_groups(SET_MARKET, SET_TOTAL_BET);
        let (group, _) = min_group_by(groups, group_phase)?;
        self.state.set_total_tip(group)
    }

    fn check_total_game_points(&self) -> Option<Tip> {
        let group = single_group(self.snapshot, TOTAL_GAME_MARKET, TOTAL_GAME_BET)?;
        self.state.game_total_over(group, RULES.points_per_set)
    }

    fn check_set_winner(&self) -> Option<Tip> {
        let groups = self.snapshot.tip_groups(SET_WINNER_MARKET, SET_WINNER_BET);
        let (group, _) = min_group_by(groups, group_phase)?;
        if self.state.min_points_to_win_set != 0 {
            return None;
        }
        tip_for_player(group, self.state.leader().id).cloned()
    }

    /// Either player already past their total line
    fn check_team_total_points(&self) -> Vec<Tip> {
        [(HOME_TOTAL_BET, Side::Home), (AWAY_TOTAL_BET, Side::Away)]
            .into_iter()
            .filter_map(|(bet, side)| {
                let group = single_group(self.snapshot, SET_MARKET, bet)?;
                self.state.team_total_over(group, side)
            })
            .collect()
    }

    fn check_set_points_winner(&self) -> Option<Tip> {
        let current_set = self.state.current_set as i64;
        let groups = self
            .snapshot
            .tip_groups(SET_MARKET, SET_POINTS_WINNER_BET)
            .into_iter()
            .filter(|g| group_phase(g) == Some(current_set));
        let (group, _) = min_group_by(groups, group_goal)?;
        self.state.points_winner_tip(group)
    }
}

impl PatternMatcher for TableTennisMatcher<'_> {
    fn sport_id(&self) -> i64 {
        sports::TABLE_TENNIS
    }

    fn check_for_matches(&self) -> Vec<Tip> {
        run_checks(self, self.snapshot.event_id(), &Self::checks())
    }

    fn describe(&self) -> Value {
        let s = &self.state;
        json!({
            "player_one": s.home,
            "player_two": s.away,
            "current_set": s.current_set,
            "game_total_points": s.game_total_points,
            "set_total_points": s.set_total_points,
            "set_points_diff": s.set_points_diff,
            "points_to_win_set": s.min_points_to_win_set,
            "margin_score": s.is_margin_score,
        })
    }
}
