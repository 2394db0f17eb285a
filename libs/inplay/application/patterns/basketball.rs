//! Basketball pattern matcher

use serde::Serialize;
use serde_json::{json, Value};

use super::state::{group_goal, group_phase, min_group_by, scoreboard, tip_named, Side};
use super::traits::{run_checks, NamedCheck, PatternError, PatternMatcher, Result};
use crate::domain::{sports, EventSnapshot, Team, Tip};

const QUARTER_MARKET: i64 = 4;
const RACE_TO_POINTS_BET: i64 = 8404;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "number", rename_all = "lowercase")]
pub enum Period {
    Quarter(u32),
    Half(u32),
    Overtime,
}

impl Period {
    /// "2nd Quarter" -> Quarter(2), "1st Half" -> Half(1), "Overtime"
    fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        if name == "overtime" {
            return Some(Period::Overtime);
        }
        let number = name.chars().next()?.to_digit(10)?;
        if name.ends_with("quarter") {
            Some(Period::Quarter(number))
        } else if name.ends_with("half") {
            Some(Period::Half(number))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamState {
    pub id: Option<i64>,
    pub name: String,
    pub total_points: u32,
    pub previous_total_points: u32,
    pub period_points: u32,
}

impl TeamState {
    fn new(team: &Team, previous: &Team) -> Self {
        Self {
            id: team.id,
            name: team.name.clone(),
            total_points: team.score.unwrap_or(0),
            previous_total_points: previous.score.unwrap_or(0),
            period_points: 0,
        }
    }
}

pub struct BasketballMatcher<'a> {
    snapshot: &'a EventSnapshot,
    period: Period,
    home: TeamState,
    away: TeamState,
    /// None on a tied score
    leader: Option<Side>,
}

impl<'a> BasketballMatcher<'a> {
    pub fn new(new: &'a EventSnapshot, old: &'a EventSnapshot) -> Result<Self> {
        let event = &new.event;
        let board = scoreboard(new)?;
        let current = board
            .current
            .as_ref()
            .ok_or(PatternError::MissingPhase { event_id: event.id })?;
        let period = Period::parse(&current.name).ok_or_else(|| PatternError::UnknownPhase {
            event_id: event.id,
            phase: current.name.clone(),
        })?;

        let previous = &old.event;
        let mut home = TeamState::new(&event.first_team, &previous.first_team);
        let mut away = TeamState::new(&event.second_team, &previous.second_team);

        for line in board.lines_for_phase(current.id) {
            if home.id == Some(line.side_id) {
                home.period_points = line.value;
            } else {
                away.period_points = line.value;
            }
        }

        let leader = match home.total_points.cmp(&away.total_points) {
            std::cmp::Ordering::Greater => Some(Side::Home),
            std::cmp::Ordering::Less => Some(Side::Away),
            std::cmp::Ordering::Equal => None,
        };

        Ok(Self {
            snapshot: new,
            period,
            home,
            away,
            leader,
        })
    }

    pub fn period(&self) -> Period {
        self.period
    }

    fn leader(&self) -> Option<(Side, &TeamState)> {
        match self.leader? {
            Side::Home => Some((Side::Home, &self.home)),
            Side::Away => Some((Side::Away, &self.away)),
        }
    }

    fn checks() -> [NamedCheck<Self>; 1] {
        [NamedCheck {
            name: "race_to_points",
            run: |m| m.check_race_to_points().into_iter().collect(),
        }]
    }

    /// Leader already holds the lowest race line of the current quarter
    fn check_race_to_points(&self) -> Option<Tip> {
        let Period::Quarter(quarter) = self.period else {
            return None;
        };
        let (side, leader) = self.leader()?;

        let groups = self
            .snapshot
            .tip_groups(QUARTER_MARKET, RACE_TO_POINTS_BET)
            .into_iter()
            .filter(|g| group_phase(g) == Some(quarter as i64));
        let (group, goal) = min_group_by(groups, group_goal)?;

        if (leader.period_points as i64) < goal {
            return None;
        }
        let name = match side {
            Side::Home => "Home",
            Side::Away => "Away",
        };
        tip_named(group, name).cloned()
    }
}

impl PatternMatcher for BasketballMatcher<'_> {
    fn sport_id(&self) -> i64 {
        sports::BASKETBALL
    }

    fn check_for_matches(&self) -> Vec<Tip> {
        run_checks(self, self.snapshot.event_id(), &Self::checks())
    }

    fn describe(&self) -> Value {
        json!({
            "period": self.period,
            "home": self.home,
            "away": self.away,
            "leader": self.leader,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_parsing() {
        assert_eq!(Period::parse("2nd Quarter"), Some(Period::Quarter(2)));
        assert_eq!(Period::parse("1st Half"), Some(Period::Half(1)));
        assert_eq!(Period::parse("Overtime"), Some(Period::Overtime));
        assert_eq!(Period::parse("Break"), None);
    }
}
