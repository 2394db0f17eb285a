//! In-play event model
//!
//! Events are rebuilt from scratch on every poll and never mutated after
//! construction. The raw upstream payload is kept for sport-specific
//! computations that need more than the typed fields.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sport ids of the upstream feed
pub mod sports {
    pub const BASKETBALL: i64 = 4;
    pub const VOLLEYBALL: i64 = 9;
    pub const TABLE_TENNIS: i64 = 138;
}

/// One side of a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: Option<i64>,
    pub name: String,
    pub score: Option<u32>,
}

/// Current phase of play as reported by the scoreboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    #[serde(alias = "gpi")]
    pub id: i64,
    #[serde(alias = "gpn")]
    pub name: String,
}

/// Identity of a tip group within one event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TipGroupKey {
    /// Feed-assigned unique tip group id
    Unique { id: i64 },
    /// Fallback when the feed gives no unique id
    Bet {
        market_group_id: i64,
        bet_group_id: i64,
    },
}

impl fmt::Display for TipGroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TipGroupKey::Unique { id } => write!(f, "u{}", id),
            TipGroupKey::Bet {
                market_group_id,
                bet_group_id,
            } => write!(f, "{}:{}", market_group_id, bet_group_id),
        }
    }
}

/// One selectable wager line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tip {
    pub id: i64,
    pub name: String,
    pub odds: f64,
    pub market_group_id: i64,
    pub market_group_name: String,
    pub bet_group_id: i64,
    /// Display name with the line placeholder rendered as `×`
    pub bet_group_name: String,
    /// Name with the actual line value substituted
    pub bet_group_name_real: String,
    pub unique_group_id: Option<i64>,
    pub is_active: bool,
    /// Identifier the bookmaker expects when placing a bet on this tip
    pub selection_id: String,
    pub associated_player_id: Option<i64>,
}

impl Tip {
    pub fn group_key(&self) -> TipGroupKey {
        match self.unique_group_id {
            Some(id) => TipGroupKey::Unique { id },
            None => TipGroupKey::Bet {
                market_group_id: self.market_group_id,
                bet_group_id: self.bet_group_id,
            },
        }
    }
}

/// An in-play match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub sport_id: i64,
    pub sport_name: String,
    pub league_name: String,
    pub first_team: Team,
    pub second_team: Team,
    /// Match clock (minutes, seconds)
    pub clock: Option<(u32, u32)>,
    pub phase: Option<Phase>,
    pub is_break: bool,
    pub tips: Vec<Tip>,
    #[serde(skip)]
    pub raw: serde_json::Value,
}

impl Event {
    pub fn has_score_info(&self) -> bool {
        self.first_team.score.is_some() && self.second_team.score.is_some()
    }

    pub fn score_line(&self) -> String {
        match (self.first_team.score, self.second_team.score) {
            (Some(a), Some(b)) => format!("{} - {}", a, b),
            _ => "<no score info>".to_string(),
        }
    }

    pub fn time_or_phase(&self) -> String {
        if let Some((m, s)) = self.clock {
            return format!("{:02}:{:02}", m, s);
        }
        match &self.phase {
            Some(phase) => phase.name.clone(),
            None => "<no time info>".to_string(),
        }
    }

    pub fn title(&self) -> String {
        format!("{} vs {}", self.first_team.name, self.second_team.name)
    }
}

/// Phase names that mean play is suspended
pub fn is_break_phase(name: &str) -> bool {
    let name = name.to_lowercase();
    ["break", "pause", "interval", "timeout"]
        .iter()
        .any(|word| name.contains(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tip(unique: Option<i64>) -> Tip {
        Tip {
            id: 1,
            name: "Over 10.5".to_string(),
            odds: 1.9,
            market_group_id: 4,
            market_group_name: "Quarters".to_string(),
            bet_group_id: 8404,
            bet_group_name: "Total ×".to_string(),
            bet_group_name_real: "Total 10.5".to_string(),
            unique_group_id: unique,
            is_active: true,
            selection_id: "s1".to_string(),
            associated_player_id: None,
        }
    }

    #[test]
    fn test_group_key_prefers_unique_id() {
        assert_eq!(tip(Some(77)).group_key(), TipGroupKey::Unique { id: 77 });
        assert_eq!(
            tip(None).group_key(),
            TipGroupKey::Bet {
                market_group_id: 4,
                bet_group_id: 8404
            }
        );
    }

    #[test]
    fn test_break_phase_detection() {
        assert!(is_break_phase("Half Time Break"));
        assert!(is_break_phase("Pause"));
        assert!(!is_break_phase("2nd Quarter"));
    }
}
