//! Current-phase eligibility of tips
//!
//! Bet names such as "Quarter 2 - Race to 20 Points" or "3rd Set Winner" are
//! tied to one phase of play. A tip is eligible only when it is not tied to
//! any phase, or when the phase it names is the one being played right now.

use serde::{Deserialize, Serialize};

use super::event::{sports, Event, Tip};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseUnit {
    Quarter,
    Half,
    Set,
    Period,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhaseRef {
    pub unit: PhaseUnit,
    pub number: u32,
}

impl PhaseRef {
    pub fn new(unit: PhaseUnit, number: u32) -> Self {
        Self { unit, number }
    }
}

const BASKETBALL_WORDS: &[(&str, PhaseUnit)] =
    &[("quarter", PhaseUnit::Quarter), ("half", PhaseUnit::Half)];
const SET_WORDS: &[(&str, PhaseUnit)] = &[("set", PhaseUnit::Set)];
const GENERIC_WORDS: &[(&str, PhaseUnit)] = &[
    ("quarter", PhaseUnit::Quarter),
    ("half", PhaseUnit::Half),
    ("set", PhaseUnit::Set),
    ("period", PhaseUnit::Period),
];

fn vocabulary(sport_id: i64) -> &'static [(&'static str, PhaseUnit)] {
    match sport_id {
        sports::BASKETBALL => BASKETBALL_WORDS,
        sports::VOLLEYBALL | sports::TABLE_TENNIS => SET_WORDS,
        _ => GENERIC_WORDS,
    }
}

/// Parse "3", "3rd", "third" and friends
fn phase_number(token: &str) -> Option<u32> {
    let words = ["first", "second", "third", "fourth", "fifth"];
    if let Some(pos) = words.iter().position(|w| *w == token) {
        return Some(pos as u32 + 1);
    }
    let digits = token
        .strip_suffix("st")
        .or_else(|| token.strip_suffix("nd"))
        .or_else(|| token.strip_suffix("rd"))
        .or_else(|| token.strip_suffix("th"))
        .unwrap_or(token);
    digits.parse().ok()
}

/// Lowest phase mentioned in `name` using the sport's phase vocabulary
pub fn tip_phase(sport_id: i64, name: &str) -> Option<PhaseRef> {
    let lowered = name.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    let words = vocabulary(sport_id);

    let mut lowest: Option<PhaseRef> = None;
    for (i, token) in tokens.iter().enumerate() {
        let Some(unit) = words
            .iter()
            .find(|(word, _)| *token == *word || token.strip_suffix('s') == Some(*word))
            .map(|(_, unit)| *unit)
        else {
            continue;
        };

        // "2nd quarter" first, then "quarter 2"
        let number = i
            .checked_sub(1)
            .and_then(|prev| phase_number(tokens[prev]))
            .or_else(|| tokens.get(i + 1).and_then(|next| phase_number(next)));

        if let Some(number) = number {
            if lowest.map(|l| number < l.number).unwrap_or(true) {
                lowest = Some(PhaseRef::new(unit, number));
            }
        }
    }
    lowest
}

/// Phase currently being played, derived from the scoreboard phase
pub fn current_phase(event: &Event) -> Option<PhaseRef> {
    let phase = event.phase.as_ref()?;
    if let Some(parsed) = tip_phase(event.sport_id, &phase.name) {
        return Some(parsed);
    }
    // Set-based sports number their phases by set
    match event.sport_id {
        sports::VOLLEYBALL | sports::TABLE_TENNIS if (1..=5).contains(&phase.id) => {
            Some(PhaseRef::new(PhaseUnit::Set, phase.id as u32))
        }
        _ => None,
    }
}

/// Whether `tip` belongs to the phase being played in `event`
pub fn is_tip_eligible(event: &Event, tip: &Tip) -> bool {
    let Some(tip_ref) = tip_phase(event.sport_id, &tip.bet_group_name_real) else {
        return true;
    };
    let Some(current) = current_phase(event) else {
        return false;
    };

    match (tip_ref.unit, current.unit) {
        (a, b) if a == b => tip_ref.number == current.number,
        (PhaseUnit::Half, PhaseUnit::Quarter) => tip_ref.number == (current.number + 1) / 2,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::{Phase, Team};

    fn event(sport_id: i64, phase: Option<(i64, &str)>) -> Event {
        Event {
            id: 1,
            sport_id,
            sport_name: String::new(),
            league_name: String::new(),
            first_team: Team {
                id: None,
                name: "A".to_string(),
                score: None,
            },
            second_team: Team {
                id: None,
                name: "B".to_string(),
                score: None,
            },
            clock: None,
            phase: phase.map(|(id, name)| Phase {
                id,
                name: name.to_string(),
            }),
            is_break: false,
            tips: Vec::new(),
            raw: serde_json::Value::Null,
        }
    }

    fn tip(name: &str) -> Tip {
        Tip {
            id: 1,
            name: "Home".to_string(),
            odds: 1.5,
            market_group_id: 4,
            market_group_name: String::new(),
            bet_group_id: 8404,
            bet_group_name: name.to_string(),
            bet_group_name_real: name.to_string(),
            unique_group_id: None,
            is_active: true,
            selection_id: String::new(),
            associated_player_id: None,
        }
    }

    #[test]
    fn test_tip_phase_parsing() {
        assert_eq!(
            tip_phase(sports::BASKETBALL, "Quarter 2 - Race to 20 Points"),
            Some(PhaseRef::new(PhaseUnit::Quarter, 2))
        );
        assert_eq!(
            tip_phase(sports::BASKETBALL, "3rd Quarter Total"),
            Some(PhaseRef::new(PhaseUnit::Quarter, 3))
        );
        assert_eq!(
            tip_phase(sports::VOLLEYBALL, "Set 3 or Set 2 Handicap"),
            Some(PhaseRef::new(PhaseUnit::Set, 2))
        );
        assert_eq!(tip_phase(sports::BASKETBALL, "Race to 10 Points"), None);
        assert_eq!(tip_phase(sports::BASKETBALL, "Half Time / Full Time"), None);
    }

    #[test]
    fn test_eligibility_by_phase() {
        let live = event(sports::BASKETBALL, Some((3, "3rd Quarter")));
        assert!(is_tip_eligible(&live, &tip("Quarter 3 - Race to 10 Points")));
        assert!(!is_tip_eligible(&live, &tip("Quarter 2 - Race to 10 Points")));
        assert!(is_tip_eligible(&live, &tip("2nd Half Winner")));
        assert!(!is_tip_eligible(&live, &tip("1st Half Winner")));
        assert!(is_tip_eligible(&live, &tip("Match Winner")));
    }

    #[test]
    fn test_unknown_current_phase_blocks_phase_bets() {
        let no_phase = event(sports::BASKETBALL, None);
        assert!(!is_tip_eligible(&no_phase, &tip("Quarter 1 - Race to 10 Points")));
        assert!(is_tip_eligible(&no_phase, &tip("Total Points")));
    }

    #[test]
    fn test_set_sports_fall_back_to_phase_id() {
        let live = event(sports::VOLLEYBALL, Some((2, "Second Game")));
        assert_eq!(current_phase(&live), Some(PhaseRef::new(PhaseUnit::Set, 2)));
        assert!(is_tip_eligible(&live, &tip("Set 2 - Total Points")));
    }
}
