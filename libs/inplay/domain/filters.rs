//! Enabled (sport, market group, bet group) combinations and their trigger times

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::event::Tip;

/// Default trigger time for a sport without a market-level override
pub const DEFAULT_SPORT_TRIGGER_SECS: u64 = 300; // 5 minutes

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterKey {
    pub sport_id: i64,
    pub market_group_id: i64,
    pub bet_group_id: i64,
}

impl FilterKey {
    pub fn new(sport_id: i64, market_group_id: i64, bet_group_id: i64) -> Self {
        Self {
            sport_id,
            market_group_id,
            bet_group_id,
        }
    }

    pub fn for_tip(sport_id: i64, tip: &Tip) -> Self {
        Self::new(sport_id, tip.market_group_id, tip.bet_group_id)
    }
}

/// Set of tracked combinations, each with its effective trigger time in seconds
#[derive(Debug, Clone, Default)]
pub struct EnabledFilters {
    triggers: HashMap<FilterKey, u64>,
}

impl EnabledFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: FilterKey, trigger_secs: u64) {
        self.triggers.insert(key, trigger_secs);
    }

    pub fn contains(&self, key: &FilterKey) -> bool {
        self.triggers.contains_key(key)
    }

    pub fn trigger_secs(&self, key: &FilterKey) -> Option<u64> {
        self.triggers.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}

impl FromIterator<(FilterKey, u64)> for EnabledFilters {
    fn from_iter<I: IntoIterator<Item = (FilterKey, u64)>>(iter: I) -> Self {
        Self {
            triggers: iter.into_iter().collect(),
        }
    }
}
