//! Global numeric scan options
//!
//! Options are stored externally as `(id, value)` rows. Every value passes
//! its validation predicate before it is accepted; anything rejected falls
//! back to the option's default.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionKind {
    MinOdds,
    MaxOdds,
    FirstNotifySecs,
    SoundNotifySecs,
    SecondNotifySecs,
    BreakMinIdleSecs,
}

impl OptionKind {
    pub const ALL: [OptionKind; 6] = [
        OptionKind::MinOdds,
        OptionKind::MaxOdds,
        OptionKind::FirstNotifySecs,
        OptionKind::SoundNotifySecs,
        OptionKind::SecondNotifySecs,
        OptionKind::BreakMinIdleSecs,
    ];

    /// Row id in the options table
    pub fn id(self) -> i64 {
        match self {
            OptionKind::MinOdds => 1,
            OptionKind::MaxOdds => 2,
            OptionKind::FirstNotifySecs => 3,
            OptionKind::SoundNotifySecs => 4,
            OptionKind::SecondNotifySecs => 5,
            OptionKind::BreakMinIdleSecs => 6,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    pub fn name(self) -> &'static str {
        match self {
            OptionKind::MinOdds => "min_odds",
            OptionKind::MaxOdds => "max_odds",
            OptionKind::FirstNotifySecs => "first_notify_secs",
            OptionKind::SoundNotifySecs => "sound_notify_secs",
            OptionKind::SecondNotifySecs => "second_notify_secs",
            OptionKind::BreakMinIdleSecs => "break_min_idle_secs",
        }
    }

    pub fn default_value(self) -> f64 {
        match self {
            OptionKind::MinOdds => 1.0,
            OptionKind::MaxOdds => 15.0,
            OptionKind::FirstNotifySecs => 120.0,
            OptionKind::SoundNotifySecs => 60.0,
            OptionKind::SecondNotifySecs => 600.0,
            OptionKind::BreakMinIdleSecs => 180.0,
        }
    }

    /// Predicate a stored value must satisfy on its own
    pub fn is_valid(self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self {
            OptionKind::MinOdds => value >= 1.0,
            OptionKind::MaxOdds => value >= 1.1,
            OptionKind::FirstNotifySecs => value >= 5.0,
            OptionKind::SoundNotifySecs => value >= 5.0,
            OptionKind::SecondNotifySecs => value >= 10.0,
            OptionKind::BreakMinIdleSecs => value >= 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOptions {
    pub min_odds: f64,
    pub max_odds: f64,
    pub first_notify_secs: u64,
    pub sound_notify_secs: u64,
    pub second_notify_secs: u64,
    pub break_min_idle_secs: u64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            min_odds: OptionKind::MinOdds.default_value(),
            max_odds: OptionKind::MaxOdds.default_value(),
            first_notify_secs: OptionKind::FirstNotifySecs.default_value() as u64,
            sound_notify_secs: OptionKind::SoundNotifySecs.default_value() as u64,
            second_notify_secs: OptionKind::SecondNotifySecs.default_value() as u64,
            break_min_idle_secs: OptionKind::BreakMinIdleSecs.default_value() as u64,
        }
    }
}

impl ScanOptions {
    /// Build options from stored rows, validating each value
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (i64, f64)>,
    {
        let mut options = Self::default();

        for (id, value) in rows {
            let Some(kind) = OptionKind::from_id(id) else {
                warn!(option_id = id, "Ignoring unknown option");
                continue;
            };
            if !kind.is_valid(value) {
                warn!(
                    option = kind.name(),
                    value,
                    "Rejected option value, keeping default {}",
                    kind.default_value()
                );
                continue;
            }
            options.set(kind, value);
        }

        if options.max_odds < options.min_odds {
            warn!(
                "max_odds {} below min_odds {}, resetting odds bounds to defaults",
                options.max_odds, options.min_odds
            );
            options.min_odds = OptionKind::MinOdds.default_value();
            options.max_odds = OptionKind::MaxOdds.default_value();
        }

        if options.second_notify_secs <= options.first_notify_secs {
            warn!(
                "second_notify_secs {} not after first_notify_secs {}, resetting delays to defaults",
                options.second_notify_secs, options.first_notify_secs
            );
            options.first_notify_secs = OptionKind::FirstNotifySecs.default_value() as u64;
            options.second_notify_secs = OptionKind::SecondNotifySecs.default_value() as u64;
        }

        options
    }

    fn set(&mut self, kind: OptionKind, value: f64) {
        match kind {
            OptionKind::MinOdds => self.min_odds = value,
            OptionKind::MaxOdds => self.max_odds = value,
            OptionKind::FirstNotifySecs => self.first_notify_secs = value as u64,
            OptionKind::SoundNotifySecs => self.sound_notify_secs = value as u64,
            OptionKind::SecondNotifySecs => self.second_notify_secs = value as u64,
            OptionKind::BreakMinIdleSecs => self.break_min_idle_secs = value as u64,
        }
    }

    pub fn odds_in_bounds(&self, min: f64, max: f64) -> bool {
        min >= self.min_odds && max <= self.max_odds
    }

    pub fn first_notify(&self) -> Duration {
        Duration::from_secs(self.first_notify_secs)
    }

    pub fn second_notify(&self) -> Duration {
        Duration::from_secs(self.second_notify_secs)
    }

    pub fn sound_notify(&self) -> Duration {
        Duration::from_secs(self.sound_notify_secs)
    }
}
