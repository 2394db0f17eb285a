//! Periodic "scanner alive" summary

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::info;

/// Counters reported with each beat
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeartbeatStats {
    pub events: usize,
    pub open_notifications: usize,
    pub sessions: usize,
}

pub struct Heartbeat {
    interval: Duration,
    last_beat: DateTime<Utc>,
    cycles: u64,
    failed_cycles: u64,
}

impl Heartbeat {
    pub fn new(interval_secs: u64, now: DateTime<Utc>) -> Self {
        Self {
            interval: Duration::from_secs(interval_secs),
            last_beat: now,
            cycles: 0,
            failed_cycles: 0,
        }
    }

    /// Count a finished cycle
    pub fn record_cycle(&mut self, ok: bool) {
        self.cycles += 1;
        if !ok {
            self.failed_cycles += 1;
        }
    }

    pub fn should_beat(&self, now: DateTime<Utc>) -> bool {
        let elapsed = now.signed_duration_since(self.last_beat);
        elapsed.to_std().unwrap_or_default() >= self.interval
    }

    /// Log the summary if due and restart the window. Returns whether it beat.
    pub fn beat_if_due(&mut self, now: DateTime<Utc>, stats: HeartbeatStats) -> bool {
        if !self.should_beat(now) {
            return false;
        }

        info!(
            "Scanner alive: {} cycles ({} failed) | {} events | {} open notifications | {} bot sessions",
            self.cycles, self.failed_cycles, stats.events, stats.open_notifications, stats.sessions
        );
        self.reset(now);
        true
    }

    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.last_beat = now;
        self.cycles = 0;
        self.failed_cycles = 0;
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_beats_after_interval() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut heartbeat = Heartbeat::new(60, start);
        heartbeat.record_cycle(true);
        heartbeat.record_cycle(false);

        let stats = HeartbeatStats::default();
        assert!(!heartbeat.beat_if_due(start + chrono::Duration::seconds(59), stats));
        assert_eq!(heartbeat.cycles(), 2);
        assert!(heartbeat.beat_if_due(start + chrono::Duration::seconds(60), stats));
        assert_eq!(heartbeat.cycles(), 0);
    }
}
