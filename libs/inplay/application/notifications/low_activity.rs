//! Low-activity detector
//!
//! Flags events that are down to a handful of live tip groups, have stayed
//! that way for a while, and whose remaining live groups are frozen.

use super::tracker::Candidate;
use crate::domain::{EventSnapshot, NotificationKind, ScanOptions};

/// Seconds the active group count must hold still
pub const MIN_STEADY_SECS: u64 = 30;
/// Seconds a group's odds must hold still
pub const MIN_IDLE_SECS: u64 = 60;
pub const MAX_ACTIVE_GROUPS: usize = 3;

pub fn find_low_activity_candidates(
    snapshot: &EventSnapshot,
    options: &ScanOptions,
) -> Vec<Candidate> {
    let active = snapshot.active_groups();
    if !(1..=MAX_ACTIVE_GROUPS).contains(&active)
        || snapshot.active_groups_steady_secs() < MIN_STEADY_SECS
    {
        return Vec::new();
    }

    snapshot
        .groups()
        .filter(|g| g.is_fully_active())
        .filter(|g| g.min_idle_secs() >= MIN_IDLE_SECS)
        .filter(|g| options.odds_in_bounds(g.min_odds(), g.max_odds()))
        .map(|g| Candidate::from_group(snapshot, g, NotificationKind::LowActivity))
        .collect()
}
