//! Notifications
//!
//! Candidate detection (patterns, idle odds, low activity) and the tracker
//! that turns candidates into open, escalating notifications.

pub mod idle;
pub mod low_activity;
pub mod tracker;

use tracing::debug;

use super::patterns::match_event;
use crate::domain::{EnabledFilters, EventSnapshot, ScanOptions, Tip};

pub use idle::find_idle_candidates;
pub use low_activity::find_low_activity_candidates;
pub use tracker::{Candidate, NotificationTracker, TrackerOutput};

/// Events tracking fewer groups than this are never treated as on a break
pub const BREAK_MIN_TRACKED_GROUPS: usize = 6;

/// The feed flags a break, or every tracked group of a large enough board
/// has been frozen for at least `break_min_idle_secs`
pub fn is_board_on_break(snapshot: &EventSnapshot, options: &ScanOptions) -> bool {
    if snapshot.event.is_break {
        return true;
    }
    snapshot.group_count() >= BREAK_MIN_TRACKED_GROUPS
        && snapshot
            .groups()
            .all(|g| g.min_idle_secs() >= options.break_min_idle_secs)
}

/// Every candidate of one event: pattern hits against the previous
/// snapshot, idle groups and low-activity groups. An event on a break
/// yields nothing.
pub fn collect_candidates(
    snapshot: &EventSnapshot,
    previous: Option<&EventSnapshot>,
    filters: &EnabledFilters,
    options: &ScanOptions,
) -> Vec<Candidate> {
    if is_board_on_break(snapshot, options) {
        debug!(event_id = snapshot.event_id(), "Board on a break, skipping");
        return Vec::new();
    }

    let mut candidates = Vec::new();
    if let Some(old) = previous {
        let tips: Vec<Tip> = match_event(snapshot, old)
            .into_iter()
            .filter(|tip| tip.is_active)
            .collect();
        candidates.extend(Candidate::from_pattern_tips(snapshot, tips));
    }
    candidates.extend(find_idle_candidates(snapshot, filters, options));
    candidates.extend(find_low_activity_candidates(snapshot, options));
    candidates
}
