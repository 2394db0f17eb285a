//! Idle-odds detector
//!
//! A tip group is a candidate when its market is active, its odds have not
//! moved for at least the group's trigger time, and every odds value of the
//! group sits inside the global bounds.

use super::tracker::Candidate;
use crate::domain::{EnabledFilters, EventSnapshot, FilterKey, NotificationKind, ScanOptions};

pub fn find_idle_candidates(
    snapshot: &EventSnapshot,
    filters: &EnabledFilters,
    options: &ScanOptions,
) -> Vec<Candidate> {
    let event = &snapshot.event;
    let mut candidates = Vec::new();

    for group in snapshot.groups() {
        let Some(first) = group.first() else {
            continue;
        };
        let key = FilterKey::for_tip(event.sport_id, &first.tip);
        let Some(trigger_secs) = filters.trigger_secs(&key) else {
            continue;
        };

        let idle = group.min_idle_secs();
        if group.is_market_active()
            && idle >= trigger_secs
            && options.odds_in_bounds(group.min_odds(), group.max_odds())
        {
            candidates.push(Candidate::from_group(
                snapshot,
                group,
                NotificationKind::IdleOdds,
            ));
        }
    }

    candidates
}
