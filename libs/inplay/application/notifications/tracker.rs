//! Notification tracker
//!
//! Owns the open notifications between cycles. Every cycle it receives the
//! full candidate set; candidates that are already open are refreshed,
//! new ones are opened, and anything not in the set is dropped.
//!
//! Candidates are merged per (event, tip group) before anything opens, so a
//! group flagged by several detectors opens one notification of the kind
//! with the highest precedence. An open notification that gets flagged by a
//! higher-precedence kind is reopened under that kind; lower kinds only
//! refresh it.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::{
    is_tip_eligible, AlertPayload, EscalationPolicy, Event, EventSnapshot, Notification,
    NotificationKey, NotificationKind, ScanOptions, Tip, TipGroupSnapshot,
};

/// A tip group that satisfies its trigger conditions this cycle
#[derive(Debug, Clone)]
pub struct Candidate {
    pub key: NotificationKey,
    pub kind: NotificationKind,
    pub event: Arc<Event>,
    pub tips: Vec<Tip>,
}

impl Candidate {
    pub fn from_group(
        snapshot: &EventSnapshot,
        group: &TipGroupSnapshot,
        kind: NotificationKind,
    ) -> Self {
        Self {
            key: NotificationKey::new(snapshot.event_id(), group.key),
            kind,
            event: Arc::clone(&snapshot.event),
            tips: group.to_tips(),
        }
    }

    /// One candidate per tip group among the matched tips
    pub fn from_pattern_tips(snapshot: &EventSnapshot, tips: Vec<Tip>) -> Vec<Self> {
        let mut grouped: BTreeMap<NotificationKey, Vec<Tip>> = BTreeMap::new();
        for tip in tips {
            let key = NotificationKey::new(snapshot.event_id(), tip.group_key());
            grouped.entry(key).or_default().push(tip);
        }
        grouped
            .into_iter()
            .map(|(key, tips)| Self {
                key,
                kind: NotificationKind::Pattern,
                event: Arc::clone(&snapshot.event),
                tips,
            })
            .collect()
    }
}

/// What one tracker update produced
#[derive(Debug, Clone, Default)]
pub struct TrackerOutput {
    /// Every notification open after the update
    pub open: Vec<AlertPayload>,
    /// Notifications that reached a new escalation level this cycle
    pub escalated: Vec<AlertPayload>,
    /// Keys of notifications opened this cycle
    pub opened: Vec<NotificationKey>,
    /// Number of notifications dropped this cycle
    pub closed: usize,
}

#[derive(Debug, Default)]
pub struct NotificationTracker {
    open: BTreeMap<NotificationKey, Notification>,
}

impl NotificationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Escalation schedule for a notification kind
    pub fn policy_for(kind: NotificationKind, options: &ScanOptions) -> EscalationPolicy {
        match kind {
            NotificationKind::IdleOdds => {
                EscalationPolicy::two_stage(options.first_notify(), options.second_notify())
            }
            NotificationKind::LowActivity | NotificationKind::Pattern => {
                EscalationPolicy::immediate()
            }
        }
    }

    /// One candidate per key, keeping the highest-precedence kind. Ties
    /// keep the first candidate seen.
    fn merge(candidates: Vec<Candidate>) -> BTreeMap<NotificationKey, Candidate> {
        let mut merged: BTreeMap<NotificationKey, Candidate> = BTreeMap::new();
        for candidate in candidates {
            match merged.get(&candidate.key) {
                Some(existing) if existing.kind >= candidate.kind => {}
                _ => {
                    merged.insert(candidate.key, candidate);
                }
            }
        }
        merged
    }

    /// Replace the open set with this cycle's candidates and escalate
    pub fn update(
        &mut self,
        candidates: Vec<Candidate>,
        options: &ScanOptions,
        now: DateTime<Utc>,
    ) -> TrackerOutput {
        let mut previous = std::mem::take(&mut self.open);
        let mut output = TrackerOutput::default();

        let eligible = candidates.into_iter().filter(|candidate| {
            candidate
                .tips
                .first()
                .is_some_and(|first| is_tip_eligible(&candidate.event, first))
        });

        for (key, candidate) in Self::merge(eligible.collect()) {
            let notification = match previous.remove(&key) {
                Some(mut existing) if existing.kind >= candidate.kind => {
                    if existing.kind == candidate.kind {
                        existing.refresh(candidate.event, candidate.tips);
                    } else {
                        // Keep the tips the stronger signal picked
                        existing.event = candidate.event;
                    }
                    existing.policy = Self::policy_for(existing.kind, options);
                    existing
                }
                upgraded => {
                    if let Some(existing) = upgraded {
                        debug!(
                            notification = %key.id(),
                            "Reopening {:?} notification as {:?}",
                            existing.kind,
                            candidate.kind
                        );
                    }
                    output.opened.push(key);
                    Notification::new(
                        key,
                        candidate.kind,
                        candidate.event,
                        candidate.tips,
                        now,
                        Self::policy_for(candidate.kind, options),
                    )
                }
            };
            self.open.insert(key, notification);
        }

        output.closed = previous.len();
        for key in previous.keys() {
            debug!(notification = %key.id(), "Notification closed");
        }

        let sound_after = options.sound_notify();
        for notification in self.open.values_mut() {
            if let Some(level) = notification.escalate(now) {
                output
                    .escalated
                    .push(notification.to_payload(now, Some(level), sound_after));
            }
        }
        output.open = self
            .open
            .values()
            .map(|n| n.to_payload(now, None, sound_after))
            .collect();

        if !output.opened.is_empty() || output.closed > 0 {
            info!(
                "{} notifications open: {} new, {} closed, {} escalated",
                self.open.len(),
                output.opened.len(),
                output.closed,
                output.escalated.len()
            );
        }
        output
    }

    pub fn get(&self, key: &NotificationKey) -> Option<&Notification> {
        self.open.get(key)
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Team, TipGroupKey};
    use chrono::Duration;

    fn event(phase: Option<(i64, &str)>) -> Arc<Event> {
        Arc::new(Event {
            id: 7,
            sport_id: 4,
            sport_name: "Basketball".to_string(),
            league_name: "League".to_string(),
            first_team: Team {
                id: Some(1),
                name: "A".to_string(),
                score: Some(20),
            },
            second_team: Team {
                id: Some(2),
                name: "B".to_string(),
                score: Some(18),
            },
            clock: None,
            phase: phase.map(|(id, name)| crate::domain::Phase {
                id,
                name: name.to_string(),
            }),
            is_break: false,
            tips: Vec::new(),
            raw: serde_json::Value::Null,
        })
    }

    fn candidate(bet_name: &str, kind: NotificationKind, event: Arc<Event>) -> Candidate {
        let tip = Tip {
            id: 1,
            name: "Home".to_string(),
            odds: 1.5,
            market_group_id: 4,
            market_group_name: "Quarters".to_string(),
            bet_group_id: 8404,
            bet_group_name: bet_name.to_string(),
            bet_group_name_real: bet_name.to_string(),
            unique_group_id: Some(11),
            is_active: true,
            selection_id: "s1".to_string(),
            associated_player_id: None,
        };
        Candidate {
            key: NotificationKey::new(7, TipGroupKey::Unique { id: 11 }),
            kind,
            event,
            tips: vec![tip],
        }
    }

    #[test]
    fn test_ineligible_candidates_are_not_opened() {
        let mut tracker = NotificationTracker::new();
        let e = event(Some((3, "3rd Quarter")));
        let out = tracker.update(
            vec![candidate("Quarter 2 - Race to 10 Points", NotificationKind::IdleOdds, e)],
            &ScanOptions::default(),
            Utc::now(),
        );
        assert!(out.opened.is_empty());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_pattern_alerts_fire_once_on_open() {
        let mut tracker = NotificationTracker::new();
        let t0 = Utc::now();
        let e = event(None);
        let c = candidate("Total Points", NotificationKind::Pattern, e);

        let out = tracker.update(vec![c.clone()], &ScanOptions::default(), t0);
        assert_eq!(out.opened.len(), 1);
        assert_eq!(out.escalated.len(), 1);

        let out = tracker.update(vec![c], &ScanOptions::default(), t0 + Duration::seconds(900));
        assert!(out.opened.is_empty());
        assert!(out.escalated.is_empty());
        assert_eq!(out.open.len(), 1);
    }

    #[test]
    fn test_open_payloads_sound_after_configured_age() {
        let mut tracker = NotificationTracker::new();
        let t0 = Utc::now();
        let c = candidate("Total Points", NotificationKind::IdleOdds, event(None));
        let options = ScanOptions {
            sound_notify_secs: 20,
            ..ScanOptions::default()
        };

        let out = tracker.update(vec![c.clone()], &options, t0);
        assert!(!out.open[0].sound);

        let out = tracker.update(vec![c], &options, t0 + Duration::seconds(20));
        assert!(out.open[0].sound);
    }

    #[test]
    fn test_missing_candidate_closes_notification() {
        let mut tracker = NotificationTracker::new();
        let t0 = Utc::now();
        let c = candidate("Total Points", NotificationKind::IdleOdds, event(None));
        tracker.update(vec![c], &ScanOptions::default(), t0);
        assert_eq!(tracker.len(), 1);

        let out = tracker.update(Vec::new(), &ScanOptions::default(), t0 + Duration::seconds(1));
        assert_eq!(out.closed, 1);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_one_notification_per_group() {
        let mut tracker = NotificationTracker::new();
        let t0 = Utc::now();
        let e = event(None);
        let idle = candidate("Total Points", NotificationKind::IdleOdds, Arc::clone(&e));
        let low = candidate("Total Points", NotificationKind::LowActivity, e);

        let out = tracker.update(vec![idle, low], &ScanOptions::default(), t0);
        assert_eq!(out.opened.len(), 1);
        assert_eq!(out.open.len(), 1);
        assert_eq!(out.open[0].kind, NotificationKind::LowActivity);
        // Low activity alerts at once; the idle schedule never applies
        assert_eq!(out.escalated.len(), 1);
    }

    #[test]
    fn test_higher_kind_reopens_lower_only_refreshes() {
        let mut tracker = NotificationTracker::new();
        let t0 = Utc::now();
        let e = event(None);
        let idle = candidate("Total Points", NotificationKind::IdleOdds, Arc::clone(&e));
        let pattern = candidate("Total Points", NotificationKind::Pattern, e);
        let options = ScanOptions::default();

        tracker.update(vec![idle.clone()], &options, t0);

        let t1 = t0 + Duration::seconds(5);
        let out = tracker.update(vec![idle.clone(), pattern], &options, t1);
        assert_eq!(out.opened.len(), 1);
        assert_eq!(out.closed, 0);
        let key = out.opened[0];
        assert_eq!(tracker.get(&key).map(|n| n.kind), Some(NotificationKind::Pattern));

        // Falling back to idle keeps the pattern notification as it is
        let out = tracker.update(vec![idle], &options, t0 + Duration::seconds(10));
        assert!(out.opened.is_empty());
        assert!(out.escalated.is_empty());
        assert_eq!(tracker.get(&key).map(|n| n.kind), Some(NotificationKind::Pattern));
    }

    #[test]
    fn test_kind_precedence() {
        assert!(NotificationKind::Pattern > NotificationKind::LowActivity);
        assert!(NotificationKind::LowActivity > NotificationKind::IdleOdds);
    }
}
