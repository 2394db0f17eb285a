//! Notification lifecycle across consecutive cycles
//!
//! Drives snapshots, the idle and low-activity detectors and the tracker
//! the way the scanner does, with explicit timestamps.

mod common;

use chrono::{DateTime, Utc};
use common::at;
use common::fixtures::{event, filters_for, options, tip, with_scoreboard};
use inplay::application::notifications::{
    collect_candidates, NotificationTracker, TrackerOutput,
};
use inplay::domain::{
    EnabledFilters, EscalationLevel, Event, NotificationKind, NotificationState, ScanOptions,
    SnapshotStore,
};
use std::sync::Arc;

const SPORT: i64 = 4;
const MARKET: i64 = 20;
const TRIGGER_SECS: u64 = 30;

struct Harness {
    store: SnapshotStore,
    tracker: NotificationTracker,
    filters: EnabledFilters,
    options: ScanOptions,
}

impl Harness {
    fn new(template: &Event) -> Self {
        Self {
            store: SnapshotStore::new(),
            tracker: NotificationTracker::new(),
            filters: filters_for(&[template], TRIGGER_SECS),
            options: options(),
        }
    }

    fn cycle(&mut self, event: Event, now: DateTime<Utc>) -> TrackerOutput {
        let built = SnapshotStore::build(&[Arc::new(event)], now, &self.filters);
        let previous = self.store.advance(built);

        let mut candidates = Vec::new();
        for (event_id, snapshot) in self.store.snapshots() {
            candidates.extend(collect_candidates(
                snapshot,
                previous.get(event_id),
                &self.filters,
                &self.options,
            ));
        }
        self.tracker.update(candidates, &self.options, now)
    }
}

/// Four groups; group 1 frozen at `frozen`, the others drift with `tick`
fn board(frozen: f64, tick: u32) -> Event {
    let drift = 0.01 * tick as f64;
    event(
        1,
        SPORT,
        vec![
            tip(1, MARKET, 1, "Over 150.5", frozen),
            tip(2, MARKET, 2, "Over 160.5", 1.80 + drift),
            tip(3, MARKET, 3, "Over 170.5", 1.90 + drift),
            tip(4, MARKET, 4, "Over 180.5", 2.00 + drift),
        ],
    )
}

fn idle_alerts(output: &TrackerOutput) -> Vec<Option<EscalationLevel>> {
    output
        .escalated
        .iter()
        .filter(|a| a.kind == NotificationKind::IdleOdds)
        .map(|a| a.level)
        .collect()
}

#[test]
fn frozen_group_escalates_twice_then_closes() {
    let mut h = Harness::new(&board(1.5, 0));

    // Not idle long enough yet
    assert!(h.cycle(board(1.5, 0), at(0)).open.is_empty());

    // Idle for the trigger time: opens silently
    let opened = h.cycle(board(1.5, 1), at(30));
    assert_eq!(opened.opened.len(), 1);
    assert!(opened.escalated.is_empty());
    let key = opened.opened[0];
    assert_eq!(
        h.tracker.get(&key).map(|n| n.kind),
        Some(NotificationKind::IdleOdds)
    );

    // 65s open against a 60s first delay
    let first = h.cycle(board(1.5, 2), at(95));
    assert_eq!(idle_alerts(&first), vec![Some(EscalationLevel::First)]);
    assert_eq!(
        h.tracker.get(&key).map(|n| n.state()),
        Some(NotificationState::FirstEscalated)
    );

    // Nothing new between the two delays
    assert!(idle_alerts(&h.cycle(board(1.5, 3), at(110))).is_empty());

    // 125s open against a 120s second delay
    let second = h.cycle(board(1.5, 4), at(155));
    assert_eq!(idle_alerts(&second), vec![Some(EscalationLevel::Second)]);

    // Never again while open
    assert!(idle_alerts(&h.cycle(board(1.5, 5), at(400))).is_empty());
    assert_eq!(h.tracker.len(), 1);

    // Odds move: condition no longer holds
    let closed = h.cycle(board(1.6, 6), at(410));
    assert_eq!(closed.closed, 1);
    assert!(h.tracker.is_empty());
}

#[test]
fn late_cycle_fires_one_level_per_cycle() {
    let mut h = Harness::new(&board(1.5, 0));
    h.cycle(board(1.5, 0), at(0));
    h.cycle(board(1.5, 1), at(30));

    // Both delays elapsed by the next cycle
    let late = h.cycle(board(1.5, 2), at(300));
    assert_eq!(idle_alerts(&late), vec![Some(EscalationLevel::First)]);

    let next = h.cycle(board(1.5, 3), at(301));
    assert_eq!(idle_alerts(&next), vec![Some(EscalationLevel::Second)]);
}

#[test]
fn reopened_notification_starts_over() {
    let mut h = Harness::new(&board(1.5, 0));
    h.cycle(board(1.5, 0), at(0));
    h.cycle(board(1.5, 1), at(30));
    h.cycle(board(1.5, 2), at(95));

    // Odds move and close it
    h.cycle(board(1.7, 3), at(100));
    assert!(h.tracker.is_empty());

    // Frozen again for the trigger time: a brand new notification
    let reopened = h.cycle(board(1.7, 4), at(130));
    assert_eq!(reopened.opened.len(), 1);
    assert!(reopened.escalated.is_empty());
    let key = reopened.opened[0];
    assert_eq!(
        h.tracker.get(&key).map(|n| n.state()),
        Some(NotificationState::Open)
    );
}

#[test]
fn odds_outside_bounds_never_open() {
    let mut h = Harness::new(&board(40.0, 0));
    h.cycle(board(40.0, 0), at(0));
    let output = h.cycle(board(40.0, 1), at(60));
    assert!(output.opened.is_empty());
}

#[test]
fn break_events_are_ignored() {
    let mut h = Harness::new(&board(1.5, 0));
    let mut on_break = board(1.5, 0);
    on_break.is_break = true;
    h.cycle(on_break.clone(), at(0));
    assert!(h.cycle(on_break, at(60)).open.is_empty());
}

#[test]
fn whole_board_idle_is_treated_as_break() {
    let tips: Vec<_> = (1..=6)
        .map(|i| tip(i, MARKET, i, "Over 150.5", 1.5 + i as f64 / 10.0))
        .collect();
    let frozen = event(1, SPORT, tips);
    let mut h = Harness::new(&frozen);

    h.cycle(frozen.clone(), at(0));
    // Every group idle past the trigger but below the break threshold
    let idle = h.cycle(frozen.clone(), at(60));
    assert_eq!(
        idle.open
            .iter()
            .filter(|a| a.kind == NotificationKind::IdleOdds)
            .count(),
        6
    );

    // Every group idle past the break threshold: suppressed
    let suppressed = h.cycle(frozen, at(200));
    assert!(suppressed.open.is_empty());
    assert_eq!(suppressed.closed, 6);
}

/// Two live groups and six suspended ones, nothing moving
fn quiet_board() -> Event {
    let tips = (1..=8)
        .map(|i| {
            let t = tip(i, MARKET, i, "Over 150.5", 1.5 + i as f64 / 10.0);
            if i <= 2 {
                t
            } else {
                common::fixtures::inactive(t)
            }
        })
        .collect();
    event(1, SPORT, tips)
}

#[test]
fn break_silences_every_detector() {
    let quiet = quiet_board();
    let mut h = Harness::new(&quiet);

    h.cycle(quiet.clone(), at(0));
    // Below the break threshold the two live groups are flagged
    let flagged = h.cycle(quiet.clone(), at(100));
    assert_eq!(flagged.open.len(), 2);
    assert!(flagged
        .open
        .iter()
        .all(|a| a.kind == NotificationKind::LowActivity));

    // Whole board frozen past the break threshold: nothing stays open
    let on_break = h.cycle(quiet, at(200));
    assert!(on_break.open.is_empty());
    assert!(on_break.opened.is_empty());
    assert_eq!(on_break.closed, 2);
}

#[test]
fn break_silences_a_board_seen_for_the_first_time_late() {
    let quiet = quiet_board();
    let mut h = Harness::new(&quiet);

    h.cycle(quiet.clone(), at(0));
    let output = h.cycle(quiet, at(200));
    assert!(output.open.is_empty());
    assert!(output.escalated.is_empty());
}

#[test]
fn one_notification_per_tip_group() {
    // One live group frozen past its trigger, three suspended
    let tips = vec![
        tip(1, MARKET, 1, "Over 150.5", 1.5),
        common::fixtures::inactive(tip(2, MARKET, 2, "Over 160.5", 1.8)),
        common::fixtures::inactive(tip(3, MARKET, 3, "Over 170.5", 1.9)),
        common::fixtures::inactive(tip(4, MARKET, 4, "Over 180.5", 2.0)),
    ];
    let quiet = event(1, SPORT, tips);
    let mut h = Harness::new(&quiet);
    h.filters = filters_for(&[&quiet], 60);

    h.cycle(quiet.clone(), at(0));
    let output = h.cycle(quiet, at(61));

    // Both detectors fire on the group; it opens once, as low activity
    assert_eq!(output.opened.len(), 1);
    assert_eq!(output.open.len(), 1);
    assert_eq!(output.open[0].kind, NotificationKind::LowActivity);
    assert_eq!(output.escalated.len(), 1);
    assert_eq!(h.tracker.len(), 1);
}

#[test]
fn low_activity_alerts_immediately() {
    // One live group left, the other three suspended
    let tips = vec![
        tip(1, MARKET, 1, "Over 150.5", 1.5),
        common::fixtures::inactive(tip(2, MARKET, 2, "Over 160.5", 1.8)),
        common::fixtures::inactive(tip(3, MARKET, 3, "Over 170.5", 1.9)),
        common::fixtures::inactive(tip(4, MARKET, 4, "Over 180.5", 2.0)),
    ];
    let quiet = event(1, SPORT, tips);
    let mut h = Harness::new(&quiet);
    // Keep the idle detector out of it
    h.filters = filters_for(&[&quiet], 10_000);

    h.cycle(quiet.clone(), at(0));
    assert!(h.cycle(quiet.clone(), at(40)).opened.is_empty());

    let output = h.cycle(quiet, at(61));
    let low: Vec<_> = output
        .escalated
        .iter()
        .filter(|a| a.kind == NotificationKind::LowActivity)
        .collect();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].level, Some(EscalationLevel::First));
}

#[test]
fn tips_for_another_phase_are_not_eligible() {
    // Race line for the 1st quarter while the 2nd is being played
    let mut race = tip(1, MARKET, 1, "Home", 1.5);
    race.bet_group_name_real = "Quarter 1 - Race to 20 Points".to_string();
    let mut filler: Vec<_> = (2..=4)
        .map(|i| tip(i, MARKET, i, "Over 150.5", 1.5))
        .collect();
    let mut tips = vec![race];
    tips.append(&mut filler);

    let template = with_scoreboard(event(1, SPORT, tips), (2, "2nd Quarter"), &[]);
    let mut h = Harness::new(&template);

    let moving = |tick: u32| {
        let mut e = template.clone();
        for t in e.tips.iter_mut().skip(1) {
            t.odds += 0.01 * tick as f64;
        }
        e
    };
    h.cycle(moving(0), at(0));
    let output = h.cycle(moving(1), at(60));
    assert!(output.opened.is_empty());
}
