//! Per-cycle odds snapshots and idle-time accounting
//!
//! A snapshot is built for every polled event, restricted to the enabled
//! filter set and nested market group -> tip group -> tip id. Diffing a new
//! snapshot against the previous cycle's snapshot of the same event carries
//! the idle counters forward:
//!
//! - odds unchanged: `idle = previous idle + elapsed seconds`
//! - odds changed: `idle = 0`
//! - tip not present before: `idle = 0`
//!
//! Snapshots are only mutable while being diffed, before they are
//! published into the store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

use super::event::{Event, Tip, TipGroupKey};
use super::filters::{EnabledFilters, FilterKey};

#[derive(Debug, Clone, Serialize)]
pub struct TipSnapshot {
    pub tip: Tip,
    /// Seconds since the odds last changed
    pub idle_secs: u64,
}

/// Snapshots of the tips sharing one tip group
#[derive(Debug, Clone, Serialize)]
pub struct TipGroupSnapshot {
    pub key: TipGroupKey,
    tips: BTreeMap<i64, TipSnapshot>,
}

impl TipGroupSnapshot {
    pub fn tips(&self) -> impl Iterator<Item = &TipSnapshot> {
        self.tips.values()
    }

    pub fn tip(&self, tip_id: i64) -> Option<&TipSnapshot> {
        self.tips.get(&tip_id)
    }

    /// First tip by id; carries the group's market and bet identity
    pub fn first(&self) -> Option<&TipSnapshot> {
        self.tips.values().next()
    }

    pub fn len(&self) -> usize {
        self.tips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tips.is_empty()
    }

    pub fn min_idle_secs(&self) -> u64 {
        self.tips.values().map(|t| t.idle_secs).min().unwrap_or(0)
    }

    pub fn min_odds(&self) -> f64 {
        self.tips
            .values()
            .map(|t| t.tip.odds)
            .fold(f64::INFINITY, f64::min)
    }

    pub fn max_odds(&self) -> f64 {
        self.tips
            .values()
            .map(|t| t.tip.odds)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn is_fully_active(&self) -> bool {
        !self.tips.is_empty() && self.tips.values().all(|t| t.tip.is_active)
    }

    /// Market activity as reported on the group's first tip
    pub fn is_market_active(&self) -> bool {
        self.first().map(|t| t.tip.is_active).unwrap_or(false)
    }

    pub fn to_tips(&self) -> Vec<Tip> {
        self.tips.values().map(|t| t.tip.clone()).collect()
    }
}

type MarketGroups = BTreeMap<TipGroupKey, TipGroupSnapshot>;

/// Filtered view of one event's tips at one instant
#[derive(Debug, Clone)]
pub struct EventSnapshot {
    pub event: Arc<Event>,
    pub timestamp: DateTime<Utc>,
    markets: BTreeMap<i64, MarketGroups>,
    active_groups: usize,
    active_groups_steady_secs: u64,
}

impl EventSnapshot {
    /// Build a snapshot holding only the tips enabled by `filters`
    pub fn build(event: Arc<Event>, timestamp: DateTime<Utc>, filters: &EnabledFilters) -> Self {
        let mut markets: BTreeMap<i64, MarketGroups> = BTreeMap::new();

        for tip in &event.tips {
            if !filters.contains(&FilterKey::for_tip(event.sport_id, tip)) {
                continue;
            }
            let key = tip.group_key();
            markets
                .entry(tip.market_group_id)
                .or_default()
                .entry(key)
                .or_insert_with(|| TipGroupSnapshot {
                    key,
                    tips: BTreeMap::new(),
                })
                .tips
                .insert(
                    tip.id,
                    TipSnapshot {
                        tip: tip.clone(),
                        idle_secs: 0,
                    },
                );
        }

        let active_groups = markets
            .values()
            .flat_map(|groups| groups.values())
            .filter(|g| g.is_fully_active())
            .count();

        Self {
            event,
            timestamp,
            markets,
            active_groups,
            active_groups_steady_secs: 0,
        }
    }

    /// Carry idle counters forward from the previous snapshot of the same event
    pub fn inherit(&mut self, previous: &EventSnapshot) {
        let elapsed = elapsed_secs(previous.timestamp, self.timestamp);

        for (market_id, groups) in self.markets.iter_mut() {
            let Some(previous_groups) = previous.markets.get(market_id) else {
                continue;
            };
            for (key, group) in groups.iter_mut() {
                let Some(previous_group) = previous_groups.get(key) else {
                    continue;
                };
                for (tip_id, snapshot) in group.tips.iter_mut() {
                    if let Some(old) = previous_group.tips.get(tip_id) {
                        snapshot.idle_secs = if odds_changed(old.tip.odds, snapshot.tip.odds) {
                            0
                        } else {
                            old.idle_secs + elapsed
                        };
                    }
                }
            }
        }

        self.active_groups_steady_secs = if self.active_groups == previous.active_groups {
            previous.active_groups_steady_secs + elapsed
        } else {
            0
        };
    }

    pub fn event_id(&self) -> i64 {
        self.event.id
    }

    pub fn market(&self, market_group_id: i64) -> Option<impl Iterator<Item = &TipGroupSnapshot>> {
        self.markets.get(&market_group_id).map(|groups| groups.values())
    }

    /// Every tracked tip group, ordered by market group then group key
    pub fn groups(&self) -> impl Iterator<Item = &TipGroupSnapshot> {
        self.markets.values().flat_map(|groups| groups.values())
    }

    pub fn group(&self, market_group_id: i64, key: &TipGroupKey) -> Option<&TipGroupSnapshot> {
        self.markets.get(&market_group_id)?.get(key)
    }

    /// Groups of one market whose bet group matches `bet_group_id`
    pub fn tip_groups(&self, market_group_id: i64, bet_group_id: i64) -> Vec<&TipGroupSnapshot> {
        self.market(market_group_id)
            .map(|groups| {
                groups
                    .filter(|g| {
                        g.first()
                            .map(|t| t.tip.bet_group_id == bet_group_id)
                            .unwrap_or(false)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn group_count(&self) -> usize {
        self.markets.values().map(|groups| groups.len()).sum()
    }

    pub fn tip_count(&self) -> usize {
        self.groups().map(|g| g.len()).sum()
    }

    /// Number of groups where every tip is currently active
    pub fn active_groups(&self) -> usize {
        self.active_groups
    }

    /// Seconds since `active_groups` last changed
    pub fn active_groups_steady_secs(&self) -> u64 {
        self.active_groups_steady_secs
    }
}

/// Owner of the latest published snapshot per event
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: HashMap<i64, EventSnapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build snapshots for a freshly polled set of events
    pub fn build(
        events: &[Arc<Event>],
        timestamp: DateTime<Utc>,
        filters: &EnabledFilters,
    ) -> HashMap<i64, EventSnapshot> {
        events
            .iter()
            .map(|event| {
                (
                    event.id,
                    EventSnapshot::build(Arc::clone(event), timestamp, filters),
                )
            })
            .collect()
    }

    /// Update idle counters in `new` from the matching snapshots in `old`
    pub fn diff(new: &mut HashMap<i64, EventSnapshot>, old: &HashMap<i64, EventSnapshot>) {
        for (event_id, snapshot) in new.iter_mut() {
            if let Some(previous) = old.get(event_id) {
                snapshot.inherit(previous);
            }
        }
    }

    /// Diff `new` against the current snapshots, publish it and return the
    /// snapshots it replaced. Events missing from `new` are dropped.
    pub fn advance(&mut self, mut new: HashMap<i64, EventSnapshot>) -> HashMap<i64, EventSnapshot> {
        Self::diff(&mut new, &self.current);
        let dropped = self
            .current
            .keys()
            .filter(|id| !new.contains_key(id))
            .count();
        if dropped > 0 {
            debug!("Dropped {} snapshots for events no longer in the feed", dropped);
        }
        std::mem::replace(&mut self.current, new)
    }

    pub fn get(&self, event_id: i64) -> Option<&EventSnapshot> {
        self.current.get(&event_id)
    }

    pub fn snapshots(&self) -> &HashMap<i64, EventSnapshot> {
        &self.current
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}

fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    to.signed_duration_since(from).num_seconds().max(0) as u64
}

fn odds_changed(a: f64, b: f64) -> bool {
    (a - b).abs() > f64::EPSILON
}
