//! Open notifications and their escalation state
//!
//! Lifecycle per (event, tip group):
//! `ABSENT -> OPEN -> FIRST_ESCALATED -> SECOND_ESCALATED`, and back to
//! `ABSENT` as soon as the trigger conditions stop holding. Escalation is
//! monotonic: a level that was sent is never sent again while the
//! notification stays open.
//!
//! A tip group has at most one open notification. When several detectors
//! flag the same group, the kind with the highest precedence wins
//! (`Pattern` over `LowActivity` over `IdleOdds`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::event::{Event, Tip, TipGroupKey};

/// Variants are ordered by precedence, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Odds frozen longer than the group's trigger time
    IdleOdds,
    /// Only a handful of groups still live, and those are frozen
    LowActivity,
    /// A sport pattern matcher picked a near-certain tip
    Pattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NotificationKey {
    pub event_id: i64,
    pub group: TipGroupKey,
}

impl NotificationKey {
    pub fn new(event_id: i64, group: TipGroupKey) -> Self {
        Self { event_id, group }
    }

    pub fn id(&self) -> String {
        format!("{}-{}", self.event_id, self.group)
    }
}

/// Delays after which each escalation level fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    pub first_after: Duration,
    pub second_after: Option<Duration>,
}

impl EscalationPolicy {
    pub fn two_stage(first_after: Duration, second_after: Duration) -> Self {
        Self {
            first_after,
            second_after: Some(second_after),
        }
    }

    /// Single alert as soon as the notification opens
    pub fn immediate() -> Self {
        Self {
            first_after: Duration::ZERO,
            second_after: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationLevel {
    First,
    Second,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationState {
    Open,
    FirstEscalated,
    SecondEscalated,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub key: NotificationKey,
    pub kind: NotificationKind,
    pub event: Arc<Event>,
    pub tips: Vec<Tip>,
    pub created_at: DateTime<Utc>,
    pub policy: EscalationPolicy,
    first_sent: bool,
    second_sent: bool,
}

impl Notification {
    pub fn new(
        key: NotificationKey,
        kind: NotificationKind,
        event: Arc<Event>,
        tips: Vec<Tip>,
        created_at: DateTime<Utc>,
        policy: EscalationPolicy,
    ) -> Self {
        Self {
            key,
            kind,
            event,
            tips,
            created_at,
            policy,
            first_sent: false,
            second_sent: false,
        }
    }

    /// Conditions still hold: keep the escalation state, refresh the data
    pub fn refresh(&mut self, event: Arc<Event>, tips: Vec<Tip>) {
        self.event = event;
        self.tips = tips;
    }

    pub fn state(&self) -> NotificationState {
        match (self.first_sent, self.second_sent) {
            (_, true) => NotificationState::SecondEscalated,
            (true, false) => NotificationState::FirstEscalated,
            _ => NotificationState::Open,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.created_at)
            .to_std()
            .unwrap_or_default()
    }

    /// Advance at most one escalation level. Returns the level that fired.
    pub fn escalate(&mut self, now: DateTime<Utc>) -> Option<EscalationLevel> {
        let age = self.age(now);

        if !self.first_sent {
            if age >= self.policy.first_after {
                self.first_sent = true;
                return Some(EscalationLevel::First);
            }
            return None;
        }

        match self.policy.second_after {
            Some(second_after) if !self.second_sent && age >= second_after => {
                self.second_sent = true;
                Some(EscalationLevel::Second)
            }
            _ => None,
        }
    }

    /// Age formatted as "MM:SS"
    pub fn uptime(&self, now: DateTime<Utc>) -> String {
        let secs = self.age(now).as_secs();
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }

    /// Payload for delivery and the cache; `sound` is set once the
    /// notification is at least `sound_after` old
    pub fn to_payload(
        &self,
        now: DateTime<Utc>,
        level: Option<EscalationLevel>,
        sound_after: Duration,
    ) -> AlertPayload {
        let first_tip = self.tips.first();
        let age = self.age(now);
        AlertPayload {
            id: self.key.id(),
            kind: self.kind,
            level,
            event_id: self.event.id,
            sport_id: self.event.sport_id,
            sport_name: self.event.sport_name.clone(),
            league_name: self.event.league_name.clone(),
            first_team: TeamLine {
                name: self.event.first_team.name.clone(),
                score: self.event.first_team.score,
            },
            second_team: TeamLine {
                name: self.event.second_team.name.clone(),
                score: self.event.second_team.score,
            },
            time: self.event.time_or_phase(),
            market_name: first_tip
                .map(|t| t.market_group_name.clone())
                .unwrap_or_default(),
            bet_name: first_tip
                .map(|t| t.bet_group_name_real.clone())
                .unwrap_or_default(),
            tips: self
                .tips
                .iter()
                .map(|t| AlertTip {
                    name: t.name.clone(),
                    odds: t.odds,
                    selection_id: t.selection_id.clone(),
                })
                .collect(),
            uptime: self.uptime(now),
            age_secs: age.as_secs(),
            sound: age >= sound_after,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamLine {
    pub name: String,
    pub score: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertTip {
    pub name: String,
    pub odds: f64,
    pub selection_id: String,
}

/// Ready-to-send view of one notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub id: String,
    pub kind: NotificationKind,
    pub level: Option<EscalationLevel>,
    pub event_id: i64,
    pub sport_id: i64,
    pub sport_name: String,
    pub league_name: String,
    pub first_team: TeamLine,
    pub second_team: TeamLine,
    pub time: String,
    pub market_name: String,
    pub bet_name: String,
    pub tips: Vec<AlertTip>,
    pub uptime: String,
    pub age_secs: u64,
    /// Old enough for the dashboard to play its sound
    pub sound: bool,
}

/// Outcome of one automatic bet placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetConfirmation {
    pub bot_id: i64,
    pub bot_name: String,
    pub bookmaker: String,
    pub event_id: i64,
    pub event_title: String,
    pub score: String,
    pub time: String,
    pub bet_name: String,
    pub tip_name: String,
    pub odds: f64,
    pub stake: f64,
    pub success: bool,
    /// Bookmaker rejection detail or local error text
    pub detail: Option<serde_json::Value>,
}
