//! Pattern matcher trait definition
//!
//! A matcher derives sport state from the current and previous snapshot of
//! one event, then runs a fixed, ordered list of checks. Every check runs;
//! the result is the concatenation of whatever they return.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::domain::Tip;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("Event {event_id} has no scoreboard")]
    MissingScoreboard { event_id: i64 },

    #[error("Event {event_id} has no current phase")]
    MissingPhase { event_id: i64 },

    #[error("Unrecognized phase '{phase}' for event {event_id}")]
    UnknownPhase { event_id: i64, phase: String },

    #[error("Phase {phase} out of range for event {event_id}")]
    PhaseOutOfRange { event_id: i64, phase: i64 },
}

pub type Result<T> = std::result::Result<T, PatternError>;

pub trait PatternMatcher {
    fn sport_id(&self) -> i64;

    /// Tips the checks consider near-certain, in check order
    fn check_for_matches(&self) -> Vec<Tip>;

    /// Derived state, for logs and diagnostics
    fn describe(&self) -> Value;
}

/// One named check of matcher `M`. A check may hit zero, one or several tips.
pub struct NamedCheck<M> {
    pub name: &'static str,
    pub run: fn(&M) -> Vec<Tip>,
}

/// Run every check in order and collect the hits
pub fn run_checks<M>(matcher: &M, event_id: i64, checks: &[NamedCheck<M>]) -> Vec<Tip> {
    let mut hits = Vec::new();
    for check in checks {
        for tip in (check.run)(matcher) {
            debug!(
                event_id,
                check = check.name,
                tip_id = tip.id,
                "Pattern matched {} @ {}",
                tip.name,
                tip.odds
            );
            hits.push(tip);
        }
    }
    hits
}
