//! Application Layer
//!
//! The scan pipeline built on the domain types: pattern matchers,
//! notification tracking, bot orchestration, and the cycle that ties them
//! together.

pub mod bots;
pub mod notifications;
pub mod patterns;
pub mod scanner;
pub mod scheduler;

pub use bots::{BotOrchestrator, BotSession, BulkResults, ReconcileSummary};
pub use notifications::{
    collect_candidates, is_board_on_break, Candidate, NotificationTracker, TrackerOutput,
};
pub use patterns::{get_matcher, match_event, supported_sports, PatternError, PatternMatcher};
pub use scanner::{CycleReport, ScanError, Scanner, ScannerSettings};
pub use scheduler::Scheduler;
