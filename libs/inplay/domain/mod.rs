//! Domain Layer
//!
//! Pure data types and the algorithms that only touch them.
//! Nothing in here performs I/O.

pub mod bots;
pub mod eligibility;
pub mod event;
pub mod filters;
pub mod notification;
pub mod options;
pub mod scoreboard;
pub mod snapshot;

pub use bots::{
    BetHistoryFilter, BetHistoryItem, BetState, BotAccount, Bookmaker, PlacementOutcome,
    SessionData, WalletBalance,
};
pub use eligibility::{current_phase, is_tip_eligible, tip_phase, PhaseRef, PhaseUnit};
pub use event::{sports, Event, Phase, Team, Tip, TipGroupKey};
pub use filters::{EnabledFilters, FilterKey, DEFAULT_SPORT_TRIGGER_SECS};
pub use notification::{
    AlertPayload, AlertTip, BetConfirmation, EscalationLevel, EscalationPolicy, Notification,
    NotificationKey, NotificationKind, NotificationState, TeamLine,
};
pub use options::{OptionKind, ScanOptions};
pub use scoreboard::{Clock, PhaseLine, Scoreboard};
pub use snapshot::{EventSnapshot, SnapshotStore, TipGroupSnapshot, TipSnapshot};
