//! In-play odds watcher
//!
//! Polls a live in-play odds feed, tracks how long every quoted price has
//! been frozen, runs per-sport pattern matchers, escalates alerts and drives
//! a pool of bookmaker bot sessions over leased proxies.
//!
//! ## Layers
//!
//! - **domain**: events, tips, snapshots, filters, options, notifications
//! - **application**: pattern engine, notification tracker, bot orchestration,
//!   scanner cycle and scheduler
//! - **infrastructure**: config, logging, HTTP clients, Postgres, Redis, Telegram

pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used items
pub use application::{
    BotOrchestrator, BotSession, CycleReport, NotificationTracker, ScanError, Scanner,
    ScannerSettings, Scheduler,
};
pub use domain::{
    EnabledFilters, Event, EventSnapshot, ScanOptions, SnapshotStore, Tip, TipGroupKey,
};
pub use infrastructure::{
    init_tracing, init_tracing_with_level, Heartbeat, ScannerConfig, ShutdownManager,
};
