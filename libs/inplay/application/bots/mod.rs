//! Bookmaker bots: one session per account and the orchestrator that
//! drives them concurrently

pub mod orchestrator;
pub mod session;

pub use orchestrator::{BotOrchestrator, BulkResults, ReconcileSummary};
pub use session::BotSession;
