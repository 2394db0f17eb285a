//! Ephemeral key/value cache shared with the operator UI
//!
//! Everything written here is short-lived status: the open notification
//! list, cycle counters, the latest error, per-bot wallet and history
//! snapshots and serialized bot sessions. Backends only need four
//! primitives; the typed writers are provided methods.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::domain::{AlertPayload, BetHistoryItem, SessionData, WalletBalance};

pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;

// ============================================================================
// Keys
// ============================================================================

pub mod keys {
    pub const NOTIFICATIONS: &str = "iw_notifications";
    pub const EVENT_COUNT: &str = "iw_status_event_count";
    pub const NOTIFICATION_COUNT: &str = "iw_status_notification_count";
    pub const HEAVY_LOAD: &str = "iw_status_heavy_load";
    pub const ERROR_CLASS: &str = "iw_status_error_class";
    pub const ERROR_DESC: &str = "iw_status_error_desc";
    pub const ERROR_DETAIL: &str = "iw_status_error_detail";
    pub const LAST_ERRORS: &str = "iw_last_errors";

    pub fn bot_wallet(bot_id: i64) -> String {
        format!("iw_bot_wallet:{}", bot_id)
    }

    pub fn bot_history(bot_id: i64) -> String {
        format!("iw_bot_history:{}", bot_id)
    }

    pub fn bot_session(bot_id: i64) -> String {
        format!("iw_bot_session:{}", bot_id)
    }
}

pub const NOTIFICATIONS_TTL: Duration = Duration::from_secs(30);
pub const STATUS_TTL: Duration = Duration::from_secs(10);
pub const ERROR_TTL: Duration = Duration::from_secs(15);
pub const BOT_DATA_TTL: Duration = Duration::from_secs(120);
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const ERROR_HISTORY_CAP: usize = 25;

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// One entry of the capped error history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub class: String,
    pub description: String,
    pub detail: Option<Value>,
    pub at: DateTime<Utc>,
}

// ============================================================================
// Trait
// ============================================================================

#[async_trait]
pub trait EphemeralCache: Send + Sync {
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Prepend to a list, keeping only the newest `cap` entries
    async fn push_capped(&self, key: &str, value: String, cap: usize) -> Result<()>;

    /// Whole list, newest first
    async fn list(&self, key: &str) -> Result<Vec<String>>;

    /// Replace the open notification list wholesale
    async fn publish_notifications(&self, open: &[AlertPayload]) -> Result<()> {
        let body = serde_json::to_string(open)?;
        self.set(keys::NOTIFICATIONS, body, Some(NOTIFICATIONS_TTL)).await
    }

    async fn publish_status(&self, events: usize, notifications: usize) -> Result<()> {
        self.set(keys::EVENT_COUNT, events.to_string(), Some(STATUS_TTL))
            .await?;
        self.set(
            keys::NOTIFICATION_COUNT,
            notifications.to_string(),
            Some(STATUS_TTL),
        )
        .await
    }

    async fn set_heavy_load(&self) -> Result<()> {
        self.set(keys::HEAVY_LOAD, "1".to_string(), Some(STATUS_TTL))
            .await
    }

    /// Publish the current error and append it to the capped history
    async fn record_error(&self, record: &ErrorRecord) -> Result<()> {
        self.set(keys::ERROR_CLASS, record.class.clone(), Some(ERROR_TTL))
            .await?;
        self.set(keys::ERROR_DESC, record.description.clone(), Some(ERROR_TTL))
            .await?;
        let detail = record
            .detail
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_default();
        self.set(keys::ERROR_DETAIL, detail, Some(ERROR_TTL)).await?;
        self.push_capped(
            keys::LAST_ERRORS,
            serde_json::to_string(record)?,
            ERROR_HISTORY_CAP,
        )
        .await
    }

    async fn last_errors(&self) -> Result<Vec<ErrorRecord>> {
        let mut records = Vec::new();
        for raw in self.list(keys::LAST_ERRORS).await? {
            match serde_json::from_str(&raw) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable error record: {}", e),
            }
        }
        Ok(records)
    }

    async fn set_bot_wallet(&self, bot_id: i64, balance: &WalletBalance) -> Result<()> {
        self.set(&keys::bot_wallet(bot_id), balance.funds(), Some(BOT_DATA_TTL))
            .await
    }

    async fn set_bot_history(&self, bot_id: i64, history: &[BetHistoryItem]) -> Result<()> {
        let items: Vec<Value> = history.iter().map(BetHistoryItem::to_json).collect();
        self.set(
            &keys::bot_history(bot_id),
            serde_json::to_string(&items)?,
            Some(BOT_DATA_TTL),
        )
        .await
    }

    async fn save_sessions(&self, sessions: &HashMap<i64, SessionData>) -> Result<()> {
        for (bot_id, data) in sessions {
            self.set(
                &keys::bot_session(*bot_id),
                serde_json::to_string(data)?,
                Some(SESSION_TTL),
            )
            .await?;
        }
        Ok(())
    }

    /// Cached sessions for the given bots; unreadable entries are skipped
    async fn load_sessions(&self, bot_ids: &[i64]) -> Result<HashMap<i64, SessionData>> {
        let mut sessions = HashMap::new();
        for bot_id in bot_ids {
            let Some(raw) = self.get(&keys::bot_session(*bot_id)).await? else {
                continue;
            };
            match serde_json::from_str(&raw) {
                Ok(data) => {
                    sessions.insert(*bot_id, data);
                }
                Err(e) => warn!(bot_id, "Discarding unreadable cached session: {}", e),
            }
        }
        Ok(sessions)
    }
}
