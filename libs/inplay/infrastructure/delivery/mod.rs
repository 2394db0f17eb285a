//! Outbound alert delivery

pub mod telegram;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::domain::{AlertPayload, BetConfirmation};
use crate::infrastructure::client::HttpError;

pub use telegram::TelegramDelivery;

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Delivery request failed: {0}")]
    Request(#[from] HttpError),

    #[error("Delivery channel not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(e: reqwest::Error) -> Self {
        DeliveryError::Request(e.into())
    }
}

pub type Result<T> = std::result::Result<T, DeliveryError>;

#[async_trait]
pub trait AlertDelivery: Send + Sync {
    async fn send_alerts(&self, alerts: &[AlertPayload]) -> Result<()>;

    async fn send_bet_confirmations(&self, confirmations: &[BetConfirmation]) -> Result<()>;
}

/// Writes alerts to the log only
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDelivery;

#[async_trait]
impl AlertDelivery for LogDelivery {
    async fn send_alerts(&self, alerts: &[AlertPayload]) -> Result<()> {
        for alert in alerts {
            info!(
                id = %alert.id,
                level = ?alert.level,
                "{} vs {} | {} | {} | {}",
                alert.first_team.name,
                alert.second_team.name,
                alert.time,
                alert.bet_name,
                alert
                    .tips
                    .iter()
                    .map(|t| format!("{} ({:.2})", t.name, t.odds))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        Ok(())
    }

    async fn send_bet_confirmations(&self, confirmations: &[BetConfirmation]) -> Result<()> {
        for c in confirmations {
            info!(
                bot_id = c.bot_id,
                success = c.success,
                "Bet {} @ {:.2} x {} on {}",
                c.tip_name,
                c.odds,
                c.stake,
                c.event_title
            );
        }
        Ok(())
    }
}
