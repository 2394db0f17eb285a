//! Telegram Bot API delivery (sendMessage, HTML parse mode)

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::{AlertDelivery, DeliveryError, Result};
use crate::domain::{AlertPayload, BetConfirmation, EscalationLevel, NotificationKind};
use crate::infrastructure::client::helpers::require_success;

pub const MAX_MESSAGE_LENGTH: usize = 4050;
pub const GROUP_DELIMITER: &str = "\n\n";

/// Spacing between consecutive messages to stay under the bot rate limit
const SEND_SPACING: Duration = Duration::from_millis(1200);

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

pub struct TelegramDelivery {
    http: Client,
    token: String,
    chat_id: String,
    bet_chat_id: Option<String>,
}

impl TelegramDelivery {
    pub fn new(token: String, chat_id: String, bet_chat_id: Option<String>) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            http,
            token,
            chat_id,
            bet_chat_id,
        })
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.token);
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let response = self.http.post(&url).json(&request).send().await?;
        require_success(response, "Telegram sendMessage failed").await?;
        Ok(())
    }

    async fn send_blocks(&self, chat_id: &str, blocks: Vec<String>) -> Result<()> {
        for (i, message) in arrange_messages(&blocks).iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(SEND_SPACING).await;
            }
            self.send_message(chat_id, message).await?;
        }
        debug!("Sent {} blocks to Telegram chat {}", blocks.len(), chat_id);
        Ok(())
    }
}

#[async_trait]
impl AlertDelivery for TelegramDelivery {
    async fn send_alerts(&self, alerts: &[AlertPayload]) -> Result<()> {
        if alerts.is_empty() {
            return Ok(());
        }
        let blocks = alerts.iter().map(render_alert).collect();
        self.send_blocks(&self.chat_id, blocks).await
    }

    async fn send_bet_confirmations(&self, confirmations: &[BetConfirmation]) -> Result<()> {
        if confirmations.is_empty() {
            return Ok(());
        }
        let chat_id = self
            .bet_chat_id
            .as_deref()
            .ok_or_else(|| DeliveryError::NotConfigured("TELEGRAM_BET_CHAT_ID".to_string()))?;
        let blocks = confirmations.iter().map(render_confirmation).collect();
        self.send_blocks(chat_id, blocks).await
    }
}

/// Pack blocks into messages of at most MAX_MESSAGE_LENGTH characters,
/// separated by a blank line. A block longer than the limit is sent alone.
pub fn arrange_messages(blocks: &[String]) -> Vec<String> {
    let mut arranged = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    let delimiter_len = GROUP_DELIMITER.chars().count();

    for block in blocks {
        let block_len = block.chars().count();
        if !current.is_empty() && current_len + delimiter_len + block_len > MAX_MESSAGE_LENGTH {
            arranged.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push_str(GROUP_DELIMITER);
            current_len += delimiter_len;
        }
        current.push_str(block);
        current_len += block_len;
    }

    if !current.is_empty() {
        arranged.push(current);
    }
    arranged
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn score_suffix(first: Option<u32>, second: Option<u32>) -> String {
    match (first, second) {
        (Some(a), Some(b)) => format!("{} - {} ({})", a, b, a + b),
        _ => "<no score info>".to_string(),
    }
}

pub fn render_alert(alert: &AlertPayload) -> String {
    let marker = match (alert.kind, alert.level) {
        (NotificationKind::Pattern, _) => "🎯",
        (NotificationKind::LowActivity, _) => "💤",
        (_, Some(EscalationLevel::Second)) => "‼️",
        _ => "❗",
    };
    let tips = alert
        .tips
        .iter()
        .map(|t| format!("{} ({:.2})", escape_html(&t.name), t.odds))
        .collect::<Vec<_>>()
        .join(" | ");

    [
        format!(
            "{} {} <b>{} vs {}</b>",
            marker,
            escape_html(&alert.sport_name),
            escape_html(&alert.first_team.name),
            escape_html(&alert.second_team.name)
        ),
        format!("<i>{}</i>", escape_html(&alert.league_name)),
        format!("Time: {}", escape_html(&alert.time)),
        format!(
            "Score: {}",
            escape_html(&score_suffix(alert.first_team.score, alert.second_team.score))
        ),
        format!(
            "Bet: {} / {}",
            escape_html(&alert.market_name),
            escape_html(&alert.bet_name)
        ),
        format!("Tips: {}", tips),
        format!("Uptime: {}", alert.uptime),
    ]
    .join("\n")
}

pub fn render_confirmation(c: &BetConfirmation) -> String {
    let mut status = String::from("Status: ");
    if c.success {
        status.push('✅');
    } else {
        status.push('❌');
        if let Some(detail) = &c.detail {
            let pretty =
                serde_json::to_string_pretty(detail).unwrap_or_else(|_| detail.to_string());
            status.push_str("\nDetails:\n<pre>");
            status.push_str(&escape_html(&pretty));
            status.push_str("</pre>");
        }
    }

    [
        format!("{} [<i>{}</i>]", escape_html(&c.bot_name), c.bookmaker),
        format!("<b>{}</b>", escape_html(&c.event_title)),
        format!("Time: {}", escape_html(&c.time)),
        format!("Score: {}", escape_html(&c.score)),
        format!("Bet: {}", escape_html(&c.bet_name)),
        format!("Tip: {} ({:.2}) x {}", escape_html(&c.tip_name), c.odds, c.stake),
        status,
    ]
    .join("\n")
}
