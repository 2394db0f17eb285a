//! Bookmaker bot accounts and the data their sessions produce

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bookmaker {
    Betsson,
    Betsafe,
}

impl Bookmaker {
    pub fn base_url(&self) -> &'static str {
        match self {
            Bookmaker::Betsson => "https://www.betsson.com",
            Bookmaker::Betsafe => "https://www.betsafe.com",
        }
    }

    pub fn brand_id(&self) -> &'static str {
        match self {
            Bookmaker::Betsson => "e123be9a-fe1e-49d0-9200-6afcf20649af",
            Bookmaker::Betsafe => "11a81f20-a960-49e4-8748-51f750c1b27c",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Bookmaker::Betsson => "betsson",
            Bookmaker::Betsafe => "betsafe",
        }
    }
}

impl fmt::Display for Bookmaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Bookmaker {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "betsson" => Ok(Bookmaker::Betsson),
            "betsafe" => Ok(Bookmaker::Betsafe),
            other => Err(format!("Unknown bookmaker: {}", other)),
        }
    }
}

/// One configured bookmaker account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotAccount {
    pub id: i64,
    pub name: Option<String>,
    pub bookmaker: Bookmaker,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub proxy_country: String,
    pub is_enabled: bool,
}

impl BotAccount {
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| "<no name>".to_string())
    }
}

/// Session artifacts that survive a process restart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub session_token: String,
    pub customer_id: String,
    pub sportsbook_token: Option<String>,
    pub proxy: Option<String>,
    pub proxy_country: String,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletBalance {
    pub total_amount: f64,
    pub withdrawable_amount: f64,
    pub locked_amount: f64,
    pub currency: String,
}

impl WalletBalance {
    pub fn funds(&self) -> String {
        format!("{} {}", self.total_amount, self.currency)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetHistoryFilter {
    All,
    Open,
    Settled,
}

impl BetHistoryFilter {
    pub fn as_param(&self) -> &'static str {
        match self {
            BetHistoryFilter::All => "All",
            BetHistoryFilter::Open => "Open",
            BetHistoryFilter::Settled => "Settled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetState {
    Open,
    Won,
    Lost,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetHistoryItem {
    pub id: String,
    pub event_name: String,
    pub category_name: String,
    pub market_name: String,
    pub selection_name: String,
    pub submitted_at: DateTime<Utc>,
    pub state: BetState,
    pub odds: f64,
    pub stake: f64,
    /// Only known once the bet is won
    pub payout: Option<f64>,
}

impl BetHistoryItem {
    /// Reported profit. Settlement is not reconciled, open bets have none.
    pub fn profit(&self) -> Option<f64> {
        match self.state {
            BetState::Won => self.payout.map(|p| p - self.stake),
            BetState::Lost => Some(-self.stake),
            BetState::Open => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "event_name": self.event_name,
            "category_name": self.category_name,
            "market_name": self.market_name,
            "selection_name": self.selection_name,
            "submission_date": self.submitted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            "state": self.state,
            "odds": self.odds,
            "stake": self.stake,
            "payout": self.payout,
            "profit": self.profit(),
        })
    }
}

/// Result of a bet submission that reached the bookmaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlacementOutcome {
    Accepted { coupon_id: Option<String> },
    /// Bookmaker-side rejection with its structured detail
    Rejected { detail: serde_json::Value },
}

impl PlacementOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, PlacementOutcome::Accepted { .. })
    }
}
