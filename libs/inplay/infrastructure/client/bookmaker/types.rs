//! Wire types of the bookmaker API

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{BetHistoryItem, BetState, WalletBalance};

pub const INVALID_CREDENTIALS_CODE: &str = "E_SESSIONS_LOGIN_INVALIDCREDENTIALS";
pub const HISTORY_PAGE_SIZE: u32 = 19;
const SUBMISSION_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub session_token: String,
    pub customer_id: Value,
}

#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SportsbookTokenResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct WalletResponse {
    pub balance: WireBalance,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireBalance {
    pub total_amount: f64,
    pub withdrawable_amount: f64,
    pub locked_amount: f64,
    pub currency_code: String,
}

impl From<WireBalance> for WalletBalance {
    fn from(b: WireBalance) -> Self {
        WalletBalance {
            total_amount: b.total_amount,
            withdrawable_amount: b.withdrawable_amount,
            locked_amount: b.locked_amount,
            currency: b.currency_code,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryResponse {
    pub data: HistoryData,
}

#[derive(Debug, Deserialize)]
pub struct HistoryData {
    pub coupons: Vec<Coupon>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: Value,
    pub event_names: Vec<String>,
    pub system_bet: SystemBet,
    pub submission_date: String,
    pub bets_status: Value,
    pub total_odds: f64,
    pub stake: f64,
    pub total_payout: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct SystemBet {
    pub selections: Vec<CouponSelection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponSelection {
    pub category_name: String,
    pub market_name: String,
    pub selection_name: String,
}

impl Coupon {
    fn state(&self) -> BetState {
        let mentions = |word: &str| match &self.bets_status {
            Value::String(s) => s.to_lowercase().contains(word),
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .any(|s| s.eq_ignore_ascii_case(word)),
            _ => false,
        };

        if mentions("won") {
            BetState::Won
        } else if mentions("lost") {
            BetState::Lost
        } else {
            BetState::Open
        }
    }

    pub fn into_item(self) -> Result<BetHistoryItem, String> {
        let state = self.state();
        let selection = self
            .system_bet
            .selections
            .first()
            .ok_or_else(|| format!("coupon {} has no selections", self.id))?;
        let submitted_at =
            NaiveDateTime::parse_from_str(&self.submission_date, SUBMISSION_DATE_FORMAT)
                .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
                .map_err(|e| {
                    format!("invalid submission date '{}': {}", self.submission_date, e)
                })?;

        Ok(BetHistoryItem {
            id: value_to_id(&self.id),
            event_name: self.event_names.first().cloned().unwrap_or_default(),
            category_name: selection.category_name.clone(),
            market_name: selection.market_name.clone(),
            selection_name: selection.selection_name.clone(),
            submitted_at,
            state,
            odds: self.total_odds,
            stake: self.stake,
            payout: if state == BetState::Won {
                self.total_payout
            } else {
                None
            },
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponRequest {
    pub accept_odds_changes: bool,
    pub bets: Vec<CouponBet>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponBet {
    pub stake: f64,
    pub stake_for_review: f64,
    pub bet_selections: Vec<CouponBetSelection>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponBetSelection {
    pub market_selection_id: String,
    pub odds: f64,
}

impl CouponRequest {
    pub fn single(stake: f64, odds: f64, selection_id: &str) -> Self {
        Self {
            accept_odds_changes: false,
            bets: vec![CouponBet {
                stake,
                stake_for_review: 0.0,
                bet_selections: vec![CouponBetSelection {
                    market_selection_id: selection_id.to_string(),
                    odds,
                }],
            }],
        }
    }
}

/// Ids come back either as numbers or strings
pub fn value_to_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coupon_into_history_item() {
        let coupon: Coupon = serde_json::from_value(serde_json::json!({
            "id": 991,
            "eventNames": ["Team A - Team B"],
            "systemBet": {"selections": [{
                "categoryName": "Volleyball",
                "marketName": "Set 2 Winner",
                "selectionName": "Team A"
            }]},
            "submissionDate": "2024-03-01T18:22:05.123Z",
            "betsStatus": ["won"],
            "totalOdds": 1.4,
            "stake": 10.0,
            "totalPayout": 14.0
        }))
        .unwrap();

        let item = coupon.into_item().unwrap();
        assert_eq!(item.id, "991");
        assert_eq!(item.state, BetState::Won);
        assert_eq!(item.payout, Some(14.0));
        assert!((item.profit().unwrap() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_coupon_request_shape() {
        let body = serde_json::to_value(CouponRequest::single(5.0, 1.3, "sel-1")).unwrap();
        assert_eq!(body["acceptOddsChanges"], false);
        assert_eq!(body["bets"][0]["stakeForReview"], 0.0);
        assert_eq!(body["bets"][0]["betSelections"][0]["marketSelectionId"], "sel-1");
    }
}
