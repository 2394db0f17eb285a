//! reqwest-backed bookmaker transport

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Proxy, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::types::*;
use super::{
    BetRequest, BookmakerError, BookmakerTransport, LoginGrant, Result, SessionAuth,
    TransportFactory,
};
use crate::domain::{BetHistoryFilter, BetHistoryItem, Bookmaker, PlacementOutcome, WalletBalance};
use crate::infrastructure::client::helpers::{parse_json, require_success};

pub struct HttpTransport {
    bookmaker: Bookmaker,
    client: Client,
}

impl HttpTransport {
    pub fn new(bookmaker: Bookmaker, proxy: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("marketcode", HeaderValue::from_static("en"));
        headers.insert("brandid", HeaderValue::from_static(bookmaker.brand_id()));

        let mut builder = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .default_headers(headers);
        if let Some(proxy) = proxy {
            builder = builder.proxy(Proxy::all(proxy)?);
        }

        Ok(Self {
            bookmaker,
            client: builder.build()?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.bookmaker.base_url(), path)
    }
}

#[async_trait]
impl BookmakerTransport for HttpTransport {
    async fn login(&self, username: &str, password: &str) -> Result<LoginGrant> {
        debug!(bookmaker = %self.bookmaker, username, "Logging in");

        let response = self
            .client
            .post(self.url("/api/v1/single-sign-on-sessions"))
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        if response.status() == StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            let code = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.code);
            if code.as_deref() == Some(INVALID_CREDENTIALS_CODE) {
                return Err(BookmakerError::InvalidCredentials);
            }
            return Err(BookmakerError::Api { status: 400, body });
        }

        let response = require_success(response, "Login failed").await?;
        let body: LoginResponse = parse_json(response).await?;

        Ok(LoginGrant {
            session_token: body.session_token,
            customer_id: value_to_id(&body.customer_id),
        })
    }

    async fn logout(&self, auth: &SessionAuth) -> Result<()> {
        let response = self
            .client
            .delete(self.url("/api/v1/current-single-sign-on-session"))
            .header("sessionToken", &auth.session_token)
            .send()
            .await?;
        require_success(response, "Logout failed").await?;
        Ok(())
    }

    async fn sportsbook_token(&self, auth: &SessionAuth) -> Result<String> {
        let response = self
            .client
            .get(self.url(&format!(
                "/api/sb/v2/sportsbookgames/betsson/{}",
                auth.customer_id
            )))
            .header("sessionToken", &auth.session_token)
            .send()
            .await?;
        let response = require_success(response, "Failed to fetch sportsbook token").await?;
        let body: SportsbookTokenResponse = parse_json(response).await?;
        Ok(body.token)
    }

    async fn wallet_balance(&self, auth: &SessionAuth) -> Result<WalletBalance> {
        let response = self
            .client
            .get(self.url("/api/v2/wallet/balance"))
            .header("sessionToken", &auth.session_token)
            .send()
            .await?;
        let response = require_success(response, "Failed to fetch wallet balance").await?;
        let body: WalletResponse = parse_json(response).await?;
        Ok(body.balance.into())
    }

    async fn bet_history(
        &self,
        auth: &SessionAuth,
        filter: BetHistoryFilter,
    ) -> Result<Vec<BetHistoryItem>> {
        let response = self
            .client
            .get(self.url("/api/sb/v1/widgets/coupon-history/v1"))
            .header("sessionToken", &auth.session_token)
            .header("sportsbookToken", auth.sportsbook_token()?)
            .query(&[
                ("couponFilter", filter.as_param().to_string()),
                ("page", "1".to_string()),
                ("pageSize", HISTORY_PAGE_SIZE.to_string()),
            ])
            .send()
            .await?;
        let response = require_success(response, "Failed to fetch bet history").await?;
        let body: HistoryResponse = parse_json(response).await?;

        let mut items = Vec::with_capacity(body.data.coupons.len());
        for coupon in body.data.coupons {
            match coupon.into_item() {
                Ok(item) => items.push(item),
                Err(e) => warn!("Skipping unreadable coupon: {}", e),
            }
        }
        Ok(items)
    }

    async fn place_bet(&self, auth: &SessionAuth, bet: &BetRequest) -> Result<PlacementOutcome> {
        let response = self
            .client
            .post(self.url("/api/sb/v1/coupons"))
            .header("sessionToken", &auth.session_token)
            .header("sportsbookToken", auth.sportsbook_token()?)
            .json(&CouponRequest::single(bet.stake, bet.odds, &bet.selection_id))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(BookmakerError::AuthExpired);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| BookmakerError::Decode(e.to_string()))?;

        if status.is_client_error() {
            return Ok(PlacementOutcome::Rejected { detail: body });
        }
        if !status.is_success() {
            return Err(BookmakerError::Api {
                status: status.as_u16(),
                body: body.to_string(),
            });
        }

        Ok(placement_outcome(body))
    }
}

/// Interpret a 2xx coupon response
fn placement_outcome(body: Value) -> PlacementOutcome {
    let rejected = ["errors", "validationErrors"].iter().find_map(|key| {
        body.get(*key)
            .and_then(Value::as_array)
            .filter(|errors| !errors.is_empty())
            .map(|errors| Value::Array(errors.clone()))
    });

    match rejected {
        Some(detail) => PlacementOutcome::Rejected { detail },
        None => PlacementOutcome::Accepted {
            coupon_id: body
                .get("couponId")
                .or_else(|| body.get("id"))
                .map(value_to_id),
        },
    }
}

/// Creates one `HttpTransport` per session and proxy
#[derive(Debug, Clone)]
pub struct HttpTransportFactory {
    timeout: Duration,
}

impl HttpTransportFactory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl TransportFactory for HttpTransportFactory {
    fn connect(
        &self,
        bookmaker: Bookmaker,
        proxy: Option<&str>,
    ) -> Result<Arc<dyn BookmakerTransport>> {
        Ok(Arc::new(HttpTransport::new(bookmaker, proxy, self.timeout)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_placement_outcome_accepted() {
        let outcome = placement_outcome(json!({"couponId": "C-1", "errors": []}));
        assert_eq!(
            outcome,
            PlacementOutcome::Accepted {
                coupon_id: Some("C-1".to_string())
            }
        );
    }

    #[test]
    fn test_placement_outcome_rejected() {
        let outcome = placement_outcome(json!({"validationErrors": [{"code": "ODDS_CHANGED"}]}));
        assert!(!outcome.is_accepted());
    }
}
