//! Bookmaker API transport
//!
//! A `BookmakerTransport` is one network identity (HTTP client bound to a
//! proxy) against one bookmaker. It performs single requests and maps HTTP
//! failures onto `BookmakerError`; retry and session policy live in the
//! bot session that owns it.

pub mod http;
pub mod types;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::HttpError;
use crate::domain::{
    BetHistoryFilter, BetHistoryItem, Bookmaker, PlacementOutcome, WalletBalance,
};
use crate::infrastructure::proxy::ProxyError;

pub use http::{HttpTransport, HttpTransportFactory};

#[derive(Error, Debug)]
pub enum BookmakerError {
    #[error("Session expired or unauthorized")]
    AuthExpired,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Bookmaker API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Sportsbook token missing")]
    MissingSportsbookToken,

    #[error("Invalid stake: {0}")]
    InvalidStake(f64),

    #[error("Stake {stake} exceeds available balance {available}")]
    InsufficientBalance { stake: f64, available: f64 },

    #[error("Proxy error: {0}")]
    Proxy(#[from] ProxyError),

    #[error("Bot task failed: {0}")]
    TaskFailed(String),

    #[error("Unknown bot: {0}")]
    UnknownBot(i64),
}

impl BookmakerError {
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, BookmakerError::AuthExpired)
    }

    /// Short class name for status reporting
    pub fn class(&self) -> &'static str {
        match self {
            BookmakerError::AuthExpired => "AuthExpired",
            BookmakerError::InvalidCredentials => "InvalidCredentials",
            BookmakerError::Network(_) | BookmakerError::Timeout(_) => "NetworkError",
            BookmakerError::Proxy(ProxyError::Exhausted { .. }) => "ProxyExhausted",
            BookmakerError::Proxy(_) => "ProxyError",
            _ => "BookmakerError",
        }
    }
}

impl From<reqwest::Error> for BookmakerError {
    fn from(e: reqwest::Error) -> Self {
        BookmakerError::Network(e.to_string())
    }
}

impl From<HttpError> for BookmakerError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::RequestFailed(e) => e.into(),
            HttpError::Api { status: 401, .. } => BookmakerError::AuthExpired,
            HttpError::Api { status, body, .. } => BookmakerError::Api { status, body },
            HttpError::DeserializeFailed(msg) => BookmakerError::Decode(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, BookmakerError>;

/// Tokens identifying an authenticated session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionAuth {
    pub session_token: String,
    pub customer_id: String,
    pub sportsbook_token: Option<String>,
}

impl SessionAuth {
    pub fn sportsbook_token(&self) -> Result<&str> {
        self.sportsbook_token
            .as_deref()
            .ok_or(BookmakerError::MissingSportsbookToken)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginGrant {
    pub session_token: String,
    pub customer_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BetRequest {
    pub stake: f64,
    pub odds: f64,
    pub selection_id: String,
}

#[async_trait]
pub trait BookmakerTransport: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<LoginGrant>;

    async fn logout(&self, auth: &SessionAuth) -> Result<()>;

    async fn sportsbook_token(&self, auth: &SessionAuth) -> Result<String>;

    async fn wallet_balance(&self, auth: &SessionAuth) -> Result<WalletBalance>;

    async fn bet_history(
        &self,
        auth: &SessionAuth,
        filter: BetHistoryFilter,
    ) -> Result<Vec<BetHistoryItem>>;

    async fn place_bet(&self, auth: &SessionAuth, bet: &BetRequest) -> Result<PlacementOutcome>;
}

/// Builds a transport bound to one proxy
pub trait TransportFactory: Send + Sync {
    fn connect(
        &self,
        bookmaker: Bookmaker,
        proxy: Option<&str>,
    ) -> Result<Arc<dyn BookmakerTransport>>;
}
