//! Common test utilities for inplay integration tests
//!
//! Event and tip fixtures plus in-memory fakes for every collaborator the
//! scanner talks to (feed, config store, delivery, bookmaker).

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use inplay::domain::{
    AlertPayload, BetConfirmation, BetHistoryFilter, BetHistoryItem, BotAccount, Bookmaker,
    EnabledFilters, Event, EventSnapshot, FilterKey, PlacementOutcome, ScanOptions, Team, Tip,
    WalletBalance,
};
use inplay::infrastructure::client::bookmaker::{
    BetRequest, BookmakerError, BookmakerTransport, LoginGrant, Result as BookResult,
    SessionAuth, TransportFactory,
};
use inplay::infrastructure::client::feed::{FeedBatch, FeedError, FeedSource, Result as FeedResult};
use inplay::infrastructure::database::{ConfigStore, Result as StoreResult, StoreError};
use inplay::infrastructure::delivery::{AlertDelivery, Result as DeliveryResult};
use inplay::infrastructure::proxy::{ProxyPool, StaticProxySource};

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).single().unwrap()
}

pub mod fixtures {
    //! Builders for events, tips and snapshots

    use super::*;
    use serde_json::{json, Value};

    pub const HOME_ID: i64 = 101;
    pub const AWAY_ID: i64 = 202;

    pub fn tip(id: i64, market_group_id: i64, bet_group_id: i64, name: &str, odds: f64) -> Tip {
        Tip {
            id,
            name: name.to_string(),
            odds,
            market_group_id,
            market_group_name: format!("Market {}", market_group_id),
            bet_group_id,
            bet_group_name: format!("Bet {}", bet_group_id),
            bet_group_name_real: format!("Bet {}", bet_group_id),
            unique_group_id: None,
            is_active: true,
            selection_id: format!("sel-{}", id),
            associated_player_id: None,
        }
    }

    /// Tip in its own unique group with a real bet name
    pub fn named_tip(
        id: i64,
        market_group_id: i64,
        bet_group_id: i64,
        unique_group_id: i64,
        bet_name: &str,
        name: &str,
    ) -> Tip {
        Tip {
            unique_group_id: Some(unique_group_id),
            bet_group_name_real: bet_name.to_string(),
            ..tip(id, market_group_id, bet_group_id, name, 1.85)
        }
    }

    pub fn for_player(mut tip: Tip, player_id: i64) -> Tip {
        tip.associated_player_id = Some(player_id);
        tip
    }

    pub fn inactive(mut tip: Tip) -> Tip {
        tip.is_active = false;
        tip
    }

    pub fn event(id: i64, sport_id: i64, tips: Vec<Tip>) -> Event {
        Event {
            id,
            sport_id,
            sport_name: format!("Sport {}", sport_id),
            league_name: "Test League".to_string(),
            first_team: Team {
                id: Some(HOME_ID),
                name: "Home".to_string(),
                score: Some(0),
            },
            second_team: Team {
                id: Some(AWAY_ID),
                name: "Away".to_string(),
                score: Some(0),
            },
            clock: None,
            phase: None,
            is_break: false,
            tips,
            raw: Value::Null,
        }
    }

    pub fn with_scores(mut event: Event, home: u32, away: u32) -> Event {
        event.first_team.score = Some(home);
        event.second_team.score = Some(away);
        event
    }

    /// Attach a scoreboard: current phase plus `(phase_id, phase_name, home, away)` lines
    pub fn with_scoreboard(
        mut event: Event,
        current: (i64, &str),
        lines: &[(i64, &str, u32, u32)],
    ) -> Event {
        let mut gsl = Vec::new();
        for (phase_id, phase_name, home, away) in lines {
            gsl.push(json!({"gpi": phase_id, "gpn": phase_name, "spi": HOME_ID, "v": home}));
            gsl.push(
                json!({"gpi": phase_id, "gpn": phase_name, "spi": AWAY_ID, "v": away.to_string()}),
            );
        }
        event.raw = json!({
            "sb": {
                "gcp": {"gpi": current.0, "gpn": current.1},
                "gsl": gsl,
            }
        });
        event.phase = Some(inplay::domain::Phase {
            id: current.0,
            name: current.1.to_string(),
        });
        event
    }

    /// Filters enabling every (sport, market, bet) of the event's tips
    pub fn filters_for(events: &[&Event], trigger_secs: u64) -> EnabledFilters {
        events
            .iter()
            .flat_map(|event| {
                event
                    .tips
                    .iter()
                    .map(|tip| (FilterKey::for_tip(event.sport_id, tip), trigger_secs))
            })
            .collect()
    }

    pub fn snapshot(event: &Event, timestamp: DateTime<Utc>) -> EventSnapshot {
        let filters = filters_for(&[event], 300);
        EventSnapshot::build(Arc::new(event.clone()), timestamp, &filters)
    }

    pub fn options() -> ScanOptions {
        ScanOptions::from_rows([(3, 60.0), (5, 120.0)])
    }

    pub fn account(id: i64, username: &str, country: &str) -> BotAccount {
        BotAccount {
            id,
            name: Some(format!("bot-{}", id)),
            bookmaker: Bookmaker::Betsson,
            username: username.to_string(),
            password: "secret".to_string(),
            proxy_country: country.to_string(),
            is_enabled: true,
        }
    }

    pub fn proxies(country: &str, count: usize) -> Arc<ProxyPool> {
        let list = (0..count)
            .map(|i| (country.to_string(), format!("http://{}-proxy-{}:8080", country, i)))
            .collect();
        Arc::new(ProxyPool::new(Arc::new(StaticProxySource::new(list))))
    }
}

// ============================================================================
// Feed
// ============================================================================

/// Feed that replays queued batches; an empty queue times out
#[derive(Default)]
pub struct FakeFeed {
    batches: Mutex<VecDeque<FeedResult<FeedBatch>>>,
}

impl FakeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, events: Vec<Event>, timestamp: DateTime<Utc>) {
        self.batches.lock().push_back(Ok(FeedBatch {
            events: events.into_iter().map(Arc::new).collect(),
            timestamp,
        }));
    }

    pub fn push_error(&self, error: FeedError) {
        self.batches.lock().push_back(Err(error));
    }
}

#[async_trait]
impl FeedSource for FakeFeed {
    async fn fetch(&self) -> FeedResult<FeedBatch> {
        self.batches
            .lock()
            .pop_front()
            .unwrap_or(Err(FeedError::Timeout(Duration::from_secs(1))))
    }
}

// ============================================================================
// Config store
// ============================================================================

#[derive(Default)]
pub struct FakeStore {
    pub filters: Mutex<EnabledFilters>,
    pub options: Mutex<ScanOptions>,
    pub bots: Mutex<Vec<BotAccount>>,
    pub bets: Mutex<Vec<BetConfirmation>>,
    pub registered_events: AtomicUsize,
    pub fail_options: Mutex<bool>,
    pub fail_filters: Mutex<bool>,
}

impl FakeStore {
    pub fn new(filters: EnabledFilters, options: ScanOptions) -> Self {
        Self {
            filters: Mutex::new(filters),
            options: Mutex::new(options),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ConfigStore for FakeStore {
    async fn register_catalog(&self, events: &[&Event]) -> StoreResult<()> {
        self.registered_events.fetch_add(events.len(), Ordering::SeqCst);
        Ok(())
    }

    async fn enabled_filters(&self) -> StoreResult<EnabledFilters> {
        if *self.fail_filters.lock() {
            return Err(StoreError::ConnectionError(sqlx::Error::PoolTimedOut));
        }
        Ok(self.filters.lock().clone())
    }

    async fn scan_options(&self) -> StoreResult<ScanOptions> {
        if *self.fail_options.lock() {
            return Err(StoreError::ConnectionError(sqlx::Error::PoolTimedOut));
        }
        Ok(self.options.lock().clone())
    }

    async fn enabled_bots(&self) -> StoreResult<Vec<BotAccount>> {
        Ok(self.bots.lock().clone())
    }

    async fn record_bet(&self, confirmation: &BetConfirmation) -> StoreResult<()> {
        self.bets.lock().push(confirmation.clone());
        Ok(())
    }
}

// ============================================================================
// Delivery
// ============================================================================

#[derive(Default)]
pub struct FakeDelivery {
    pub alerts: Mutex<Vec<AlertPayload>>,
    pub confirmations: Mutex<Vec<BetConfirmation>>,
}

#[async_trait]
impl AlertDelivery for FakeDelivery {
    async fn send_alerts(&self, alerts: &[AlertPayload]) -> DeliveryResult<()> {
        self.alerts.lock().extend_from_slice(alerts);
        Ok(())
    }

    async fn send_bet_confirmations(
        &self,
        confirmations: &[BetConfirmation],
    ) -> DeliveryResult<()> {
        self.confirmations.lock().extend_from_slice(confirmations);
        Ok(())
    }
}

// ============================================================================
// Bookmaker
// ============================================================================

/// Scripted bookmaker shared by every transport the factory hands out.
/// Behaviour is keyed by username.
#[derive(Default)]
pub struct FakeBook {
    /// Login attempts per username
    pub logins: Mutex<HashMap<String, usize>>,
    /// Proxy each connected transport was built with
    pub connections: Mutex<Vec<Option<String>>>,
    pub bets: Mutex<Vec<(String, BetRequest)>>,
    /// Logins fail with a network error
    pub unreachable: Mutex<HashSet<String>>,
    /// Logins fail with invalid credentials
    pub bad_credentials: Mutex<HashSet<String>>,
    /// Calls hang until the bulk timeout fires
    pub hanging: Mutex<HashSet<String>>,
    /// Session tokens the bookmaker treats as expired
    pub expired_tokens: Mutex<HashSet<String>>,
    pub balance: Mutex<f64>,
}

impl FakeBook {
    pub fn new() -> Arc<Self> {
        let book = Self::default();
        *book.balance.lock() = 100.0;
        Arc::new(book)
    }

    pub fn login_count(&self, username: &str) -> usize {
        self.logins.lock().get(username).copied().unwrap_or(0)
    }

    fn username_of(auth: &SessionAuth) -> String {
        auth.session_token
            .split('#')
            .next()
            .unwrap_or_default()
            .to_string()
    }

    async fn check(&self, auth: &SessionAuth) -> BookResult<()> {
        let username = Self::username_of(auth);
        if self.hanging.lock().contains(&username) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.expired_tokens.lock().remove(&auth.session_token) {
            return Err(BookmakerError::AuthExpired);
        }
        Ok(())
    }
}

pub struct FakeTransport {
    book: Arc<FakeBook>,
}

#[async_trait]
impl BookmakerTransport for FakeTransport {
    async fn login(&self, username: &str, _password: &str) -> BookResult<LoginGrant> {
        let attempt = {
            let mut logins = self.book.logins.lock();
            let count = logins.entry(username.to_string()).or_default();
            *count += 1;
            *count
        };
        if self.book.hanging.lock().contains(username) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.book.unreachable.lock().contains(username) {
            return Err(BookmakerError::Network("connection refused".to_string()));
        }
        if self.book.bad_credentials.lock().contains(username) {
            return Err(BookmakerError::InvalidCredentials);
        }
        Ok(LoginGrant {
            session_token: format!("{}#{}", username, attempt),
            customer_id: format!("cust-{}", username),
        })
    }

    async fn logout(&self, _auth: &SessionAuth) -> BookResult<()> {
        Ok(())
    }

    async fn sportsbook_token(&self, auth: &SessionAuth) -> BookResult<String> {
        self.book.check(auth).await?;
        Ok(format!("sb-{}", auth.session_token))
    }

    async fn wallet_balance(&self, auth: &SessionAuth) -> BookResult<WalletBalance> {
        self.book.check(auth).await?;
        let balance = *self.book.balance.lock();
        Ok(WalletBalance {
            total_amount: balance,
            withdrawable_amount: balance,
            locked_amount: 0.0,
            currency: "EUR".to_string(),
        })
    }

    async fn bet_history(
        &self,
        auth: &SessionAuth,
        _filter: BetHistoryFilter,
    ) -> BookResult<Vec<BetHistoryItem>> {
        self.book.check(auth).await?;
        Ok(Vec::new())
    }

    async fn place_bet(
        &self,
        auth: &SessionAuth,
        bet: &BetRequest,
    ) -> BookResult<PlacementOutcome> {
        self.book.check(auth).await?;
        auth.sportsbook_token()?;
        let mut bets = self.book.bets.lock();
        bets.push((FakeBook::username_of(auth), bet.clone()));
        Ok(PlacementOutcome::Accepted {
            coupon_id: Some(format!("coupon-{}", bets.len())),
        })
    }
}

pub struct FakeFactory {
    pub book: Arc<FakeBook>,
}

impl FakeFactory {
    pub fn new(book: &Arc<FakeBook>) -> Arc<Self> {
        Arc::new(Self {
            book: Arc::clone(book),
        })
    }
}

impl TransportFactory for FakeFactory {
    fn connect(
        &self,
        _bookmaker: Bookmaker,
        proxy: Option<&str>,
    ) -> BookResult<Arc<dyn BookmakerTransport>> {
        self.book
            .connections
            .lock()
            .push(proxy.map(str::to_string));
        Ok(Arc::new(FakeTransport {
            book: Arc::clone(&self.book),
        }))
    }
}
