//! One authenticated bookmaker identity
//!
//! A `BotSession` is the sole owner of its transport (HTTP client bound to
//! a leased proxy) and its tokens. Every bookmaker call goes through
//! [`BotSession::call`], which logs in when needed and re-authenticates at
//! most once when the bookmaker reports the session as expired.

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::domain::{
    BetHistoryFilter, BetHistoryItem, BotAccount, PlacementOutcome, SessionData, WalletBalance,
};
use crate::infrastructure::client::bookmaker::{
    BetRequest, BookmakerError, BookmakerTransport, Result, SessionAuth, TransportFactory,
};
use crate::infrastructure::proxy::ProxyPool;

/// Tokens an operation needs before it can run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Session,
    Sportsbook,
}

pub struct BotSession {
    account: BotAccount,
    factory: Arc<dyn TransportFactory>,
    proxies: Arc<ProxyPool>,
    transport: Option<Arc<dyn BookmakerTransport>>,
    proxy: Option<String>,
    auth: Option<SessionAuth>,
    wallet: Option<WalletBalance>,
    /// Set when the bookmaker rejected the credentials; cleared on change
    credentials_rejected: bool,
}

impl BotSession {
    pub fn new(
        account: BotAccount,
        factory: Arc<dyn TransportFactory>,
        proxies: Arc<ProxyPool>,
    ) -> Self {
        Self {
            account,
            factory,
            proxies,
            transport: None,
            proxy: None,
            auth: None,
            wallet: None,
            credentials_rejected: false,
        }
    }

    pub fn id(&self) -> i64 {
        self.account.id
    }

    pub fn account(&self) -> &BotAccount {
        &self.account
    }

    pub fn is_logged_in(&self) -> bool {
        self.auth.is_some()
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    /// Last balance fetched, if any
    pub fn cached_wallet(&self) -> Option<&WalletBalance> {
        self.wallet.as_ref()
    }

    // ========================================================================
    // Connection and authentication
    // ========================================================================

    async fn ensure_transport(&mut self) -> Result<Arc<dyn BookmakerTransport>> {
        if let Some(transport) = &self.transport {
            return Ok(Arc::clone(transport));
        }

        let proxy = self.proxies.lease(&self.account.proxy_country).await?;
        let transport = match self.factory.connect(self.account.bookmaker, Some(&proxy)) {
            Ok(transport) => transport,
            Err(e) => {
                self.proxies.release(&proxy);
                return Err(e);
            }
        };
        debug!(
            bot_id = self.account.id,
            country = %self.account.proxy_country,
            "Connected through leased proxy"
        );
        self.proxy = Some(proxy);
        self.transport = Some(Arc::clone(&transport));
        Ok(transport)
    }

    /// Drop tokens and transport and give the proxy back to the pool
    fn disconnect(&mut self) {
        self.auth = None;
        self.transport = None;
        self.wallet = None;
        if let Some(proxy) = self.proxy.take() {
            self.proxies.release(&proxy);
        }
    }

    /// Authenticate from scratch. Does not fetch a sportsbook token.
    pub async fn login(&mut self) -> Result<()> {
        if self.credentials_rejected {
            return Err(BookmakerError::InvalidCredentials);
        }
        self.auth = None;

        let transport = self.ensure_transport().await?;
        match transport
            .login(&self.account.username, &self.account.password)
            .await
        {
            Ok(grant) => {
                self.auth = Some(SessionAuth {
                    session_token: grant.session_token,
                    customer_id: grant.customer_id,
                    sportsbook_token: None,
                });
                info!(
                    bot_id = self.account.id,
                    "Logged in to {} as {}", self.account.bookmaker, self.account.username
                );
                Ok(())
            }
            Err(BookmakerError::InvalidCredentials) => {
                self.credentials_rejected = true;
                error!(
                    bot_id = self.account.id,
                    "Credentials rejected for {}, bot disabled until its account changes",
                    self.account.username
                );
                Err(BookmakerError::InvalidCredentials)
            }
            Err(e) => Err(e),
        }
    }

    /// End the session and release the proxy. The session is torn down
    /// locally even when the bookmaker call fails.
    pub async fn logout(&mut self) -> Result<()> {
        let result = match (&self.transport, &self.auth) {
            (Some(transport), Some(auth)) => transport.logout(auth).await,
            _ => Ok(()),
        };
        self.disconnect();
        if result.is_ok() {
            debug!(bot_id = self.account.id, "Logged out");
        }
        result
    }

    async fn fetch_sportsbook_token(&mut self) -> Result<()> {
        let (transport, auth) = self.credentials()?;
        if auth.sportsbook_token.is_some() {
            return Ok(());
        }
        let token = transport.sportsbook_token(&auth).await?;
        if let Some(auth) = self.auth.as_mut() {
            auth.sportsbook_token = Some(token);
        }
        Ok(())
    }

    /// Make sure the secondary token needed for bets and history exists
    pub async fn ensure_sportsbook_token(&mut self) -> Result<()> {
        self.call(Access::Sportsbook, |_, _| async { Ok(()) }).await
    }

    fn credentials(&self) -> Result<(Arc<dyn BookmakerTransport>, SessionAuth)> {
        match (&self.transport, &self.auth) {
            (Some(transport), Some(auth)) => Ok((Arc::clone(transport), auth.clone())),
            _ => Err(BookmakerError::AuthExpired),
        }
    }

    async fn attempt<T, F, Fut>(&mut self, access: Access, op: &F) -> Result<T>
    where
        F: Fn(Arc<dyn BookmakerTransport>, SessionAuth) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if access == Access::Sportsbook {
            self.fetch_sportsbook_token().await?;
        }
        let (transport, auth) = self.credentials()?;
        op(transport, auth).await
    }

    /// Run `op` with a live session.
    ///
    /// Logs in first when there is no session. An expired session is
    /// renewed and `op` retried once, unless the login just happened. A
    /// session that expires again right after renewal counts as rejected
    /// credentials.
    async fn call<T, F, Fut>(&mut self, access: Access, op: F) -> Result<T>
    where
        F: Fn(Arc<dyn BookmakerTransport>, SessionAuth) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if self.credentials_rejected {
            return Err(BookmakerError::InvalidCredentials);
        }

        let mut fresh_login = false;
        if !self.is_logged_in() {
            debug!(bot_id = self.account.id, "Not logged in, logging in first");
            self.login().await?;
            fresh_login = true;
        }

        match self.attempt(access, &op).await {
            Err(BookmakerError::AuthExpired) if !fresh_login => {
                warn!(bot_id = self.account.id, "Session expired, logging in again");
                self.login().await?;
                match self.attempt(access, &op).await {
                    Err(BookmakerError::AuthExpired) => {
                        error!(
                            bot_id = self.account.id,
                            "Session rejected right after logging in again, disabling bot"
                        );
                        self.credentials_rejected = true;
                        Err(BookmakerError::InvalidCredentials)
                    }
                    retried => retried,
                }
            }
            result => result,
        }
    }

    // ========================================================================
    // Bookmaker operations
    // ========================================================================

    /// Wallet balance, from cache unless `reload` or nothing is cached
    pub async fn wallet_balance(&mut self, reload: bool) -> Result<WalletBalance> {
        if !reload {
            if let Some(wallet) = &self.wallet {
                return Ok(wallet.clone());
            }
        }
        let wallet = self
            .call(Access::Session, |transport, auth| async move {
                transport.wallet_balance(&auth).await
            })
            .await?;
        self.wallet = Some(wallet.clone());
        Ok(wallet)
    }

    pub async fn bet_history(&mut self, filter: BetHistoryFilter) -> Result<Vec<BetHistoryItem>> {
        self.call(Access::Sportsbook, |transport, auth| async move {
            transport.bet_history(&auth, filter).await
        })
        .await
    }

    /// Submit a single bet.
    ///
    /// With `validate_stake` the stake is checked against the withdrawable
    /// balance (fetched when unknown) and the call fails locally if it does
    /// not fit.
    pub async fn place_bet(
        &mut self,
        stake: f64,
        odds: f64,
        selection_id: &str,
        validate_stake: bool,
    ) -> Result<PlacementOutcome> {
        if !stake.is_finite() || stake <= 0.0 {
            return Err(BookmakerError::InvalidStake(stake));
        }
        if validate_stake {
            let available = self.wallet_balance(false).await?.withdrawable_amount;
            if stake > available {
                return Err(BookmakerError::InsufficientBalance { stake, available });
            }
        }

        let bet = BetRequest {
            stake,
            odds,
            selection_id: selection_id.to_string(),
        };
        let outcome = self
            .call(Access::Sportsbook, |transport, auth| {
                let bet = bet.clone();
                async move { transport.place_bet(&auth, &bet).await }
            })
            .await?;

        match &outcome {
            PlacementOutcome::Accepted { coupon_id } => {
                // Balance moved; next read goes to the bookmaker
                self.wallet = None;
                info!(
                    bot_id = self.account.id,
                    coupon = coupon_id.as_deref().unwrap_or("-"),
                    "Bet placed: {} @ {} x {}",
                    selection_id,
                    odds,
                    stake
                );
            }
            PlacementOutcome::Rejected { detail } => {
                warn!(bot_id = self.account.id, "Bet rejected: {}", detail);
            }
        }
        Ok(outcome)
    }

    // ========================================================================
    // Configuration changes and persistence
    // ========================================================================

    /// Apply a changed configuration row. A new proxy country or new
    /// credentials tear the session down and log in again if it was live.
    pub async fn update_account(&mut self, account: BotAccount) -> Result<()> {
        let country_changed = !self
            .account
            .proxy_country
            .eq_ignore_ascii_case(&account.proxy_country);
        let credentials_changed = self.account.username != account.username
            || self.account.password != account.password
            || self.account.bookmaker != account.bookmaker;
        let was_logged_in = self.is_logged_in();

        self.account = account;
        if credentials_changed {
            self.credentials_rejected = false;
        }
        if !country_changed && !credentials_changed {
            return Ok(());
        }

        info!(
            bot_id = self.account.id,
            country_changed, credentials_changed, "Re-establishing bot session"
        );
        if let Err(e) = self.logout().await {
            warn!(bot_id = self.account.id, "Logout before re-establishing failed: {}", e);
        }
        if was_logged_in {
            self.login().await?;
        }
        Ok(())
    }

    /// Tokens and proxy needed to resume this session elsewhere
    pub fn session_data(&self) -> Option<SessionData> {
        let auth = self.auth.as_ref()?;
        Some(SessionData {
            session_token: auth.session_token.clone(),
            customer_id: auth.customer_id.clone(),
            sportsbook_token: auth.sportsbook_token.clone(),
            proxy: self.proxy.clone(),
            proxy_country: self.account.proxy_country.clone(),
            saved_at: Utc::now(),
        })
    }

    /// Resume from cached session data.
    ///
    /// Returns false and leaves the session untouched when it is already
    /// logged in, the data belongs to another proxy country, or its proxy
    /// is held by someone else.
    pub fn restore(&mut self, data: SessionData) -> Result<bool> {
        if self.is_logged_in()
            || !data
                .proxy_country
                .eq_ignore_ascii_case(&self.account.proxy_country)
        {
            return Ok(false);
        }
        let Some(proxy) = data.proxy else {
            return Ok(false);
        };

        self.disconnect();
        if let Err(e) = self.proxies.claim(&proxy) {
            debug!(bot_id = self.account.id, "Discarding cached session: {}", e);
            return Ok(false);
        }
        let transport = match self.factory.connect(self.account.bookmaker, Some(&proxy)) {
            Ok(transport) => transport,
            Err(e) => {
                self.proxies.release(&proxy);
                return Err(e);
            }
        };

        self.transport = Some(transport);
        self.proxy = Some(proxy);
        self.auth = Some(SessionAuth {
            session_token: data.session_token,
            customer_id: data.customer_id,
            sportsbook_token: data.sportsbook_token,
        });
        info!(bot_id = self.account.id, "Resumed cached session");
        Ok(true)
    }
}
