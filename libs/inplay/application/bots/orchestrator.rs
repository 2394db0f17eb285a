//! Bot orchestration
//!
//! Owns every enabled `BotSession`, reconciles them against the configured
//! accounts and runs bulk operations across them. Each session in a bulk
//! operation runs as its own task under a timeout; a failure or timeout is
//! reported as that bot's result and never affects the others.

use futures::future::join_all;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::session::BotSession;
use crate::domain::{
    BetHistoryFilter, BetHistoryItem, BotAccount, PlacementOutcome, SessionData, WalletBalance,
};
use crate::infrastructure::client::bookmaker::{BookmakerError, Result, TransportFactory};
use crate::infrastructure::proxy::ProxyPool;

/// Per-bot results of a bulk operation
pub type BulkResults<T> = HashMap<i64, Result<T>>;

type SharedSession = Arc<Mutex<BotSession>>;

struct Slot {
    account: BotAccount,
    session: SharedSession,
}

/// What a reconciliation changed
#[derive(Debug, Default)]
pub struct ReconcileSummary {
    pub added: Vec<i64>,
    pub removed: Vec<i64>,
    pub updated: Vec<i64>,
    /// Login results, when logins were requested
    pub logins: BulkResults<()>,
}

pub struct BotOrchestrator {
    slots: BTreeMap<i64, Slot>,
    factory: Arc<dyn TransportFactory>,
    proxies: Arc<ProxyPool>,
    call_timeout: Duration,
}

impl BotOrchestrator {
    pub fn new(
        factory: Arc<dyn TransportFactory>,
        proxies: Arc<ProxyPool>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            slots: BTreeMap::new(),
            factory,
            proxies,
            call_timeout,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn bot_ids(&self) -> Vec<i64> {
        self.slots.keys().copied().collect()
    }

    pub fn account(&self, bot_id: i64) -> Option<&BotAccount> {
        self.slots.get(&bot_id).map(|slot| &slot.account)
    }

    pub fn proxy_pool(&self) -> &Arc<ProxyPool> {
        &self.proxies
    }

    /// Reconcile sessions with the configured accounts, optionally logging
    /// in every session that has no login yet
    pub async fn load_bots(&mut self, accounts: Vec<BotAccount>, log_in: bool) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();
        let configured: HashSet<i64> = accounts
            .iter()
            .filter(|a| a.is_enabled)
            .map(|a| a.id)
            .collect();

        let stale: Vec<i64> = self
            .slots
            .keys()
            .filter(|id| !configured.contains(id))
            .copied()
            .collect();
        for bot_id in stale {
            if let Some(slot) = self.slots.remove(&bot_id) {
                let mut session = slot.session.lock().await;
                match tokio::time::timeout(self.call_timeout, session.logout()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(bot_id, "Logout of removed bot failed: {}", e),
                    Err(_) => warn!(bot_id, "Logout of removed bot timed out"),
                }
                summary.removed.push(bot_id);
            }
        }

        for account in accounts.into_iter().filter(|a| a.is_enabled) {
            let bot_id = account.id;
            match self.slots.get_mut(&bot_id) {
                Some(slot) => {
                    if slot.account == account {
                        continue;
                    }
                    slot.account = account.clone();
                    let mut session = slot.session.lock().await;
                    match tokio::time::timeout(self.call_timeout, session.update_account(account))
                        .await
                    {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => warn!(bot_id, "Bot update failed: {}", e),
                        Err(_) => warn!(bot_id, "Bot update timed out"),
                    }
                    summary.updated.push(bot_id);
                }
                None => {
                    let session = BotSession::new(
                        account.clone(),
                        Arc::clone(&self.factory),
                        Arc::clone(&self.proxies),
                    );
                    self.slots.insert(
                        bot_id,
                        Slot {
                            account,
                            session: Arc::new(Mutex::new(session)),
                        },
                    );
                    summary.added.push(bot_id);
                }
            }
        }

        if !summary.added.is_empty() || !summary.removed.is_empty() || !summary.updated.is_empty()
        {
            info!(
                "Bots reconciled: {} active ({} added, {} removed, {} updated)",
                self.slots.len(),
                summary.added.len(),
                summary.removed.len(),
                summary.updated.len()
            );
        }

        if log_in {
            summary.logins = self.log_in_all().await;
        }
        summary
    }

    /// Resume sessions from cached data where possible. Returns the ids of
    /// the sessions that were resumed.
    pub async fn restore_sessions(&self, mut cached: HashMap<i64, SessionData>) -> Vec<i64> {
        let mut restored = Vec::new();
        for (bot_id, slot) in &self.slots {
            let Some(data) = cached.remove(bot_id) else {
                continue;
            };
            let mut session = slot.session.lock().await;
            match session.restore(data) {
                Ok(true) => restored.push(*bot_id),
                Ok(false) => {}
                Err(e) => warn!(bot_id, "Cached session unusable: {}", e),
            }
        }
        restored
    }

    /// Serializable session state of every logged-in bot
    pub async fn session_data(&self) -> HashMap<i64, SessionData> {
        let mut data = HashMap::new();
        for (bot_id, slot) in &self.slots {
            let session = slot.session.lock().await;
            if let Some(session_data) = session.session_data() {
                data.insert(*bot_id, session_data);
            }
        }
        data
    }

    /// Make the pool's leased set match the proxies held by live sessions
    pub async fn sync_leases(&self) {
        let mut leased = HashSet::new();
        for slot in self.slots.values() {
            let session = slot.session.lock().await;
            if let Some(proxy) = session.proxy() {
                leased.insert(proxy.to_string());
            }
        }
        debug!("{} proxies leased", leased.len());
        self.proxies.set_leased(leased);
    }

    // ========================================================================
    // Bulk operations
    // ========================================================================

    /// Run `op` once per session concurrently and collect every result
    async fn fan_out<T, F, Fut>(&self, op: F) -> BulkResults<T>
    where
        T: Send + 'static,
        F: Fn(SharedSession) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let timeout = self.call_timeout;
        let handles = self.slots.iter().map(|(bot_id, slot)| {
            let bot_id = *bot_id;
            let call = op(Arc::clone(&slot.session));
            let handle = tokio::spawn(async move {
                match tokio::time::timeout(timeout, call).await {
                    Ok(result) => result,
                    Err(_) => Err(BookmakerError::Timeout(timeout)),
                }
            });
            async move {
                let result = handle
                    .await
                    .unwrap_or_else(|e| Err(BookmakerError::TaskFailed(e.to_string())));
                (bot_id, result)
            }
        });

        let results: BulkResults<T> = join_all(handles).await.into_iter().collect();
        for (bot_id, result) in &results {
            if let Err(e) = result {
                warn!(bot_id, class = e.class(), "Bot call failed: {}", e);
            }
        }
        results
    }

    /// Log in every session without a login, with its sportsbook token
    pub async fn log_in_all(&self) -> BulkResults<()> {
        self.fan_out(|session| async move {
            let mut session = session.lock().await;
            if !session.is_logged_in() {
                session.login().await?;
            }
            session.ensure_sportsbook_token().await
        })
        .await
    }

    pub async fn refresh_wallet_balances(&self) -> BulkResults<WalletBalance> {
        self.fan_out(|session| async move {
            let mut session = session.lock().await;
            session.wallet_balance(true).await
        })
        .await
    }

    pub async fn refresh_bet_histories(&self) -> BulkResults<Vec<BetHistoryItem>> {
        self.fan_out(|session| async move {
            let mut session = session.lock().await;
            session.bet_history(BetHistoryFilter::All).await
        })
        .await
    }

    /// Place the same bet from every bot
    pub async fn place_bets(
        &self,
        stake: f64,
        odds: f64,
        selection_id: &str,
        validate_stake: bool,
    ) -> BulkResults<PlacementOutcome> {
        let selection_id = selection_id.to_string();
        self.fan_out(move |session| {
            let selection_id = selection_id.clone();
            async move {
                let mut session = session.lock().await;
                session
                    .place_bet(stake, odds, &selection_id, validate_stake)
                    .await
            }
        })
        .await
    }
}
