//! Scan cycle
//!
//! One cycle: poll the feed, refresh configuration, snapshot and diff the
//! odds, run the pattern matchers and idle detectors, update the open
//! notifications, publish and deliver, and optionally bet. A feed failure
//! aborts the cycle. A config store failure while registering the catalog
//! or loading the enabled filters skips the snapshot and notification
//! steps for this cycle, leaving the previous snapshots and open
//! notifications untouched. Every other collaborator failure is logged,
//! reported in the cycle report and the cycle carries on with the
//! last-known state.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::bots::BotOrchestrator;
use super::notifications::{collect_candidates, NotificationTracker};
use crate::domain::{
    BetConfirmation, EnabledFilters, Event, NotificationKey, NotificationKind, PlacementOutcome,
    ScanOptions, SnapshotStore, Tip,
};
use crate::infrastructure::cache::{CacheError, EphemeralCache, ErrorRecord};
use crate::infrastructure::client::bookmaker::BookmakerError;
use crate::infrastructure::client::{FeedError, FeedSource};
use crate::infrastructure::config::{AutoBetConfig, ScannerConfig};
use crate::infrastructure::database::{ConfigStore, StoreError};
use crate::infrastructure::delivery::{AlertDelivery, DeliveryError};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Config store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),
}

impl ScanError {
    pub fn class(&self) -> &'static str {
        match self {
            ScanError::Feed(FeedError::MalformedResponse { .. }) => "UpstreamParseError",
            ScanError::Feed(_) => "FeedError",
            ScanError::Store(_) => "ConfigStoreError",
            ScanError::Cache(_) => "CacheError",
            ScanError::Delivery(_) => "DeliveryError",
        }
    }

    /// Diagnostic payload: the raw feed body for malformed responses,
    /// otherwise the debug rendering and the chain of underlying errors
    pub fn detail(&self) -> Option<Value> {
        if let ScanError::Feed(FeedError::MalformedResponse { payload, .. }) = self {
            return Some(payload.clone());
        }

        let mut chain = Vec::new();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        Some(json!({
            "debug": format!("{:?}", self),
            "chain": chain,
        }))
    }

    pub fn to_record(&self, at: DateTime<Utc>) -> ErrorRecord {
        ErrorRecord {
            class: self.class().to_string(),
            description: self.to_string(),
            detail: self.detail(),
            at,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// Cycle cadence and auto-bet settings
#[derive(Debug, Clone)]
pub struct ScannerSettings {
    /// Reconcile bots every N cycles (and on the first one)
    pub bot_refresh_every: u64,
    /// Sync wallets, histories and sessions every N cycles
    pub bot_sync_every: u64,
    pub auto_bet: AutoBetConfig,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            bot_refresh_every: 30,
            bot_sync_every: 60,
            auto_bet: AutoBetConfig::default(),
        }
    }
}

impl From<&ScannerConfig> for ScannerSettings {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            bot_refresh_every: config.scan.bot_refresh_every,
            bot_sync_every: config.scan.bot_sync_every,
            auto_bet: config.auto_bet.clone(),
        }
    }
}

/// Summary of one cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub cycle: u64,
    pub events: usize,
    pub tracked_tips: usize,
    pub candidates: usize,
    pub open_notifications: usize,
    pub opened: usize,
    pub closed: usize,
    pub escalations: usize,
    pub bets_placed: usize,
    /// The config store failed; snapshots and notifications were not touched
    pub store_unavailable: bool,
    /// Collaborator failures the cycle recovered from
    pub warnings: Vec<ErrorRecord>,
}

impl CycleReport {
    fn recover(&mut self, step: &str, error: impl Into<ScanError>, now: DateTime<Utc>) {
        let error = error.into();
        warn!(step, class = error.class(), "{}", error);
        self.warnings.push(error.to_record(now));
    }
}

pub struct Scanner {
    feed: Arc<dyn FeedSource>,
    store: Arc<dyn ConfigStore>,
    cache: Arc<dyn EphemeralCache>,
    delivery: Arc<dyn AlertDelivery>,
    bots: Option<BotOrchestrator>,
    settings: ScannerSettings,
    snapshots: SnapshotStore,
    tracker: NotificationTracker,
    filters: EnabledFilters,
    options: ScanOptions,
    cycle: u64,
    bots_loaded: bool,
}

impl Scanner {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        store: Arc<dyn ConfigStore>,
        cache: Arc<dyn EphemeralCache>,
        delivery: Arc<dyn AlertDelivery>,
        settings: ScannerSettings,
    ) -> Self {
        Self {
            feed,
            store,
            cache,
            delivery,
            bots: None,
            settings,
            snapshots: SnapshotStore::new(),
            tracker: NotificationTracker::new(),
            filters: EnabledFilters::new(),
            options: ScanOptions::default(),
            cycle: 0,
            bots_loaded: false,
        }
    }

    pub fn with_bots(mut self, bots: BotOrchestrator) -> Self {
        self.bots = Some(bots);
        self
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    pub fn tracker(&self) -> &NotificationTracker {
        &self.tracker
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    pub fn filters(&self) -> &EnabledFilters {
        &self.filters
    }

    pub fn bots(&self) -> Option<&BotOrchestrator> {
        self.bots.as_ref()
    }

    pub fn cache(&self) -> &Arc<dyn EphemeralCache> {
        &self.cache
    }

    fn is_due(&self, every: u64) -> bool {
        every > 0 && self.cycle % every == 0
    }

    /// Run one full cycle
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleReport> {
        let batch = self.feed.fetch().await?;
        self.cycle += 1;

        let mut report = CycleReport {
            cycle: self.cycle,
            events: batch.events.len(),
            ..Default::default()
        };

        let store_ready = self
            .refresh_configuration(&batch.events, &mut report, now)
            .await;

        let bots_due = !self.bots_loaded || self.is_due(self.settings.bot_refresh_every);
        if self.bots.is_some() && bots_due {
            self.reconcile_bots(&mut report, now).await;
        }

        if store_ready {
            self.notify(&batch.events, batch.timestamp, &mut report, now)
                .await;
        } else {
            report.store_unavailable = true;
            warn!(cycle = self.cycle, "Config store unavailable, skipping notifications");
        }

        if self.bots.is_some() && self.is_due(self.settings.bot_sync_every) {
            self.sync_bots(&mut report, now).await;
        }

        debug!(
            cycle = report.cycle,
            events = report.events,
            tips = report.tracked_tips,
            candidates = report.candidates,
            open = report.open_notifications,
            "Cycle complete"
        );
        Ok(report)
    }

    /// Snapshot, detect, track, publish, deliver and auto-bet
    async fn notify(
        &mut self,
        events: &[Arc<Event>],
        timestamp: DateTime<Utc>,
        report: &mut CycleReport,
        now: DateTime<Utc>,
    ) {
        // Snapshot and diff against the previous cycle
        let built = SnapshotStore::build(events, timestamp, &self.filters);
        let previous = self.snapshots.advance(built);
        report.tracked_tips = self
            .snapshots
            .snapshots()
            .values()
            .map(|s| s.tip_count())
            .sum();

        let mut candidates = Vec::new();
        for (event_id, snapshot) in self.snapshots.snapshots() {
            candidates.extend(collect_candidates(
                snapshot,
                previous.get(event_id),
                &self.filters,
                &self.options,
            ));
        }
        report.candidates = candidates.len();

        let output = self.tracker.update(candidates, &self.options, now);
        report.open_notifications = output.open.len();
        report.opened = output.opened.len();
        report.closed = output.closed;
        report.escalations = output.escalated.len();

        if let Err(e) = self.cache.publish_notifications(&output.open).await {
            report.recover("publish_notifications", e, now);
        }
        if let Err(e) = self
            .cache
            .publish_status(report.events, report.open_notifications)
            .await
        {
            report.recover("publish_status", e, now);
        }
        if !output.escalated.is_empty() {
            if let Err(e) = self.delivery.send_alerts(&output.escalated).await {
                report.recover("send_alerts", e, now);
            }
        }

        if self.settings.auto_bet.enabled {
            let pattern_keys: Vec<_> = output
                .opened
                .iter()
                .filter(|key| {
                    self.tracker
                        .get(key)
                        .is_some_and(|n| n.kind == NotificationKind::Pattern)
                })
                .copied()
                .collect();
            if !pattern_keys.is_empty() {
                self.auto_bet(&pattern_keys, report, now).await;
            }
        }
    }

    /// Register the catalog and reload filters and options. Returns false
    /// when the catalog or the filters could not be reconciled; options
    /// fall back to their last-known values.
    async fn refresh_configuration(
        &mut self,
        events: &[Arc<Event>],
        report: &mut CycleReport,
        now: DateTime<Utc>,
    ) -> bool {
        let refs: Vec<&Event> = events.iter().map(|e| e.as_ref()).collect();
        if let Err(e) = self.store.register_catalog(&refs).await {
            report.recover("register_catalog", e, now);
            return false;
        }

        match self.store.enabled_filters().await {
            Ok(filters) => self.filters = filters,
            Err(e) => {
                report.recover("enabled_filters", e, now);
                return false;
            }
        }
        match self.store.scan_options().await {
            Ok(options) => self.options = options,
            Err(e) => report.recover("scan_options", e, now),
        }
        true
    }

    async fn reconcile_bots(&mut self, report: &mut CycleReport, now: DateTime<Utc>) {
        let accounts = match self.store.enabled_bots().await {
            Ok(accounts) => accounts,
            Err(e) => {
                report.recover("enabled_bots", e, now);
                return;
            }
        };
        let Some(bots) = self.bots.as_mut() else {
            return;
        };

        let summary = bots.load_bots(accounts, false).await;

        // Resume sessions a previous process left behind
        if !self.bots_loaded {
            self.bots_loaded = true;
            match self.cache.load_sessions(&bots.bot_ids()).await {
                Ok(cached) if !cached.is_empty() => {
                    let restored = bots.restore_sessions(cached).await;
                    info!("Resumed {} cached bot sessions", restored.len());
                }
                Ok(_) => {}
                Err(e) => report.recover("load_sessions", e, now),
            }
        }

        let logins = bots.log_in_all().await;
        let failed = logins.values().filter(|r| r.is_err()).count();
        if failed > 0 {
            warn!("{} of {} bots failed to log in", failed, logins.len());
        }
        debug!(added = summary.added.len(), removed = summary.removed.len(), "Bots refreshed");

        bots.sync_leases().await;
        self.persist_sessions(report, now).await;
    }

    async fn sync_bots(&self, report: &mut CycleReport, now: DateTime<Utc>) {
        let Some(bots) = self.bots.as_ref() else {
            return;
        };

        for (bot_id, result) in bots.refresh_wallet_balances().await {
            if let Ok(wallet) = result {
                if let Err(e) = self.cache.set_bot_wallet(bot_id, &wallet).await {
                    report.recover("set_bot_wallet", e, now);
                }
            }
        }
        for (bot_id, result) in bots.refresh_bet_histories().await {
            if let Ok(history) = result {
                if let Err(e) = self.cache.set_bot_history(bot_id, &history).await {
                    report.recover("set_bot_history", e, now);
                }
            }
        }

        self.persist_sessions(report, now).await;
    }

    async fn persist_sessions(&self, report: &mut CycleReport, now: DateTime<Utc>) {
        let Some(bots) = self.bots.as_ref() else {
            return;
        };
        let sessions = bots.session_data().await;
        if let Err(e) = self.cache.save_sessions(&sessions).await {
            report.recover("save_sessions", e, now);
        }
    }

    /// Bet every tip of freshly opened pattern notifications from every bot
    async fn auto_bet(
        &self,
        keys: &[NotificationKey],
        report: &mut CycleReport,
        now: DateTime<Utc>,
    ) {
        let Some(bots) = self.bots.as_ref() else {
            return;
        };
        if bots.is_empty() {
            return;
        }
        let stake = self.settings.auto_bet.stake;
        let validate = self.settings.auto_bet.validate_stake;

        let mut confirmations = Vec::new();
        for key in keys {
            let Some(notification) = self.tracker.get(key) else {
                continue;
            };
            let event = Arc::clone(&notification.event);
            for tip in &notification.tips {
                info!(
                    event_id = event.id,
                    "Auto-betting {} @ {} on {}",
                    tip.name,
                    tip.odds,
                    event.title()
                );
                let results = bots
                    .place_bets(stake, tip.odds, &tip.selection_id, validate)
                    .await;
                for (bot_id, result) in results {
                    let confirmation = confirmation(bots, bot_id, &event, tip, stake, result);
                    if confirmation.success {
                        report.bets_placed += 1;
                    }
                    confirmations.push(confirmation);
                }
            }
        }

        for confirmation in &confirmations {
            if let Err(e) = self.store.record_bet(confirmation).await {
                report.recover("record_bet", e, now);
            }
        }
        if !confirmations.is_empty() {
            if let Err(e) = self.delivery.send_bet_confirmations(&confirmations).await {
                report.recover("send_bet_confirmations", e, now);
            }
        }
    }

    /// Save bot sessions before the process exits
    pub async fn shutdown(&mut self) {
        let mut report = CycleReport::default();
        self.persist_sessions(&mut report, Utc::now()).await;
        if report.warnings.is_empty() && self.bots.is_some() {
            info!("Bot sessions saved");
        }
    }
}

fn confirmation(
    bots: &BotOrchestrator,
    bot_id: i64,
    event: &Event,
    tip: &Tip,
    stake: f64,
    result: std::result::Result<PlacementOutcome, BookmakerError>,
) -> BetConfirmation {
    let account = bots.account(bot_id);
    let (success, detail) = match result {
        Ok(PlacementOutcome::Accepted { coupon_id }) => {
            (true, coupon_id.map(|id| json!({ "coupon_id": id })))
        }
        Ok(PlacementOutcome::Rejected { detail }) => (false, Some(detail)),
        Err(e) => (
            false,
            Some(json!({ "class": e.class(), "error": e.to_string() })),
        ),
    };

    BetConfirmation {
        bot_id,
        bot_name: account
            .map(|a| a.display_name())
            .unwrap_or_else(|| format!("bot {}", bot_id)),
        bookmaker: account
            .map(|a| a.bookmaker.name().to_string())
            .unwrap_or_default(),
        event_id: event.id,
        event_title: event.title(),
        score: event.score_line(),
        time: event.time_or_phase(),
        bet_name: tip.bet_group_name_real.clone(),
        tip_name: tip.name.clone(),
        odds: tip.odds,
        stake,
        success,
        detail,
    }
}
