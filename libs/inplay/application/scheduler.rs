//! Fixed-interval driver for the scan cycle
//!
//! Cycles never run concurrently: the next tick is only awaited once the
//! current cycle has finished. A cycle that outlasts the interval is
//! reported (warning + heavy-load flag) instead of being silently absorbed.

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::scanner::{CycleReport, Scanner};
use crate::infrastructure::cache::{EphemeralCache, ErrorRecord};
use crate::infrastructure::{Heartbeat, HeartbeatStats, ShutdownManager};

pub struct Scheduler {
    scanner: Scanner,
    cache: Arc<dyn EphemeralCache>,
    interval: Duration,
    shutdown: ShutdownManager,
    heartbeat: Heartbeat,
    overruns: u64,
}

impl Scheduler {
    pub fn new(
        scanner: Scanner,
        interval: Duration,
        heartbeat_interval_secs: u64,
        shutdown: ShutdownManager,
    ) -> Self {
        let cache = Arc::clone(scanner.cache());
        Self {
            scanner,
            cache,
            interval,
            shutdown,
            heartbeat: Heartbeat::new(heartbeat_interval_secs, Utc::now()),
            overruns: 0,
        }
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    /// Cycles that took longer than the interval
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Run cycles until shutdown, then persist bot sessions
    pub async fn run(&mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Scanner started, one cycle every {:?}", self.interval);

        while self.shutdown.is_running() {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.shutdown.wait() => break,
            }
            self.tick().await;
        }

        info!(
            "Scanner stopping after {} cycles ({} overruns)",
            self.scanner.cycle(),
            self.overruns
        );
        self.scanner.shutdown().await;
    }

    /// Run a single cycle and handle its outcome
    pub async fn tick(&mut self) -> Option<CycleReport> {
        let started = Instant::now();
        let result = self.scanner.run_cycle(Utc::now()).await;
        let elapsed = started.elapsed();

        let report = match result {
            Ok(report) => {
                for warning in &report.warnings {
                    self.record(warning).await;
                }
                debug!(cycle = report.cycle, "Cycle took {:?}", elapsed);
                Some(report)
            }
            Err(e) => {
                error!(class = e.class(), "Cycle failed: {}", e);
                self.record(&e.to_record(Utc::now())).await;
                None
            }
        };

        if elapsed > self.interval {
            self.overruns += 1;
            warn!(
                "Cycle took {:?}, longer than the {:?} interval; next cycle is late",
                elapsed, self.interval
            );
            if let Err(e) = self.cache.set_heavy_load().await {
                warn!("Failed to set heavy-load flag: {}", e);
            }
        }

        self.heartbeat.record_cycle(report.is_some());
        let stats = HeartbeatStats {
            events: self.scanner.snapshots().len(),
            open_notifications: self.scanner.tracker().len(),
            sessions: self.scanner.bots().map(|b| b.len()).unwrap_or(0),
        };
        self.heartbeat.beat_if_due(Utc::now(), stats);

        report
    }

    async fn record(&self, record: &ErrorRecord) {
        if let Err(e) = self.cache.record_error(record).await {
            warn!("Failed to record error in cache: {}", e);
        }
    }
}
