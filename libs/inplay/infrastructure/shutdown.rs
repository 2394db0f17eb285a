//! Graceful shutdown management

use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::info;

/// Shared stop signal for the scheduler and its background tasks
#[derive(Clone)]
pub struct ShutdownManager {
    stop: Arc<watch::Sender<bool>>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            stop: Arc::new(stop),
        }
    }

    /// Spawn a Ctrl+C signal handler that triggers shutdown
    pub fn spawn_signal_handler(&self) {
        let manager = self.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("Received shutdown signal (Ctrl+C), finishing current cycle");
                manager.trigger();
            }
        });
    }

    pub fn trigger(&self) {
        self.stop.send_replace(true);
    }

    pub fn is_running(&self) -> bool {
        !*self.stop.borrow()
    }

    /// Resolves once shutdown has been requested
    pub async fn wait(&self) {
        let mut rx = self.stop.subscribe();
        // Err means the sender is gone, which cannot happen while self lives
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    /// Sleep for a duration, waking early if shutdown is triggered.
    /// Returns false when interrupted.
    pub async fn interruptible_sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => self.is_running(),
            _ = self.wait() => false,
        }
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_interrupts_sleep() {
        let shutdown = ShutdownManager::new();
        assert!(shutdown.is_running());

        let waiter = shutdown.clone();
        let handle =
            tokio::spawn(async move { waiter.interruptible_sleep(Duration::from_secs(30)).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.trigger();

        let completed = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(!completed);
        assert!(!shutdown.is_running());
    }

    #[tokio::test]
    async fn test_short_sleep_completes() {
        let shutdown = ShutdownManager::new();
        assert!(shutdown.interruptible_sleep(Duration::from_millis(5)).await);
    }
}
