//! Proxy leasing
//!
//! `ProxyPool` hands out proxies exclusively: a proxy leased to one bot
//! session is never handed to another until it is released. Candidate
//! lists come from a `ProxySource`; the leased set lives behind the pool's
//! own mutex and is only touched while that lock is held.

pub mod webshare;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub use webshare::WebshareProxySource;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("No available proxies for country '{country}'")]
    Exhausted { country: String },

    #[error("Proxy already leased: {0}")]
    AlreadyLeased(String),

    #[error("Proxy source request failed: {0}")]
    Source(String),
}

impl From<reqwest::Error> for ProxyError {
    fn from(e: reqwest::Error) -> Self {
        ProxyError::Source(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;

/// Supplier of candidate proxy URLs for a country
#[async_trait]
pub trait ProxySource: Send + Sync {
    async fn list(&self, country: &str) -> Result<Vec<String>>;
}

/// Fixed proxy list from configuration, keyed by country code
#[derive(Debug, Clone, Default)]
pub struct StaticProxySource {
    proxies: Vec<(String, String)>,
}

impl StaticProxySource {
    pub fn new(proxies: Vec<(String, String)>) -> Self {
        Self { proxies }
    }
}

#[async_trait]
impl ProxySource for StaticProxySource {
    async fn list(&self, country: &str) -> Result<Vec<String>> {
        Ok(self
            .proxies
            .iter()
            .filter(|(c, _)| c.eq_ignore_ascii_case(country))
            .map(|(_, url)| url.clone())
            .collect())
    }
}

pub struct ProxyPool {
    source: Arc<dyn ProxySource>,
    leased: Mutex<HashSet<String>>,
}

impl ProxyPool {
    pub fn new(source: Arc<dyn ProxySource>) -> Self {
        Self {
            source,
            leased: Mutex::new(HashSet::new()),
        }
    }

    /// Lease a random proxy for `country` that nobody else holds
    pub async fn lease(&self, country: &str) -> Result<String> {
        let candidates = self.source.list(country).await?;

        let mut leased = self.leased.lock();
        let available: Vec<&String> = candidates.iter().filter(|p| !leased.contains(*p)).collect();
        let chosen = available
            .choose(&mut rand::thread_rng())
            .map(|p| (*p).clone())
            .ok_or_else(|| ProxyError::Exhausted {
                country: country.to_string(),
            })?;
        leased.insert(chosen.clone());

        debug!(
            country,
            leased = leased.len(),
            "Leased proxy ({} candidates)",
            candidates.len()
        );
        Ok(chosen)
    }

    /// Take a specific proxy, e.g. when resuming a cached session
    pub fn claim(&self, proxy: &str) -> Result<()> {
        let mut leased = self.leased.lock();
        if !leased.insert(proxy.to_string()) {
            return Err(ProxyError::AlreadyLeased(proxy.to_string()));
        }
        Ok(())
    }

    /// Return a proxy to the pool. Returns false if it was not leased.
    pub fn release(&self, proxy: &str) -> bool {
        self.leased.lock().remove(proxy)
    }

    /// Replace the leased set after session reconciliation
    pub fn set_leased(&self, proxies: HashSet<String>) {
        *self.leased.lock() = proxies;
    }

    pub fn is_leased(&self, proxy: &str) -> bool {
        self.leased.lock().contains(proxy)
    }

    pub fn leased(&self) -> HashSet<String> {
        self.leased.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(urls: &[&str]) -> ProxyPool {
        let proxies = urls
            .iter()
            .map(|u| ("de".to_string(), u.to_string()))
            .collect();
        ProxyPool::new(Arc::new(StaticProxySource::new(proxies)))
    }

    #[tokio::test]
    async fn test_lease_is_exclusive_until_released() {
        let pool = pool(&["http://p1", "http://p2"]);

        let a = pool.lease("DE").await.unwrap();
        let b = pool.lease("de").await.unwrap();
        assert_ne!(a, b);

        let err = pool.lease("de").await.unwrap_err();
        assert!(matches!(err, ProxyError::Exhausted { .. }));

        assert!(pool.release(&a));
        assert_eq!(pool.lease("de").await.unwrap(), a);
    }

    #[tokio::test]
    async fn test_unknown_country_is_exhausted() {
        let pool = pool(&["http://p1"]);
        assert!(matches!(
            pool.lease("fi").await,
            Err(ProxyError::Exhausted { .. })
        ));
    }

    #[test]
    fn test_claim_and_set_leased() {
        let pool = pool(&["http://p1"]);
        pool.claim("http://p1").unwrap();
        assert!(matches!(
            pool.claim("http://p1"),
            Err(ProxyError::AlreadyLeased(_))
        ));

        pool.set_leased(HashSet::from(["http://p9".to_string()]));
        assert!(!pool.is_leased("http://p1"));
        assert!(pool.is_leased("http://p9"));
    }

    #[tokio::test]
    async fn test_concurrent_leases_never_collide() {
        let urls: Vec<String> = (0..16).map(|i| format!("http://p{}", i)).collect();
        let refs: Vec<&str> = urls.iter().map(|s| s.as_str()).collect();
        let pool = Arc::new(pool(&refs));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let pool = Arc::clone(&pool);
                tokio::spawn(async move { pool.lease("de").await.unwrap() })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            assert!(seen.insert(handle.await.unwrap()));
        }
        assert_eq!(pool.leased().len(), 16);
    }
}
