//! Infrastructure Layer
//!
//! Adapters for everything outside the process: the upstream feed,
//! bookmaker APIs, proxy provider, Postgres, Redis and Telegram, plus
//! process plumbing (config, logging, shutdown, heartbeat).

pub mod cache;
pub mod client;
pub mod config;
pub mod database;
pub mod delivery;
pub mod heartbeat;
pub mod logging;
pub mod proxy;
pub mod shutdown;

pub use cache::{CacheError, EphemeralCache, ErrorRecord, MemoryCache, RedisCache};
pub use client::{
    BookmakerError, BookmakerTransport, FeedBatch, FeedError, FeedSource, HttpFeedClient,
    HttpTransportFactory, SessionAuth, TransportFactory,
};
pub use config::{ConfigError, ScannerConfig};
pub use database::{ConfigStore, PgConfigStore, StoreError};
pub use delivery::{AlertDelivery, DeliveryError, LogDelivery, TelegramDelivery};
pub use heartbeat::{Heartbeat, HeartbeatStats};
pub use logging::{init_tracing, init_tracing_with_level};
pub use proxy::{ProxyError, ProxyPool, ProxySource, StaticProxySource, WebshareProxySource};
pub use shutdown::ShutdownManager;
