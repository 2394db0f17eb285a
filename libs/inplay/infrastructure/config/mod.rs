//! Scanner configuration loaded from YAML with environment overrides

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::infrastructure::client::feed::DEFAULT_FEED_URL;
use crate::infrastructure::proxy::webshare::DEFAULT_WEBSHARE_URL;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarMissing(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Scanner service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub bookmaker: BookmakerConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub auto_bet: AutoBetConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_url")]
    pub url: String,
    #[serde(default = "default_feed_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_event_count")]
    pub event_count: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            timeout_ms: default_feed_timeout_ms(),
            event_count: default_event_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Delay between cycle starts
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Reconcile bot accounts every N cycles
    #[serde(default = "default_bot_refresh_every")]
    pub bot_refresh_every: u64,
    /// Refresh wallets and histories every N cycles
    #[serde(default = "default_bot_sync_every")]
    pub bot_sync_every: u64,
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            bot_refresh_every: default_bot_refresh_every(),
            bot_sync_every: default_bot_sync_every(),
            heartbeat_interval_secs: default_heartbeat_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmakerConfig {
    /// Timeout of a single bookmaker request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Timeout of one bot's share of a bulk operation
    #[serde(default = "default_bulk_timeout")]
    pub bulk_timeout_secs: u64,
}

impl Default for BookmakerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            bulk_timeout_secs: default_bulk_timeout(),
        }
    }
}

/// Fixed proxy list entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticProxy {
    pub country: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_webshare_url")]
    pub webshare_url: String,
    /// Webshare API token (from WEBSHARE_API_TOKEN)
    #[serde(default)]
    pub token: Option<String>,
    /// Used instead of Webshare when non-empty
    #[serde(default)]
    pub static_list: Vec<StaticProxy>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            webshare_url: default_webshare_url(),
            token: None,
            static_list: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoBetConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_stake")]
    pub stake: f64,
    #[serde(default = "default_true")]
    pub validate_stake: bool,
}

impl Default for AutoBetConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            stake: default_stake(),
            validate_stake: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
    /// Chat receiving bet confirmations
    #[serde(default)]
    pub bet_chat_id: Option<String>,
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        self.token.is_some() && self.chat_id.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// In-process cache is used when unset
    #[serde(default)]
    pub redis_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

fn default_feed_timeout_ms() -> u64 {
    1000
}

fn default_event_count() -> u32 {
    1000
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_bot_refresh_every() -> u64 {
    30
}

fn default_bot_sync_every() -> u64 {
    60
}

fn default_heartbeat_interval() -> u64 {
    60
}

fn default_request_timeout() -> u64 {
    10
}

fn default_bulk_timeout() -> u64 {
    20
}

fn default_webshare_url() -> String {
    DEFAULT_WEBSHARE_URL.to_string()
}

fn default_stake() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl ScannerConfig {
    /// Load configuration from YAML file
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        Self::from_yaml(&yaml_content)
    }

    /// Parse, apply environment overrides and validate
    pub fn from_yaml(yaml_content: &str) -> Result<Self> {
        let mut config: ScannerConfig = serde_yaml::from_str(yaml_content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(db_url) = std::env::var("DATABASE_URL") {
            info!("Overriding database URL from environment variable");
            self.database.url = db_url;
        }
        if let Ok(redis_url) = std::env::var("REDIS_URL") {
            self.cache.redis_url = Some(redis_url);
        }
        if let Ok(token) = std::env::var("TELEGRAM_TOKEN") {
            self.telegram.token = Some(token);
        }
        if let Ok(chat_id) = std::env::var("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = Some(chat_id);
        }
        if let Ok(chat_id) = std::env::var("TELEGRAM_BET_CHAT_ID") {
            self.telegram.bet_chat_id = Some(chat_id);
        }
        if let Ok(token) = std::env::var("WEBSHARE_API_TOKEN") {
            self.proxy.token = Some(token);
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of: {}",
                valid_levels.join(", ")
            )));
        }

        if self.database.url.is_empty() {
            return Err(ConfigError::EnvVarMissing("DATABASE_URL".to_string()));
        }

        let positive = [
            ("feed.timeout_ms", self.feed.timeout_ms),
            ("feed.event_count", self.feed.event_count as u64),
            ("scan.interval_ms", self.scan.interval_ms),
            ("scan.bot_refresh_every", self.scan.bot_refresh_every),
            ("scan.bot_sync_every", self.scan.bot_sync_every),
            ("scan.heartbeat_interval_secs", self.scan.heartbeat_interval_secs),
            ("bookmaker.request_timeout_secs", self.bookmaker.request_timeout_secs),
            ("bookmaker.bulk_timeout_secs", self.bookmaker.bulk_timeout_secs),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ValidationError(format!(
                "{} must be greater than 0",
                name
            )));
        }

        if self.auto_bet.stake <= 0.0 {
            return Err(ConfigError::ValidationError(
                "auto_bet.stake must be greater than 0".to_string(),
            ));
        }

        if self.static_proxies_empty() && self.proxy.token.is_none() {
            return Err(ConfigError::EnvVarMissing("WEBSHARE_API_TOKEN".to_string()));
        }

        Ok(())
    }

    fn static_proxies_empty(&self) -> bool {
        self.proxy.static_list.is_empty()
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan.interval_ms)
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_millis(self.feed.timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.bookmaker.request_timeout_secs)
    }

    pub fn bulk_timeout(&self) -> Duration {
        Duration::from_secs(self.bookmaker.bulk_timeout_secs)
    }

    /// Log configuration summary
    pub fn log(&self) {
        info!("Configuration loaded:");
        info!("  Feed: {} ({} ms timeout)", self.feed.url, self.feed.timeout_ms);
        info!("  Scan interval: {} ms", self.scan.interval_ms);
        info!(
            "  Bot refresh / sync: every {} / {} cycles",
            self.scan.bot_refresh_every, self.scan.bot_sync_every
        );
        info!(
            "  Auto-bet: {} (stake {}, validate {})",
            if self.auto_bet.enabled { "on" } else { "off" },
            self.auto_bet.stake,
            self.auto_bet.validate_stake
        );
        info!(
            "  Proxies: {}",
            if self.static_proxies_empty() {
                "webshare".to_string()
            } else {
                format!("{} static", self.proxy.static_list.len())
            }
        );
        info!(
            "  Telegram: {}",
            if self.telegram.is_configured() { "enabled" } else { "log only" }
        );
        info!(
            "  Cache: {}",
            if self.cache.redis_url.is_some() { "redis" } else { "in-memory" }
        );
        info!("  Log level: {}", self.log_level);
    }
}
