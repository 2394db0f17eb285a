use anyhow::{Context, Result};
use inplay::application::{BotOrchestrator, Scanner, ScannerSettings, Scheduler};
use inplay::infrastructure::cache::EphemeralCache;
use inplay::infrastructure::delivery::AlertDelivery;
use inplay::infrastructure::proxy::ProxySource;
use inplay::infrastructure::{
    init_tracing_with_level, HttpFeedClient, HttpTransportFactory, LogDelivery, MemoryCache,
    PgConfigStore, ProxyPool, RedisCache, ScannerConfig, ShutdownManager, StaticProxySource,
    TelegramDelivery, WebshareProxySource,
};
use inplay_watch::bin_common::{config_path_from_args, parse_args, ConfigType};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const REDIS_CONNECT_RETRIES: u32 = 5;
const PROXY_LIST_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Load config first (before logging is initialized)
    let config_path = config_path_from_args(&parse_args(), ConfigType::Scanner);
    let config = ScannerConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    init_tracing_with_level(&config.log_level);
    config.log();

    let store = Arc::new(PgConfigStore::new(&config.database.url).await?);

    let cache: Arc<dyn EphemeralCache> = match &config.cache.redis_url {
        Some(url) => Arc::new(RedisCache::connect(url, REDIS_CONNECT_RETRIES).await?),
        None => {
            warn!("No Redis URL configured, status and sessions stay in process");
            Arc::new(MemoryCache::new())
        }
    };

    let telegram = &config.telegram;
    let delivery: Arc<dyn AlertDelivery> = match (&telegram.token, &telegram.chat_id) {
        (Some(token), Some(chat_id)) => Arc::new(TelegramDelivery::new(
            token.clone(),
            chat_id.clone(),
            telegram.bet_chat_id.clone(),
        )?),
        _ => Arc::new(LogDelivery),
    };

    let feed = Arc::new(HttpFeedClient::new(
        config.feed.url.clone(),
        config.feed.event_count,
        config.feed_timeout(),
    )?);

    let proxy_source: Arc<dyn ProxySource> = if config.proxy.static_list.is_empty() {
        let token = config.proxy.token.clone().unwrap_or_default();
        Arc::new(WebshareProxySource::new(
            config.proxy.webshare_url.clone(),
            token,
            PROXY_LIST_TIMEOUT,
        )?)
    } else {
        Arc::new(StaticProxySource::new(
            config
                .proxy
                .static_list
                .iter()
                .map(|p| (p.country.clone(), p.url.clone()))
                .collect(),
        ))
    };
    let bots = BotOrchestrator::new(
        Arc::new(HttpTransportFactory::new(config.request_timeout())),
        Arc::new(ProxyPool::new(proxy_source)),
        config.bulk_timeout(),
    );

    let scanner = Scanner::new(
        feed,
        store,
        cache,
        delivery,
        ScannerSettings::from(&config),
    )
    .with_bots(bots);

    let shutdown = ShutdownManager::new();
    shutdown.spawn_signal_handler();

    print_banner("In-play scanner", config.scan.interval_ms);

    let mut scheduler = Scheduler::new(
        scanner,
        config.scan_interval(),
        config.scan.heartbeat_interval_secs,
        shutdown,
    );
    scheduler.run().await;

    print_shutdown("Scanner", scheduler.scanner().cycle(), scheduler.overruns());
    Ok(())
}

fn print_banner(name: &str, interval_ms: u64) {
    info!("");
    info!("========================================");
    info!("Starting {}", name);
    info!("Cycle interval: {}ms", interval_ms);
    info!("Press Ctrl+C to stop");
    info!("========================================");
    info!("");
}

fn print_shutdown(name: &str, cycles: u64, overruns: u64) {
    info!("");
    info!("========================================");
    info!("{} stopped gracefully", name);
    info!("{} cycles, {} overruns", cycles, overruns);
    info!("========================================");
}
