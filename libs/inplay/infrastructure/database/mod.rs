//! Operator configuration stored in Postgres
//!
//! Sports, markets and bets are registered as the feed reveals them and
//! toggled by the operator; options and bot accounts are edited there too.

pub mod schema;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{
    BetConfirmation, BotAccount, Bookmaker, EnabledFilters, Event, FilterKey, ScanOptions,
};

pub use schema::initialize_schema;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Schema error: {0}")]
    SchemaError(#[from] schema::SchemaError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Rows per multi-value INSERT
const CATALOG_CHUNK: usize = 1000;

#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Upsert the sports, markets and bets seen in the feed
    async fn register_catalog(&self, events: &[&Event]) -> Result<()>;

    async fn enabled_filters(&self) -> Result<EnabledFilters>;

    async fn scan_options(&self) -> Result<ScanOptions>;

    async fn enabled_bots(&self) -> Result<Vec<BotAccount>>;

    /// Keep an audit row for an automatic bet attempt
    async fn record_bet(&self, confirmation: &BetConfirmation) -> Result<()>;
}

type MarketRow = (i64, i64, String);
type BetRow = (i64, i64, i64, String);

/// Distinct catalog rows in an event batch
#[derive(Debug, Default, PartialEq)]
pub struct Catalog {
    pub sports: BTreeSet<(i64, String)>,
    pub markets: BTreeSet<MarketRow>,
    pub bets: BTreeSet<BetRow>,
}

impl Catalog {
    pub fn collect(events: &[&Event]) -> Self {
        let mut catalog = Self::default();
        for event in events {
            catalog
                .sports
                .insert((event.sport_id, event.sport_name.clone()));
            for tip in &event.tips {
                catalog.markets.insert((
                    event.sport_id,
                    tip.market_group_id,
                    tip.market_group_name.clone(),
                ));
                catalog.bets.insert((
                    event.sport_id,
                    tip.market_group_id,
                    tip.bet_group_id,
                    tip.bet_group_name.clone(),
                ));
            }
        }
        catalog
    }

    pub fn is_empty(&self) -> bool {
        self.sports.is_empty()
    }
}

pub struct PgConfigStore {
    pool: PgPool,
}

impl PgConfigStore {
    /// Create new database connection and initialize schema
    pub async fn new(db_url: &str) -> Result<Self> {
        info!("Connecting to configuration database");

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?;

        schema::initialize_schema(&pool).await?;

        info!("Configuration database initialized");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ConfigStore for PgConfigStore {
    async fn register_catalog(&self, events: &[&Event]) -> Result<()> {
        let catalog = Catalog::collect(events);
        if catalog.is_empty() {
            return Ok(());
        }

        let sports: Vec<_> = catalog.sports.into_iter().collect();
        let markets: Vec<_> = catalog.markets.into_iter().collect();
        let bets: Vec<_> = catalog.bets.into_iter().collect();

        let mut tx = self.pool.begin().await?;

        for chunk in sports.chunks(CATALOG_CHUNK) {
            let mut query = QueryBuilder::<Postgres>::new("INSERT INTO sports (id, name) ");
            query.push_values(chunk, |mut row, (id, name)| {
                row.push_bind(*id).push_bind(name);
            });
            query.push(" ON CONFLICT DO NOTHING");
            query.build().execute(&mut *tx).await?;
        }

        for chunk in markets.chunks(CATALOG_CHUNK) {
            let mut query =
                QueryBuilder::<Postgres>::new("INSERT INTO markets (sport_id, id, name) ");
            query.push_values(chunk, |mut row, (sport_id, id, name)| {
                row.push_bind(*sport_id).push_bind(*id).push_bind(name);
            });
            query.push(" ON CONFLICT DO NOTHING");
            query.build().execute(&mut *tx).await?;
        }

        for chunk in bets.chunks(CATALOG_CHUNK) {
            let mut query =
                QueryBuilder::<Postgres>::new("INSERT INTO bets (sport_id, market_id, id, name) ");
            query.push_values(chunk, |mut row, (sport_id, market_id, id, name)| {
                row.push_bind(*sport_id)
                    .push_bind(*market_id)
                    .push_bind(*id)
                    .push_bind(name);
            });
            query.push(" ON CONFLICT DO NOTHING");
            query.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        debug!(
            sports = sports.len(),
            markets = markets.len(),
            bets = bets.len(),
            "Registered catalog"
        );
        Ok(())
    }

    async fn enabled_filters(&self) -> Result<EnabledFilters> {
        let rows: Vec<(i64, i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT s.id, m.id, b.id, COALESCE(m.trigger_time, s.trigger_time)
            FROM sports s
            JOIN markets m ON m.sport_id = s.id
            JOIN bets b ON b.sport_id = m.sport_id AND b.market_id = m.id
            WHERE s.is_enabled AND m.is_enabled AND b.is_enabled
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(sport_id, market_id, bet_id, trigger)| {
                (
                    FilterKey::new(sport_id, market_id, bet_id),
                    trigger.max(0) as u64,
                )
            })
            .collect())
    }

    async fn scan_options(&self) -> Result<ScanOptions> {
        let rows: Vec<(i64, f64)> = sqlx::query_as("SELECT id, value FROM options")
            .fetch_all(&self.pool)
            .await?;
        Ok(ScanOptions::from_rows(rows))
    }

    async fn enabled_bots(&self) -> Result<Vec<BotAccount>> {
        let rows: Vec<(i64, Option<String>, String, String, String, String, bool)> =
            sqlx::query_as(
                r#"
                SELECT id, name, bookmaker, username, password, proxy_country, is_enabled
                FROM bet_bots
                WHERE is_enabled
                ORDER BY id
                "#,
            )
            .fetch_all(&self.pool)
            .await?;

        let mut accounts = Vec::with_capacity(rows.len());
        for (id, name, bookmaker, username, password, proxy_country, is_enabled) in rows {
            let bookmaker = match bookmaker.parse::<Bookmaker>() {
                Ok(b) => b,
                Err(e) => {
                    warn!(bot_id = id, "Skipping bot: {}", e);
                    continue;
                }
            };
            accounts.push(BotAccount {
                id,
                name,
                bookmaker,
                username,
                password,
                proxy_country,
                is_enabled,
            });
        }
        Ok(accounts)
    }

    async fn record_bet(&self, confirmation: &BetConfirmation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bet_attempts (
                bot_id, event_id, event_title, bet_name, tip_name,
                stake, odds, success, detail, placed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(confirmation.bot_id)
        .bind(confirmation.event_id)
        .bind(&confirmation.event_title)
        .bind(&confirmation.bet_name)
        .bind(&confirmation.tip_name)
        .bind(confirmation.stake)
        .bind(confirmation.odds)
        .bind(confirmation.success)
        .bind(&confirmation.detail)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
