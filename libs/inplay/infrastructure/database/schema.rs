use sqlx::PgPool;
use thiserror::Error;

use crate::domain::OptionKind;
use crate::domain::DEFAULT_SPORT_TRIGGER_SECS;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, SchemaError>;

/// Database schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize database schema and seed default options
pub async fn initialize_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS sports (
            id BIGINT PRIMARY KEY,
            name TEXT NOT NULL,
            is_enabled BOOLEAN NOT NULL DEFAULT true,
            trigger_time BIGINT NOT NULL DEFAULT {}
        )
        "#,
        DEFAULT_SPORT_TRIGGER_SECS
    ))
    .execute(pool)
    .await?;

    // trigger_time NULL falls back to the sport's
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS markets (
            id BIGINT NOT NULL,
            sport_id BIGINT NOT NULL REFERENCES sports(id),
            name TEXT NOT NULL,
            is_enabled BOOLEAN NOT NULL DEFAULT true,
            trigger_time BIGINT,
            PRIMARY KEY (sport_id, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bets (
            id BIGINT NOT NULL,
            sport_id BIGINT NOT NULL,
            market_id BIGINT NOT NULL,
            name TEXT NOT NULL,
            is_enabled BOOLEAN NOT NULL DEFAULT true,
            PRIMARY KEY (sport_id, market_id, id),
            FOREIGN KEY (sport_id, market_id) REFERENCES markets(sport_id, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS options (
            id BIGINT PRIMARY KEY,
            name TEXT NOT NULL,
            value DOUBLE PRECISION NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bet_bots (
            id BIGSERIAL PRIMARY KEY,
            name TEXT UNIQUE,
            bookmaker TEXT NOT NULL,
            username TEXT NOT NULL,
            password TEXT NOT NULL,
            proxy_country TEXT NOT NULL DEFAULT 'US',
            is_enabled BOOLEAN NOT NULL DEFAULT true,
            UNIQUE (username, bookmaker)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bet_attempts (
            id BIGSERIAL PRIMARY KEY,
            bot_id BIGINT NOT NULL REFERENCES bet_bots(id),
            event_id BIGINT NOT NULL,
            event_title TEXT NOT NULL,
            bet_name TEXT NOT NULL,
            tip_name TEXT NOT NULL,
            stake DOUBLE PRECISION NOT NULL,
            odds DOUBLE PRECISION NOT NULL,
            success BOOLEAN NOT NULL,
            detail JSONB,
            placed_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_bet_attempts_bot ON bet_attempts(bot_id, placed_at)")
        .execute(pool)
        .await?;

    for kind in OptionKind::ALL {
        sqlx::query("INSERT INTO options (id, name, value) VALUES ($1, $2, $3) ON CONFLICT (id) DO NOTHING")
            .bind(kind.id())
            .bind(kind.name())
            .bind(kind.default_value())
            .execute(pool)
            .await?;
    }

    Ok(())
}
