//! Redis-backed cache

use ::redis::aio::ConnectionManager;
use ::redis::{AsyncCommands, Client};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

use super::{EphemeralCache, Result};

pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Connect, retrying with exponential backoff
    pub async fn connect(url: &str, max_retries: u32) -> Result<Self> {
        let mut attempt = 0;
        loop {
            let result = match Client::open(url) {
                Ok(client) => ConnectionManager::new(client).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(conn) => {
                    info!("Connected to Redis");
                    return Ok(Self { conn });
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_retries {
                        return Err(e.into());
                    }
                    warn!("Redis connection attempt {} failed: {}. Retrying...", attempt, e);
                    tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
                }
            }
        }
    }
}

#[async_trait]
impl EphemeralCache for RedisCache {
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        let mut cmd = ::redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("EX").arg(ttl.as_secs().max(1));
        }
        cmd.query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn push_capped(&self, key: &str, value: String, cap: usize) -> Result<()> {
        let mut conn = self.conn.clone();
        ::redis::pipe()
            .atomic()
            .lpush(key, value)
            .ignore()
            .ltrim(key, 0, cap as isize - 1)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn list(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.lrange(key, 0, -1).await?)
    }
}
