//! Upstream in-play feed client

pub mod types;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::DATE;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::helpers::{parse_json, require_success};
use super::HttpError;
use crate::domain::Event;

pub const DEFAULT_FEED_URL: &str = "https://krn-api-a.bpsgameserver.com/isa/v2/1101/en/event";

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Feed request failed: {0}")]
    Request(#[from] HttpError),

    #[error("Feed request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed upstream response: {reason}")]
    MalformedResponse { reason: String, payload: Value },
}

pub type Result<T> = std::result::Result<T, FeedError>;

/// One poll of the feed
#[derive(Debug, Clone)]
pub struct FeedBatch {
    pub events: Vec<Arc<Event>>,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<FeedBatch>;
}

pub struct HttpFeedClient {
    client: Client,
    url: String,
    event_count: u32,
    timeout: Duration,
}

impl HttpFeedClient {
    pub fn new(url: impl Into<String>, event_count: u32, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(HttpError::from)?;

        Ok(Self {
            client,
            url: url.into(),
            event_count,
            timeout,
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeedClient {
    async fn fetch(&self) -> Result<FeedBatch> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("eventCount", self.event_count.to_string()),
                ("eventPhase", "2".to_string()),
                ("include", "scoreboard,scoresummary".to_string()),
                ("override", "Mst1X2ParticipantName".to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FeedError::Timeout(self.timeout)
                } else {
                    FeedError::Request(e.into())
                }
            })?;

        let timestamp = response
            .headers()
            .get(DATE)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| DateTime::parse_from_rfc2822(s).ok())
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let response = require_success(response, "Feed returned an error").await?;
        let body: Value = parse_json(response).await?;
        let events = types::parse_events(&body)?;

        debug!("Fetched {} events (feed time {})", events.len(), timestamp);

        Ok(FeedBatch {
            events: events.into_iter().map(Arc::new).collect(),
            timestamp,
        })
    }
}
