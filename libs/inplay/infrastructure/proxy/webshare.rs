//! Webshare proxy list API

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{ProxyError, ProxySource, Result};
use crate::infrastructure::client::helpers::require_success;

pub const DEFAULT_WEBSHARE_URL: &str = "https://proxy.webshare.io/api/proxy/list";

#[derive(Debug, Deserialize)]
struct ProxyListResponse {
    results: Vec<WebshareProxy>,
}

#[derive(Debug, Deserialize)]
struct WebshareProxy {
    username: String,
    password: String,
    proxy_address: String,
    ports: WebsharePorts,
}

#[derive(Debug, Deserialize)]
struct WebsharePorts {
    http: u16,
}

impl WebshareProxy {
    fn url(&self) -> String {
        format!(
            "http://{}:{}@{}:{}",
            self.username, self.password, self.proxy_address, self.ports.http
        )
    }
}

pub struct WebshareProxySource {
    client: Client,
    url: String,
    token: String,
}

impl WebshareProxySource {
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            token: token.into(),
        })
    }
}

#[async_trait]
impl ProxySource for WebshareProxySource {
    async fn list(&self, country: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .get(&self.url)
            .header("Authorization", format!("Token {}", self.token))
            .query(&[("countries", country)])
            .send()
            .await?;
        let response = require_success(response, "Failed to fetch proxy list")
            .await
            .map_err(|e| ProxyError::Source(e.to_string()))?;

        let body: ProxyListResponse = response.json().await?;
        debug!(country, count = body.results.len(), "Fetched proxy list");

        Ok(body.results.iter().map(WebshareProxy::url).collect())
    }
}
