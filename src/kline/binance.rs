//! Binance REST klines client
//!
//! Polls `GET /api/v3/klines` for a single symbol and interval and turns the
//! response into a [`Snapshot`].

use super::{FetchError, KlineSource, Snapshot};
use crate::config::UpstreamConfig;
use async_trait::async_trait;
use reqwest::Client;

/// Klines endpoint path, relative to the API base URL
const KLINES_PATH: &str = "/api/v3/klines";

/// Client for the Binance klines endpoint
pub struct BinanceKlineClient {
    config: UpstreamConfig,
    client: Client,
}

impl BinanceKlineClient {
    /// Create a client; every request is bounded by `config.timeout_secs`
    pub fn new(config: UpstreamConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { config, client })
    }

    /// Full klines URL
    fn klines_url(&self) -> String {
        format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            KLINES_PATH
        )
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }
}

#[async_trait]
impl KlineSource for BinanceKlineClient {
    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        let url = self.klines_url();
        let limit = self.config.limit.to_string();

        tracing::debug!(
            url = %url,
            symbol = %self.config.symbol,
            interval = %self.config.interval,
            limit = self.config.limit,
            "Fetching klines"
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", self.config.symbol.as_str()),
                ("interval", self.config.interval.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body = response.bytes().await?;
        Snapshot::from_upstream_json(&body)
    }
}
