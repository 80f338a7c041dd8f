//! Fetch command implementation

use crate::config::Config;
use crate::kline::{BinanceKlineClient, KlineSource};
use clap::Args;

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Pretty-print the snapshot JSON
    #[arg(long)]
    pub pretty: bool,
}

impl FetchArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let client = BinanceKlineClient::new(config.upstream.clone())?;
        let snapshot = client.fetch().await?;

        tracing::info!(candles = snapshot.len(), "Fetched kline data");

        let json = if self.pretty {
            serde_json::to_string_pretty(&snapshot)?
        } else {
            serde_json::to_string(&snapshot)?
        };
        println!("{}", json);
        Ok(())
    }
}
