//! Serve command implementation

use crate::config::Config;
use crate::fetcher::Fetcher;
use crate::hub::BroadcastHub;
use crate::kline::BinanceKlineClient;
use crate::server::{self, AppState, Keepalive};
use clap::Args;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Bind address (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

impl ServeArgs {
    /// Fold command-line overrides into the loaded config
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.debug {
            config.telemetry.log_level = "debug".to_string();
        }
    }

    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let hub = Arc::new(BroadcastHub::new(config.server.subscriber_buffer));

        let source = Arc::new(BinanceKlineClient::new(config.upstream.clone())?);
        tracing::info!(
            symbol = %config.upstream.symbol,
            interval = %config.upstream.interval,
            limit = config.upstream.limit,
            "Starting kline fetcher"
        );
        let _fetcher = Fetcher::new(source, hub.clone(), config.poll.interval()).spawn();

        let state = AppState {
            hub,
            keepalive: Keepalive::from_config(&config.server),
        };
        let app = server::router(state, &config.server.allowed_origin)?;

        let listener = TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
        server::serve(listener, app).await
    }
}
