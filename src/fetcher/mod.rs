//! Fetcher loop
//!
//! One perpetual task: fetch, replace-and-publish on success, log on failure,
//! then sleep a fixed interval. Failures never stop the loop and never touch
//! the current snapshot.

use crate::hub::BroadcastHub;
use crate::kline::{FetchError, KlineSource, Snapshot};
use crate::telemetry::{self, LatencyMetric};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Polls a [`KlineSource`] and feeds a [`BroadcastHub`]
pub struct Fetcher {
    source: Arc<dyn KlineSource>,
    hub: Arc<BroadcastHub>,
    interval: Duration,
}

impl Fetcher {
    pub fn new(source: Arc<dyn KlineSource>, hub: Arc<BroadcastHub>, interval: Duration) -> Self {
        Self {
            source,
            hub,
            interval,
        }
    }

    /// Spawn the loop on the current runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Run forever
    pub async fn run(&self) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Kline fetcher loop started"
        );

        loop {
            self.run_cycle().await.ok();
            sleep(self.interval).await;
        }
    }

    /// One fetch-transform-publish cycle
    ///
    /// Returns the number of candles published.
    pub async fn run_cycle(&self) -> Result<usize, FetchError> {
        let started = Instant::now();
        let result = self.fetch_guarded().await;
        telemetry::record_latency(LatencyMetric::Fetch, started.elapsed());

        match result {
            Ok(snapshot) => {
                let count = snapshot.len();
                let newest = snapshot.newest().and_then(|c| c.open_time_utc());
                let report = self.hub.publish(snapshot).await;
                telemetry::record_fetch("success");

                tracing::info!(
                    candles = count,
                    newest = ?newest,
                    subscribers = report.delivered,
                    "Fetched kline data"
                );
                Ok(count)
            }
            Err(e) => {
                telemetry::record_fetch(e.category());
                tracing::error!(category = e.category(), error = %e, "Kline fetch failed");
                Err(e)
            }
        }
    }

    /// Fetch with panics in the source turned into [`FetchError::Other`]
    async fn fetch_guarded(&self) -> Result<Snapshot, FetchError> {
        match AssertUnwindSafe(self.source.fetch()).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let msg = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "source panicked".to_string());
                Err(FetchError::Other(msg))
            }
        }
    }
}
