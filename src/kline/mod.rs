//! Kline data module
//!
//! Candle/snapshot types, the upstream Binance client and the fetch error taxonomy

mod binance;
mod error;
mod types;

pub use binance::BinanceKlineClient;
pub use error::FetchError;
pub use types::{Candle, Snapshot, CANDLE_FIELDS};

use async_trait::async_trait;

/// Source of kline snapshots
#[async_trait]
pub trait KlineSource: Send + Sync {
    /// Fetch the latest snapshot from upstream
    async fn fetch(&self) -> Result<Snapshot, FetchError>;
}
