//! Configuration types for kline-relay

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable that overrides the allowed CORS origin
pub const ALLOWED_ORIGIN_ENV: &str = "SERVER_IP";

/// Bundled example configuration, used when no config file can be read
pub const EXAMPLE_CONFIG: &str = include_str!("../config.toml.example");

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Upstream klines endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// API base URL, without the `/api/v3/klines` path
    pub base_url: String,
    pub symbol: String,
    /// Kline interval (e.g., "1m")
    pub interval: String,
    /// Number of candles requested per poll
    pub limit: u32,
    /// Request timeout (seconds)
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.binance.us".to_string(),
            symbol: "BTCUSDC".to_string(),
            interval: "1m".to_string(),
            limit: 250,
            timeout_secs: 60,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Fetcher loop cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Fixed sleep between cycles, after success and failure alike (seconds)
    pub interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Push server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origin allowed by CORS in addition to `http://127.0.0.1`
    pub allowed_origin: String,
    /// Interval between WebSocket pings (seconds)
    pub ping_interval_secs: u64,
    /// Close a client that has sent nothing for this long (seconds)
    pub idle_timeout_secs: u64,
    /// Per-subscriber queue depth before deliveries are dropped
    pub subscriber_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            allowed_origin: "http://127.0.0.1".to_string(),
            ping_interval_secs: 25,
            idle_timeout_secs: 60,
            subscriber_buffer: 16,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    /// Prometheus scrape port; no exporter when unset
    pub metrics_port: Option<u16>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_port: None,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,
    /// JSON format for log aggregation
    Json,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse the bundled example configuration
    pub fn example() -> anyhow::Result<Self> {
        Ok(toml::from_str(EXAMPLE_CONFIG)?)
    }

    /// Apply overrides taken from the process environment
    pub fn apply_env(&mut self) {
        self.apply_allowed_origin(std::env::var(ALLOWED_ORIGIN_ENV).ok());
    }

    fn apply_allowed_origin(&mut self, origin: Option<String>) {
        if let Some(origin) = origin.filter(|o| !o.trim().is_empty()) {
            self.server.allowed_origin = origin;
        }
    }

    /// Reject values that would turn the poll loop into a busy loop
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll.interval_secs == 0 {
            anyhow::bail!("poll.interval_secs must be at least 1");
        }
        if self.upstream.timeout_secs == 0 {
            anyhow::bail!("upstream.timeout_secs must be at least 1");
        }
        Ok(())
    }
}
