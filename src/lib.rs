//! kline-relay: Binance kline poller with WebSocket fan-out
//!
//! This library provides:
//! - A Binance REST klines client that truncates records to OHLC + open time
//! - A fixed-interval fetcher loop that survives every fetch failure
//! - A broadcast hub with late-joiner replay
//! - An axum WebSocket push server
//! - Logging and Prometheus metrics

pub mod cli;
pub mod config;
pub mod fetcher;
pub mod hub;
pub mod kline;
pub mod server;
pub mod telemetry;
