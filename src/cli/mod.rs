//! CLI interface for kline-relay
//!
//! Provides subcommands for:
//! - `serve`: Run the fetcher loop and the push server
//! - `fetch`: Fetch one snapshot and print it
//! - `config`: Show the effective configuration

mod fetch;
mod serve;

pub use fetch::FetchArgs;
pub use serve::ServeArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "kline-relay")]
#[command(about = "Relays Binance kline snapshots to WebSocket clients")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the fetcher loop and the push server
    Serve(ServeArgs),
    /// Fetch one snapshot and print it as JSON
    Fetch(FetchArgs),
    /// Show the effective configuration
    Config,
}
