use clap::Parser;
use kline_relay::cli::{Cli, Commands};
use kline_relay::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
            eprintln!("Using bundled example configuration");
            Config::example()?
        }
    };
    config.apply_env();

    if let Commands::Serve(args) = &cli.command {
        args.apply(&mut config);
    }
    config.validate()?;

    // Initialize telemetry
    let _telemetry = kline_relay::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Serve(args) => {
            tracing::info!("Starting kline relay");
            args.execute(config).await?;
        }
        Commands::Fetch(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
