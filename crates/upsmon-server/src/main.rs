use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use upsmon_server::config::AppConfig;
use upsmon_server::logging::init_tracing;
use upsmon_server::shutdown::SignalHandler;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "upsmon.toml")]
    config: PathBuf,

    /// Override server.port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load(Some(&args.config))?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    init_tracing(&config.logging);
    info!("Starting UPS monitor server with config: {}", args.config.display());
    config.validate()?;

    let signals = SignalHandler::default();
    upsmon_server::run(config, async move {
        let signal = signals.wait().await;
        info!(?signal, "Shutting down");
    })
    .await
}
