//! Lifeline daemon - first aid guidance service
//!
//! Serves the assessment flow, guidance, emergency log and nearby facility
//! search over HTTP.

use anyhow::Result;
use clap::Parser;
use lifelined::config::{Config, CONFIG_PATH};
use lifelined::server::{self, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lifelined", version, about = "Lifeline first aid daemon")]
struct Args {
    /// Config file (default: /etc/lifeline/config.toml, then /var/lib/lifeline/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured listen address
    #[arg(short, long)]
    listen: Option<String>,

    /// Write a default config file and exit
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = CONFIG_PATH)]
    init_config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.init_config {
        Config::save_default(path)?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => Config::load_explicit(path)?,
        None => Config::load(),
    };

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.daemon.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Lifeline Daemon v{} starting", env!("CARGO_PKG_VERSION"));

    let state = Arc::new(AppState::from_config(&config)?);

    server::spawn_pruner(
        Arc::clone(&state.registry),
        Duration::from_secs(config.daemon.prune_interval_secs),
        config.daemon.session_ttl(),
    );

    let addr = args.listen.unwrap_or(config.daemon.listen_addr);
    server::run(state, &addr).await?;

    info!("Lifeline Daemon stopped");
    Ok(())
}
