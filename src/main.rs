//! Binary entry point: wire the chain, the HTTP server and the mining
//! driver together, then run until the driver finishes (or forever).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use parking_lot::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use aula_chain::config::{Cli, Settings};
use aula_chain::network::server;
use aula_chain::{miner, Chain};

/// Grace period before a `--stop` node asks itself to shut down, so peers
/// can still pull the final chain.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(&cli)?;
    info!(
        miner = %settings.miner_id,
        difficulty = settings.difficulty,
        port = settings.port,
        rewrite = settings.rewrite.is_some(),
        "starting node"
    );

    let chain = Arc::new(Mutex::new(Chain::new(
        settings.difficulty,
        &settings.ip,
        settings.port,
        settings.peers.clone(),
        &settings.miner_id,
        &settings.miner_wallet.address,
        &settings.miner_wallet.private_key,
    )));

    let addr: SocketAddr = format!("0.0.0.0:{}", settings.port).parse()?;
    let server_chain = Arc::clone(&chain);
    let server_task = tokio::spawn(async move { server::serve(server_chain, addr).await });

    let driver_chain = Arc::clone(&chain);
    let driver_settings = settings.clone();
    tokio::task::spawn_blocking(move || miner::run_driver(&driver_chain, &driver_settings))
        .await??;

    if settings.stop_when_done {
        tokio::time::sleep(SHUTDOWN_GRACE).await;
        let shutdown_url = format!("http://{}:{}/apagado", settings.ip, settings.port);
        if let Err(err) = reqwest::get(&shutdown_url).await {
            warn!(%err, "shutdown request failed");
        }
    }

    server_task.await??;
    Ok(())
}
