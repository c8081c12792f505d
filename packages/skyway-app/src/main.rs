//! Skyway Bridge Node
//!
//! Headless bridge orchestrator: connects a Cosmos account and an EVM
//! account, keeps their balances polled, and exposes an HTTP API for
//! submitting deposits (IBC transfers to the bridge account) and withdrawals
//! (withdrawer contract calls back to the IBC chain).

mod config;
mod context;
mod server;
mod watcher;

use std::sync::Arc;

use config::Config;
use context::AppContext;
use server::{AppState, BridgeStats, Metrics};
use tokio::sync::RwLock;
use tracing::{error, info};
use watcher::BalanceWatcher;

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    init_logging();

    info!("Starting Skyway Bridge Node");

    let config = Config::load()?;
    info!(
        node_id = %config.node_id,
        environment = %config.environment,
        "Configuration loaded"
    );

    let ctx = Arc::new(AppContext::new(config)?);

    let stats = Arc::new(RwLock::new(BridgeStats {
        node_id: ctx.config.node_id.clone(),
        environment: ctx.config.environment.to_string(),
        ..Default::default()
    }));
    let metrics = Arc::new(Metrics::new());

    // HTTP server runs for the lifetime of the process
    let server_state = AppState {
        ctx: Arc::clone(&ctx),
        stats: Arc::clone(&stats),
        metrics: Arc::clone(&metrics),
    };
    let bind_address = ctx.config.bind_address.clone();
    let http_port = ctx.config.http_port;
    tokio::spawn(async move {
        if let Err(e) = server::start_server(&bind_address, http_port, server_state).await {
            error!(error = %e, "HTTP server exited");
        }
    });

    // Shutdown channel
    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        let _ = shutdown_tx.send(()).await;
    });

    let mut watcher = BalanceWatcher::new(ctx);
    watcher.run(shutdown_rx, stats, metrics).await?;

    info!("Skyway Bridge Node stopped");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,skyway_app=debug,skyway_core=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}
