//! Balance watcher
//!
//! Connects both wallets, runs one balance polling session per side, and
//! mirrors the latest values into the shared stats the HTTP server reports.

use std::sync::Arc;
use std::time::Duration;

use eyre::Result;
use skyway_core::{BalancePoller, PollerConfig, ServiceKind, Withdrawal};
use tokio::sync::mpsc;
use tracing::info;

use crate::context::{lock, AppContext};
use crate::server::{SharedMetrics, SharedStats};

pub struct BalanceWatcher {
    ctx: Arc<AppContext>,
}

impl BalanceWatcher {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    pub async fn run(
        &mut self,
        mut shutdown_rx: mpsc::Receiver<()>,
        stats: SharedStats,
        metrics: SharedMetrics,
    ) -> Result<()> {
        self.ctx.connect_wallets().await?;

        {
            let mut stats = stats.write().await;
            stats.cosmos_address = lock(&self.ctx.cosmos_selection)
                .address()
                .map(str::to_string);
            stats.evm_address = lock(&self.ctx.evm_selection).address().map(str::to_string);
        }

        let poller_config = PollerConfig {
            enabled: self.ctx.config.polling_enabled,
            interval: Duration::from_millis(self.ctx.config.poll_interval_ms),
        };

        let cosmos_poller = self.spawn_cosmos_poller(&poller_config, &metrics)?;
        let evm_poller = self.spawn_evm_poller(&poller_config, &metrics)?;

        info!(
            enabled = poller_config.enabled,
            interval_ms = self.ctx.config.poll_interval_ms,
            "balance watcher running"
        );

        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("shutdown signal received, stopping balance watcher");
                    break;
                }
                _ = ticker.tick() => {
                    let mut stats = stats.write().await;
                    stats.cosmos_balance = cosmos_poller.value();
                    stats.evm_balance = evm_poller.value();
                    stats.notifications_queued = self.ctx.notifications.len() as u64;
                    metrics
                        .notifications_queued
                        .set(self.ctx.notifications.len() as i64);
                }
            }
        }

        cosmos_poller.stop();
        evm_poller.stop();
        Ok(())
    }

    fn spawn_cosmos_poller(
        &self,
        config: &PollerConfig,
        metrics: &SharedMetrics,
    ) -> Result<BalancePoller> {
        let (address, currency) = self.ctx.cosmos_account()?;
        let queries = Arc::clone(&self.ctx.cosmos_queries);
        let poll_errors = metrics.poll_errors_total.clone();

        Ok(BalancePoller::spawn(
            move || {
                let queries = Arc::clone(&queries);
                let address = address.clone();
                let currency = currency.clone();
                Box::pin(async move {
                    let balance = queries
                        .display_balance(&address, &currency)
                        .await
                        .map_err(eyre::Report::new)?;
                    Ok(Some(balance))
                })
            },
            config.clone(),
            move |_| poll_errors.inc(),
        ))
    }

    fn spawn_evm_poller(
        &self,
        config: &PollerConfig,
        metrics: &SharedMetrics,
    ) -> Result<BalancePoller> {
        let (address, currency) = self.ctx.evm_account()?;
        let ctx = Arc::clone(&self.ctx);
        let poll_errors = metrics.poll_errors_total.clone();

        Ok(BalancePoller::spawn(
            move || {
                let ctx = Arc::clone(&ctx);
                let address = address.clone();
                let currency = currency.clone();
                Box::pin(async move {
                    // ERC-20 balances go through the per-token service cache;
                    // native balances use the shared query client directly.
                    let queries = match &currency.withdrawal {
                        Withdrawal::Erc20 { contract, .. } => {
                            let rpc_url = ctx
                                .chains
                                .evm_chains
                                .first()
                                .and_then(|c| c.rpc_url())
                                .ok_or_else(|| eyre::eyre!("no EVM RPC configured"))?
                                .to_string();
                            ctx.token_services
                                .get_or_create(
                                    ServiceKind::Erc20,
                                    contract,
                                    &ctx.evm_signer.provider_id(),
                                    || skyway_core::evm::EvmQueryClient::new(&rpc_url),
                                )
                                .map_err(eyre::Report::new)?
                        }
                        _ => Arc::clone(&ctx.evm_queries),
                    };

                    let balance = queries
                        .display_balance(&address, &currency)
                        .await
                        .map_err(eyre::Report::new)?;
                    Ok(Some(balance))
                })
            },
            config.clone(),
            move |_| poll_errors.inc(),
        ))
    }
}
