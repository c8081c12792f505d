//! Application context: explicit dependency wiring
//!
//! Everything the node shares between the watcher and the HTTP API is built
//! once here and passed down as `Arc<AppContext>`. There are no ambient
//! globals; notification and selection state live behind this context.

use std::sync::{Arc, Mutex, PoisonError};

use eyre::{eyre, Result};
use skyway_core::cosmos::{LcdQueryClient, LcdSignerConfig, LcdSigningClient, MnemonicWallet};
use skyway_core::evm::{EvmQueryClient, EvmSigner, EvmSignerConfig};
use skyway_core::{
    resolve_chain_config, send_ibc_transfer, to_base_units, withdraw_to_ibc_chain, BridgeError,
    ChainConfigs, CosmosChain, CosmosCurrency, CosmosWalletAdapter, DispatchGuard, EvmChain,
    EvmCurrency, EvmWalletAdapter, IbcTransferConfig, NotificationCenter, SelectionState,
    ServiceCache, TxOutcome,
};
use tracing::info;

use crate::config::Config;

pub struct AppContext {
    pub config: Config,
    pub chains: ChainConfigs,

    pub cosmos_selection: Arc<Mutex<SelectionState<CosmosChain>>>,
    pub evm_selection: Arc<Mutex<SelectionState<EvmChain>>>,
    pub notifications: Arc<NotificationCenter>,

    pub cosmos_wallet: Arc<MnemonicWallet>,
    pub cosmos_client: Arc<LcdSigningClient>,
    pub cosmos_queries: Arc<LcdQueryClient>,

    pub evm_signer: Arc<EvmSigner>,
    pub evm_queries: Arc<EvmQueryClient>,
    /// Per-token query handles, invalidated when the signer changes.
    pub token_services: Arc<ServiceCache<EvmQueryClient>>,

    pub transfer_config: IbcTransferConfig,
    /// One transfer at a time, in either direction.
    pub dispatch_guard: Arc<DispatchGuard>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let chains = resolve_chain_config(config.environment);

        let ibc_chain = chains
            .ibc_chains
            .first()
            .ok_or_else(|| eyre!("no IBC chains configured for {}", config.environment))?;
        let evm_chain = chains
            .evm_chains
            .first()
            .ok_or_else(|| eyre!("no EVM chains configured for {}", config.environment))?;
        let evm_rpc = evm_chain
            .rpc_url()
            .ok_or_else(|| eyre!("EVM chain {} has no RPC URL", evm_chain.chain_name))?;

        let cosmos_wallet = Arc::new(MnemonicWallet::new(
            config.node_id.clone(),
            &config.cosmos_mnemonic,
            chains.ibc_chains.clone(),
        )?);

        let cosmos_client = Arc::new(LcdSigningClient::new(LcdSignerConfig {
            lcd_url: ibc_chain.rest_url.clone(),
            chain_id: ibc_chain.chain_id.clone(),
            bech32_prefix: ibc_chain.bech32_prefix.clone(),
            mnemonic: config.cosmos_mnemonic.clone(),
            derivation_path: None,
        })?);

        let cosmos_queries = Arc::new(LcdQueryClient::new(&ibc_chain.rest_url)?);

        let evm_signer = Arc::new(EvmSigner::new(EvmSignerConfig {
            rpc_url: evm_rpc.to_string(),
            chain_id: evm_chain.chain_id,
            private_key: config.evm_private_key.clone(),
        })?);
        let evm_queries = Arc::new(EvmQueryClient::new(evm_rpc)?);

        info!(
            environment = %config.environment,
            ibc_chain = %ibc_chain.chain_name,
            evm_chain = %evm_chain.chain_name,
            "application context built"
        );

        Ok(Self {
            cosmos_selection: Arc::new(Mutex::new(SelectionState::new(chains.ibc_chains.clone()))),
            evm_selection: Arc::new(Mutex::new(SelectionState::new(chains.evm_chains.clone()))),
            notifications: Arc::new(NotificationCenter::new()),
            cosmos_wallet,
            cosmos_client,
            cosmos_queries,
            evm_signer,
            evm_queries,
            token_services: Arc::new(ServiceCache::new()),
            transfer_config: IbcTransferConfig::default(),
            dispatch_guard: Arc::new(DispatchGuard::new()),
            config,
            chains,
        })
    }

    /// Connect both wallets, defaulting selections and recording addresses.
    pub async fn connect_wallets(&self) -> Result<()> {
        let cosmos_adapter = CosmosWalletAdapter::new(
            Arc::clone(&self.cosmos_wallet),
            Arc::clone(&self.cosmos_selection),
            Arc::clone(&self.notifications),
        );
        let key = cosmos_adapter.connect().await?;
        info!(address = %key.address, "cosmos account connected");

        let evm_adapter = EvmWalletAdapter::new(
            Arc::clone(&self.evm_signer),
            Arc::clone(&self.evm_selection),
            Arc::clone(&self.notifications),
        );
        let address = evm_adapter.connect().await?;
        info!(%address, "evm account connected");

        // Pick default currencies so balance polling has something to watch
        {
            let mut selection = lock(&self.cosmos_selection);
            if let Some(currency) = selection.default_currency().cloned() {
                selection.select_currency(currency)?;
            }
        }
        {
            let mut selection = lock(&self.evm_selection);
            if let Some(currency) = selection.default_currency().cloned() {
                selection.select_currency(currency)?;
            }
        }

        Ok(())
    }

    /// Selected Cosmos account and currency, if connected.
    pub fn cosmos_account(&self) -> Result<(String, CosmosCurrency), BridgeError> {
        let selection = lock(&self.cosmos_selection);
        let address = selection
            .address()
            .ok_or_else(|| BridgeError::InvalidSelection("cosmos wallet not connected".to_string()))?
            .to_string();
        let currency = selection
            .selected_currency()
            .cloned()
            .ok_or_else(|| BridgeError::InvalidSelection("no currency selected".to_string()))?;
        Ok((address, currency))
    }

    /// Selected EVM account and currency, if connected.
    pub fn evm_account(&self) -> Result<(String, EvmCurrency), BridgeError> {
        let selection = lock(&self.evm_selection);
        let address = selection
            .address()
            .ok_or_else(|| BridgeError::InvalidSelection("evm wallet not connected".to_string()))?
            .to_string();
        let currency = selection
            .selected_currency()
            .cloned()
            .ok_or_else(|| BridgeError::InvalidSelection("no currency selected".to_string()))?;
        Ok((address, currency))
    }

    /// Deposit: IBC transfer from the Cosmos account to the bridge, routed to
    /// `recipient` on the EVM chain. `amount` is in display units.
    pub async fn deposit(&self, amount: &str, recipient: &str) -> Result<TxOutcome, BridgeError> {
        let _permit = self.dispatch_guard.try_begin().ok_or_else(|| {
            BridgeError::Transfer("a transfer is already in flight".to_string())
        })?;

        let (sender, currency) = self.cosmos_account()?;
        let base_amount = to_base_units(amount, currency.decimals)?;

        let result = send_ibc_transfer(
            self.cosmos_client.as_ref(),
            &sender,
            recipient,
            &base_amount,
            &currency,
            &self.transfer_config,
        )
        .await;

        match &result {
            Ok(outcome) if outcome.success => {
                self.notifications
                    .success(format!("Deposited {} {}", amount, currency.denom));
            }
            Ok(outcome) => {
                self.notifications.warning(format!(
                    "Deposit submitted but unconfirmed: {}",
                    outcome.tx_hash
                ));
            }
            Err(err) => {
                self.notifications.danger(err.to_string());
            }
        }
        result
    }

    /// Withdrawal: withdrawer contract call sending funds to `destination` on
    /// the IBC chain. `amount` is in display units.
    pub async fn withdraw(&self, amount: &str, destination: &str) -> Result<TxOutcome, BridgeError> {
        let _permit = self.dispatch_guard.try_begin().ok_or_else(|| {
            BridgeError::Transfer("a transfer is already in flight".to_string())
        })?;

        let (_, currency) = self.evm_account()?;
        let base_amount: u128 = to_base_units(amount, currency.decimals)?
            .parse()
            .map_err(|_| BridgeError::Amount("amount exceeds u128".to_string()))?;

        let result = withdraw_to_ibc_chain(
            self.evm_signer.as_ref(),
            &currency,
            base_amount,
            destination,
            "",
        )
        .await;

        match &result {
            Ok(outcome) if outcome.success => {
                self.notifications
                    .success(format!("Withdrew {} {}", amount, currency.denom));
            }
            Ok(outcome) => {
                self.notifications
                    .warning(format!("Withdrawal reverted: {}", outcome.tx_hash));
            }
            Err(err) => {
                self.notifications.danger(err.to_string());
            }
        }
        result
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
