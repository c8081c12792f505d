//! Wallet connection adapters
//!
//! Adapters sit between a wallet provider (Keplr-style Cosmos signer, or an
//! EIP-1193 EVM provider) and the per-kind [`SelectionState`]. They own the
//! connect/disconnect choreography: defaulting the chain, registering unknown
//! chains with the wallet, resolving the account address, and translating
//! failures into notifications instead of panics.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::BridgeError;
use crate::format::format_balance;
use crate::notify::{Level, NotificationCenter};
use crate::selection::SelectionState;
use crate::types::{CosmosChain, Currency, EvmChain};

/// Key material a Cosmos wallet exposes for one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletKey {
    /// Wallet-side account label.
    pub name: String,
    /// Bech32 account address for the chain the key was requested for.
    pub address: String,
}

/// Keplr-style Cosmos wallet provider.
#[async_trait]
pub trait CosmosWalletProvider: Send + Sync {
    /// Resolve the key for a chain.
    ///
    /// Errors with [`BridgeError::ChainUnknown`] when the wallet has no
    /// registration for the chain, and [`BridgeError::WalletUnavailable`]
    /// when the provider itself is missing.
    async fn key_for_chain(&self, chain_id: &str) -> Result<WalletKey, BridgeError>;

    /// Register a chain with the wallet so a follow-up key request can
    /// succeed.
    async fn suggest_chain(&self, chain: &CosmosChain) -> Result<(), BridgeError>;
}

/// EIP-1193 style EVM wallet provider.
#[async_trait]
pub trait EvmWalletProvider: Send + Sync {
    /// Prompt for account access; the first returned account is the active
    /// one.
    async fn request_accounts(&self) -> Result<Vec<String>, BridgeError>;

    /// Native balance of an address in base units (wei), as a decimal string.
    async fn native_balance(&self, address: &str) -> Result<String, BridgeError>;
}

// ============================================================================
// Cosmos adapter
// ============================================================================

/// Connects a Cosmos wallet to the Cosmos-side selection state.
pub struct CosmosWalletAdapter<P> {
    provider: Arc<P>,
    selection: Arc<Mutex<SelectionState<CosmosChain>>>,
    notifications: Arc<NotificationCenter>,
}

impl<P: CosmosWalletProvider> CosmosWalletAdapter<P> {
    pub fn new(
        provider: Arc<P>,
        selection: Arc<Mutex<SelectionState<CosmosChain>>>,
        notifications: Arc<NotificationCenter>,
    ) -> Self {
        Self {
            provider,
            selection,
            notifications,
        }
    }

    /// Connect the wallet: default the chain if none is selected, resolve the
    /// key, and record the address in the selection state.
    ///
    /// An unknown chain is registered with the wallet once and the key request
    /// retried; any other failure resets the selection and surfaces a danger
    /// notification. A missing wallet surfaces its install link instead.
    pub async fn connect(&self) -> Result<WalletKey, BridgeError> {
        let chain = self.lock_selection().ensure_default_chain()?;

        match self.resolve_key(&chain).await {
            Ok(key) => {
                self.lock_selection().set_address(&key.address);
                info!(chain_id = %chain.chain_id, address = %key.address, "wallet connected");
                Ok(key)
            }
            Err(err) => {
                self.lock_selection().reset();
                let level = if err.is_wallet_unavailable() {
                    Level::Warning
                } else {
                    Level::Danger
                };
                self.notifications.toast(level, err.to_string());
                Err(err)
            }
        }
    }

    async fn resolve_key(&self, chain: &CosmosChain) -> Result<WalletKey, BridgeError> {
        match self.provider.key_for_chain(&chain.chain_id).await {
            Err(BridgeError::ChainUnknown { chain_id }) => {
                warn!(%chain_id, "chain not registered with wallet, suggesting it");
                self.provider.suggest_chain(chain).await?;
                self.provider.key_for_chain(&chain.chain_id).await
            }
            other => other,
        }
    }

    /// Disconnect: clears the whole Cosmos-side selection.
    pub fn disconnect(&self) {
        self.lock_selection().reset();
        info!("cosmos wallet disconnected");
    }

    fn lock_selection(&self) -> std::sync::MutexGuard<'_, SelectionState<CosmosChain>> {
        self.selection.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// EVM adapter
// ============================================================================

/// Connects an EVM wallet to the EVM-side selection state.
pub struct EvmWalletAdapter<P> {
    provider: Arc<P>,
    selection: Arc<Mutex<SelectionState<EvmChain>>>,
    notifications: Arc<NotificationCenter>,
}

impl<P: EvmWalletProvider> EvmWalletAdapter<P> {
    pub fn new(
        provider: Arc<P>,
        selection: Arc<Mutex<SelectionState<EvmChain>>>,
        notifications: Arc<NotificationCenter>,
    ) -> Self {
        Self {
            provider,
            selection,
            notifications,
        }
    }

    /// Connect the wallet and record the active account address.
    pub async fn connect(&self) -> Result<String, BridgeError> {
        self.lock_selection().ensure_default_chain()?;

        let resolved = self.provider.request_accounts().await.and_then(|accounts| {
            accounts
                .into_iter()
                .next()
                .ok_or_else(|| BridgeError::transfer("wallet returned no accounts"))
        });

        match resolved {
            Ok(address) => {
                self.lock_selection().set_address(&address);
                info!(%address, "evm wallet connected");
                Ok(address)
            }
            Err(err) => {
                self.lock_selection().reset();
                let level = if err.is_wallet_unavailable() {
                    Level::Warning
                } else {
                    Level::Danger
                };
                self.notifications.toast(level, err.to_string());
                Err(err)
            }
        }
    }

    /// Native balance of the connected account, rendered for display,
    /// e.g. "1.00 TIA".
    pub async fn display_native_balance(&self) -> Result<String, BridgeError> {
        let (address, currency) = {
            let selection = self.lock_selection();
            let address = selection
                .address()
                .ok_or_else(|| {
                    BridgeError::InvalidSelection("no wallet connected".to_string())
                })?
                .to_string();
            let currency = selection
                .selected_currency()
                .or_else(|| selection.default_currency())
                .cloned()
                .ok_or_else(|| {
                    BridgeError::InvalidSelection("no currency available".to_string())
                })?;
            (address, currency)
        };

        let base_units = self.provider.native_balance(&address).await?;
        let amount = format_balance(&base_units, currency.decimals)?;
        Ok(format!("{} {}", amount, currency.display_denom()))
    }

    /// Disconnect: clears the whole EVM-side selection.
    pub fn disconnect(&self) {
        self.lock_selection().reset();
        info!("evm wallet disconnected");
    }

    fn lock_selection(&self) -> std::sync::MutexGuard<'_, SelectionState<EvmChain>> {
        self.selection.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
