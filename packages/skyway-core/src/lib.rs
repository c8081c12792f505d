//! Skyway-Core: Shared Bridge Orchestration Library
//!
//! This crate provides the chain-agnostic core of the Skyway bridge: selecting
//! chains and currencies, polling balances, connecting wallets, and
//! dispatching deposits (IBC transfers) and withdrawals (withdrawer contract
//! calls):
//!
//! - **Config** - Environment resolution and per-environment chain tables
//! - **Selection** - Chain/currency/address selection state per wallet kind
//! - **Polling** - Interval balance polling with stale-result discard
//! - **Wallet** - Connection adapters over wallet providers
//! - **Dispatch** - IBC transfer and withdrawer-call construction and submission
//! - **Notify** - Process-wide toast/modal notification queue
//! - **Cosmos Module** - LCD signing client, bank queries, mnemonic wallet
//! - **EVM Module** - Withdrawer contract bindings, signing client, queries
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! skyway-core = { path = "../skyway-core" }
//! ```
//!
//! ## Feature Flags
//!
//! - `cosmos` - Enable Cosmos chain support (default)
//! - `evm` - Enable EVM chain support (default)

// Core modules (always available)
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod notify;
pub mod polling;
pub mod registry;
pub mod selection;
pub mod types;
pub mod wallet;

// Chain-specific modules (feature-gated)
#[cfg(feature = "cosmos")]
pub mod cosmos;

#[cfg(feature = "evm")]
pub mod evm;

// Re-export commonly used items at the crate root
pub use cache::{ServiceCache, ServiceKind};
pub use config::{
    apply_overrides, resolve_chain_config, ChainConfigs, Environment, EVM_CHAINS_OVERRIDE_VAR,
    IBC_CHAINS_OVERRIDE_VAR,
};
pub use dispatch::{
    build_ibc_transfer, build_withdrawer_call, send_ibc_transfer, withdraw_to_ibc_chain,
    AccountInfo, CosmosSigningClient, DispatchGuard, EvmWithdrawerClient, IbcTransferConfig,
    IbcTransferPlan, TxOutcome, WithdrawerCallPlan, WithdrawerEntry, DEFAULT_IBC_GAS_LIMIT,
    DEFAULT_IBC_TIMEOUT,
};
pub use error::BridgeError;
pub use format::{format_balance, pad_decimal, to_base_units};
pub use notify::{Level, NotificationCenter, NotificationView, ToastPosition};
pub use polling::{BalancePoller, PollerConfig, DEFAULT_POLL_INTERVAL};
pub use registry::{ProviderInfo, ProviderRegistry};
pub use selection::SelectionState;
pub use types::{
    Chain, ChainKind, CosmosChain, CosmosCurrency, Currency, EvmChain, EvmCurrency, IbcLinkage,
    Withdrawal,
};
pub use wallet::{
    CosmosWalletAdapter, CosmosWalletProvider, EvmWalletAdapter, EvmWalletProvider, WalletKey,
};
