//! EVM signing client
//!
//! Wraps alloy's `PrivateKeySigner` and `EthereumWallet` and submits
//! withdrawer contract calls. The wallet-attached provider is built per call
//! from the configured RPC URL.

use alloy::{
    network::EthereumWallet,
    primitives::{Address, U256},
    providers::{Provider, ProviderBuilder},
    rpc::types::TransactionReceipt,
    signers::local::PrivateKeySigner,
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use std::fmt;
use tracing::{debug, info};

use crate::dispatch::{EvmWithdrawerClient, TxOutcome, WithdrawerCallPlan, WithdrawerEntry};
use crate::error::BridgeError;
use crate::evm::contracts::{NativeWithdrawer, WithdrawableErc20};
use crate::wallet::EvmWalletProvider;

/// Configuration for the EVM signer.
#[derive(Clone)]
pub struct EvmSignerConfig {
    /// RPC URL for the EVM chain.
    pub rpc_url: String,
    /// Chain ID.
    pub chain_id: u64,
    /// Private key (hex string, with or without 0x prefix).
    pub private_key: String,
}

impl fmt::Debug for EvmSignerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmSignerConfig")
            .field("rpc_url", &self.rpc_url)
            .field("chain_id", &self.chain_id)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// EVM signing client for withdrawer contract calls.
pub struct EvmSigner {
    wallet: EthereumWallet,
    rpc_url: url::Url,
    chain_id: u64,
    address: Address,
}

impl EvmSigner {
    pub fn new(config: EvmSignerConfig) -> Result<Self, BridgeError> {
        let signer: PrivateKeySigner = config
            .private_key
            .parse()
            .map_err(|e| BridgeError::Config(format!("invalid private key: {e}")))?;

        let address = signer.address();
        let wallet = EthereumWallet::from(signer);
        let rpc_url: url::Url = config
            .rpc_url
            .parse()
            .map_err(|e| BridgeError::Config(format!("invalid RPC URL: {e}")))?;

        info!(
            address = %address,
            chain_id = config.chain_id,
            "EVM signer initialized"
        );

        Ok(Self {
            wallet,
            rpc_url,
            chain_id: config.chain_id,
            address,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Identity string used as the service-cache provider key.
    pub fn provider_id(&self) -> String {
        format!("evm:{}:{:#x}", self.chain_id, self.address)
    }

    fn provider(&self) -> impl Provider<Http<Client>> + Clone {
        ProviderBuilder::new()
            .wallet(self.wallet.clone())
            .on_http(self.rpc_url.clone())
    }

    /// Native balance of this signer, in wei.
    pub async fn balance(&self) -> Result<U256> {
        let balance = self.provider().get_balance(self.address).await?;
        Ok(balance)
    }

    async fn submit(&self, plan: &WithdrawerCallPlan) -> Result<TransactionReceipt> {
        let contract: Address = plan
            .contract
            .parse()
            .map_err(|e| eyre!("invalid contract address '{}': {}", plan.contract, e))?;
        let provider = self.provider();
        let value = U256::from(plan.value);

        debug!(
            contract = %contract,
            value = %value,
            destination = %plan.destination_address,
            "sending withdrawer call"
        );

        let pending = match &plan.entry {
            WithdrawerEntry::Native => {
                NativeWithdrawer::new(contract, &provider)
                    .withdrawToIbcChain(plan.destination_address.clone(), plan.memo.clone())
                    .value(value)
                    .send()
                    .await
                    .wrap_err("failed to send native withdrawal")?
            }
            WithdrawerEntry::Erc20 { amount } => {
                WithdrawableErc20::new(contract, &provider)
                    .withdraw(
                        U256::from(*amount),
                        plan.destination_address.clone(),
                        plan.memo.clone(),
                    )
                    .value(value)
                    .send()
                    .await
                    .wrap_err("failed to send ERC-20 withdrawal")?
            }
        };

        pending
            .get_receipt()
            .await
            .wrap_err("failed to get withdrawal receipt")
    }
}

#[async_trait]
impl EvmWithdrawerClient for EvmSigner {
    async fn submit_withdrawal(&self, plan: &WithdrawerCallPlan) -> Result<TxOutcome, BridgeError> {
        let receipt = self.submit(plan).await?;
        Ok(TxOutcome {
            tx_hash: format!("{:#x}", receipt.transaction_hash),
            height: receipt.block_number,
            success: receipt.status(),
            raw_log: None,
        })
    }
}

#[async_trait]
impl EvmWalletProvider for EvmSigner {
    async fn request_accounts(&self) -> Result<Vec<String>, BridgeError> {
        Ok(vec![format!("{:#x}", self.address)])
    }

    async fn native_balance(&self, address: &str) -> Result<String, BridgeError> {
        let address: Address = address
            .parse()
            .map_err(|e| BridgeError::Config(format!("invalid address: {e}")))?;
        let balance = self
            .provider()
            .get_balance(address)
            .await
            .map_err(|e| BridgeError::transfer(format!("balance query failed: {e}")))?;
        Ok(balance.to_string())
    }
}
