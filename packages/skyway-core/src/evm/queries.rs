//! Read-only EVM balance queries

use alloy::{
    primitives::{Address, U256},
    providers::{Provider, ProviderBuilder},
    transports::http::{Client, Http},
};
use eyre::{eyre, Result};

use crate::error::BridgeError;
use crate::evm::contracts::WithdrawableErc20;
use crate::format::format_balance;
use crate::types::{Currency, EvmCurrency, Withdrawal};

/// Read-only query client for one EVM chain.
pub struct EvmQueryClient {
    rpc_url: url::Url,
}

impl EvmQueryClient {
    pub fn new(rpc_url: &str) -> Result<Self, BridgeError> {
        let rpc_url = rpc_url
            .parse()
            .map_err(|e| BridgeError::Config(format!("invalid RPC URL: {e}")))?;
        Ok(Self { rpc_url })
    }

    fn provider(&self) -> impl Provider<Http<Client>> + Clone {
        ProviderBuilder::new().on_http(self.rpc_url.clone())
    }

    /// Native balance of an address, in wei.
    pub async fn native_balance(&self, address: &str) -> Result<U256> {
        let address: Address = address
            .parse()
            .map_err(|e| eyre!("invalid address '{address}': {e}"))?;
        Ok(self.provider().get_balance(address).await?)
    }

    /// ERC-20 balance of an account.
    pub async fn erc20_balance(&self, token: &str, account: &str) -> Result<U256> {
        let token: Address = token
            .parse()
            .map_err(|e| eyre!("invalid token address '{token}': {e}"))?;
        let account: Address = account
            .parse()
            .map_err(|e| eyre!("invalid account address '{account}': {e}"))?;

        let provider = self.provider();
        let balance = WithdrawableErc20::new(token, &provider)
            .balanceOf(account)
            .call()
            .await?;
        Ok(balance._0)
    }

    /// Balance of an EVM currency rendered for display, e.g. "1.00 TIA".
    ///
    /// ERC-20 currencies are queried through their token contract; everything
    /// else uses the native account balance.
    pub async fn display_balance(
        &self,
        address: &str,
        currency: &EvmCurrency,
    ) -> Result<String, BridgeError> {
        let balance = match &currency.withdrawal {
            Withdrawal::Erc20 { contract, .. } => self.erc20_balance(contract, address).await?,
            Withdrawal::Native { .. } | Withdrawal::None => self.native_balance(address).await?,
        };

        let formatted = format_balance(&balance.to_string(), currency.decimals)?;
        Ok(format!("{} {}", formatted, currency.display_denom()))
    }
}
