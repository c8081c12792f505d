//! Mnemonic-backed Cosmos wallet provider
//!
//! Headless stand-in for a browser wallet extension. Chains must be
//! registered (at construction or via `suggest_chain`) before a key can be
//! resolved for them, mirroring the extension's register-then-retry flow.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use bip39::Mnemonic;
use cosmrs::{bip32::DerivationPath, crypto::secp256k1::SigningKey};
use tracing::info;

use crate::cosmos::signer::COSMOS_DERIVATION_PATH;
use crate::error::BridgeError;
use crate::types::CosmosChain;
use crate::wallet::{CosmosWalletProvider, WalletKey};

/// Wallet provider deriving per-chain keys from one mnemonic.
pub struct MnemonicWallet {
    account_name: String,
    mnemonic: Mnemonic,
    /// Registered chains, keyed by chain ID.
    chains: Mutex<HashMap<String, CosmosChain>>,
}

impl fmt::Debug for MnemonicWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MnemonicWallet")
            .field("account_name", &self.account_name)
            .field("mnemonic", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl MnemonicWallet {
    pub fn new(
        account_name: impl Into<String>,
        mnemonic: &str,
        chains: Vec<CosmosChain>,
    ) -> Result<Self, BridgeError> {
        let mnemonic = Mnemonic::parse(mnemonic)
            .map_err(|e| BridgeError::Config(format!("invalid mnemonic: {e}")))?;

        Ok(Self {
            account_name: account_name.into(),
            mnemonic,
            chains: Mutex::new(
                chains
                    .into_iter()
                    .map(|c| (c.chain_id.clone(), c))
                    .collect(),
            ),
        })
    }

    fn derive_address(&self, bech32_prefix: &str) -> Result<String, BridgeError> {
        let seed = self.mnemonic.to_seed("");
        let path: DerivationPath = COSMOS_DERIVATION_PATH
            .parse()
            .map_err(|e| BridgeError::Config(format!("invalid derivation path: {e:?}")))?;

        let key = SigningKey::derive_from_path(seed, &path)
            .map_err(|e| BridgeError::Config(format!("failed to derive signing key: {e}")))?;
        let address = key
            .public_key()
            .account_id(bech32_prefix)
            .map_err(|e| BridgeError::Config(format!("failed to derive account ID: {e}")))?;

        Ok(address.to_string())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CosmosChain>> {
        self.chains.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CosmosWalletProvider for MnemonicWallet {
    async fn key_for_chain(&self, chain_id: &str) -> Result<WalletKey, BridgeError> {
        let prefix = {
            let chains = self.lock();
            let chain = chains.get(chain_id).ok_or_else(|| BridgeError::ChainUnknown {
                chain_id: chain_id.to_string(),
            })?;
            chain.bech32_prefix.clone()
        };

        Ok(WalletKey {
            name: self.account_name.clone(),
            address: self.derive_address(&prefix)?,
        })
    }

    async fn suggest_chain(&self, chain: &CosmosChain) -> Result<(), BridgeError> {
        info!(chain_id = %chain.chain_id, "registering chain with wallet");
        self.lock().insert(chain.chain_id.clone(), chain.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn celestia() -> CosmosChain {
        CosmosChain {
            chain_id: "celestia-local".to_string(),
            chain_name: "Celestia".to_string(),
            rpc_url: "http://localhost:26657".to_string(),
            rest_url: "http://localhost:1317".to_string(),
            bech32_prefix: "celestia".to_string(),
            currencies: vec![],
            icon_url: None,
            explorer_url: None,
        }
    }

    #[tokio::test]
    async fn test_key_for_registered_chain() {
        let wallet = MnemonicWallet::new("trading", TEST_MNEMONIC, vec![celestia()]).unwrap();
        let key = wallet.key_for_chain("celestia-local").await.unwrap();
        assert_eq!(key.name, "trading");
        assert!(key.address.starts_with("celestia1"));
    }

    #[tokio::test]
    async fn test_unregistered_chain_then_suggest() {
        let wallet = MnemonicWallet::new("trading", TEST_MNEMONIC, vec![]).unwrap();

        let err = wallet.key_for_chain("celestia-local").await.unwrap_err();
        assert!(matches!(err, BridgeError::ChainUnknown { .. }));

        wallet.suggest_chain(&celestia()).await.unwrap();
        let key = wallet.key_for_chain("celestia-local").await.unwrap();
        assert!(key.address.starts_with("celestia1"));
    }

    #[test]
    fn test_debug_redacts_mnemonic() {
        let wallet = MnemonicWallet::new("trading", TEST_MNEMONIC, vec![]).unwrap();
        let rendered = format!("{wallet:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("abandon"));
    }
}
