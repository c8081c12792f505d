//! Error taxonomy for bridge orchestration
//!
//! The dispatchers and wallet adapters are the only layers that catch broad
//! errors from external systems; everything above them propagates `BridgeError`
//! and the outermost caller turns a failure into a user-facing notification.

use thiserror::Error;

/// Errors surfaced by the bridge orchestration layer.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Missing or malformed configuration. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// The wallet extension/provider is not available.
    ///
    /// Recoverable: callers surface a dismissible notification carrying the
    /// install link instead of crashing.
    #[error("wallet unavailable; install it from {install_url}")]
    WalletUnavailable { install_url: String },

    /// The wallet does not recognize the requested chain.
    ///
    /// Callers should attempt chain registration before giving up.
    #[error("chain {chain_id} is not known to the wallet")]
    ChainUnknown { chain_id: String },

    /// The signing client has no account record for the address.
    ///
    /// Commonly caused by an address that has never held funds on the source
    /// chain; worded distinctly from generic failures for that reason.
    #[error("account {address} not found on chain; it may have a zero balance")]
    AccountNotFound { address: String },

    /// A transfer or contract call failed after submission to the chain
    /// boundary. Never retried automatically.
    #[error("transfer failed: {0}")]
    Transfer(String),

    /// A selection invariant was violated (e.g. currency not on the selected
    /// chain). The selection state is left unchanged.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// Amount parsing/formatting failure.
    #[error("invalid amount: {0}")]
    Amount(String),

    /// Anything else from an external collaborator.
    #[error(transparent)]
    Other(#[from] eyre::Report),
}

impl BridgeError {
    /// Helper for wrapping chain-boundary failures.
    pub fn transfer(msg: impl Into<String>) -> Self {
        BridgeError::Transfer(msg.into())
    }

    /// True if this error means the wallet itself is missing.
    pub fn is_wallet_unavailable(&self) -> bool {
        matches!(self, BridgeError::WalletUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_not_found_wording_is_distinct() {
        let err = BridgeError::AccountNotFound {
            address: "celestia1abc".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("celestia1abc"));
        assert!(msg.contains("zero balance"));
    }

    #[test]
    fn test_wallet_unavailable_carries_install_link() {
        let err = BridgeError::WalletUnavailable {
            install_url: "https://keplr.app/download".to_string(),
        };
        assert!(err.is_wallet_unavailable());
        assert!(err.to_string().contains("https://keplr.app/download"));
    }
}
