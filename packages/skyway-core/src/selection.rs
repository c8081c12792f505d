//! Chain and currency selection state
//!
//! One [`SelectionState`] exists per wallet kind (Cosmos, EVM). It owns the
//! configured chain list for that kind, tracks the user's selected chain,
//! currency, and resolved account address, and derives the dropdown option
//! lists from the chain tables rather than storing them.

use crate::error::BridgeError;
use crate::types::{Chain, Currency};

/// Selection state for one wallet kind.
///
/// Invariant: a selected currency always belongs to the selected chain's
/// currency list; [`select_currency`](Self::select_currency) enforces this
/// before any balance query or transfer can observe the pair.
#[derive(Debug, Clone)]
pub struct SelectionState<C: Chain> {
    chains: Vec<C>,
    selected_chain: Option<C>,
    selected_currency: Option<C::Currency>,
    address: Option<String>,
}

impl<C: Chain> SelectionState<C> {
    /// Create selection state over the configured chains, nothing selected.
    pub fn new(chains: Vec<C>) -> Self {
        Self {
            chains,
            selected_chain: None,
            selected_currency: None,
            address: None,
        }
    }

    // ========================================================================
    // Derived views
    // ========================================================================

    /// Chains selectable in the dropdown, in configuration order.
    pub fn selectable_chains(&self) -> &[C] {
        &self.chains
    }

    /// Default chain pick: the first configured chain.
    pub fn default_chain(&self) -> Option<&C> {
        self.chains.first()
    }

    /// Currencies of the selected chain that can actually be bridged,
    /// in configuration order. Empty when no chain is selected.
    pub fn transfer_currencies(&self) -> Vec<&C::Currency> {
        self.selected_chain
            .as_ref()
            .map(|chain| {
                chain
                    .currencies()
                    .iter()
                    .filter(|c| c.is_transfer_capable())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Default currency pick: the first transfer-capable currency of the
    /// selected chain.
    pub fn default_currency(&self) -> Option<&C::Currency> {
        self.transfer_currencies().first().copied()
    }

    pub fn selected_chain(&self) -> Option<&C> {
        self.selected_chain.as_ref()
    }

    pub fn selected_currency(&self) -> Option<&C::Currency> {
        self.selected_currency.as_ref()
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Select a chain (or clear the selection with `None`).
    ///
    /// Moving to a different chain invalidates the selected currency and the
    /// resolved address, since neither is guaranteed valid on the new chain.
    pub fn select_chain(&mut self, chain: Option<C>) {
        if self.selected_chain == chain {
            return;
        }
        self.selected_chain = chain;
        self.selected_currency = None;
        self.address = None;
    }

    /// Select a currency belonging to the selected chain.
    ///
    /// Rejected (state unchanged) when no chain is selected or the currency
    /// is not in the selected chain's list.
    pub fn select_currency(&mut self, currency: C::Currency) -> Result<(), BridgeError> {
        let chain = self.selected_chain.as_ref().ok_or_else(|| {
            BridgeError::InvalidSelection("no chain selected".to_string())
        })?;

        if !chain.currencies().contains(&currency) {
            return Err(BridgeError::InvalidSelection(format!(
                "currency {} does not belong to chain {}",
                currency.display_denom(),
                chain.display_name()
            )));
        }

        self.selected_currency = Some(currency);
        Ok(())
    }

    /// Record the account address resolved by a wallet connection.
    pub fn set_address(&mut self, address: impl Into<String>) {
        self.address = Some(address.into());
    }

    /// Select the default chain if none is selected yet, and return the
    /// (now guaranteed) selection.
    ///
    /// This lets `connect()` pick a default and continue in the same task
    /// instead of asking the caller to re-invoke after state settles.
    pub fn ensure_default_chain(&mut self) -> Result<C, BridgeError> {
        if let Some(chain) = &self.selected_chain {
            return Ok(chain.clone());
        }
        let first = self
            .chains
            .first()
            .cloned()
            .ok_or_else(|| BridgeError::Config("no chains configured".to_string()))?;
        self.select_chain(Some(first.clone()));
        Ok(first)
    }

    /// Clear chain, currency, and address. Used on disconnect and on error
    /// recovery.
    pub fn reset(&mut self) {
        self.selected_chain = None;
        self.selected_currency = None;
        self.address = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CosmosChain, CosmosCurrency, IbcLinkage};

    fn currency(denom: &str, linked: bool) -> CosmosCurrency {
        CosmosCurrency {
            denom: denom.to_string(),
            minimal_denom: format!("u{}", denom.to_lowercase()),
            decimals: 6,
            ibc: linked.then(|| IbcLinkage {
                channel: "channel-1".to_string(),
                bridge_account: "skyway1bridge".to_string(),
            }),
        }
    }

    fn chain(name: &str, currencies: Vec<CosmosCurrency>) -> CosmosChain {
        CosmosChain {
            chain_id: name.to_lowercase(),
            chain_name: name.to_string(),
            rpc_url: "http://localhost:26657".to_string(),
            rest_url: "http://localhost:1317".to_string(),
            bech32_prefix: "celestia".to_string(),
            currencies,
            icon_url: None,
            explorer_url: None,
        }
    }

    fn two_chain_state() -> SelectionState<CosmosChain> {
        SelectionState::new(vec![
            chain("Alpha", vec![currency("TIA", true), currency("XYZ", false)]),
            chain("Beta", vec![currency("NTRN", true)]),
        ])
    }

    #[test]
    fn test_selecting_new_chain_clears_currency_and_address() {
        let mut state = two_chain_state();
        let alpha = state.selectable_chains()[0].clone();
        let beta = state.selectable_chains()[1].clone();

        state.select_chain(Some(alpha));
        state.select_currency(currency("TIA", true)).unwrap();
        state.set_address("celestia1sender");

        state.select_chain(Some(beta));
        assert!(state.selected_currency().is_none());
        assert!(state.address().is_none());
    }

    #[test]
    fn test_reselecting_same_chain_keeps_currency() {
        let mut state = two_chain_state();
        let alpha = state.selectable_chains()[0].clone();
        state.select_chain(Some(alpha.clone()));
        state.select_currency(currency("TIA", true)).unwrap();

        state.select_chain(Some(alpha));
        assert!(state.selected_currency().is_some());
    }

    #[test]
    fn test_select_currency_rejects_foreign_currency() {
        let mut state = two_chain_state();
        let alpha = state.selectable_chains()[0].clone();
        state.select_chain(Some(alpha));
        state.select_currency(currency("TIA", true)).unwrap();

        // NTRN belongs to Beta, not Alpha; selection must be unchanged
        let err = state.select_currency(currency("NTRN", true)).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidSelection(_)));
        assert_eq!(state.selected_currency().unwrap().denom, "TIA");
    }

    #[test]
    fn test_select_currency_requires_chain() {
        let mut state = two_chain_state();
        assert!(state.select_currency(currency("TIA", true)).is_err());
        assert!(state.selected_currency().is_none());
    }

    #[test]
    fn test_transfer_currencies_filters_unlinked() {
        let mut state = two_chain_state();
        let alpha = state.selectable_chains()[0].clone();
        state.select_chain(Some(alpha));

        let options = state.transfer_currencies();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].denom, "TIA");
        assert_eq!(state.default_currency().unwrap().denom, "TIA");
    }

    #[test]
    fn test_ensure_default_chain_selects_first() {
        let mut state = two_chain_state();
        let selected = state.ensure_default_chain().unwrap();
        assert_eq!(selected.chain_name, "Alpha");
        assert_eq!(state.selected_chain().unwrap().chain_name, "Alpha");

        // Second call is a no-op on an existing selection
        let beta = state.selectable_chains()[1].clone();
        state.select_chain(Some(beta));
        let selected = state.ensure_default_chain().unwrap();
        assert_eq!(selected.chain_name, "Beta");
    }

    #[test]
    fn test_ensure_default_chain_with_no_chains() {
        let mut state: SelectionState<CosmosChain> = SelectionState::new(vec![]);
        assert!(state.ensure_default_chain().is_err());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut state = two_chain_state();
        state.ensure_default_chain().unwrap();
        state.select_currency(currency("TIA", true)).unwrap();
        state.set_address("celestia1sender");

        state.reset();
        assert!(state.selected_chain().is_none());
        assert!(state.selected_currency().is_none());
        assert!(state.address().is_none());
    }
}
