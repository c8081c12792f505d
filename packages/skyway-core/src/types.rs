//! Chain and currency descriptors shared across the bridge
//!
//! Descriptors are loaded once at startup from static configuration (plus
//! optional overrides) and never mutated afterwards. Withdrawal capability is
//! modeled as a tagged variant so a currency cannot simultaneously be both an
//! ERC-20 and a native-token withdrawal target.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which wallet family a chain (and its selection state) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainKind {
    Cosmos,
    Evm,
}

impl ChainKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainKind::Cosmos => "cosmos",
            ChainKind::Evm => "evm",
        }
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Common view over chain descriptors, used by the selection state.
pub trait Chain: Clone + PartialEq + fmt::Debug {
    type Currency: Currency + Clone + PartialEq + fmt::Debug;

    /// Human-readable label, also the key in the config tables.
    fn display_name(&self) -> &str;

    /// Currencies configured for this chain, in configuration order.
    fn currencies(&self) -> &[Self::Currency];

    fn kind(&self) -> ChainKind;
}

/// Common view over currency descriptors.
pub trait Currency {
    /// Display unit, e.g. `TIA`.
    fn display_denom(&self) -> &str;

    /// Base (atomic) unit, e.g. `utia`.
    fn minimal_denom(&self) -> &str;

    /// Decimal exponent relating display and base units.
    fn decimals(&self) -> u32;

    /// Whether this currency carries the linkage data needed for a
    /// cross-chain transfer. Currencies without it are excluded from
    /// deposit/withdraw option lists.
    fn is_transfer_capable(&self) -> bool;
}

// ============================================================================
// Cosmos (IBC) chains
// ============================================================================

/// A Cosmos-family chain reachable over IBC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CosmosChain {
    /// On-chain identifier, e.g. `celestia` or `mocha-4`.
    pub chain_id: String,
    /// Display name and config-table key.
    pub chain_name: String,
    /// Tendermint RPC endpoint.
    pub rpc_url: String,
    /// LCD/REST endpoint used for balance and account queries.
    pub rest_url: String,
    /// Bech32 account prefix, e.g. `celestia`.
    pub bech32_prefix: String,
    pub currencies: Vec<CosmosCurrency>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub explorer_url: Option<String>,
}

/// A currency on a Cosmos chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CosmosCurrency {
    /// Display denom, e.g. `TIA`.
    pub denom: String,
    /// On-chain base denom, e.g. `utia`.
    pub minimal_denom: String,
    /// Decimal exponent between the two.
    pub decimals: u32,
    /// IBC routing data; absent for currencies that cannot be bridged.
    #[serde(default)]
    pub ibc: Option<IbcLinkage>,
}

/// Routing data for sending a currency over IBC to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IbcLinkage {
    /// Source channel identifier, e.g. `channel-1`.
    pub channel: String,
    /// Bridge account on the source chain that relays deposits onward.
    pub bridge_account: String,
}

impl Chain for CosmosChain {
    type Currency = CosmosCurrency;

    fn display_name(&self) -> &str {
        &self.chain_name
    }

    fn currencies(&self) -> &[CosmosCurrency] {
        &self.currencies
    }

    fn kind(&self) -> ChainKind {
        ChainKind::Cosmos
    }
}

impl Currency for CosmosCurrency {
    fn display_denom(&self) -> &str {
        &self.denom
    }

    fn minimal_denom(&self) -> &str {
        &self.minimal_denom
    }

    fn decimals(&self) -> u32 {
        self.decimals
    }

    fn is_transfer_capable(&self) -> bool {
        self.ibc.is_some()
    }
}

// ============================================================================
// EVM chains
// ============================================================================

/// An EVM-compatible chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvmChain {
    /// Native EVM chain ID.
    pub chain_id: u64,
    /// Display name and config-table key.
    pub chain_name: String,
    /// RPC endpoints, tried in order.
    pub rpc_urls: Vec<String>,
    pub currencies: Vec<EvmCurrency>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub explorer_url: Option<String>,
}

impl EvmChain {
    /// Primary RPC endpoint.
    pub fn rpc_url(&self) -> Option<&str> {
        self.rpc_urls.first().map(String::as_str)
    }
}

/// A currency on an EVM chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvmCurrency {
    pub denom: String,
    pub minimal_denom: String,
    pub decimals: u32,
    /// How (and whether) this currency can be withdrawn to an IBC chain.
    #[serde(default)]
    pub withdrawal: Withdrawal,
}

/// Withdrawal capability of an EVM currency.
///
/// Exactly one of the variants applies; "both ERC-20 and native" is not a
/// representable state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Withdrawal {
    /// Native token withdrawn through a dedicated withdrawer contract.
    /// The call value carries `amount + fee`.
    Native {
        withdrawer: String,
        #[serde(default)]
        fee: u128,
    },
    /// ERC-20 token whose contract exposes the withdrawal entry point.
    /// The call value carries only `fee`; the amount is an argument.
    Erc20 {
        contract: String,
        #[serde(default)]
        fee: u128,
    },
    /// Not withdrawable; excluded from withdraw option lists.
    #[default]
    None,
}

impl Withdrawal {
    /// Withdrawal fee in base units, zero when not withdrawable.
    pub fn fee(&self) -> u128 {
        match self {
            Withdrawal::Native { fee, .. } | Withdrawal::Erc20 { fee, .. } => *fee,
            Withdrawal::None => 0,
        }
    }
}

impl Chain for EvmChain {
    type Currency = EvmCurrency;

    fn display_name(&self) -> &str {
        &self.chain_name
    }

    fn currencies(&self) -> &[EvmCurrency] {
        &self.currencies
    }

    fn kind(&self) -> ChainKind {
        ChainKind::Evm
    }
}

impl Currency for EvmCurrency {
    fn display_denom(&self) -> &str {
        &self.denom
    }

    fn minimal_denom(&self) -> &str {
        &self.minimal_denom
    }

    fn decimals(&self) -> u32 {
        self.decimals
    }

    fn is_transfer_capable(&self) -> bool {
        !matches!(self.withdrawal, Withdrawal::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tia() -> CosmosCurrency {
        CosmosCurrency {
            denom: "TIA".to_string(),
            minimal_denom: "utia".to_string(),
            decimals: 6,
            ibc: Some(IbcLinkage {
                channel: "channel-1".to_string(),
                bridge_account: "astria1d7zjjljc0dsmvkwqvglmsvtzv9rd6wwqk2mitv".to_string(),
            }),
        }
    }

    #[test]
    fn test_cosmos_currency_transfer_capability() {
        assert!(tia().is_transfer_capable());

        let unlinked = CosmosCurrency {
            ibc: None,
            ..tia()
        };
        assert!(!unlinked.is_transfer_capable());
    }

    #[test]
    fn test_evm_withdrawal_variants() {
        let native = EvmCurrency {
            denom: "RIA".to_string(),
            minimal_denom: "uria".to_string(),
            decimals: 18,
            withdrawal: Withdrawal::Native {
                withdrawer: "0x0000000000000000000000000000000000000001".to_string(),
                fee: 10_000_000_000_000_000,
            },
        };
        assert!(native.is_transfer_capable());
        assert_eq!(native.withdrawal.fee(), 10_000_000_000_000_000);

        let inert = EvmCurrency {
            denom: "WETH".to_string(),
            minimal_denom: "wei".to_string(),
            decimals: 18,
            withdrawal: Withdrawal::None,
        };
        assert!(!inert.is_transfer_capable());
        assert_eq!(inert.withdrawal.fee(), 0);
    }

    #[test]
    fn test_withdrawal_json_round_trip() {
        let json = r#"{"type":"erc20","contract":"0xdead","fee":5}"#;
        let parsed: Withdrawal = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed,
            Withdrawal::Erc20 {
                contract: "0xdead".to_string(),
                fee: 5,
            }
        );

        // Absent field deserializes to the non-withdrawable default
        let currency: EvmCurrency = serde_json::from_str(
            r#"{"denom":"WETH","minimal_denom":"wei","decimals":18}"#,
        )
        .unwrap();
        assert_eq!(currency.withdrawal, Withdrawal::None);
    }

    #[test]
    fn test_chain_kind_display() {
        assert_eq!(format!("{}", ChainKind::Cosmos), "cosmos");
        assert_eq!(format!("{}", ChainKind::Evm), "evm");
    }
}
