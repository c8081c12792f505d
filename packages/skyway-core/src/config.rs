//! Deployment environment resolution and chain configuration tables
//!
//! Chain/currency metadata is keyed by deployment environment and loaded once
//! at startup. Each table (IBC and EVM independently) can be fully replaced by
//! a JSON-encoded environment variable; a malformed override is logged and the
//! static default retained, never a hard failure.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::types::{CosmosChain, CosmosCurrency, EvmChain, EvmCurrency, IbcLinkage, Withdrawal};

/// Env var holding a JSON array of [`CosmosChain`] that replaces the IBC table.
pub const IBC_CHAINS_OVERRIDE_VAR: &str = "SKYWAY_IBC_CHAINS_OVERRIDE";

/// Env var holding a JSON array of [`EvmChain`] that replaces the EVM table.
pub const EVM_CHAINS_OVERRIDE_VAR: &str = "SKYWAY_EVM_CHAINS_OVERRIDE";

/// Deployment environment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    Dusk,
    Dawn,
    Mainnet,
}

impl Environment {
    /// Parse a label, falling back to `Local` for anything unrecognized.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "local" => Environment::Local,
            "dusk" => Environment::Dusk,
            "dawn" => Environment::Dawn,
            "mainnet" => Environment::Mainnet,
            other => {
                warn!(label = %other, "unrecognized environment label, defaulting to local");
                Environment::Local
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Dusk => "dusk",
            Environment::Dawn => "dawn",
            Environment::Mainnet => "mainnet",
        }
    }
}

impl FromStr for Environment {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Environment::from_label(s))
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolved chain tables for one environment.
///
/// Order is selection order: the first entry of each list is the default
/// pick in the corresponding dropdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfigs {
    pub ibc_chains: Vec<CosmosChain>,
    pub evm_chains: Vec<EvmChain>,
}

impl ChainConfigs {
    /// Look up an IBC chain by display name.
    pub fn ibc_chain(&self, name: &str) -> Option<&CosmosChain> {
        self.ibc_chains.iter().find(|c| c.chain_name == name)
    }

    /// Look up an EVM chain by display name.
    pub fn evm_chain(&self, name: &str) -> Option<&EvmChain> {
        self.evm_chains.iter().find(|c| c.chain_name == name)
    }
}

/// Resolve the chain tables for an environment, honoring env-var overrides.
///
/// Pure given the process environment: reads only the two override variables.
pub fn resolve_chain_config(env: Environment) -> ChainConfigs {
    let ibc_override = std::env::var(IBC_CHAINS_OVERRIDE_VAR).ok();
    let evm_override = std::env::var(EVM_CHAINS_OVERRIDE_VAR).ok();
    apply_overrides(
        default_configs(env),
        ibc_override.as_deref(),
        evm_override.as_deref(),
    )
}

/// Replace either table with a parsed JSON override.
///
/// Each table is replaced independently; a parse failure leaves the static
/// default for that table in place.
pub fn apply_overrides(
    mut configs: ChainConfigs,
    ibc_json: Option<&str>,
    evm_json: Option<&str>,
) -> ChainConfigs {
    if let Some(json) = ibc_json {
        match serde_json::from_str::<Vec<CosmosChain>>(json) {
            Ok(chains) => configs.ibc_chains = chains,
            Err(e) => warn!(error = %e, "ignoring malformed IBC chain override"),
        }
    }
    if let Some(json) = evm_json {
        match serde_json::from_str::<Vec<EvmChain>>(json) {
            Ok(chains) => configs.evm_chains = chains,
            Err(e) => warn!(error = %e, "ignoring malformed EVM chain override"),
        }
    }
    configs
}

// ============================================================================
// Static per-environment tables
// ============================================================================

fn default_configs(env: Environment) -> ChainConfigs {
    match env {
        Environment::Local => ChainConfigs {
            ibc_chains: vec![celestia_chain(
                "celestia-local-0",
                "Celestia Local",
                "http://rpc.celestia.localdev.me",
                "http://rest.celestia.localdev.me",
                "channel-0",
                "skyway1d7zjjljc0dsmvkwqvglmsvtzv9rd6wwqkxsn2v",
                None,
            )],
            evm_chains: vec![rollup_chain(
                912_559,
                "Skyway Local",
                "http://executor.skyway.localdev.me",
                "0x0000000000000000000000000000000000001001",
                None,
            )],
        },
        Environment::Dusk => ChainConfigs {
            ibc_chains: vec![celestia_chain(
                "mocha-4",
                "Celestia Mocha",
                "https://rpc-mocha.pops.one",
                "https://api-mocha.pops.one",
                "channel-107",
                "skyway1u6ewl0tejz2wwvnmxfn4dxykexkmlkyhjstdgv",
                Some("https://mocha.celenium.io"),
            )],
            evm_chains: vec![rollup_chain(
                912_559,
                "Skyway Dusk",
                "https://rpc.evm.dusk.skyway.net",
                "0xA58639fB5458e65E4fA917FF951C390292C24A15",
                Some("https://explorer.evm.dusk.skyway.net"),
            )],
        },
        Environment::Dawn => ChainConfigs {
            ibc_chains: vec![celestia_chain(
                "mocha-4",
                "Celestia Mocha",
                "https://rpc-mocha.pops.one",
                "https://api-mocha.pops.one",
                "channel-160",
                "skyway1lepsmxnlvd2rwtkqdjr0cwrus7hqw9qvjwsaeh",
                Some("https://mocha.celenium.io"),
            )],
            evm_chains: vec![rollup_chain(
                17_558,
                "Skyway Dawn",
                "https://rpc.evm.dawn.skyway.net",
                "0xA58639fB5458e65E4fA917FF951C390292C24A15",
                Some("https://explorer.evm.dawn.skyway.net"),
            )],
        },
        Environment::Mainnet => ChainConfigs {
            ibc_chains: vec![celestia_chain(
                "celestia",
                "Celestia",
                "https://celestia-rpc.polkachu.com",
                "https://celestia-api.polkachu.com",
                "channel-48",
                "skyway13vptdafyttpmlwppt0s844efey2cpc0mevy92p",
                Some("https://celenium.io"),
            )],
            evm_chains: vec![rollup_chain(
                253_368_190,
                "Skyway",
                "https://rpc.evm.skyway.net",
                "0xA58639fB5458e65E4fA917FF951C390292C24A15",
                Some("https://explorer.evm.skyway.net"),
            )],
        },
    }
}

fn celestia_chain(
    chain_id: &str,
    name: &str,
    rpc_url: &str,
    rest_url: &str,
    channel: &str,
    bridge_account: &str,
    explorer: Option<&str>,
) -> CosmosChain {
    CosmosChain {
        chain_id: chain_id.to_string(),
        chain_name: name.to_string(),
        rpc_url: rpc_url.to_string(),
        rest_url: rest_url.to_string(),
        bech32_prefix: "celestia".to_string(),
        currencies: vec![CosmosCurrency {
            denom: "TIA".to_string(),
            minimal_denom: "utia".to_string(),
            decimals: 6,
            ibc: Some(IbcLinkage {
                channel: channel.to_string(),
                bridge_account: bridge_account.to_string(),
            }),
        }],
        icon_url: None,
        explorer_url: explorer.map(str::to_string),
    }
}

fn rollup_chain(
    chain_id: u64,
    name: &str,
    rpc_url: &str,
    withdrawer: &str,
    explorer: Option<&str>,
) -> EvmChain {
    EvmChain {
        chain_id,
        chain_name: name.to_string(),
        rpc_urls: vec![rpc_url.to_string()],
        currencies: vec![EvmCurrency {
            denom: "TIA".to_string(),
            minimal_denom: "utia".to_string(),
            decimals: 18,
            withdrawal: Withdrawal::Native {
                withdrawer: withdrawer.to_string(),
                fee: 10_000_000_000_000_000,
            },
        }],
        icon_url: None,
        explorer_url: explorer.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_label_fallback() {
        assert_eq!(Environment::from_label("mainnet"), Environment::Mainnet);
        assert_eq!(Environment::from_label("DUSK"), Environment::Dusk);
        assert_eq!(Environment::from_label("staging"), Environment::Local);
        assert_eq!(Environment::from_label(""), Environment::Local);
    }

    #[test]
    fn test_environment_from_str_never_fails() {
        let env: Environment = "dawn".parse().unwrap();
        assert_eq!(env, Environment::Dawn);
        let env: Environment = "garbage".parse().unwrap();
        assert_eq!(env, Environment::Local);
    }

    #[test]
    fn test_every_environment_has_chains() {
        for env in [
            Environment::Local,
            Environment::Dusk,
            Environment::Dawn,
            Environment::Mainnet,
        ] {
            let configs = default_configs(env);
            assert!(!configs.ibc_chains.is_empty(), "{env} missing IBC chains");
            assert!(!configs.evm_chains.is_empty(), "{env} missing EVM chains");
        }
    }

    #[test]
    fn test_valid_override_replaces_table() {
        let override_json = r#"[{
            "chain_id": "test-1",
            "chain_name": "Testnet",
            "rpc_url": "http://localhost:26657",
            "rest_url": "http://localhost:1317",
            "bech32_prefix": "test",
            "currencies": []
        }]"#;

        let configs = apply_overrides(default_configs(Environment::Local), Some(override_json), None);
        assert_eq!(configs.ibc_chains.len(), 1);
        assert_eq!(configs.ibc_chains[0].chain_id, "test-1");
        // EVM table untouched
        assert_eq!(configs.evm_chains, default_configs(Environment::Local).evm_chains);
    }

    #[test]
    fn test_malformed_override_retains_default() {
        let defaults = default_configs(Environment::Dusk);
        let configs = apply_overrides(defaults.clone(), Some("{not json"), Some("[1,2,3]"));
        assert_eq!(configs, defaults);
    }

    #[test]
    fn test_chain_lookup_by_name() {
        let configs = default_configs(Environment::Mainnet);
        assert!(configs.ibc_chain("Celestia").is_some());
        assert!(configs.ibc_chain("Nope").is_none());
        assert!(configs.evm_chain("Skyway").is_some());
    }
}
