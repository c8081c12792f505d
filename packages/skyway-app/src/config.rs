//! Node configuration

use eyre::{eyre, Result};
use skyway_core::Environment;
use std::env;
use std::fmt;

/// Node configuration, loaded from the environment.
#[derive(Clone)]
pub struct Config {
    /// Unique node instance ID for multi-node deployments.
    pub node_id: String,

    /// Deployment environment selecting the chain tables.
    pub environment: Environment,

    /// Mnemonic for the Cosmos-side account.
    pub cosmos_mnemonic: String,
    /// Private key for the EVM-side account.
    pub evm_private_key: String,

    /// Balance poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Whether balance polling is enabled at all.
    pub polling_enabled: bool,

    /// HTTP server bind address (default 0.0.0.0).
    pub bind_address: String,
    /// HTTP server port (default 9099).
    pub http_port: u16,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("node_id", &self.node_id)
            .field("environment", &self.environment)
            .field("cosmos_mnemonic", &"<redacted>")
            .field("evm_private_key", &"<redacted>")
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("polling_enabled", &self.polling_enabled)
            .field("bind_address", &self.bind_address)
            .field("http_port", &self.http_port)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded .env from {:?}", path);
        }

        let default_id = format!("skyway-{}", std::process::id());

        Ok(Self {
            node_id: env::var("NODE_ID").unwrap_or(default_id),

            environment: env::var("SKYWAY_ENV")
                .unwrap_or_else(|_| "local".to_string())
                .parse()
                // Environment parsing is infallible; unknown labels fall back to local
                .unwrap_or(Environment::Local),

            cosmos_mnemonic: env::var("COSMOS_MNEMONIC")
                .map_err(|_| eyre!("COSMOS_MNEMONIC required"))?,
            evm_private_key: env::var("EVM_PRIVATE_KEY")
                .map_err(|_| eyre!("EVM_PRIVATE_KEY required"))?,

            poll_interval_ms: env::var("POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),

            polling_enabled: env::var("BALANCE_POLLING")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true),

            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string()),

            http_port: env::var("HTTP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(9099),
        })
    }
}
