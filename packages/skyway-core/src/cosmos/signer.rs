//! LCD-backed Cosmos signing client
//!
//! Derives a secp256k1 key from a mnemonic, signs IBC transfer transactions
//! with cosmrs, and broadcasts them through the LCD REST API with
//! confirmation polling.

use bip39::Mnemonic;
use cosmrs::{
    bip32::DerivationPath,
    crypto::secp256k1::SigningKey,
    tx::{self, Fee, SignDoc, SignerInfo},
    AccountId, Any, Coin,
};
use eyre::{eyre, Result, WrapErr};
use ibc_proto::ibc::applications::transfer::v1::MsgTransfer;
use prost::Message;
use reqwest::Client;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::dispatch::{AccountInfo, CosmosSigningClient, IbcTransferPlan, TxOutcome};
use crate::error::BridgeError;

/// Cosmos Hub derivation path (BIP44 coin type 118), used by most IBC chains.
pub const COSMOS_DERIVATION_PATH: &str = "m/44'/118'/0'/0/0";

/// Protobuf type URL of the IBC fungible token transfer message.
const MSG_TRANSFER_TYPE_URL: &str = "/ibc.applications.transfer.v1.MsgTransfer";

/// Configuration for the LCD signing client.
#[derive(Clone)]
pub struct LcdSignerConfig {
    /// LCD/REST endpoint used for account queries and broadcasting.
    pub lcd_url: String,
    /// On-chain identifier, e.g. `celestia`.
    pub chain_id: String,
    /// Bech32 account prefix, e.g. `celestia`.
    pub bech32_prefix: String,
    /// Mnemonic phrase.
    pub mnemonic: String,
    /// Custom derivation path (defaults to [`COSMOS_DERIVATION_PATH`]).
    pub derivation_path: Option<String>,
}

impl fmt::Debug for LcdSignerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LcdSignerConfig")
            .field("lcd_url", &self.lcd_url)
            .field("chain_id", &self.chain_id)
            .field("bech32_prefix", &self.bech32_prefix)
            .field("mnemonic", &"<redacted>")
            .field("derivation_path", &self.derivation_path)
            .finish()
    }
}

/// Cosmos signing client speaking to an LCD endpoint.
pub struct LcdSigningClient {
    signing_key: SigningKey,
    address: AccountId,
    lcd_url: String,
    chain_id: String,
    client: Client,
}

impl LcdSigningClient {
    pub fn new(config: LcdSignerConfig) -> Result<Self, BridgeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .wrap_err("failed to create HTTP client")?;

        let derivation_path = config
            .derivation_path
            .as_deref()
            .unwrap_or(COSMOS_DERIVATION_PATH);

        let mnemonic = Mnemonic::parse(&config.mnemonic)
            .map_err(|e| BridgeError::Config(format!("invalid mnemonic: {e}")))?;
        let seed = mnemonic.to_seed("");
        let path: DerivationPath = derivation_path
            .parse()
            .map_err(|e| BridgeError::Config(format!("invalid derivation path: {e:?}")))?;

        let signing_key = SigningKey::derive_from_path(seed, &path)
            .map_err(|e| BridgeError::Config(format!("failed to derive signing key: {e}")))?;
        let address = signing_key
            .public_key()
            .account_id(&config.bech32_prefix)
            .map_err(|e| BridgeError::Config(format!("failed to derive account ID: {e}")))?;

        info!(
            address = %address,
            chain_id = %config.chain_id,
            "LCD signing client initialized"
        );

        Ok(Self {
            signing_key,
            address,
            lcd_url: config.lcd_url.trim_end_matches('/').to_string(),
            chain_id: config.chain_id,
            client,
        })
    }

    pub fn address(&self) -> &AccountId {
        &self.address
    }

    pub fn address_str(&self) -> String {
        self.address.to_string()
    }

    // =========================================================================
    // Account queries
    // =========================================================================

    /// Fetch account number and sequence, `None` when the chain has no record
    /// of the address (LCD returns 404 for never-funded accounts).
    async fn fetch_account_info(&self, address: &str) -> Result<Option<AccountInfo>> {
        let url = format!("{}/cosmos/auth/v1beta1/accounts/{}", self.lcd_url, address);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .wrap_err("failed to query account info")?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(eyre!(
                "account query failed: {} - {}",
                response.status(),
                response.text().await.unwrap_or_default()
            ));
        }

        let data: serde_json::Value = response.json().await?;
        let account = data
            .get("account")
            .ok_or_else(|| eyre!("missing 'account' field in response"))?;

        let sequence = account
            .get("sequence")
            .or_else(|| account.get("base_account").and_then(|b| b.get("sequence")))
            .and_then(|v| v.as_str())
            .unwrap_or("0")
            .parse()
            .unwrap_or(0);

        let account_number = account
            .get("account_number")
            .or_else(|| {
                account
                    .get("base_account")
                    .and_then(|b| b.get("account_number"))
            })
            .and_then(|v| v.as_str())
            .unwrap_or("0")
            .parse()
            .unwrap_or(0);

        Ok(Some(AccountInfo {
            account_number,
            sequence,
        }))
    }

    // =========================================================================
    // Transaction signing
    // =========================================================================

    /// Build, sign, and serialize the transfer transaction.
    fn sign_transfer(&self, plan: &IbcTransferPlan, account: &AccountInfo) -> Result<Vec<u8>> {
        let transfer = MsgTransfer {
            source_port: plan.source_port.clone(),
            source_channel: plan.source_channel.clone(),
            token: Some(ibc_proto::cosmos::base::v1beta1::Coin {
                denom: plan.token_denom.clone(),
                amount: plan.token_amount.clone(),
            }),
            sender: plan.sender.clone(),
            receiver: plan.receiver.clone(),
            timeout_height: None,
            timeout_timestamp: plan.timeout_timestamp_ns,
            memo: plan.memo.clone(),
        };

        let any = Any {
            type_url: MSG_TRANSFER_TYPE_URL.to_string(),
            value: transfer.encode_to_vec(),
        };

        let body = tx::Body::new(vec![any], "", 0u32);

        let signer_info =
            SignerInfo::single_direct(Some(self.signing_key.public_key()), account.sequence);

        let fee = Fee::from_amount_and_gas(
            Coin {
                denom: plan
                    .fee_denom
                    .parse()
                    .map_err(|e| eyre!("invalid fee denom '{}': {}", plan.fee_denom, e))?,
                amount: plan.fee_amount,
            },
            plan.gas_limit,
        );

        let auth_info = signer_info.auth_info(fee);
        let chain_id = self
            .chain_id
            .parse()
            .map_err(|_| eyre!("invalid chain ID: {}", self.chain_id))?;

        let sign_doc = SignDoc::new(&body, &auth_info, &chain_id, account.account_number)
            .map_err(|e| eyre!("failed to create sign doc: {e}"))?;

        let tx_raw = sign_doc
            .sign(&self.signing_key)
            .map_err(|e| eyre!("failed to sign transaction: {e}"))?;

        tx_raw
            .to_bytes()
            .map_err(|e| eyre!("failed to serialize transaction: {e}"))
    }

    // =========================================================================
    // Broadcasting
    // =========================================================================

    async fn broadcast_and_confirm(&self, tx_bytes: &[u8]) -> Result<TxOutcome> {
        let tx_b64 = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, tx_bytes);

        let broadcast_request = serde_json::json!({
            "tx_bytes": tx_b64,
            "mode": "BROADCAST_MODE_SYNC"
        });

        let broadcast_url = format!("{}/cosmos/tx/v1beta1/txs", self.lcd_url);
        info!(url = %broadcast_url, "broadcasting transfer");

        let response = self
            .client
            .post(&broadcast_url)
            .json(&broadcast_request)
            .send()
            .await
            .wrap_err("failed to broadcast transaction")?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .unwrap_or_else(|_| serde_json::json!({"error": "failed to parse response"}));

        if !status.is_success() {
            return Err(eyre!("broadcast failed (HTTP {status}): {body}"));
        }

        let tx_response = body
            .get("tx_response")
            .ok_or_else(|| eyre!("missing tx_response in broadcast result: {body}"))?;

        let code = tx_response
            .get("code")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        if code != 0 {
            let raw_log = tx_response
                .get("raw_log")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error");
            return Err(eyre!("transaction rejected (code {code}): {raw_log}"));
        }

        let tx_hash = tx_response
            .get("txhash")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        info!(%tx_hash, "transfer broadcast accepted, awaiting confirmation");

        match self.wait_for_confirmation(&tx_hash).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(
                    %tx_hash,
                    error = %e,
                    "broadcast succeeded but confirmation timed out"
                );
                Ok(TxOutcome {
                    tx_hash,
                    height: None,
                    success: false,
                    raw_log: Some(format!("broadcast succeeded, confirmation timed out: {e}")),
                })
            }
        }
    }

    /// Poll the LCD until the transaction lands in a block.
    async fn wait_for_confirmation(&self, tx_hash: &str) -> Result<TxOutcome> {
        let timeout = Duration::from_secs(30);
        let max_delay = Duration::from_secs(3);

        let start = Instant::now();
        let mut delay = Duration::from_millis(500);
        let tx_url = format!("{}/cosmos/tx/v1beta1/txs/{}", self.lcd_url, tx_hash);

        while start.elapsed() < timeout {
            tokio::time::sleep(delay).await;

            match self.client.get(&tx_url).send().await {
                Ok(response) if response.status().is_success() => {
                    let body: serde_json::Value = response.json().await.unwrap_or_default();
                    if let Some(tx_response) = body.get("tx_response") {
                        let code = tx_response
                            .get("code")
                            .and_then(|v| v.as_u64())
                            .unwrap_or(0);
                        let height = tx_response
                            .get("height")
                            .and_then(|v| v.as_str())
                            .and_then(|h| h.parse().ok());
                        let raw_log = tx_response
                            .get("raw_log")
                            .and_then(|v| v.as_str())
                            .map(|s| s.to_string());

                        debug!(%tx_hash, height = ?height, code, "transfer confirmed");
                        return Ok(TxOutcome {
                            tx_hash: tx_hash.to_string(),
                            height,
                            success: code == 0,
                            raw_log,
                        });
                    }
                }
                Ok(response) if response.status().as_u16() == 404 => {
                    debug!(%tx_hash, "transaction not yet in block, waiting");
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(%tx_hash, error = %e, "error querying transaction status");
                }
            }

            delay = std::cmp::min(delay * 2, max_delay);
        }

        Err(eyre!("timeout waiting for transaction {tx_hash}"))
    }
}

#[async_trait::async_trait]
impl CosmosSigningClient for LcdSigningClient {
    async fn account_info(&self, address: &str) -> Result<Option<AccountInfo>, BridgeError> {
        Ok(self.fetch_account_info(address).await?)
    }

    async fn broadcast_transfer(&self, plan: &IbcTransferPlan) -> Result<TxOutcome, BridgeError> {
        let account = self
            .fetch_account_info(&plan.sender)
            .await?
            .ok_or_else(|| BridgeError::AccountNotFound {
                address: plan.sender.clone(),
            })?;

        debug!(
            sequence = account.sequence,
            account_number = account.account_number,
            gas_limit = plan.gas_limit,
            "signing transfer"
        );

        let tx_bytes = self.sign_transfer(plan, &account)?;
        Ok(self.broadcast_and_confirm(&tx_bytes).await?)
    }
}
