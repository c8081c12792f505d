//! Cross-chain transfer dispatchers
//!
//! Two directions: an IBC transfer from a Cosmos chain to the bridge account
//! (deposit), and a withdrawer-contract call on the EVM chain (withdrawal).
//! Message/call construction is separated from broadcast so the exact wire
//! shape is testable without a chain; the signing clients behind the traits
//! do the actual submission.
//!
//! Dispatch is fire-once: calling a dispatcher twice submits two independent
//! transactions. Deduplication and nonce tracking belong to the signing
//! client, not this layer. [`DispatchGuard`] is what callers use to keep a
//! double-click from starting a second submission while one is in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::BridgeError;
use crate::types::{CosmosCurrency, Currency, EvmCurrency, Withdrawal};

/// Default gas budget for the IBC transfer transaction.
pub const DEFAULT_IBC_GAS_LIMIT: u64 = 350_000;

/// Default transfer timeout, measured from submission.
pub const DEFAULT_IBC_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// IBC port used for fungible token transfers.
pub const TRANSFER_PORT: &str = "transfer";

/// Tunables for the IBC transfer dispatcher.
///
/// The defaults reproduce the long-standing fixed values; they are fields
/// rather than constants so deployments can override them.
#[derive(Debug, Clone)]
pub struct IbcTransferConfig {
    pub gas_limit: u64,
    /// Fee paid in the transferred currency's base denom.
    pub fee_amount: u128,
    pub timeout: Duration,
}

impl Default for IbcTransferConfig {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_IBC_GAS_LIMIT,
            fee_amount: 0,
            timeout: DEFAULT_IBC_TIMEOUT,
        }
    }
}

/// Memo embedded in the transfer instructing the bridge where to route the
/// deposit on the destination chain.
#[derive(Debug, Serialize)]
struct DepositMemo<'a> {
    #[serde(rename = "rollupDepositAddress")]
    rollup_deposit_address: &'a str,
}

/// Fully-constructed IBC transfer, ready for signing and broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct IbcTransferPlan {
    pub source_port: String,
    pub source_channel: String,
    pub token_amount: String,
    pub token_denom: String,
    pub sender: String,
    /// The bridge account associated with the source currency.
    pub receiver: String,
    /// JSON routing instruction for the destination-side recipient.
    pub memo: String,
    /// Absolute timeout, unix nanoseconds.
    pub timeout_timestamp_ns: u64,
    pub fee_denom: String,
    pub fee_amount: u128,
    pub gas_limit: u64,
}

/// Construct the single transfer message for a deposit.
///
/// `amount` is in base units of `currency`. Fails when the currency carries
/// no IBC linkage (it is not depositable) or the amount is malformed.
pub fn build_ibc_transfer(
    sender: &str,
    recipient: &str,
    amount: &str,
    currency: &CosmosCurrency,
    config: &IbcTransferConfig,
    now: SystemTime,
) -> Result<IbcTransferPlan, BridgeError> {
    let linkage = currency.ibc.as_ref().ok_or_else(|| {
        BridgeError::InvalidSelection(format!(
            "currency {} has no IBC linkage and cannot be deposited",
            currency.display_denom()
        ))
    })?;

    amount
        .parse::<u128>()
        .map_err(|_| BridgeError::Amount(format!("not a base-unit integer: {amount:?}")))?;

    let memo = serde_json::to_string(&DepositMemo {
        rollup_deposit_address: recipient,
    })
    .map_err(|e| BridgeError::Transfer(format!("failed to encode memo: {e}")))?;

    let timeout_timestamp_ns = now
        .checked_add(config.timeout)
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos() as u64)
        .ok_or_else(|| BridgeError::Transfer("transfer timeout overflows".to_string()))?;

    Ok(IbcTransferPlan {
        source_port: TRANSFER_PORT.to_string(),
        source_channel: linkage.channel.clone(),
        token_amount: amount.to_string(),
        token_denom: currency.minimal_denom.clone(),
        sender: sender.to_string(),
        receiver: linkage.bridge_account.clone(),
        memo,
        timeout_timestamp_ns,
        fee_denom: currency.minimal_denom.clone(),
        fee_amount: config.fee_amount,
        gas_limit: config.gas_limit,
    })
}

/// On-chain account record (sequence = nonce).
#[derive(Debug, Clone, PartialEq)]
pub struct AccountInfo {
    pub account_number: u64,
    pub sequence: u64,
}

/// Result of a signed-and-broadcast transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TxOutcome {
    pub tx_hash: String,
    pub height: Option<u64>,
    pub success: bool,
    pub raw_log: Option<String>,
}

/// Cosmos signing-and-broadcast client, e.g. LCD-backed or a wallet's
/// offline signer. Treated as a black box with exactly this call shape.
#[async_trait]
pub trait CosmosSigningClient: Send + Sync {
    /// Look up the on-chain account, `None` when the chain has no record of
    /// the address.
    async fn account_info(&self, address: &str) -> Result<Option<AccountInfo>, BridgeError>;

    /// Sign and broadcast the transfer atomically.
    async fn broadcast_transfer(&self, plan: &IbcTransferPlan) -> Result<TxOutcome, BridgeError>;
}

/// Submit an IBC deposit: one transfer message to the currency's bridge
/// account, with the recipient routed via the memo.
///
/// Fails with [`BridgeError::AccountNotFound`] when the sender has no account
/// record on the source chain (commonly a zero-balance address). Never
/// retries; the caller translates failures into notifications.
pub async fn send_ibc_transfer(
    client: &dyn CosmosSigningClient,
    sender: &str,
    recipient: &str,
    amount: &str,
    currency: &CosmosCurrency,
    config: &IbcTransferConfig,
) -> Result<TxOutcome, BridgeError> {
    client
        .account_info(sender)
        .await?
        .ok_or_else(|| BridgeError::AccountNotFound {
            address: sender.to_string(),
        })?;

    let plan = build_ibc_transfer(
        sender,
        recipient,
        amount,
        currency,
        config,
        SystemTime::now(),
    )?;

    info!(
        channel = %plan.source_channel,
        denom = %plan.token_denom,
        amount = %plan.token_amount,
        receiver = %plan.receiver,
        "submitting IBC deposit"
    );

    let outcome = client.broadcast_transfer(&plan).await?;
    if !outcome.success {
        warn!(tx_hash = %outcome.tx_hash, log = ?outcome.raw_log, "IBC deposit not confirmed successful");
    }
    Ok(outcome)
}

// ============================================================================
// EVM withdrawals
// ============================================================================

/// Which withdrawer entry point a call targets.
#[derive(Debug, Clone, PartialEq)]
pub enum WithdrawerEntry {
    /// `withdrawToIbcChain(destination, memo)`; the amount rides in the call
    /// value together with the fee.
    Native,
    /// `withdraw(amount, destination, memo)`; the amount is an argument and
    /// only the fee rides in the call value.
    Erc20 { amount: u128 },
}

/// Fully-constructed withdrawer contract call.
#[derive(Debug, Clone, PartialEq)]
pub struct WithdrawerCallPlan {
    /// Contract to call (withdrawer contract, or the ERC-20 itself).
    pub contract: String,
    /// Call value in wei.
    pub value: u128,
    pub entry: WithdrawerEntry,
    /// Destination address on the IBC chain.
    pub destination_address: String,
    pub memo: String,
}

/// Construct the withdrawer call for an EVM currency.
///
/// Native currencies send `amount + fee` as the call value; ERC-20
/// currencies pass the amount as an argument and send exactly `fee`.
pub fn build_withdrawer_call(
    currency: &EvmCurrency,
    amount: u128,
    destination_address: &str,
    memo: &str,
) -> Result<WithdrawerCallPlan, BridgeError> {
    let (contract, value, entry) = match &currency.withdrawal {
        Withdrawal::Native { withdrawer, fee } => {
            let value = amount.checked_add(*fee).ok_or_else(|| {
                BridgeError::Amount("amount plus fee overflows".to_string())
            })?;
            (withdrawer.clone(), value, WithdrawerEntry::Native)
        }
        Withdrawal::Erc20 { contract, fee } => {
            (contract.clone(), *fee, WithdrawerEntry::Erc20 { amount })
        }
        Withdrawal::None => {
            return Err(BridgeError::InvalidSelection(format!(
                "currency {} is not withdrawable",
                currency.display_denom()
            )))
        }
    };

    Ok(WithdrawerCallPlan {
        contract,
        value,
        entry,
        destination_address: destination_address.to_string(),
        memo: memo.to_string(),
    })
}

/// EVM client able to submit withdrawer contract calls.
#[async_trait]
pub trait EvmWithdrawerClient: Send + Sync {
    /// Submit the call; errors from the chain propagate unchanged.
    async fn submit_withdrawal(&self, plan: &WithdrawerCallPlan) -> Result<TxOutcome, BridgeError>;
}

/// Withdraw an EVM currency to an IBC chain address.
pub async fn withdraw_to_ibc_chain(
    client: &dyn EvmWithdrawerClient,
    currency: &EvmCurrency,
    amount: u128,
    destination_address: &str,
    memo: &str,
) -> Result<TxOutcome, BridgeError> {
    let plan = build_withdrawer_call(currency, amount, destination_address, memo)?;

    info!(
        contract = %plan.contract,
        value = plan.value,
        destination = %plan.destination_address,
        "submitting withdrawal"
    );

    client.submit_withdrawal(&plan).await
}

// ============================================================================
// Re-entrancy guard
// ============================================================================

/// Guard against concurrent dispatches from the same control.
///
/// `try_begin` hands out at most one [`DispatchPermit`] at a time; the
/// triggering control stays disabled until the permit drops.
#[derive(Debug, Default)]
pub struct DispatchGuard {
    in_flight: AtomicBool,
}

impl DispatchGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the permit, or `None` when a dispatch is already in flight.
    pub fn try_begin(&self) -> Option<DispatchPermit<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| DispatchPermit { guard: self })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// RAII permit; releases the guard on drop.
pub struct DispatchPermit<'a> {
    guard: &'a DispatchGuard,
}

impl Drop for DispatchPermit<'_> {
    fn drop(&mut self) {
        self.guard.in_flight.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IbcLinkage;
    use std::sync::Mutex;

    fn tia() -> CosmosCurrency {
        CosmosCurrency {
            denom: "TIA".to_string(),
            minimal_denom: "utia".to_string(),
            decimals: 6,
            ibc: Some(IbcLinkage {
                channel: "channel-1".to_string(),
                bridge_account: "skyway1d7zjjljc0dsmvkwqvglmsvtzv9rd6wwqkxsn2v".to_string(),
            }),
        }
    }

    #[test]
    fn test_build_ibc_transfer_message_shape() {
        let plan = build_ibc_transfer(
            "celestia1sender",
            "0xRecipientOnRollup",
            "5000000",
            &tia(),
            &IbcTransferConfig::default(),
            UNIX_EPOCH + Duration::from_secs(1_700_000_000),
        )
        .unwrap();

        assert_eq!(plan.token_amount, "5000000");
        assert_eq!(plan.token_denom, "utia");
        assert_eq!(plan.source_port, "transfer");
        assert_eq!(plan.source_channel, "channel-1");
        assert_eq!(
            plan.receiver,
            "skyway1d7zjjljc0dsmvkwqvglmsvtzv9rd6wwqkxsn2v"
        );

        let memo: serde_json::Value = serde_json::from_str(&plan.memo).unwrap();
        assert_eq!(
            memo,
            serde_json::json!({"rollupDepositAddress": "0xRecipientOnRollup"})
        );

        // Zero fee in the transferred denom, fixed default gas, 10m timeout
        assert_eq!(plan.fee_denom, "utia");
        assert_eq!(plan.fee_amount, 0);
        assert_eq!(plan.gas_limit, 350_000);
        assert_eq!(
            plan.timeout_timestamp_ns,
            (1_700_000_000u64 + 600) * 1_000_000_000
        );
    }

    #[test]
    fn test_build_ibc_transfer_rejects_unlinked_currency() {
        let unlinked = CosmosCurrency { ibc: None, ..tia() };
        let err = build_ibc_transfer(
            "celestia1sender",
            "0xRecipient",
            "1",
            &unlinked,
            &IbcTransferConfig::default(),
            SystemTime::now(),
        )
        .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidSelection(_)));
    }

    #[test]
    fn test_build_ibc_transfer_rejects_bad_amount() {
        let err = build_ibc_transfer(
            "celestia1sender",
            "0xRecipient",
            "5.0",
            &tia(),
            &IbcTransferConfig::default(),
            SystemTime::now(),
        )
        .unwrap_err();
        assert!(matches!(err, BridgeError::Amount(_)));
    }

    struct RecordingClient {
        account: Option<AccountInfo>,
        broadcasts: Mutex<Vec<IbcTransferPlan>>,
    }

    #[async_trait]
    impl CosmosSigningClient for RecordingClient {
        async fn account_info(&self, _address: &str) -> Result<Option<AccountInfo>, BridgeError> {
            Ok(self.account.clone())
        }

        async fn broadcast_transfer(
            &self,
            plan: &IbcTransferPlan,
        ) -> Result<TxOutcome, BridgeError> {
            self.broadcasts.lock().unwrap().push(plan.clone());
            Ok(TxOutcome {
                tx_hash: "ABC123".to_string(),
                height: Some(42),
                success: true,
                raw_log: None,
            })
        }
    }

    #[tokio::test]
    async fn test_send_ibc_transfer_broadcasts_exactly_one_message() {
        let client = RecordingClient {
            account: Some(AccountInfo {
                account_number: 7,
                sequence: 3,
            }),
            broadcasts: Mutex::new(Vec::new()),
        };

        let outcome = send_ibc_transfer(
            &client,
            "celestia1sender",
            "0xRecipient",
            "5000000",
            &tia(),
            &IbcTransferConfig::default(),
        )
        .await
        .unwrap();

        assert!(outcome.success);
        let broadcasts = client.broadcasts.lock().unwrap();
        assert_eq!(broadcasts.len(), 1);
        assert_eq!(broadcasts[0].token_amount, "5000000");
        assert_eq!(broadcasts[0].token_denom, "utia");
    }

    #[tokio::test]
    async fn test_send_ibc_transfer_missing_account() {
        let client = RecordingClient {
            account: None,
            broadcasts: Mutex::new(Vec::new()),
        };

        let err = send_ibc_transfer(
            &client,
            "celestia1empty",
            "0xRecipient",
            "1",
            &tia(),
            &IbcTransferConfig::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, BridgeError::AccountNotFound { .. }));
        assert!(client.broadcasts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_native_withdrawal_value_is_amount_plus_fee() {
        let currency = EvmCurrency {
            denom: "TIA".to_string(),
            minimal_denom: "utia".to_string(),
            decimals: 18,
            withdrawal: Withdrawal::Native {
                withdrawer: "0xWithdrawer".to_string(),
                fee: 10_000_000_000_000_000,
            },
        };

        let plan =
            build_withdrawer_call(&currency, 1_000_000_000_000_000_000, "celestia1dest", "")
                .unwrap();
        assert_eq!(plan.contract, "0xWithdrawer");
        assert_eq!(plan.value, 1_010_000_000_000_000_000);
        assert_eq!(plan.entry, WithdrawerEntry::Native);
    }

    #[test]
    fn test_erc20_withdrawal_value_is_exactly_the_fee() {
        let currency = EvmCurrency {
            denom: "dTIA".to_string(),
            minimal_denom: "dtia".to_string(),
            decimals: 18,
            withdrawal: Withdrawal::Erc20 {
                contract: "0xToken".to_string(),
                fee: 10_000_000_000_000_000,
            },
        };

        let plan =
            build_withdrawer_call(&currency, 1_000_000_000_000_000_000, "celestia1dest", "memo")
                .unwrap();
        assert_eq!(plan.contract, "0xToken");
        assert_eq!(plan.value, 10_000_000_000_000_000);
        assert_eq!(
            plan.entry,
            WithdrawerEntry::Erc20 {
                amount: 1_000_000_000_000_000_000
            }
        );
    }

    #[test]
    fn test_non_withdrawable_currency_rejected() {
        let currency = EvmCurrency {
            denom: "WETH".to_string(),
            minimal_denom: "wei".to_string(),
            decimals: 18,
            withdrawal: Withdrawal::None,
        };
        assert!(build_withdrawer_call(&currency, 1, "celestia1dest", "").is_err());
    }

    #[test]
    fn test_dispatch_guard_blocks_reentry() {
        let guard = DispatchGuard::new();

        let permit = guard.try_begin().expect("first dispatch acquires permit");
        assert!(guard.is_in_flight());
        assert!(guard.try_begin().is_none());

        drop(permit);
        assert!(!guard.is_in_flight());
        assert!(guard.try_begin().is_some());
    }
}
