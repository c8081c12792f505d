//! Cosmos-side clients: LCD signing, balance queries, and a mnemonic wallet
//! provider for headless use.

pub mod queries;
pub mod signer;
pub mod wallet;

pub use queries::LcdQueryClient;
pub use signer::{LcdSignerConfig, LcdSigningClient, COSMOS_DERIVATION_PATH};
pub use wallet::MnemonicWallet;
