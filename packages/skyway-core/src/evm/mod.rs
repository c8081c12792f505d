//! EVM-side clients: withdrawer contract bindings, a signing client, and
//! read-only balance queries.

pub mod contracts;
pub mod queries;
pub mod signer;

pub use queries::EvmQueryClient;
pub use signer::{EvmSigner, EvmSignerConfig};
