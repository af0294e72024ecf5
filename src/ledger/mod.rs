//! Ledger access
//!
//! [`LedgerClient`] is the seam between the pipeline and the network. The
//! production implementation is [`RpcLedgerClient`]; tests supply their own.

mod rpc;

pub use rpc::RpcLedgerClient;

use async_trait::async_trait;
use solana_sdk::hash::Hash;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use thiserror::Error;

/// A recent blockhash together with the last block height at which a
/// transaction referencing it can still land
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerReference {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Terminal result of waiting on a signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// Landed and reached the client's commitment level
    Confirmed,
    /// Landed but failed to execute
    Failed(String),
    /// Block height passed the reference's validity height without the
    /// signature landing
    Expired,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("RPC request failed: {0}")]
    Rpc(String),

    #[error("Transaction submission failed: {0}")]
    Send(String),

    /// The node simulated the transaction and refused it
    #[error("Transaction rejected in preflight: {0}")]
    Preflight(String),
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Fetch a fresh blockhash and its validity height
    async fn latest_reference(&self) -> Result<LedgerReference, LedgerError>;

    /// Submit an already signed transaction
    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, LedgerError>;

    /// Wait until `signature` is confirmed, fails, or `reference` expires.
    ///
    /// Unbounded on its own; callers apply their own timeout.
    async fn await_confirmation(
        &self,
        signature: &Signature,
        reference: &LedgerReference,
    ) -> Result<Confirmation, LedgerError>;
}
