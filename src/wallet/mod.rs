//! Wallet capability surface
//!
//! The controller never inspects which wallet it was handed. It asks for a
//! [`WalletCapabilities`] descriptor through [`probe`] and otherwise talks to
//! the [`WalletAdapter`] trait only.

mod keypair;

pub use keypair::KeypairWallet;

use crate::pipeline::PaymentIntent;
use crate::FailureKind;
use async_trait::async_trait;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("Wallet not available")]
    Unavailable,

    #[error("Wallet not connected")]
    NotConnected,

    #[error("Connection rejected: {0}")]
    ConnectionRejected(String),

    #[error("Signature rejected: {0}")]
    SignatureRejected(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rejected by the network: {0}")]
    LedgerRejected(String),
}

impl WalletError {
    pub fn kind(&self) -> FailureKind {
        match self {
            WalletError::Unavailable => FailureKind::WalletUnavailable,
            WalletError::NotConnected => FailureKind::NotConnected,
            WalletError::ConnectionRejected(_) => FailureKind::ConnectionRejected,
            WalletError::SignatureRejected(_) => FailureKind::SignatureRejected,
            WalletError::Network(_) => FailureKind::NetworkError,
            WalletError::LedgerRejected(_) => FailureKind::LedgerRejected,
        }
    }
}

/// What a wallet provider says it can do
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletCapabilities {
    /// Provider name, e.g. `local-keypair`
    pub provider: String,
    /// Can sign a transaction and submit it in one step
    pub can_sign_and_submit: bool,
}

/// Result of the wallet capability probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletAvailability {
    Unavailable,
    /// Present, but lacks sign-and-submit
    Unsupported(WalletCapabilities),
    Available(WalletCapabilities),
}

impl WalletAvailability {
    pub fn is_available(&self) -> bool {
        matches!(self, WalletAvailability::Available(_))
    }
}

/// Probe an optional wallet handle. Absence is reported, never raised.
pub fn probe(wallet: Option<&dyn WalletAdapter>) -> WalletAvailability {
    match wallet {
        None => WalletAvailability::Unavailable,
        Some(wallet) => {
            let capabilities = wallet.capabilities();
            if capabilities.can_sign_and_submit {
                WalletAvailability::Available(capabilities)
            } else {
                WalletAvailability::Unsupported(capabilities)
            }
        }
    }
}

#[async_trait]
pub trait WalletAdapter: Send + Sync {
    fn capabilities(&self) -> WalletCapabilities;

    /// Ask the user to connect; returns the connected public key
    async fn connect(&self) -> Result<Pubkey, WalletError>;

    /// Public key of the current connection, if any
    fn current_public_key(&self) -> Option<Pubkey>;

    /// Sign the intent's transfer and submit it to the ledger
    async fn sign_and_submit(&self, intent: &PaymentIntent) -> Result<Signature, WalletError>;

    fn disconnect(&self) {}
}
