//! Error types for the paytrap demo

use crate::flow::{DemoStep, Trigger};
use crate::ledger::LedgerError;
use crate::wallet::WalletError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Trigger {trigger:?} is not valid in step {step:?}")]
    InvalidTransition { step: DemoStep, trigger: Trigger },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Genuine failure taxonomy surfaced to the user.
///
/// The staged failure shown after a confirmed payment is not part of this
/// list; see [`crate::flow::Feedback::ScriptedServiceFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    WalletUnavailable,
    ConnectionRejected,
    NotConnected,
    SignatureRejected,
    NetworkError,
    LedgerRejected,
    ConfirmationTimedOut,
    Busy,
    Interrupted,
}

impl FailureKind {
    /// User-facing message for this failure
    pub fn message(&self) -> &'static str {
        match self {
            FailureKind::WalletUnavailable => {
                "Wallet not available. Install or configure a wallet to continue."
            }
            FailureKind::ConnectionRejected => "Wallet connection was rejected.",
            FailureKind::NotConnected => {
                "Wallet not connected. Connect a wallet before creating your token."
            }
            FailureKind::SignatureRejected => "Transaction was declined in the wallet.",
            FailureKind::NetworkError => "Network error while submitting the transaction.",
            FailureKind::LedgerRejected => "The network rejected the transaction.",
            FailureKind::ConfirmationTimedOut => {
                "Timed out waiting for the transaction to confirm."
            }
            FailureKind::Busy => "A request is already in progress.",
            FailureKind::Interrupted => "The request was interrupted before it completed.",
        }
    }
}
