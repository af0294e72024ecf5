//! Transaction pipeline
//!
//! One call to [`TransactionPipeline::execute`] runs one payment attempt:
//! fetch a fresh reference, build the intent, hand it to the wallet, wait for
//! confirmation. Every failure is folded into a [`TransactionOutcome`]; the
//! pipeline itself never returns an error.

mod intent;

pub use intent::PaymentIntent;

use crate::config::{ResolvedConfig, Timeouts, DEMO_FEE_LAMPORTS};
use crate::ledger::{Confirmation, LedgerClient, LedgerReference};
use crate::wallet::WalletAdapter;
use crate::FailureKind;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Result of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// Landed and confirmed on the ledger
    Confirmed { signature: Signature },
    /// Landed but the ledger refused to execute it
    Rejected { reason: String },
    /// Never made it onto the ledger
    SubmissionFailed { kind: FailureKind, reason: String },
    /// No confirmation within the timeout, or the reference expired first
    ConfirmationTimedOut,
}

impl TransactionOutcome {
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            TransactionOutcome::Confirmed { signature } => Some(signature),
            _ => None,
        }
    }
}

pub struct TransactionPipeline {
    ledger: Arc<dyn LedgerClient>,
    recipient: Pubkey,
    amount_lamports: u64,
    timeouts: Timeouts,
    deploy_delay: Duration,
}

impl TransactionPipeline {
    pub fn new(ledger: Arc<dyn LedgerClient>, recipient: Pubkey) -> Self {
        Self {
            ledger,
            recipient,
            amount_lamports: DEMO_FEE_LAMPORTS,
            timeouts: Timeouts::default(),
            deploy_delay: Duration::ZERO,
        }
    }

    pub fn from_config(ledger: Arc<dyn LedgerClient>, config: &ResolvedConfig) -> Self {
        Self {
            ledger,
            recipient: config.recipient,
            amount_lamports: config.amount_lamports,
            timeouts: config.timeouts,
            deploy_delay: config.deploy_delay,
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_deploy_delay(mut self, delay: Duration) -> Self {
        self.deploy_delay = delay;
        self
    }

    pub fn recipient(&self) -> Pubkey {
        self.recipient
    }

    pub fn amount_lamports(&self) -> u64 {
        self.amount_lamports
    }

    /// Run one payment attempt for `fee_payer`.
    ///
    /// The caller must already hold a connected session for `fee_payer`.
    pub async fn execute(&self, wallet: &dyn WalletAdapter, fee_payer: Pubkey) -> TransactionOutcome {
        let reference = match self.fetch_reference().await {
            Ok(reference) => reference,
            Err(reason) => {
                warn!(reason = %reason, "Could not fetch a fresh blockhash");
                return TransactionOutcome::SubmissionFailed {
                    kind: FailureKind::NetworkError,
                    reason,
                };
            }
        };

        let intent = PaymentIntent::new(self.recipient, self.amount_lamports, fee_payer, reference);
        info!(
            fee_payer = %intent.fee_payer,
            recipient = %intent.recipient,
            amount_lamports = intent.amount_lamports,
            blockhash = %intent.blockhash(),
            last_valid_block_height = intent.last_valid_block_height(),
            "Submitting payment intent"
        );

        let signature = match timeout(self.timeouts.submit, wallet.sign_and_submit(&intent)).await {
            Ok(Ok(signature)) => signature,
            Ok(Err(e)) => {
                warn!(error = %e, "Wallet did not submit the transaction");
                return TransactionOutcome::SubmissionFailed {
                    kind: e.kind(),
                    reason: e.to_string(),
                };
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.timeouts.submit.as_millis() as u64,
                    "Wallet sign-and-submit timed out"
                );
                return TransactionOutcome::SubmissionFailed {
                    kind: FailureKind::NetworkError,
                    reason: "wallet did not respond in time".to_string(),
                };
            }
        };

        debug!(signature = %signature, "Awaiting confirmation");
        let confirmation = timeout(
            self.timeouts.confirmation,
            self.ledger.await_confirmation(&signature, &intent.reference),
        )
        .await;

        match confirmation {
            Ok(Ok(Confirmation::Confirmed)) => {}
            Ok(Ok(Confirmation::Failed(reason))) => {
                warn!(signature = %signature, reason = %reason, "Transaction failed on-chain");
                return TransactionOutcome::Rejected { reason };
            }
            Ok(Ok(Confirmation::Expired)) => {
                warn!(signature = %signature, "Blockhash expired before confirmation");
                return TransactionOutcome::ConfirmationTimedOut;
            }
            Ok(Err(e)) => {
                warn!(signature = %signature, error = %e, "Confirmation status unknown");
                return TransactionOutcome::ConfirmationTimedOut;
            }
            Err(_) => {
                warn!(
                    signature = %signature,
                    timeout_ms = self.timeouts.confirmation.as_millis() as u64,
                    "Confirmation timed out"
                );
                return TransactionOutcome::ConfirmationTimedOut;
            }
        }

        info!(signature = %signature, "Payment confirmed");
        if !self.deploy_delay.is_zero() {
            // "Deploying your token..."
            tokio::time::sleep(self.deploy_delay).await;
        }

        TransactionOutcome::Confirmed { signature }
    }

    async fn fetch_reference(&self) -> Result<LedgerReference, String> {
        match timeout(self.timeouts.reference, self.ledger.latest_reference()).await {
            Ok(Ok(reference)) => Ok(reference),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err("timed out fetching latest blockhash".to_string()),
        }
    }
}
