use crate::FailureKind;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

/// User-visible step of the demo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemoStep {
    Intro,
    Form,
    Processing,
    /// Shown after a *confirmed* payment
    Error,
    RefundFunnel,
    Done,
}

impl DemoStep {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DemoStep::Done)
    }
}

/// Anything that can move the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Start,
    ConnectWallet,
    DisconnectWallet,
    Submit,
    /// Pipeline outcome delivered
    Outcome,
    /// In-flight submission dropped before its outcome arrived
    Interrupted,
    RequestRefund,
    AdvanceRefund,
    Finish,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletSession {
    pub connected: bool,
    pub public_key: Option<Pubkey>,
}

impl WalletSession {
    pub fn connected(public_key: Pubkey) -> Self {
        Self {
            connected: true,
            public_key: Some(public_key),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Stalling messages shown inside the refund funnel, in order
pub const REFUND_STALLS: &[&str] = &[
    "Refund request received. Verifying your payment on-chain.",
    "Verification is taking longer than usual. Your request is in the queue.",
    "Refunds are processed manually. A support agent will contact you.",
    "The refund queue is congested. Please check back later.",
];

/// What the user is shown alongside the current step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    /// Genuine failure; the flow is back on the form
    Failure { kind: FailureKind, detail: String },
    /// Staged failure after a real, confirmed payment
    ScriptedServiceFailure { signature: Signature },
    RefundStall { stage: usize },
    Finished { signature: Signature },
}

impl Feedback {
    pub fn failure(kind: FailureKind, detail: impl Into<String>) -> Self {
        Feedback::Failure {
            kind,
            detail: detail.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Feedback::Failure { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Feedback::Failure { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Feedback::Failure { kind, detail } => match kind {
                FailureKind::NetworkError | FailureKind::LedgerRejected if !detail.is_empty() => {
                    format!("{} ({})", kind.message(), detail)
                }
                _ => kind.message().to_string(),
            },
            Feedback::ScriptedServiceFailure { .. } => {
                "Token deployment failed due to a service error. Your fee will be refunded."
                    .to_string()
            }
            Feedback::RefundStall { stage } => {
                let idx = (*stage).min(REFUND_STALLS.len() - 1);
                REFUND_STALLS[idx].to_string()
            }
            Feedback::Finished { signature } => {
                format!("Your payment {} was never refunded.", signature)
            }
        }
    }
}

/// Consistent view of the controller taken under one lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSnapshot {
    pub step: DemoStep,
    pub session: WalletSession,
    pub signature: Option<Signature>,
    pub feedback: Option<Feedback>,
    pub refund_stage: usize,
    pub attempts: u32,
    pub busy: bool,
}
