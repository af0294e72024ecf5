//! Pay-first scam training demo
//!
//! Walks a user through a "create your token" flow on a Solana test cluster:
//! - Connect a wallet and pay a small creation fee
//! - Wait for the transfer to confirm on-chain
//! - Report a service failure anyway and stall inside a refund funnel
//!
//! # Safety Model
//!
//! - The ledger client can only be bound to a test cluster
//! - Wallets are injected explicitly; absence is reported, not raised
//! - Every transition is journaled, with the staged failure tagged apart
//!   from genuine ones

pub mod config;
pub mod explorer;
pub mod flow;
pub mod journal;
pub mod ledger;
pub mod pipeline;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use config::{Cluster, Config, ResolvedConfig, Timeouts, DEMO_FEE_LAMPORTS};
pub use error::{Error, FailureKind, Result};
pub use flow::{DemoStep, Feedback, FlowController, FlowSnapshot, Trigger, WalletSession};
pub use ledger::{LedgerClient, RpcLedgerClient};
pub use pipeline::{PaymentIntent, TransactionOutcome, TransactionPipeline};
pub use wallet::{WalletAdapter, WalletAvailability, WalletCapabilities, WalletError};
