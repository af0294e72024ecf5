//! Configuration for the paytrap demo
//!
//! Loaded in three layers: built-in defaults, an optional JSON file, then
//! environment overrides. [`Config::resolve`] validates the result once at
//! startup; nothing downstream re-parses addresses.

pub mod cluster;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub use cluster::Cluster;

/// Recipient address override environment variable name
pub const RECIPIENT_ENV: &str = "PAYTRAP_RECIPIENT";

/// Cluster override environment variable name
pub const CLUSTER_ENV: &str = "PAYTRAP_CLUSTER";

/// Path to the keypair file backing the local wallet provider
pub const KEYPAIR_ENV: &str = "PAYTRAP_KEYPAIR";

/// Built-in demo recipient, used when no override is configured
pub const DEFAULT_RECIPIENT: &str = "Hw92YDvS64pccBscJC4uu7Wd2CcnVCLwckAGS6ngU6mh";

/// Fixed "token creation fee" charged by the demo (0.01 SOL)
pub const DEMO_FEE_LAMPORTS: u64 = 10_000_000;

/// Per-suspend-point timeouts (milliseconds)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Wallet connect
    pub connect_ms: u64,
    /// Latest blockhash fetch
    pub reference_ms: u64,
    /// Wallet sign-and-submit
    pub submit_ms: u64,
    /// Confirmation wait
    pub confirmation_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 30_000,
            reference_ms: 10_000,
            submit_ms: 60_000,
            confirmation_ms: 60_000,
        }
    }
}

/// Main configuration
///
/// Every field is optional in a config file; missing ones take the
/// [`Default`] value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Test cluster the ledger client binds to
    pub cluster: Cluster,
    /// Recipient address override (base58)
    pub recipient: Option<String>,
    /// Suspend-point timeouts
    pub timeouts: TimeoutConfig,
    /// Interval between signature status polls (milliseconds)
    pub confirmation_poll_ms: u64,
    /// Cosmetic "deploying your token" delay after confirmation (milliseconds)
    pub deploy_delay_ms: u64,
    /// Path to the transition journal (JSONL)
    pub journal_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cluster: Cluster::Devnet,
            recipient: None,
            timeouts: TimeoutConfig::default(),
            confirmation_poll_ms: 500,
            deploy_delay_ms: 2_500,
            journal_path: Some("paytrap-journal.jsonl".to_string()),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Apply `PAYTRAP_RECIPIENT` / `PAYTRAP_CLUSTER` from the environment
    pub fn apply_env(self) -> Result<Self> {
        self.with_overrides(
            std::env::var(RECIPIENT_ENV).ok(),
            std::env::var(CLUSTER_ENV).ok(),
        )
    }

    /// Apply explicit overrides; empty strings are ignored
    pub fn with_overrides(
        mut self,
        recipient: Option<String>,
        cluster: Option<String>,
    ) -> Result<Self> {
        if let Some(recipient) = recipient.filter(|r| !r.trim().is_empty()) {
            tracing::debug!(recipient = %recipient, "Recipient overridden from environment");
            self.recipient = Some(recipient.trim().to_string());
        }
        if let Some(cluster) = cluster.filter(|c| !c.trim().is_empty()) {
            self.cluster = cluster.parse().map_err(Error::Config)?;
        }
        Ok(self)
    }

    /// Validate and convert into the runtime form
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let raw = self.recipient.as_deref().unwrap_or(DEFAULT_RECIPIENT);
        let recipient = parse_address(raw)?;

        if self.confirmation_poll_ms == 0 {
            return Err(Error::Config(
                "confirmation_poll_ms must be greater than zero".to_string(),
            ));
        }

        Ok(ResolvedConfig {
            cluster: self.cluster,
            recipient,
            amount_lamports: DEMO_FEE_LAMPORTS,
            timeouts: Timeouts {
                connect: Duration::from_millis(self.timeouts.connect_ms),
                reference: Duration::from_millis(self.timeouts.reference_ms),
                submit: Duration::from_millis(self.timeouts.submit_ms),
                confirmation: Duration::from_millis(self.timeouts.confirmation_ms),
            },
            poll_interval: Duration::from_millis(self.confirmation_poll_ms),
            deploy_delay: Duration::from_millis(self.deploy_delay_ms),
            journal_path: self.journal_path.as_ref().map(PathBuf::from),
        })
    }
}

/// Parse a base58 address, rejecting anything that is not exactly 32 bytes
pub fn parse_address(raw: &str) -> Result<Pubkey> {
    Pubkey::from_str(raw.trim())
        .map_err(|e| Error::Config(format!("Invalid recipient address '{}': {}", raw, e)))
}

/// Suspend-point timeouts as durations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub reference: Duration,
    pub submit: Duration,
    pub confirmation: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        let raw = TimeoutConfig::default();
        Self {
            connect: Duration::from_millis(raw.connect_ms),
            reference: Duration::from_millis(raw.reference_ms),
            submit: Duration::from_millis(raw.submit_ms),
            confirmation: Duration::from_millis(raw.confirmation_ms),
        }
    }
}

/// Validated configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub cluster: Cluster,
    pub recipient: Pubkey,
    pub amount_lamports: u64,
    pub timeouts: Timeouts,
    pub poll_interval: Duration,
    pub deploy_delay: Duration,
    pub journal_path: Option<PathBuf>,
}
