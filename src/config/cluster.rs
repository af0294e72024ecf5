//! Ledger cluster binding
//!
//! The demo only ever talks to a test cluster. There is deliberately no
//! mainnet variant: a real-value network cannot be expressed in config.
//!
//! # Examples
//!
//! ```bash
//! # Default: devnet
//! export PAYTRAP_CLUSTER=devnet
//!
//! # Local validator (solana-test-validator)
//! export PAYTRAP_CLUSTER=localnet
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Public RPC endpoints for the supported test clusters
mod endpoints {
    pub const DEVNET: &str = "https://api.devnet.solana.com";
    pub const TESTNET: &str = "https://api.testnet.solana.com";
    pub const LOCALNET: &str = "http://127.0.0.1:8899";
}

/// Supported test clusters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Cluster {
    #[default]
    Devnet,
    Testnet,
    Localnet,
}

impl Cluster {
    /// JSON-RPC endpoint the ledger client binds to
    pub fn rpc_url(&self) -> &'static str {
        match self {
            Cluster::Devnet => endpoints::DEVNET,
            Cluster::Testnet => endpoints::TESTNET,
            Cluster::Localnet => endpoints::LOCALNET,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Cluster::Devnet => "devnet",
            Cluster::Testnet => "testnet",
            Cluster::Localnet => "localnet",
        }
    }

    /// Value of the `cluster` query parameter understood by the explorer
    pub fn explorer_tag(&self) -> &'static str {
        match self {
            Cluster::Devnet => "devnet",
            Cluster::Testnet => "testnet",
            Cluster::Localnet => "custom",
        }
    }

    /// Inverse of [`Cluster::explorer_tag`]
    pub fn from_explorer_tag(tag: &str) -> Option<Self> {
        match tag {
            "devnet" => Some(Cluster::Devnet),
            "testnet" => Some(Cluster::Testnet),
            "custom" => Some(Cluster::Localnet),
            _ => None,
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Cluster {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "devnet" => Ok(Cluster::Devnet),
            "testnet" => Ok(Cluster::Testnet),
            "localnet" | "localhost" => Ok(Cluster::Localnet),
            "mainnet" | "mainnet-beta" => Err(format!(
                "cluster '{}' carries real value and is not supported",
                s
            )),
            other => Err(format!("unknown cluster '{}'", other)),
        }
    }
}
