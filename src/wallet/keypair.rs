//! Local keypair wallet provider
//!
//! Signs with a keypair loaded from disk and submits through the shared
//! ledger client. The keypair is never serialized or logged.

use super::{WalletAdapter, WalletCapabilities, WalletError};
use crate::ledger::{LedgerClient, LedgerError};
use crate::pipeline::PaymentIntent;
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{read_keypair_file, Keypair, Signature, Signer};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const PROVIDER_NAME: &str = "local-keypair";

pub struct KeypairWallet {
    keypair: Keypair,
    ledger: Arc<dyn LedgerClient>,
    connected: AtomicBool,
}

impl KeypairWallet {
    pub fn new(keypair: Keypair, ledger: Arc<dyn LedgerClient>) -> Self {
        Self {
            keypair,
            ledger,
            connected: AtomicBool::new(false),
        }
    }

    /// Load a keypair file in the `solana-keygen` JSON format
    pub fn from_file(path: &Path, ledger: Arc<dyn LedgerClient>) -> Result<Self, WalletError> {
        let keypair = read_keypair_file(path).map_err(|e| {
            WalletError::ConnectionRejected(format!(
                "Failed to read keypair {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::new(keypair, ledger))
    }

    /// Load from the path named by an environment variable.
    ///
    /// Returns `Ok(None)` when the variable is unset.
    pub fn from_env(
        var_name: &str,
        ledger: Arc<dyn LedgerClient>,
    ) -> Result<Option<Self>, WalletError> {
        match std::env::var(var_name) {
            Ok(path) if !path.trim().is_empty() => {
                Self::from_file(Path::new(path.trim()), ledger).map(Some)
            }
            _ => Ok(None),
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }
}

#[async_trait]
impl WalletAdapter for KeypairWallet {
    fn capabilities(&self) -> WalletCapabilities {
        WalletCapabilities {
            provider: PROVIDER_NAME.to_string(),
            can_sign_and_submit: true,
        }
    }

    async fn connect(&self) -> Result<Pubkey, WalletError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(self.pubkey())
    }

    fn current_public_key(&self) -> Option<Pubkey> {
        self.connected
            .load(Ordering::SeqCst)
            .then(|| self.pubkey())
    }

    async fn sign_and_submit(&self, intent: &PaymentIntent) -> Result<Signature, WalletError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(WalletError::NotConnected);
        }
        if intent.fee_payer != self.pubkey() {
            return Err(WalletError::SignatureRejected(format!(
                "fee payer {} is not this wallet",
                intent.fee_payer
            )));
        }

        let mut tx = intent.to_transaction();
        tx.try_sign(&[&self.keypair], intent.blockhash())
            .map_err(|e| WalletError::SignatureRejected(e.to_string()))?;

        self.ledger.send_transaction(&tx).await.map_err(|e| match e {
            LedgerError::Preflight(reason) => WalletError::LedgerRejected(reason),
            e => WalletError::Network(e.to_string()),
        })
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

// Implement Debug manually to avoid exposing the keypair
impl std::fmt::Debug for KeypairWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeypairWallet")
            .field("pubkey", &self.pubkey())
            .field("keypair", &"[REDACTED]")
            .field("connected", &self.connected.load(Ordering::SeqCst))
            .finish()
    }
}
