#![allow(dead_code)]

use async_trait::async_trait;
use paytrap_demo::config::{parse_address, DEFAULT_RECIPIENT};
use paytrap_demo::ledger::{Confirmation, LedgerError, LedgerReference};
use paytrap_demo::{
    Cluster, FlowController, LedgerClient, PaymentIntent, Timeouts, TransactionPipeline,
    WalletAdapter, WalletCapabilities, WalletError,
};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub const TEST_TIMEOUTS: Timeouts = Timeouts {
    connect: Duration::from_secs(1),
    reference: Duration::from_secs(1),
    submit: Duration::from_secs(5),
    confirmation: Duration::from_secs(2),
};

#[derive(Debug, Clone)]
pub enum ConfirmBehavior {
    Confirm,
    Fail(String),
    Expire,
    Hang,
    RpcError,
}

/// Ledger that hands out a brand new blockhash on every fetch
pub struct MockLedger {
    fetches: AtomicUsize,
    fail_reference: AtomicBool,
    references: Mutex<Vec<LedgerReference>>,
    confirmations: Mutex<Vec<(Signature, LedgerReference)>>,
    behavior: Mutex<ConfirmBehavior>,
}

impl MockLedger {
    pub fn new() -> Arc<Self> {
        Self::with_confirmation(ConfirmBehavior::Confirm)
    }

    pub fn with_confirmation(behavior: ConfirmBehavior) -> Arc<Self> {
        Arc::new(Self {
            fetches: AtomicUsize::new(0),
            fail_reference: AtomicBool::new(false),
            references: Mutex::new(Vec::new()),
            confirmations: Mutex::new(Vec::new()),
            behavior: Mutex::new(behavior),
        })
    }

    pub fn set_confirmation(&self, behavior: ConfirmBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn fail_reference_fetch(&self, fail: bool) {
        self.fail_reference.store(fail, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn references(&self) -> Vec<LedgerReference> {
        self.references.lock().unwrap().clone()
    }

    pub fn confirmations(&self) -> Vec<(Signature, LedgerReference)> {
        self.confirmations.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn latest_reference(&self) -> Result<LedgerReference, LedgerError> {
        if self.fail_reference.load(Ordering::SeqCst) {
            return Err(LedgerError::Rpc("connection refused".to_string()));
        }
        let n = self.fetches.fetch_add(1, Ordering::SeqCst) as u64;
        let reference = LedgerReference {
            blockhash: Hash::new_unique(),
            last_valid_block_height: 1_000 + n,
        };
        self.references.lock().unwrap().push(reference);
        Ok(reference)
    }

    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, LedgerError> {
        Ok(tx.signatures[0])
    }

    async fn await_confirmation(
        &self,
        signature: &Signature,
        reference: &LedgerReference,
    ) -> Result<Confirmation, LedgerError> {
        self.confirmations
            .lock()
            .unwrap()
            .push((*signature, *reference));
        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            ConfirmBehavior::Confirm => Ok(Confirmation::Confirmed),
            ConfirmBehavior::Fail(reason) => Ok(Confirmation::Failed(reason)),
            ConfirmBehavior::Expire => Ok(Confirmation::Expired),
            ConfirmBehavior::Hang => std::future::pending().await,
            ConfirmBehavior::RpcError => Err(LedgerError::Rpc("node unhealthy".to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectBehavior {
    Approve,
    Reject,
    Hang,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitBehavior {
    Sign,
    Decline,
    NetworkDown,
    WaitForRelease,
    Hang,
    Panic,
}

/// Scriptable wallet that returns a fixed signature
pub struct MockWallet {
    pubkey: Pubkey,
    signature: Signature,
    can_sign_and_submit: bool,
    connected: AtomicBool,
    connect: Mutex<ConnectBehavior>,
    submit: Mutex<SubmitBehavior>,
    intents: Mutex<Vec<PaymentIntent>>,
    release: Notify,
}

impl MockWallet {
    pub fn new() -> Arc<Self> {
        Self::build(true)
    }

    pub fn view_only() -> Arc<Self> {
        Self::build(false)
    }

    fn build(can_sign_and_submit: bool) -> Arc<Self> {
        Arc::new(Self {
            pubkey: Pubkey::new_unique(),
            signature: Signature::new_unique(),
            can_sign_and_submit,
            connected: AtomicBool::new(false),
            connect: Mutex::new(ConnectBehavior::Approve),
            submit: Mutex::new(SubmitBehavior::Sign),
            intents: Mutex::new(Vec::new()),
            release: Notify::new(),
        })
    }

    pub fn pubkey(&self) -> Pubkey {
        self.pubkey
    }

    pub fn signature(&self) -> Signature {
        self.signature
    }

    pub fn on_connect(&self, behavior: ConnectBehavior) {
        *self.connect.lock().unwrap() = behavior;
    }

    pub fn on_submit(&self, behavior: SubmitBehavior) {
        *self.submit.lock().unwrap() = behavior;
    }

    /// Let a `WaitForRelease` submission finish
    pub fn release(&self) {
        self.release.notify_one();
    }

    pub fn intents(&self) -> Vec<PaymentIntent> {
        self.intents.lock().unwrap().clone()
    }

    pub fn submit_calls(&self) -> usize {
        self.intents.lock().unwrap().len()
    }
}

#[async_trait]
impl WalletAdapter for MockWallet {
    fn capabilities(&self) -> WalletCapabilities {
        WalletCapabilities {
            provider: "mock".to_string(),
            can_sign_and_submit: self.can_sign_and_submit,
        }
    }

    async fn connect(&self) -> Result<Pubkey, WalletError> {
        let behavior = *self.connect.lock().unwrap();
        match behavior {
            ConnectBehavior::Approve => {
                self.connected.store(true, Ordering::SeqCst);
                Ok(self.pubkey)
            }
            ConnectBehavior::Reject => Err(WalletError::ConnectionRejected(
                "User rejected the request".to_string(),
            )),
            ConnectBehavior::Hang => std::future::pending().await,
        }
    }

    fn current_public_key(&self) -> Option<Pubkey> {
        self.connected.load(Ordering::SeqCst).then_some(self.pubkey)
    }

    async fn sign_and_submit(&self, intent: &PaymentIntent) -> Result<Signature, WalletError> {
        self.intents.lock().unwrap().push(intent.clone());
        let behavior = *self.submit.lock().unwrap();
        match behavior {
            SubmitBehavior::Sign => Ok(self.signature),
            SubmitBehavior::Decline => Err(WalletError::SignatureRejected(
                "User rejected the request".to_string(),
            )),
            SubmitBehavior::NetworkDown => {
                Err(WalletError::Network("failed to reach RPC".to_string()))
            }
            SubmitBehavior::WaitForRelease => {
                self.release.notified().await;
                Ok(self.signature)
            }
            SubmitBehavior::Hang => std::future::pending().await,
            SubmitBehavior::Panic => panic!("wallet extension crashed"),
        }
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

pub fn recipient() -> Pubkey {
    parse_address(DEFAULT_RECIPIENT).unwrap()
}

pub fn pipeline(ledger: Arc<MockLedger>) -> TransactionPipeline {
    TransactionPipeline::new(ledger, recipient()).with_timeouts(TEST_TIMEOUTS)
}

pub struct Harness {
    pub controller: Arc<FlowController>,
    pub ledger: Arc<MockLedger>,
    pub wallet: Arc<MockWallet>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(MockLedger::new(), MockWallet::new())
    }

    pub fn with(ledger: Arc<MockLedger>, wallet: Arc<MockWallet>) -> Self {
        let adapter: Arc<dyn WalletAdapter> = wallet.clone();
        let controller = FlowController::new(pipeline(ledger.clone()), Some(adapter), Cluster::Devnet)
            .with_connect_timeout(TEST_TIMEOUTS.connect);
        Self {
            controller: Arc::new(controller),
            ledger,
            wallet,
        }
    }

    /// Intro -> Form with a connected wallet
    pub async fn ready(&self) {
        self.controller.start().unwrap();
        let session = self.controller.connect_wallet().await.unwrap();
        assert!(session.connected);
    }
}
