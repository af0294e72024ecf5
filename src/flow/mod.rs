//! Flow controller
//!
//! Owns the current [`DemoStep`] and is the only thing that changes it.
//!
//! | From         | Trigger        | To           |
//! |--------------|----------------|--------------|
//! | Intro        | start          | Form         |
//! | Form         | submit         | Processing   |
//! | Processing   | Confirmed      | Error        |
//! | Processing   | any failure    | Form         |
//! | Error        | request refund | RefundFunnel |
//! | RefundFunnel | finish         | Done         |
//! | Done         | anything       | Done         |
//!
//! `Processing -> Error` happens on a *confirmed* payment: the service takes
//! the fee and then claims to have failed. It is surfaced as
//! [`Feedback::ScriptedServiceFailure`] and journaled under its own kind,
//! never as a [`Feedback::Failure`].
//!
//! Triggers outside the table return [`Error::InvalidTransition`] and change
//! nothing. The controller is `Sync`; share it as `Arc<FlowController>` if
//! several tasks drive it.

mod busy;
mod step;

pub use step::{DemoStep, Feedback, FlowSnapshot, Trigger, WalletSession, REFUND_STALLS};

use crate::config::{Cluster, ResolvedConfig, Timeouts};
use crate::explorer::explorer_link;
use crate::journal::{EntryKind, JournalEntry, TransitionJournal};
use crate::ledger::LedgerClient;
use crate::pipeline::{TransactionOutcome, TransactionPipeline};
use crate::wallet::{probe, WalletAdapter, WalletAvailability};
use crate::{Error, FailureKind, Result};
use busy::{BusyFlag, BusyGuard};
use solana_sdk::signature::Signature;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

struct FlowState {
    step: DemoStep,
    session: WalletSession,
    signature: Option<Signature>,
    feedback: Option<Feedback>,
    refund_stage: usize,
    attempts: u32,
    // Built under the lock, written after it is released
    unwritten: Vec<JournalEntry>,
}

impl Default for FlowState {
    fn default() -> Self {
        Self {
            step: DemoStep::Intro,
            session: WalletSession::default(),
            signature: None,
            feedback: None,
            refund_stage: 0,
            attempts: 0,
            unwritten: Vec::new(),
        }
    }
}

pub struct FlowController {
    pipeline: TransactionPipeline,
    wallet: Option<Arc<dyn WalletAdapter>>,
    cluster: Cluster,
    connect_timeout: Duration,
    journal: Option<TransitionJournal>,
    // Never held across an await
    state: Mutex<FlowState>,
    busy: BusyFlag,
}

impl FlowController {
    /// Controller on `Intro` with no journal and the default connect timeout
    pub fn new(
        pipeline: TransactionPipeline,
        wallet: Option<Arc<dyn WalletAdapter>>,
        cluster: Cluster,
    ) -> Self {
        Self {
            pipeline,
            wallet,
            cluster,
            connect_timeout: Timeouts::default().connect,
            journal: None,
            state: Mutex::new(FlowState::default()),
            busy: BusyFlag::default(),
        }
    }

    /// Wire a controller from validated config and the process-wide ledger
    pub fn from_config(
        config: &ResolvedConfig,
        ledger: Arc<dyn LedgerClient>,
        wallet: Option<Arc<dyn WalletAdapter>>,
    ) -> Self {
        let pipeline = TransactionPipeline::from_config(ledger, config);
        let mut controller = Self::new(pipeline, wallet, config.cluster)
            .with_connect_timeout(config.timeouts.connect);
        if let Some(path) = &config.journal_path {
            controller = controller.with_journal(TransitionJournal::new(path));
        }
        controller
    }

    /// Journal every transition to `journal`
    pub fn with_journal(mut self, journal: TransitionJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Bound on how long `connect_wallet` waits for the wallet
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    fn lock(&self) -> MutexGuard<'_, FlowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current step
    pub fn step(&self) -> DemoStep {
        self.lock().step
    }

    /// Current wallet session; cleared until a connect succeeds
    pub fn session(&self) -> WalletSession {
        self.lock().session.clone()
    }

    /// Signature of the confirmed payment, once there is one
    pub fn signature(&self) -> Option<Signature> {
        self.lock().signature
    }

    /// What the user should be shown alongside the current step
    pub fn feedback(&self) -> Option<Feedback> {
        self.lock().feedback.clone()
    }

    /// Whether a connect or submission is in flight
    pub fn is_busy(&self) -> bool {
        self.busy.is_set()
    }

    pub fn cluster(&self) -> Cluster {
        self.cluster
    }

    /// Every observable field, read under a single lock
    pub fn snapshot(&self) -> FlowSnapshot {
        let state = self.lock();
        FlowSnapshot {
            step: state.step,
            session: state.session.clone(),
            signature: state.signature,
            feedback: state.feedback.clone(),
            refund_stage: state.refund_stage,
            attempts: state.attempts,
            busy: self.busy.is_set(),
        }
    }

    /// Explorer URL for the confirmed payment on this controller's cluster
    pub fn explorer_link(&self) -> Option<String> {
        self.signature()
            .map(|signature| explorer_link(&signature, self.cluster))
    }

    pub fn wallet_availability(&self) -> WalletAvailability {
        probe(self.wallet.as_deref())
    }

    /// Leave the intro for the payment form
    pub fn start(&self) -> Result<DemoStep> {
        let _flush = JournalFlush(self);
        let mut state = self.lock();
        match state.step {
            step if step.is_terminal() => Ok(step),
            DemoStep::Intro => {
                self.move_to(&mut state, Trigger::Start, DemoStep::Form, EntryKind::Transition);
                Ok(DemoStep::Form)
            }
            step => Err(Error::InvalidTransition {
                step,
                trigger: Trigger::Start,
            }),
        }
    }

    /// Connect the injected wallet. Wallet problems are surfaced as feedback
    /// and leave the session cleared; they are not returned as errors.
    pub async fn connect_wallet(&self) -> Result<WalletSession> {
        let _flush = JournalFlush(self);
        let (wallet, _guard) = {
            let mut state = self.lock();
            match state.step {
                step if step.is_terminal() => return Ok(state.session.clone()),
                DemoStep::Intro | DemoStep::Form => {}
                step => {
                    return Err(Error::InvalidTransition {
                        step,
                        trigger: Trigger::ConnectWallet,
                    })
                }
            }

            let step = state.step;
            let wallet = match (&self.wallet, self.wallet_availability()) {
                (Some(wallet), WalletAvailability::Available(_)) => wallet.clone(),
                _ => {
                    state.session.clear();
                    self.fail(
                        &mut state,
                        Trigger::ConnectWallet,
                        step,
                        FailureKind::WalletUnavailable,
                        "no wallet provider that can sign and submit",
                    );
                    return Ok(state.session.clone());
                }
            };
            let Some(guard) = self.busy.try_acquire() else {
                self.fail(
                    &mut state,
                    Trigger::ConnectWallet,
                    step,
                    FailureKind::Busy,
                    "connect requested while another request is in flight",
                );
                return Ok(state.session.clone());
            };
            (wallet, guard)
        };
        self.flush_journal();

        let result = timeout(self.connect_timeout, wallet.connect()).await;

        let mut state = self.lock();
        let step = state.step;
        match result {
            Ok(Ok(public_key)) => {
                state.session = WalletSession::connected(public_key);
                if state.feedback.as_ref().is_some_and(Feedback::is_failure) {
                    state.feedback = None;
                }
                info!(public_key = %public_key, "Wallet connected");
                self.move_to(&mut state, Trigger::ConnectWallet, step, EntryKind::Transition);
            }
            Ok(Err(e)) => {
                state.session.clear();
                self.fail(&mut state, Trigger::ConnectWallet, step, e.kind(), e.to_string());
            }
            Err(_) => {
                state.session.clear();
                self.fail(
                    &mut state,
                    Trigger::ConnectWallet,
                    step,
                    FailureKind::ConnectionRejected,
                    "wallet did not respond in time",
                );
            }
        }
        Ok(state.session.clone())
    }

    /// Drop the wallet session; the step does not change
    pub fn disconnect_wallet(&self) -> Result<DemoStep> {
        let _flush = JournalFlush(self);
        let mut state = self.lock();
        let step = state.step;
        match step {
            step if step.is_terminal() => return Ok(step),
            DemoStep::Intro | DemoStep::Form => {}
            step => {
                return Err(Error::InvalidTransition {
                    step,
                    trigger: Trigger::DisconnectWallet,
                })
            }
        }

        if self.busy.is_set() {
            self.fail(
                &mut state,
                Trigger::DisconnectWallet,
                step,
                FailureKind::Busy,
                "disconnect requested while another request is in flight",
            );
            return Ok(step);
        }

        if let Some(wallet) = &self.wallet {
            wallet.disconnect();
        }
        state.session.clear();
        self.move_to(&mut state, Trigger::DisconnectWallet, step, EntryKind::Transition);
        Ok(step)
    }

    /// Pay the fee. Runs exactly one pipeline invocation when the session is
    /// connected and nothing else is in flight; otherwise stays on the form
    /// with a surfaced failure.
    pub async fn submit(&self) -> Result<DemoStep> {
        let _flush = JournalFlush(self);
        let (mut in_flight, wallet, fee_payer) = {
            let mut state = self.lock();
            match state.step {
                step if step.is_terminal() => return Ok(step),
                DemoStep::Form => {}
                step => {
                    return Err(Error::InvalidTransition {
                        step,
                        trigger: Trigger::Submit,
                    })
                }
            }

            let fee_payer = match (state.session.connected, state.session.public_key) {
                (true, Some(public_key)) => public_key,
                _ => {
                    self.fail(
                        &mut state,
                        Trigger::Submit,
                        DemoStep::Form,
                        FailureKind::NotConnected,
                        "submit without a connected wallet",
                    );
                    return Ok(DemoStep::Form);
                }
            };
            let Some(wallet) = self.wallet.clone() else {
                self.fail(
                    &mut state,
                    Trigger::Submit,
                    DemoStep::Form,
                    FailureKind::WalletUnavailable,
                    "session has no wallet provider",
                );
                return Ok(DemoStep::Form);
            };
            let Some(guard) = self.busy.try_acquire() else {
                self.fail(
                    &mut state,
                    Trigger::Submit,
                    DemoStep::Form,
                    FailureKind::Busy,
                    "submit requested while another request is in flight",
                );
                return Ok(DemoStep::Form);
            };

            state.feedback = None;
            state.attempts += 1;
            self.move_to(&mut state, Trigger::Submit, DemoStep::Processing, EntryKind::Transition);

            let in_flight = InFlight {
                controller: self,
                settled: false,
                _guard: guard,
            };
            (in_flight, wallet, fee_payer)
        };
        self.flush_journal();

        let outcome = self.pipeline.execute(wallet.as_ref(), fee_payer).await;
        let step = self.apply_outcome(outcome);
        in_flight.settled = true;
        Ok(step)
    }

    fn apply_outcome(&self, outcome: TransactionOutcome) -> DemoStep {
        let mut state = self.lock();
        if state.step != DemoStep::Processing {
            warn!(step = ?state.step, "Outcome arrived outside Processing; ignored");
            return state.step;
        }

        match outcome {
            TransactionOutcome::Confirmed { signature } => {
                state.signature = Some(signature);
                state.feedback = Some(Feedback::ScriptedServiceFailure { signature });
                info!(
                    scripted = true,
                    signature = %signature,
                    explorer = %explorer_link(&signature, self.cluster),
                    "Payment confirmed; showing scripted service failure"
                );
                self.move_to(
                    &mut state,
                    Trigger::Outcome,
                    DemoStep::Error,
                    EntryKind::ScriptedServiceFailure,
                );
            }
            TransactionOutcome::Rejected { reason } => self.fail(
                &mut state,
                Trigger::Outcome,
                DemoStep::Form,
                FailureKind::LedgerRejected,
                reason,
            ),
            TransactionOutcome::SubmissionFailed { kind, reason } => {
                self.fail(&mut state, Trigger::Outcome, DemoStep::Form, kind, reason)
            }
            TransactionOutcome::ConfirmationTimedOut => self.fail(
                &mut state,
                Trigger::Outcome,
                DemoStep::Form,
                FailureKind::ConfirmationTimedOut,
                "no confirmation before the deadline",
            ),
        }
        state.step
    }

    /// Enter the refund funnel. Only offered after a confirmed payment.
    pub fn request_refund(&self) -> Result<DemoStep> {
        let _flush = JournalFlush(self);
        let mut state = self.lock();
        match (state.step, state.signature) {
            (step, _) if step.is_terminal() => Ok(step),
            (DemoStep::Error, Some(_)) => {
                state.refund_stage = 0;
                state.feedback = Some(Feedback::RefundStall { stage: 0 });
                self.move_to(
                    &mut state,
                    Trigger::RequestRefund,
                    DemoStep::RefundFunnel,
                    EntryKind::Transition,
                );
                Ok(DemoStep::RefundFunnel)
            }
            (step, _) => Err(Error::InvalidTransition {
                step,
                trigger: Trigger::RequestRefund,
            }),
        }
    }

    /// Click through one more stall inside the refund funnel
    pub fn advance_refund(&self) -> Result<DemoStep> {
        let _flush = JournalFlush(self);
        let mut state = self.lock();
        match state.step {
            step if step.is_terminal() => Ok(step),
            DemoStep::RefundFunnel => {
                let stage = (state.refund_stage + 1).min(REFUND_STALLS.len() - 1);
                state.refund_stage = stage;
                state.feedback = Some(Feedback::RefundStall { stage });
                self.move_to(
                    &mut state,
                    Trigger::AdvanceRefund,
                    DemoStep::RefundFunnel,
                    EntryKind::Transition,
                );
                Ok(DemoStep::RefundFunnel)
            }
            step => Err(Error::InvalidTransition {
                step,
                trigger: Trigger::AdvanceRefund,
            }),
        }
    }

    /// Leave the refund funnel for good
    pub fn finish(&self) -> Result<DemoStep> {
        let _flush = JournalFlush(self);
        let mut state = self.lock();
        match state.step {
            step if step.is_terminal() => Ok(step),
            DemoStep::RefundFunnel => {
                state.feedback = state
                    .signature
                    .map(|signature| Feedback::Finished { signature });
                self.move_to(&mut state, Trigger::Finish, DemoStep::Done, EntryKind::Transition);
                Ok(DemoStep::Done)
            }
            step => Err(Error::InvalidTransition {
                step,
                trigger: Trigger::Finish,
            }),
        }
    }

    fn move_to(&self, state: &mut FlowState, trigger: Trigger, to: DemoStep, kind: EntryKind) {
        let from = state.step;
        state.step = to;
        info!(from = ?from, to = ?to, trigger = ?trigger, "Step transition");
        if let Some(journal) = &self.journal {
            let entry = journal.entry(
                trigger,
                from,
                to,
                kind,
                state.signature.map(|s| s.to_string()),
                state.feedback.as_ref().map(Feedback::message),
            );
            state.unwritten.push(entry);
        }
    }

    fn flush_journal(&self) {
        if let Some(journal) = &self.journal {
            journal.append_from(|| std::mem::take(&mut self.lock().unwritten));
        }
    }

    fn fail(
        &self,
        state: &mut FlowState,
        trigger: Trigger,
        to: DemoStep,
        kind: FailureKind,
        detail: impl Into<String>,
    ) {
        let detail = detail.into();
        warn!(kind = ?kind, detail = %detail, trigger = ?trigger, "Request failed");
        state.feedback = Some(Feedback::failure(kind, detail));
        self.move_to(state, trigger, to, EntryKind::Failure);
    }
}

/// Writes queued journal entries on drop. Created before the state lock is
/// taken so that it is released last, after the lock.
struct JournalFlush<'a>(&'a FlowController);

impl Drop for JournalFlush<'_> {
    fn drop(&mut self) {
        self.0.flush_journal();
    }
}

/// Outstanding submission. Dropping it before an outcome is applied (the
/// submit future was cancelled, or a collaborator panicked) puts the
/// controller back on the form; the busy flag is released either way.
struct InFlight<'a> {
    controller: &'a FlowController,
    settled: bool,
    _guard: BusyGuard<'a>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.controller.lock();
        if state.step == DemoStep::Processing {
            self.controller.fail(
                &mut state,
                Trigger::Interrupted,
                DemoStep::Form,
                FailureKind::Interrupted,
                "submission dropped before an outcome arrived",
            );
        }
    }
}
