//! paytrap CLI
//!
//! Command-line driver for the pay-first scam training demo.

use clap::{Parser, Subcommand};
use paytrap_demo::config::KEYPAIR_ENV;
use paytrap_demo::explorer::explorer_link;
use paytrap_demo::journal::TransitionJournal;
use paytrap_demo::wallet::KeypairWallet;
use paytrap_demo::{
    Config, DemoStep, Error, FlowController, LedgerClient, ResolvedConfig, Result,
    RpcLedgerClient, WalletAdapter, WalletAvailability,
};
use solana_sdk::signature::Signature;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "paytrap")]
#[command(about = "Training demo of a pay-first token-creation scam on a Solana test cluster")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk through the whole flow with the keypair named by PAYTRAP_KEYPAIR
    Run {
        /// Number of refund stalls to click through before giving up
        #[arg(long, default_value_t = 3)]
        refund_clicks: usize,
    },

    /// Report whether a wallet provider is available
    Probe,

    /// Print the explorer link for a signature
    Explorer {
        /// Transaction signature (base58)
        signature: String,
    },

    /// Print a transition journal
    Journal {
        /// Path to the JSONL journal (defaults to the configured one)
        path: Option<PathBuf>,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    // Load config
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    }
    .apply_env()?;
    let resolved = config.resolve()?;

    match cli.command {
        Commands::Run { refund_clicks } => run_demo(&resolved, refund_clicks).await?,
        Commands::Probe => run_probe(&resolved),
        Commands::Explorer { signature } => {
            let signature = Signature::from_str(&signature)
                .map_err(|e| Error::Config(format!("Invalid signature: {}", e)))?;
            println!("{}", explorer_link(&signature, resolved.cluster));
        }
        Commands::Journal { path } => {
            let path = path
                .or_else(|| resolved.journal_path.clone())
                .ok_or_else(|| Error::Config("No journal path configured".to_string()))?;
            for entry in TransitionJournal::read_entries(&path)? {
                println!("{}", serde_json::to_string(&entry)?);
            }
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            println!("recipient: {}", resolved.recipient);
            println!("rpc: {}", resolved.cluster.rpc_url());
        }
    }

    Ok(())
}

/// Build the env-provided wallet. A missing or unreadable keypair degrades
/// to "no wallet" rather than aborting.
fn load_wallet(ledger: Arc<dyn LedgerClient>) -> Option<Arc<dyn WalletAdapter>> {
    match KeypairWallet::from_env(KEYPAIR_ENV, ledger) {
        Ok(Some(wallet)) => {
            tracing::info!(pubkey = %wallet.pubkey(), "Loaded wallet from {}", KEYPAIR_ENV);
            let wallet: Arc<dyn WalletAdapter> = Arc::new(wallet);
            Some(wallet)
        }
        Ok(None) => {
            tracing::warn!("No {} set - wallet not available", KEYPAIR_ENV);
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load wallet from {}", KEYPAIR_ENV);
            None
        }
    }
}

fn build_controller(resolved: &ResolvedConfig) -> FlowController {
    let ledger: Arc<dyn LedgerClient> =
        Arc::new(RpcLedgerClient::new(resolved.cluster, resolved.poll_interval));
    let wallet = load_wallet(ledger.clone());
    FlowController::from_config(resolved, ledger, wallet)
}

fn run_probe(resolved: &ResolvedConfig) {
    let controller = build_controller(resolved);
    match controller.wallet_availability() {
        WalletAvailability::Available(caps) => {
            println!("Wallet available: {}", caps.provider);
        }
        WalletAvailability::Unsupported(caps) => {
            println!("Wallet {} cannot sign and submit", caps.provider);
        }
        WalletAvailability::Unavailable => println!("Wallet not available"),
    }
}

async fn run_demo(resolved: &ResolvedConfig, refund_clicks: usize) -> Result<()> {
    tracing::info!(
        cluster = %resolved.cluster,
        recipient = %resolved.recipient,
        amount_lamports = resolved.amount_lamports,
        "Starting demo"
    );

    let controller = build_controller(resolved);
    println!("[{:?}] Launch your token in one click.", controller.start()?);

    let session = controller.connect_wallet().await?;
    if !session.connected {
        if let Some(feedback) = controller.feedback() {
            println!("[{:?}] {}", controller.step(), feedback.message());
        }
        return Ok(());
    }
    if let Some(public_key) = session.public_key {
        println!("[{:?}] Connected {}", controller.step(), public_key);
    }

    println!(
        "[{:?}] Paying {} lamports creation fee...",
        DemoStep::Processing,
        resolved.amount_lamports
    );
    let step = controller.submit().await?;
    if let Some(feedback) = controller.feedback() {
        println!("[{:?}] {}", step, feedback.message());
    }
    if step != DemoStep::Error {
        return Ok(());
    }
    if let Some(link) = controller.explorer_link() {
        println!("[{:?}] The payment actually confirmed: {}", step, link);
    }

    let mut step = controller.request_refund()?;
    for _ in 0..refund_clicks {
        if let Some(feedback) = controller.feedback() {
            println!("[{:?}] {}", step, feedback.message());
        }
        step = controller.advance_refund()?;
    }

    let step = controller.finish()?;
    if let Some(feedback) = controller.feedback() {
        println!("[{:?}] {}", step, feedback.message());
    }
    Ok(())
}
