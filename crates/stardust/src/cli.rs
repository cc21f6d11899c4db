//! Stardust app cli definition and entrypoint.
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use stardust_core::config::{Config, get_config};
use stardust_core::entitlement::{Entitlements, LocalEntitlements};
use stardust_core::get_data_dir;
use stardust_core::reply::ReplyError;
use stardust_core::session::{AskError, OracleSession};
use stardust_core::store::{FileStore, KeyValueStore, load_star_seed_id};

use crate::console::{
    CANCELLED_FOOTER, FALLBACK_REPLY, GenerationSpinner, MessageType, QUOTA_HINT,
    format_quota_footer, style_text,
};
use crate::log::setup_logging;

/// Stardust - a private channel to the stars.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show verbose logs.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask the oracle a single question.
    Ask {
        /// Question to ask.
        question: Vec<String>,
    },
    /// Start an interactive session with the oracle.
    Chat,
    /// Show remaining questions, membership and session identity.
    Status,
    /// Manage the gold membership.
    Gold {
        #[command(subcommand)]
        action: Option<GoldAction>,
    },
}

#[derive(Subcommand, Debug)]
enum GoldAction {
    /// Activate the gold membership.
    Buy,
    /// Re-read membership state from storage.
    Restore,
}

/// Runs the main CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        setup_logging().context("Failed to set up logging")?;
    }

    let config = get_config(None).context("Failed to load configuration")?;
    let data_dir = get_data_dir().context("Failed to get data directory")?;
    let store: Arc<dyn KeyValueStore> = Arc::new(
        FileStore::open(data_dir.join("state.json")).context("Failed to open session store")?,
    );
    let entitlements: Arc<dyn Entitlements> = Arc::new(LocalEntitlements::new(store.clone()));

    match &cli.command {
        Commands::Ask { question } => {
            execute_ask(&question.join(" "), &config, store, entitlements).await
        }
        Commands::Chat => crate::chat::execute(&config, store, entitlements).await,
        Commands::Status => execute_status(&config, store, entitlements),
        Commands::Gold { action } => execute_gold(action.as_ref(), entitlements),
    }
}

async fn execute_ask(
    question: &str,
    config: &Config,
    store: Arc<dyn KeyValueStore>,
    entitlements: Arc<dyn Entitlements>,
) -> Result<()> {
    let question = question.trim();
    if question.is_empty() {
        anyhow::bail!("Nothing to ask, the stars await a question");
    }

    let mut session =
        OracleSession::new(config, store, entitlements).context("Failed to start session")?;

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let spinner = GenerationSpinner::new();
    let result = session.ask(question, cancel).await;
    spinner.clear();

    present_ask_result(&session, result);
    Ok(())
}

/// Call-site failure contract: quota exhaustion gets an upgrade hint,
/// cancellation stays quiet, everything else becomes one generic line.
pub fn present_ask_result(
    session: &OracleSession,
    result: std::result::Result<stardust_core::reply::Message, AskError>,
) {
    match result {
        Ok(message) => {
            println!("{}", style_text(&message.text, MessageType::Oracle));
            println!();
            let footer = format_quota_footer(
                session.remaining_today(),
                session.question_limit(),
                session.is_subscribed(),
            );
            println!("{}", style_text(&footer, MessageType::Footer));
        }
        Err(AskError::QuotaExhausted) => {
            println!("{QUOTA_HINT}");
        }
        Err(AskError::Reply(ReplyError::Cancelled)) => {
            println!("{}", style_text(CANCELLED_FOOTER, MessageType::Footer));
        }
        Err(AskError::Reply(e)) => {
            tracing::warn!("Oracle reply failed: {e}");
            println!("{FALLBACK_REPLY}");
        }
    }
}

fn execute_status(
    config: &Config,
    store: Arc<dyn KeyValueStore>,
    entitlements: Arc<dyn Entitlements>,
) -> Result<()> {
    let session = OracleSession::new(config, store.clone(), entitlements)
        .context("Failed to start session")?;

    println!("Oracle mode: {}", config.oracle.mode.as_str());
    println!(
        "Free questions left today: {} of {}",
        session.remaining_today(),
        session.question_limit()
    );
    println!(
        "Gold membership: {}",
        if session.is_subscribed() {
            "active"
        } else {
            "inactive"
        }
    );
    println!("Star seed: {}", load_star_seed_id(store.as_ref()));
    Ok(())
}

fn execute_gold(action: Option<&GoldAction>, entitlements: Arc<dyn Entitlements>) -> Result<()> {
    match action {
        Some(GoldAction::Buy) => {
            entitlements
                .purchase()
                .context("Failed to record purchase")?;
            println!("Gold membership active. The oracle listens without limit.");
        }
        Some(GoldAction::Restore) => {
            entitlements
                .restore_purchases()
                .context("Failed to restore purchases")?;
            if entitlements.is_subscribed() {
                println!("Gold membership restored.");
            } else {
                println!("No gold membership found.");
            }
        }
        None => {
            if entitlements.is_subscribed() {
                println!("Gold membership: active");
            } else {
                println!("Gold membership: inactive. Activate with `stardust gold buy`.");
            }
        }
    }
    Ok(())
}
