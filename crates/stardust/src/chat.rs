//! Interactive oracle session (REPL).
use anyhow::{Context as _, Result};
use clap::{CommandFactory, Parser, Subcommand};
use console::Style;
use rustyline::completion::Candidate;
use rustyline::{
    CompletionType, Config as ReadlineConfig, Context, Editor, Helper, Highlighter, Validator,
    error::ReadlineError,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use stardust_core::config::Config;
use stardust_core::entitlement::Entitlements;
use stardust_core::reply::ReplyError;
use stardust_core::session::{AskError, OracleSession};
use stardust_core::store::KeyValueStore;

use crate::cli::present_ask_result;
use crate::console::{GenerationSpinner, MessageType, style_text};

#[derive(Debug)]
struct CompletionCandidate {
    text: String,
    display_string: String,
}

impl CompletionCandidate {
    fn new(text: String) -> Self {
        let display_string = Style::new().white().apply_to(&text).to_string();
        Self {
            text,
            display_string,
        }
    }
}

impl Candidate for CompletionCandidate {
    fn display(&self) -> &str {
        &self.display_string
    }

    fn replacement(&self) -> &str {
        &self.text
    }
}

#[derive(Parser, Debug)]
#[command(multicall = true)]
struct CliCommand {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clear the conversation transcript
    Clear,
    /// Show remaining questions and membership
    Status,
    /// Manage the gold membership. E.g. /gold buy
    Gold {
        #[command(subcommand)]
        action: Option<GoldCommand>,
    },
    /// Exit the session
    #[command(alias = "q", alias = "quit")]
    Exit,
}

#[derive(Subcommand, Debug)]
enum GoldCommand {
    /// Activate the gold membership
    Buy,
    /// Re-read membership state from storage
    Restore,
}

#[derive(Helper, Validator, Highlighter)]
struct CommandCompleter {
    command_names: Vec<String>,
}

impl rustyline::completion::Completer for CommandCompleter {
    type Candidate = CompletionCandidate;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context,
    ) -> Result<(usize, Vec<Self::Candidate>), ReadlineError> {
        // Only suggest commands at start of line
        if pos == 0 || line.starts_with('/') {
            let candidates = self
                .command_names
                .iter()
                .filter(|&cmd_name| cmd_name.starts_with(line))
                .map(|s| CompletionCandidate::new(s.clone()))
                .collect();

            Ok((0, candidates))
        } else {
            Ok((0, Vec::new()))
        }
    }
}

impl rustyline::hint::Hinter for CommandCompleter {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context) -> Option<Self::Hint> {
        if line.is_empty() || pos < line.len() {
            return None;
        }
        if line.starts_with('/') {
            self.command_names
                .iter()
                .find(|&cmd_name| cmd_name.starts_with(line))
                .map(|cmd_name| {
                    format!("{}", Style::new().white().apply_to(&cmd_name[line.len()..]))
                })
        } else {
            None
        }
    }
}

pub async fn execute(
    config: &Config,
    store: Arc<dyn KeyValueStore>,
    entitlements: Arc<dyn Entitlements>,
) -> Result<()> {
    let session = OracleSession::new(config, store, entitlements.clone())
        .context("Failed to start session")?;
    start_chat(Arc::new(Mutex::new(session)), entitlements).await
}

/// Chat UX flow
async fn start_chat(
    session: Arc<Mutex<OracleSession>>,
    entitlements: Arc<dyn Entitlements>,
) -> Result<()> {
    println!("Welcome, star traveler. Ask and I will translate the cosmos.");
    println!("Type '/help' for commands, '/q' to exit.");

    let readline_config = ReadlineConfig::builder()
        .history_ignore_dups(true)?
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .build();

    let command_names = CliCommand::command()
        .get_subcommands()
        .flat_map(|c| c.get_name_and_visible_aliases())
        .map(|s| format!("/{s}"))
        .collect::<Vec<_>>();

    let mut rl = Editor::with_config(readline_config)?;
    rl.set_helper(Some(CommandCompleter { command_names }));

    let prompt = (style_text("> ", MessageType::Prompt)).to_string();
    loop {
        let readline = rl.readline(&prompt);
        match readline {
            Ok(line) => {
                rl.add_history_entry(&line)?;
                let user_input = line.trim();

                // Skip empty input
                if user_input.is_empty() {
                    continue;
                }

                let continue_repl = match user_input.starts_with('/') {
                    true => process_command(&session, &entitlements, user_input).await?,
                    false => process_message(&session, user_input).await?,
                };

                if continue_repl {
                    continue;
                }

                return Ok(());
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C pressed, but not during generation.
                // The generation path handles Ctrl-C while a question is in flight.
                println!("Type /quit to exit.");
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D pressed
                println!("\nFarewell, star traveler.");
                return Ok(());
            }
            Err(err) => {
                return Err(err.into());
            }
        }
    }
}

/// Returns false if the REPL should break.
async fn process_command(
    session: &Arc<Mutex<OracleSession>>,
    entitlements: &Arc<dyn Entitlements>,
    user_input: &str,
) -> Result<bool> {
    let args = match shlex::split(user_input) {
        Some(args) => args,
        None => {
            println!("Invalid command syntax");
            return Ok(true);
        }
    };

    let continue_repl = match CliCommand::try_parse_from(args) {
        Ok(CliCommand { command }) => match command {
            Command::Clear => {
                session.lock().await.clear_messages();
                println!("Transcript cleared");
                true
            }
            Command::Status => {
                let session_guard = session.lock().await;
                println!(
                    "Free questions left today: {} of {}",
                    session_guard.remaining_today(),
                    session_guard.question_limit()
                );
                println!(
                    "Gold membership: {}",
                    if session_guard.is_subscribed() {
                        "active"
                    } else {
                        "inactive"
                    }
                );
                true
            }
            Command::Gold { action } => {
                match action {
                    Some(GoldCommand::Buy) => match entitlements.purchase() {
                        Ok(()) => println!("Gold membership active. Ask without limit."),
                        Err(e) => eprintln!("Error recording purchase: {e}"),
                    },
                    Some(GoldCommand::Restore) => match entitlements.restore_purchases() {
                        Ok(()) => {
                            if entitlements.is_subscribed() {
                                println!("Gold membership restored.");
                            } else {
                                println!("No gold membership found.");
                            }
                        }
                        Err(e) => eprintln!("Error restoring purchases: {e}"),
                    },
                    None => {
                        println!(
                            "Gold membership: {}",
                            if entitlements.is_subscribed() {
                                "active"
                            } else {
                                "inactive. Activate with /gold buy"
                            }
                        );
                    }
                }
                true
            }
            Command::Exit => {
                println!("Farewell, star traveler.");
                false
            }
        },
        Err(e) => {
            e.print().unwrap();
            true
        }
    };

    Ok(continue_repl)
}

/// Returns false if the REPL should break.
async fn process_message(session: &Arc<Mutex<OracleSession>>, line: &str) -> Result<bool> {
    let spinner = GenerationSpinner::new();
    let cancel = CancellationToken::new();

    let mut session_guard = session.lock().await;

    let result = tokio::select! {
        // Ctrl-C cancels the in-flight question
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            Err(AskError::Reply(ReplyError::Cancelled))
        }
        result = session_guard.ask(line, cancel.clone()) => result,
    };

    spinner.clear();
    present_ask_result(&session_guard, result);
    println!();

    Ok(true)
}
