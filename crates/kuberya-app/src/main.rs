//! Kuberya application binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Build the application shell around the reply simulator
//! 3. Print assistant replies as they arrive on the event channel
//! 4. Run a line-oriented REPL over stdin

mod cli;
mod commands;

use std::io::Write as _;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};

use kuberya_chat::{AppShell, SessionManager, SubmitRejection};
use kuberya_core::config::KuberyaConfig;
use kuberya_core::types::{Author, ChatMode, Theme};
use kuberya_core::{Result, SessionEvent};

use cli::CliArgs;
use commands::{load_attachment, Command, HELP};

enum Flow {
    Continue,
    Quit,
}

/// Print assistant messages as they land, until the channel closes.
async fn print_replies(session: SessionManager, mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::MessageAppended {
                message_id,
                author: Author::Assistant,
                ..
            }) => {
                let Some(message) = session.messages().into_iter().find(|m| m.id == message_id)
                else {
                    continue;
                };
                println!("\n[{}] bot: {}", message.created_at.clock_time(), message.text);
                if message.failed {
                    println!("  (type /retry to try again)");
                }
                prompt();
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Reply printer fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

fn print_history(shell: &AppShell) -> Result<()> {
    let ledger = shell.history()?;
    if ledger.is_empty() {
        println!("No history yet.");
        return Ok(());
    }
    let active = ledger.active();
    for (i, entry) in ledger.entries().iter().enumerate() {
        let marker = if Some(entry.id) == active { '*' } else { ' ' };
        println!(
            "{marker}{:>3}. {} ({}) - {}",
            i + 1,
            entry.title,
            entry.model_label,
            entry.created_at_display
        );
        println!("       {}", entry.summary);
    }
    Ok(())
}

async fn run_command(shell: &mut AppShell, command: Command) -> Result<Flow> {
    match command {
        Command::Quit => return Ok(Flow::Quit),
        Command::Help => println!("{HELP}"),
        Command::Usage(usage) => println!("usage: {usage}"),
        Command::Unknown(name) => println!("Unknown command /{name}. Try /help."),
        Command::Login => {
            shell.login();
            println!("Welcome back.");
        }
        Command::Logout => {
            shell.logout();
            println!("Logged out. Type /login to continue.");
        }
        Command::Theme => {
            let theme = shell.toggle_theme();
            println!("Theme: {}", if theme == Theme::Dark { "dark" } else { "light" });
        }
        Command::Support(text) => {
            shell.support_mut().open();
            if let Some(reply) = shell.support().send(&text) {
                let canned = shell.support().canned_reply().to_string();
                tokio::spawn(async move {
                    if reply.await.is_ok() {
                        println!("\nsupport: {canned}");
                        prompt();
                    }
                });
            }
        }
        Command::Send(text) => {
            let session = shell.session()?;
            if session.mode() == ChatMode::Voice {
                println!("Voice mode is active. Use /listen, or /voice to return to chat.");
                return Ok(Flow::Continue);
            }
            match session.submit(&text).rejection() {
                None => println!("(thinking...)"),
                Some(SubmitRejection::AwaitingReply) => println!("Still waiting for the last reply."),
                Some(_) => {}
            }
        }
        Command::Retry => {
            if let Some(SubmitRejection::NothingToRetry) = shell.session()?.retry_last().rejection() {
                println!("Nothing to retry.");
            }
        }
        Command::Attach(path) => {
            let session = shell.session()?;
            let file = load_attachment(&path).await?;
            let name = file.display_name.clone();
            session.add_attachments(vec![file]);
            println!("Staged {name} ({} pending)", session.pending_attachments().len());
        }
        Command::Detach(index) => match shell.session()?.remove_attachment(index) {
            Some(removed) => println!("Removed {}", removed.display_name),
            None => println!("No attachment #{}", index + 1),
        },
        Command::Voice => {
            let mode = shell.toggle_voice()?;
            println!("Mode: {mode}");
            if mode == ChatMode::Voice {
                println!("{}", shell.voice().status_line());
            }
        }
        Command::Listen => {
            if shell.session()?.mode() != ChatMode::Voice {
                println!("Switch to voice mode first with /voice.");
                return Ok(Flow::Continue);
            }
            let voice = shell.voice_mut();
            voice.toggle_listening();
            let bars: Vec<String> = voice.bars().iter().map(u32::to_string).collect();
            println!("{} - {}", voice.status_line(), voice.hint_line());
            println!("level [{}]", bars.join(" "));
        }
        Command::New => {
            shell.new_chat()?;
            println!("Started a new conversation.");
        }
        Command::History => print_history(shell)?,
        Command::Select(index) => {
            let ledger = shell.history()?;
            match ledger.nth(index) {
                Some(entry) => {
                    ledger.select(entry.id);
                    println!("Selected \"{}\"", entry.title);
                }
                None => println!("No history entry #{}", index + 1),
            }
        }
        Command::Delete(index) => {
            let ledger = shell.history()?;
            match ledger.nth(index) {
                Some(entry) => {
                    ledger.delete(entry.id);
                    println!("Deleted \"{}\"", entry.title);
                }
                None => println!("No history entry #{}", index + 1),
            }
        }
        Command::ClearHistory => {
            let removed = shell.history()?.clear_all();
            println!("Removed {removed} entries.");
        }
        Command::Model(label) => {
            shell.session()?;
            println!("Model: {label} - {}", shell.model_description(&label));
            shell.select_model(label);
        }
        Command::Models => {
            let selected = shell.selected_model();
            for model in shell.models() {
                let marker = if model.label == selected.as_str() { '*' } else { ' ' };
                println!("{marker} {} - {}", model.label, model.description);
            }
        }
        Command::Export => {
            let doc = serde_json::json!({
                "history": shell.history()?.entries(),
                "messages": shell.session()?.messages(),
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
    }
    Ok(Flow::Continue)
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = KuberyaConfig::load_or_default(&config_file);

    // Tracing.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting {} v{}", config.general.app_name, env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    if args.no_demo_history {
        config.history.seed_demo_entries = false;
    }
    if let Some(model) = &args.model {
        config.models.default_model = model.clone();
    }

    let mut shell = AppShell::with_simulator(&config);
    if args.dark {
        shell.set_theme(Theme::Dark);
    }
    shell.login();

    let session = shell.session()?.clone();
    tokio::spawn(print_replies(session, shell.subscribe()));

    println!(
        "{} ({}) - type /help for commands",
        config.general.app_name,
        shell.selected_model()
    );
    prompt();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = Command::parse(&line);
        let gated = !matches!(
            command,
            Command::Login | Command::Help | Command::Quit | Command::Theme | Command::Support(_)
        );
        if gated && !shell.is_logged_in() {
            println!("Please /login first.");
            prompt();
            continue;
        }
        match run_command(&mut shell, command).await {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(e) => println!("error: {e}"),
        }
        prompt();
    }

    shell.logout();
    tracing::info!("Goodbye");
    Ok(())
}
