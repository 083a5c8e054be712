/*!
Command handlers for the CLI

This module provides the handlers invoked by the CLI entrypoint:

- `chat`     - Interactive chat loop
- `ask`      - Single question, answer printed to stdout
- `sessions` - List, show, switch and create sessions
- `clear`    - Clear the active conversation
- `status`   - Backend readiness and knowledge base counters

Every handler builds a [`ChatController`] from the configuration and
works through it, so the CLI and the library share one code path.
*/

use crate::api::{AssistantApi, HttpAssistantClient};
use crate::config::Config;
use crate::controller::{ChatController, InitializePolicy};
use crate::error::Result;
use crate::render;
use crate::session::{Message, SessionStore};
use crate::storage::open_store;
use colored::Colorize;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

// Special commands parser for the chat loop
pub mod special_commands;

/// Build a controller from configuration
///
/// Opens the configured storage backend, restores the saved state and
/// connects the HTTP client. Nothing is sent to the backend yet.
///
/// # Errors
///
/// Returns error if the storage backend cannot be opened or the HTTP client
/// cannot be built
pub fn build_controller(config: &Config) -> Result<ChatController> {
    let repo = open_store(&config.storage)?;
    let store = SessionStore::load(repo, config.sessions.clone());
    tracing::debug!(
        session = %store.active_session_id(),
        messages = store.messages().len(),
        sessions = store.sessions().len(),
        "Restored chat state"
    );

    let api: Arc<dyn AssistantApi> = Arc::new(HttpAssistantClient::new(&config.api)?);
    Ok(ChatController::new(
        api,
        Arc::new(Mutex::new(store)),
        InitializePolicy::from(&config.api),
    ))
}

/// Wait for a backend clear notification before the process exits
///
/// The notification is best effort; a failed task is only logged.
async fn finish_notification(handle: JoinHandle<()>) {
    if let Err(e) = handle.await {
        tracing::warn!("Backend clear notification did not complete: {}", e);
    }
}

/// Print every message of the active conversation
fn print_transcript(messages: &[Message]) {
    for message in messages {
        println!("{}", render::format_message(message));
    }
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Restores the active conversation, starts backend initialization in
    //! the background and runs a readline loop. Lines starting with `/` are
    //! handled by [`super::special_commands`]; everything else is sent to
    //! the assistant.

    use super::special_commands::{parse_special_command, print_help, SpecialCommand};
    use super::*;
    use crate::controller::{RejectReason, SendOutcome};
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start interactive chat mode
    ///
    /// # Errors
    ///
    /// Returns error if the controller cannot be built, the terminal cannot
    /// be read or the session store fails to persist a change
    pub async fn run_chat(config: Config) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let controller = Arc::new(build_controller(&config)?);

        let init = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.initialize().await })
        };

        let mut rl = DefaultEditor::new()?;

        {
            let store = controller.lock_store()?;
            print_welcome_banner(store.active_session_id(), store.messages().len());
            print_transcript(store.messages());
        }

        loop {
            match rl.readline(&format!("{} ", "mira>".magenta().bold())) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(trimmed)?;

                    let command = match parse_special_command(trimmed) {
                        Ok(command) => command,
                        Err(e) => {
                            eprintln!("{}", e.to_string().red());
                            continue;
                        }
                    };

                    match command {
                        SpecialCommand::Exit => break,
                        SpecialCommand::Help => print_help(),
                        SpecialCommand::NewSession => {
                            let (id, _notify) = controller.start_new_session()?;
                            println!("{} {}", "Started new session".green(), id.cyan());
                        }
                        SpecialCommand::Clear => {
                            controller.clear()?;
                            println!("{}", "Conversation cleared.".green());
                        }
                        SpecialCommand::ListSessions(query) => {
                            let store = controller.lock_store()?;
                            super::sessions::print_sessions(&store, query.as_deref());
                        }
                        SpecialCommand::SwitchSession(id) => match controller.switch_session(&id) {
                            Ok(_notify) => {
                                println!("{} {}", "Switched to".green(), id.cyan());
                                print_transcript(controller.lock_store()?.messages());
                            }
                            Err(e) => eprintln!("{}", format!("{:#}", e).red()),
                        },
                        SpecialCommand::ShowStatus => {
                            super::status::print_status(&controller).await;
                        }
                        SpecialCommand::None => send_and_print(&controller, trimmed).await?,
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => {
                    tracing::error!("Readline error: {}", e);
                    break;
                }
            }
        }

        init.abort();
        println!("Goodbye!");
        Ok(())
    }

    async fn send_and_print(controller: &ChatController, text: &str) -> Result<()> {
        println!("{}", "Thinking...".dimmed());
        match controller.send(text).await? {
            SendOutcome::Answered | SendOutcome::Failed => {
                if let Some(reply) = controller.lock_store()?.messages().last() {
                    println!("{}", render::format_message(reply));
                }
            }
            SendOutcome::Rejected(RejectReason::Busy) => {
                println!("{}", "Still waiting for the previous answer.".yellow());
            }
            SendOutcome::Rejected(RejectReason::EmptyInput) | SendOutcome::Discarded => {}
        }
        Ok(())
    }

    fn print_welcome_banner(session_id: &str, message_count: usize) {
        println!();
        println!("{}", "Mira knowledge assistant".bold());
        println!(
            "Session {} ({} messages). Type {} for commands.",
            session_id.cyan(),
            message_count,
            "/help".cyan()
        );
        println!();
    }
}

// Single question handler
pub mod ask {
    //! Send one question and print the reply.

    use super::*;
    use crate::controller::SendOutcome;
    use crate::error::MiraError;

    /// Initialize the backend, send `text` and print the reply
    ///
    /// # Errors
    ///
    /// Returns error if the backend request failed (after printing the
    /// fallback message) or the store cannot be persisted
    pub async fn run_ask(config: Config, text: String) -> Result<()> {
        let controller = build_controller(&config)?;

        if !controller.initialize().await {
            tracing::warn!("Backend did not report ready, sending anyway");
        }

        let outcome = controller.send(&text).await?;
        tracing::debug!(?outcome, "Ask finished");

        if let Some(reply) = controller.lock_store()?.messages().last() {
            println!("{}", render::format_message(reply));
        }

        match outcome {
            SendOutcome::Failed => {
                Err(MiraError::Api("assistant backend did not answer".to_string()).into())
            }
            _ => Ok(()),
        }
    }
}

// Session management handlers
pub mod sessions {
    //! List, show, switch and create sessions.

    use super::*;
    use crate::cli::SessionsCommand;

    /// Dispatch a `sessions` subcommand
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be opened or persisted, or
    /// `MiraError::SessionNotFound` when switching to an unknown id
    pub async fn handle_sessions(config: Config, command: SessionsCommand) -> Result<()> {
        let controller = build_controller(&config)?;

        match command {
            SessionsCommand::List { search } => {
                let store = controller.lock_store()?;
                print_sessions(&store, search.as_deref());
            }
            SessionsCommand::Show => {
                let store = controller.lock_store()?;
                if store.messages().is_empty() {
                    println!("{}", "The active conversation is empty.".yellow());
                } else {
                    print_transcript(store.messages());
                }
            }
            SessionsCommand::Switch { id } => {
                let notify = controller.switch_session(&id)?;
                println!("{} {}", "Switched to".green(), id.cyan());
                finish_notification(notify).await;
            }
            SessionsCommand::New => {
                let (id, notify) = controller.start_new_session()?;
                println!("{} {}", "Started new session".green(), id.cyan());
                finish_notification(notify).await;
            }
        }
        Ok(())
    }

    /// Print the session table, filtered by `query` when given
    pub fn print_sessions(store: &SessionStore, query: Option<&str>) {
        let matches = store.search_sessions(query.unwrap_or(""));
        if matches.is_empty() {
            println!("{}", "No chat sessions found.".yellow());
            return;
        }

        println!("\nChat Sessions:");
        render::sessions_table(&matches, store.active_session_id()).printstd();
        println!();
        println!(
            "Use {} to reopen a session.",
            "mira sessions switch <ID>".cyan()
        );
        println!();
    }
}

// Clear handler
pub mod clear {
    //! Clear the active conversation.

    use super::*;

    /// Clear the active conversation and tell the backend
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be opened or persisted
    pub async fn run_clear(config: Config) -> Result<()> {
        let controller = build_controller(&config)?;
        let notify = controller.clear()?;
        println!("{}", "Conversation cleared.".green());
        finish_notification(notify).await;
        Ok(())
    }
}

// Status handler
pub mod status {
    //! Backend readiness and local session state.

    use super::*;

    /// Print backend status and the local session state
    ///
    /// # Errors
    ///
    /// Returns error if the controller cannot be built
    pub async fn run_status(config: Config) -> Result<()> {
        let controller = build_controller(&config)?;
        print_status(&controller).await;
        Ok(())
    }

    /// Print backend status, or a warning when it is unreachable
    pub async fn print_status(controller: &ChatController) {
        match controller.status().await {
            Ok(status) => println!("{}", render::format_status(&status)),
            Err(e) => println!("{} {:#}", "Backend unreachable:".red(), e),
        }

        let summary = controller.lock_store().map(|store| {
            (
                store.active_session_id().to_string(),
                store.messages().len(),
                store.sessions().len(),
            )
        });
        match summary {
            Ok((id, messages, sessions)) => println!(
                "Session: {} ({} messages, {} stored sessions)",
                id, messages, sessions
            ),
            Err(e) => tracing::warn!("Could not read session state: {:#}", e),
        }
    }
}
