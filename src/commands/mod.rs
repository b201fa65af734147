/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes two top-level command modules:

- `chat` — Interactive chat session
- `ask`  — Answer a single question and exit

Both build a [`Session`] from the command-line settings and talk to the
[`SqlAgent`].
*/

use crate::agent::SqlAgent;
use crate::cli::SessionArgs;
use crate::commands::special_commands::{help_text, SpecialCommand};
use crate::config::Config;
use crate::credential::Credential;
use crate::error::{Result, TabletalkError};
use crate::session::{ConfigurationUpdate, Session, TurnOutcome};
use crate::transcript;
use colored::Colorize;

// Special commands parser for session settings
pub mod special_commands;

/// Build the data source update described by command-line settings
pub fn initial_update(args: &SessionArgs) -> ConfigurationUpdate {
    ConfigurationUpdate {
        csv: args.csv.clone(),
        connection: args.database_url.clone(),
    }
}

/// Create a session with the credential from the command line
pub fn new_session(config: &Config, args: &SessionArgs) -> Session {
    let mut session = Session::new(config);
    session.set_credential(args.api_key.as_deref().and_then(Credential::new));
    session
}

/// Session status as display lines
pub fn status_text(session: &Session) -> String {
    let store = match session.store_source() {
        Some(source) => source.to_string(),
        None => "none (use /upload or /connect)".to_string(),
    };
    let key = if session.has_credential() {
        "set"
    } else {
        "not set (use /key)"
    };
    format!(
        "Session:           {}\nData Source:       {}\nAPI Key:           {}\nConversation Size: {} messages",
        session.id(),
        store,
        key,
        session.conversation().len()
    )
}

/// Apply a special command to the session
///
/// Returns the text to display, or `None` when the session should end.
pub async fn execute_special_command(
    session: &mut Session,
    command: SpecialCommand,
) -> Option<String> {
    let output = match command {
        SpecialCommand::Upload(path) => match session.ingest_file(&path) {
            Ok(source) => format!("{} {}", "Loaded".green(), source),
            Err(e) => format!("{} {}", "Upload failed:".red(), e),
        },
        SpecialCommand::Connect(descriptor) => match session.connect(&descriptor).await {
            Ok(source) => format!("{} {}", "Connected to".green(), source),
            Err(e) => format!("{} {}", "Connection failed:".red(), e),
        },
        SpecialCommand::SetKey(secret) => match Credential::new(secret) {
            Some(credential) => {
                session.set_credential(Some(credential));
                "API key set for this session".green().to_string()
            }
            None => "API key cannot be blank".red().to_string(),
        },
        SpecialCommand::ShowTranscript => transcript::render_transcript(session.conversation()),
        SpecialCommand::ShowStatus => status_text(session),
        SpecialCommand::Help => help_text().to_string(),
        SpecialCommand::Exit => return None,
        SpecialCommand::None => String::new(),
    };
    Some(output)
}

// Chat command handler
pub mod chat {
    //! Interactive chat session handler.
    //!
    //! Applies the command-line data source, then runs a readline loop where
    //! each line is either a special command or a question for the agent.

    use super::*;
    use crate::commands::special_commands::parse_special_command;
    use crate::conversation::ChatTurn;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start an interactive chat session
    ///
    /// # Errors
    ///
    /// Returns error if the line editor cannot be initialized
    pub async fn run_chat(config: Config, args: SessionArgs) -> Result<()> {
        let mut session = new_session(&config, &args);
        tracing::info!(session = %session.id(), "Starting interactive chat session");

        let update = initial_update(&args);
        if let Err(e) = session.apply_configuration(&update).await {
            eprintln!("{}", format!("Error: {}", e).red());
        }

        let agent = SqlAgent::new(config);
        let mut rl = DefaultEditor::new()?;

        print_welcome_banner();
        println!("{}\n", transcript::render_transcript(session.conversation()));

        loop {
            match rl.readline(&format!("{} ", ">>".cyan().bold())) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let command = parse_special_command(trimmed);
                    if !matches!(command, Ok(SpecialCommand::SetKey(_))) {
                        let _ = rl.add_history_entry(trimmed);
                    }

                    match command {
                        Ok(SpecialCommand::None) => {}
                        Ok(command) => match execute_special_command(&mut session, command).await {
                            Some(output) => {
                                println!("{}\n", output);
                                continue;
                            }
                            None => break,
                        },
                        Err(e) => {
                            eprintln!("{}\n", e);
                            continue;
                        }
                    }

                    println!("{}", transcript::render_turn(&ChatTurn::user(trimmed)));
                    println!("{}", "Working...".dimmed());
                    match session.submit(&agent, trimmed).await {
                        TurnOutcome::Answered(_) => {
                            if let Some(turn) = session.conversation().last() {
                                println!("{}\n", transcript::render_turn(turn));
                            }
                        }
                        TurnOutcome::NoActiveStore(message) => {
                            println!("{}\n", transcript::render_notice(&message));
                        }
                        TurnOutcome::Faulted(fault) => {
                            eprintln!("{}\n", transcript::render_fault(&fault));
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Display welcome banner at the start of a chat session
    fn print_welcome_banner() {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║              Tabletalk - Chat with your tables               ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }
}

// One-shot question handler
pub mod ask {
    //! Non-interactive question answering.

    use super::*;

    /// Answer a single question and print the answer to stdout
    ///
    /// # Errors
    ///
    /// Returns `TabletalkError::Config` for a blank question, the ingestion or
    /// connection error, `TabletalkError::NoActiveStore` when no data source
    /// was given, or the agent fault
    pub async fn run_ask(config: Config, args: SessionArgs, question: String) -> Result<()> {
        let question = question.trim();
        if question.is_empty() {
            return Err(TabletalkError::Config("Question cannot be blank".to_string()).into());
        }

        let mut session = new_session(&config, &args);
        session.apply_configuration(&initial_update(&args)).await?;

        let agent = SqlAgent::new(config);
        match session.submit(&agent, question).await {
            TurnOutcome::Answered(answer) => {
                println!("{}", answer);
                Ok(())
            }
            TurnOutcome::NoActiveStore(message) => {
                Err(TabletalkError::NoActiveStore(message).into())
            }
            TurnOutcome::Faulted(fault) => Err(fault.into()),
        }
    }
}
