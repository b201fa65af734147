//! Special commands parser for interactive chat mode
//!
//! Special commands configure the session or display state; they are never
//! sent to the agent. They are the terminal's settings panel:
//! - Upload a CSV file or connect to a database
//! - Set the API key
//! - Re-render the transcript and show session status
//! - Display help information
//! - Exit the session
//!
//! Commands are prefixed with `/` and their names are case-insensitive.
//! Arguments keep their case.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an argument it does not take
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Ingest a CSV file as the active store
    Upload(PathBuf),

    /// Connect to the database named by a descriptor
    Connect(String),

    /// Set the provider API key
    SetKey(String),

    /// Re-render every turn of the conversation
    ShowTranscript,

    /// Display store, credential and conversation status
    ShowStatus,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command
    ///
    /// The input should be submitted to the agent as a question.
    None,
}

impl std::fmt::Debug for SpecialCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Upload(path) => f.debug_tuple("Upload").field(path).finish(),
            Self::Connect(descriptor) => f.debug_tuple("Connect").field(descriptor).finish(),
            Self::SetKey(_) => f.write_str("SetKey(****)"),
            Self::ShowTranscript => f.write_str("ShowTranscript"),
            Self::ShowStatus => f.write_str("ShowStatus"),
            Self::Help => f.write_str("Help"),
            Self::Exit => f.write_str("Exit"),
            Self::None => f.write_str("None"),
        }
    }
}

fn required_argument(command: &str, usage: &str, arg: &str) -> Result<String, CommandError> {
    if arg.is_empty() {
        Err(CommandError::MissingArgument {
            command: command.to_string(),
            usage: usage.to_string(),
        })
    } else {
        Ok(arg.to_string())
    }
}

fn no_argument(
    command: &str,
    arg: &str,
    parsed: SpecialCommand,
) -> Result<SpecialCommand, CommandError> {
    if arg.is_empty() {
        Ok(parsed)
    } else {
        Err(CommandError::UnsupportedArgument {
            command: command.to_string(),
            arg: arg.to_string(),
        })
    }
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns `CommandError::UnknownCommand` if input starts with "/" but is not
/// a valid command, `CommandError::MissingArgument` if a command requires an
/// argument but none was provided, and `CommandError::UnsupportedArgument` if
/// a command that takes no argument receives one.
///
/// # Examples
///
/// ```
/// use tabletalk::commands::special_commands::{parse_special_command, SpecialCommand};
/// use std::path::PathBuf;
///
/// assert_eq!(
///     parse_special_command("/upload data/People.csv").unwrap(),
///     SpecialCommand::Upload(PathBuf::from("data/People.csv"))
/// );
/// assert_eq!(
///     parse_special_command("what is the average age?").unwrap(),
///     SpecialCommand::None
/// );
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    // If input doesn't start with "/", it's not a command (except exit/quit)
    if !trimmed.starts_with('/') {
        return Ok(match lower.as_str() {
            "exit" | "quit" => SpecialCommand::Exit,
            _ => SpecialCommand::None,
        });
    }

    let (name, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((name, rest)) => (name.to_lowercase(), rest.trim()),
        None => (lower, ""),
    };

    match name.as_str() {
        "/upload" | "/csv" => required_argument("/upload", "/upload <path/to/file.csv>", arg)
            .map(|path| SpecialCommand::Upload(PathBuf::from(path))),
        "/connect" | "/db" => {
            required_argument("/connect", "/connect <database engine URL>", arg)
                .map(SpecialCommand::Connect)
        }
        "/key" => required_argument("/key", "/key <OpenAI API key>", arg).map(SpecialCommand::SetKey),
        "/transcript" | "/history" => no_argument("/transcript", arg, SpecialCommand::ShowTranscript),
        "/status" => no_argument("/status", arg, SpecialCommand::ShowStatus),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/exit" | "/quit" => Ok(SpecialCommand::Exit),
        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

/// Help text for special commands
pub fn help_text() -> &'static str {
    r#"
Special Commands for Interactive Chat Mode
===========================================

DATA SOURCE:
  /upload <path>        - Load a CSV file as the table to ask about
  /csv <path>           - Same as /upload
  /connect <url>        - Connect to a SQLite or PostgreSQL database URL
  /db <url>             - Same as /connect

CREDENTIALS:
  /key <api key>        - Set the OpenAI API key for this session

SESSION INFORMATION:
  /transcript           - Show the whole conversation again
  /status               - Show the active data source and session state
  /help                 - Show this help message
  /?                    - Same as /help

SESSION CONTROL:
  exit                  - Exit interactive mode
  quit                  - Same as exit

NOTES:
  - Command names are case-insensitive; arguments are used as typed
  - Anything else you type is sent to the assistant as a question
  - A new upload or connection replaces the previous data source
"#
}

/// Display help text for special commands
pub fn print_help() {
    println!("{}", help_text());
}
