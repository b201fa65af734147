//! Command-line interface definition for Tabletalk
//!
//! This module defines the CLI structure using clap's derive API,
//! providing an interactive chat command and a one-shot ask command.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Tabletalk - chat with your tables
///
/// Load a CSV file or connect to a SQL database, then ask questions
/// in plain language.
#[derive(Parser, Debug, Clone)]
#[command(name = "tabletalk")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Data source and credential settings shared by every command
///
/// These mirror the settings panel of an interactive session: when both
/// `--csv` and `--database-url` are given, the CSV wins.
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// CSV file to load into a disposable database
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Database URL to connect to (sqlite:///data/shop.db or postgresql://user@host/db)
    #[arg(long)]
    pub database_url: Option<String>,

    /// API key for the language model provider
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Override the model from config
    #[arg(short, long)]
    pub model: Option<String>,
}

/// Available commands for Tabletalk
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Ask a single question and print the answer
    Ask {
        #[command(flatten)]
        session: SessionArgs,

        /// Question to ask about the data
        #[arg(short, long, value_parser = non_blank)]
        question: String,
    },
}

fn non_blank(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err("question cannot be blank".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

impl Commands {
    /// Session settings carried by the command
    pub fn session_args(&self) -> &SessionArgs {
        match self {
            Self::Chat { session } | Self::Ask { session, .. } => session,
        }
    }

    /// Model override supplied on the command line, if any
    pub fn model_override(&self) -> Option<&str> {
        self.session_args().model.as_deref()
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            json_logs: false,
            command: Commands::Chat {
                session: SessionArgs::default(),
            },
        }
    }
}
