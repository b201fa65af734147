//! Tabletalk - chat with your tables
//!
//! This library lets a user load a CSV file or connect to a SQL database and
//! ask questions in plain language. A language model answers by calling SQL
//! tools against the active data store.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `store`: Disposable CSV-backed stores, database connections, and queries
//! - `conversation`: Append-only chat log and the agent's history window
//! - `session`: Per-session state and the turn state machine
//! - `agent`: Answering agent boundary, fault taxonomy, and tool-calling loop
//! - `providers`: Language model provider abstraction (OpenAI-compatible)
//! - `tools`: SQL toolkit offered to the model
//! - `transcript`: Terminal rendering of the conversation
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use tabletalk::{Config, Session, SqlAgent};
//! use tabletalk::credential::Credential;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let mut session = Session::new(&config);
//!     session.set_credential(Credential::new("sk-..."));
//!     session.connect("postgresql://reader@localhost/shop").await?;
//!
//!     let agent = SqlAgent::new(config);
//!     let outcome = session.submit(&agent, "How many orders were placed in May?").await;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod credential;
pub mod error;
pub mod prompts;
pub mod providers;
pub mod session;
pub mod store;
pub mod tools;
pub mod transcript;

// Re-export commonly used types
pub use agent::{AgentFault, AgentFaultKind, AnsweringAgent, SqlAgent};
pub use config::Config;
pub use conversation::{ChatTurn, Conversation, Role};
pub use error::{Result, TabletalkError};
pub use session::{ConfigurationUpdate, Session, TurnOutcome};
pub use store::DataStoreHandle;

#[cfg(test)]
pub mod test_utils;
