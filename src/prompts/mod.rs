//! System prompt for the answering agent
//!
//! The prompt combines SQL agent instructions with the assistant persona
//! shown to the user.

use crate::store::{Dialect, StoreSource};

/// Persona appended to every system prompt
pub const PERSONA: &str = "Please respond to the user in a kind and friendly manner, while maintaining a professional tone.";

/// Builds the system prompt for a question against `source`
///
/// # Arguments
///
/// * `source` - Origin of the active store, described to the model
/// * `dialect` - SQL dialect the model must write
/// * `max_rows` - Row cap applied by the `run_query` tool
///
/// # Examples
///
/// ```
/// use tabletalk::prompts::build_system_prompt;
/// use tabletalk::store::{Dialect, StoreSource};
///
/// let source = StoreSource::Connected { descriptor: "sqlite://".to_string() };
/// let prompt = build_system_prompt(&source, Dialect::Sqlite, 50);
/// assert!(prompt.contains("SQLite"));
/// assert!(prompt.contains("list_tables"));
/// ```
pub fn build_system_prompt(source: &StoreSource, dialect: Dialect, max_rows: usize) -> String {
    let data_note = match source {
        StoreSource::Ephemeral {
            file_name, table, ..
        } => format!(
            "The user uploaded the CSV file '{}'. Its rows are stored in the table `{}`.",
            file_name, table
        ),
        StoreSource::Connected { .. } => {
            "The user connected a database. Discover its tables before answering.".to_string()
        }
    };

    format!(
        r#"You are an agent designed to interact with a SQL database.
Given an input question, create a syntactically correct {dialect} query to run, then look at the results of the query and return the answer.
Unless the user specifies a specific number of examples they wish to obtain, always limit your query to at most {max_rows} results.
You can order the results by a relevant column to return the most interesting examples in the database.
Never query for all the columns from a specific table, only ask for the relevant columns given the question.

{data_note}

TOOLS:
- list_tables: see which tables exist. Always start here.
- describe_tables: see the schema and sample rows of the tables relevant to the question.
- run_query: execute a query. If you get an error, rewrite the query and try again.

CONSTRAINTS:
- Only use the information returned by the tools to construct your final answer.
- Do NOT make any DML statements (INSERT, UPDATE, DELETE, DROP etc.) to the database.
- If the question does not seem related to the database, answer without querying it.

{PERSONA}"#
    )
}
