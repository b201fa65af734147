//! Tools module for Tabletalk
//!
//! This module contains the tool executor trait, the tool registry, and the
//! SQL toolkit the answering agent uses to inspect and query the active store.

pub mod describe_tables;
pub mod list_tables;
pub mod run_query;

pub use describe_tables::DescribeTablesTool;
pub use list_tables::ListTablesTool;
pub use run_query::RunQueryTool;

use crate::config::ToolsConfig;
use crate::error::Result;
use crate::store::SqlDatabase;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Tool result structure
///
/// Represents the result of a tool execution with truncation support.
#[derive(Debug, Clone)]
pub struct ToolResult {
    /// Whether the tool execution succeeded
    pub success: bool,
    /// Output from the tool
    pub output: String,
    /// Error message if execution failed
    pub error: Option<String>,
    /// Whether the output was truncated
    pub truncated: bool,
}

impl ToolResult {
    /// Create a successful tool result
    pub fn success(output: String) -> Self {
        Self {
            success: true,
            output,
            error: None,
            truncated: false,
        }
    }

    /// Create a failed tool result
    ///
    /// Failed results are still fed back to the model, which can correct
    /// itself on the next iteration.
    pub fn error(error: String) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error),
            truncated: false,
        }
    }

    /// Truncate output if it exceeds the maximum size
    ///
    /// # Arguments
    ///
    /// * `max_size` - Maximum size in bytes
    pub fn truncate_if_needed(mut self, max_size: usize) -> Self {
        if self.output.len() > max_size {
            let mut cut = max_size;
            while !self.output.is_char_boundary(cut) {
                cut -= 1;
            }
            self.output.truncate(cut);
            self.output.push_str("\n... (truncated)");
            self.truncated = true;
        }
        self
    }

    /// Convert to a message string for the conversation
    pub fn to_message(&self) -> String {
        if self.success {
            if self.truncated {
                format!("{}\n(Output truncated to fit context window)", self.output)
            } else {
                self.output.clone()
            }
        } else {
            format!(
                "Error: {}",
                self.error.as_deref().unwrap_or("Unknown error")
            )
        }
    }
}

/// Tool executor trait for implementing tool execution logic
///
/// # Examples
///
/// ```no_run
/// use tabletalk::tools::{ToolExecutor, ToolResult};
/// use tabletalk::error::Result;
/// use async_trait::async_trait;
/// use serde_json::Value;
///
/// struct Echo;
///
/// #[async_trait]
/// impl ToolExecutor for Echo {
///     fn tool_definition(&self) -> Value {
///         serde_json::json!({
///             "name": "echo",
///             "description": "Echo the arguments back",
///             "parameters": {"type": "object", "properties": {}}
///         })
///     }
///
///     async fn execute(&self, args: Value) -> Result<ToolResult> {
///         Ok(ToolResult::success(args.to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Returns the tool definition as a JSON value
    ///
    /// The definition follows the OpenAI function calling format:
    /// `{"name": ..., "description": ..., "parameters": <JSON schema>}`.
    fn tool_definition(&self) -> serde_json::Value;

    /// Executes the tool with the given arguments
    ///
    /// # Errors
    ///
    /// Returns error if the arguments are malformed or execution fails in a
    /// way the model cannot recover from
    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult>;
}

/// Tool registry for managing available tools
///
/// Definitions are returned in name order so requests are stable.
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn ToolExecutor>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool executor in the registry
    pub fn register(&mut self, name: impl Into<String>, executor: Arc<dyn ToolExecutor>) {
        self.tools.insert(name.into(), executor);
    }

    /// Get a tool executor by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolExecutor>> {
        self.tools.get(name).cloned()
    }

    /// Get all tool definitions as JSON values
    pub fn all_definitions(&self) -> Vec<serde_json::Value> {
        self.tools
            .values()
            .map(|executor| executor.tool_definition())
            .collect()
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the SQL toolkit bound to `database`
///
/// # Examples
///
/// ```
/// use tabletalk::config::ToolsConfig;
/// use tabletalk::store::SqlDatabase;
/// use tabletalk::tools::build_sql_toolkit;
///
/// let db = SqlDatabase::new(rusqlite::Connection::open_in_memory().unwrap());
/// let registry = build_sql_toolkit(&db, &ToolsConfig::default());
/// assert_eq!(registry.len(), 3);
/// ```
pub fn build_sql_toolkit(database: &SqlDatabase, config: &ToolsConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(
        list_tables::TOOL_NAME,
        Arc::new(ListTablesTool::new(database.clone())),
    );
    registry.register(
        describe_tables::TOOL_NAME,
        Arc::new(DescribeTablesTool::new(database.clone(), config.sample_rows)),
    );
    registry.register(
        run_query::TOOL_NAME,
        Arc::new(RunQueryTool::new(database.clone(), config.max_query_rows)),
    );
    registry
}
