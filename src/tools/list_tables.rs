//! list_tables tool
//!
//! Lets the model discover which tables and views the active store holds.

use crate::error::Result;
use crate::store::SqlDatabase;
use crate::tools::{ToolExecutor, ToolResult};
use serde_json::json;

/// Registered name of the tool
pub const TOOL_NAME: &str = "list_tables";

/// Lists tables and views in the active store
pub struct ListTablesTool {
    database: SqlDatabase,
}

impl ListTablesTool {
    /// Creates a tool bound to `database`
    pub fn new(database: SqlDatabase) -> Self {
        Self { database }
    }
}

#[async_trait::async_trait]
impl ToolExecutor for ListTablesTool {
    fn tool_definition(&self) -> serde_json::Value {
        json!({
            "name": TOOL_NAME,
            "description": "List the tables in the database as a comma-separated list. Call this first to see what data is available.",
            "parameters": {
                "type": "object",
                "properties": {}
            }
        })
    }

    async fn execute(&self, _args: serde_json::Value) -> Result<ToolResult> {
        let tables = self.database.table_names().await?;
        if tables.is_empty() {
            return Ok(ToolResult::success(
                "The database contains no tables".to_string(),
            ));
        }
        Ok(ToolResult::success(tables.join(", ")))
    }
}
