//! run_query tool
//!
//! Executes one read-only SQL statement against the active store. SQL errors
//! are returned as tool output rather than failing the agent, so the model can
//! rewrite the query.

use crate::error::{Result, TabletalkError};
use crate::store::SqlDatabase;
use crate::tools::{ToolExecutor, ToolResult};
use serde::Deserialize;
use serde_json::json;

/// Registered name of the tool
pub const TOOL_NAME: &str = "run_query";

#[derive(Debug, Deserialize)]
struct RunQueryParams {
    query: String,
}

/// Runs a SQL query and returns the rows as a text table
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use tabletalk::store::SqlDatabase;
/// use tabletalk::tools::{RunQueryTool, ToolExecutor};
///
/// # tokio_test::block_on(async {
/// let conn = rusqlite::Connection::open_in_memory().unwrap();
/// conn.execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (41), (1);")
///     .unwrap();
/// let tool = RunQueryTool::new(SqlDatabase::new(conn), 10);
///
/// let result = tool
///     .execute(json!({"query": "SELECT SUM(x) AS total FROM t"}))
///     .await
///     .unwrap();
/// assert!(result.success);
/// assert!(result.output.contains("42"));
/// # });
/// ```
pub struct RunQueryTool {
    database: SqlDatabase,
    max_rows: usize,
}

impl RunQueryTool {
    /// Creates a tool bound to `database`, returning at most `max_rows` rows
    pub fn new(database: SqlDatabase, max_rows: usize) -> Self {
        Self { database, max_rows }
    }
}

#[async_trait::async_trait]
impl ToolExecutor for RunQueryTool {
    fn tool_definition(&self) -> serde_json::Value {
        json!({
            "name": TOOL_NAME,
            "description": format!(
                "Execute a single read-only {} query and return the result. At most {} rows are returned; use aggregates or LIMIT for large tables. If the query is wrong an error is returned; rewrite it and try again.",
                self.database.dialect(),
                self.max_rows
            ),
            "parameters": {
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": format!("A syntactically correct {} SELECT statement", self.database.dialect())
                    }
                },
                "required": ["query"]
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult> {
        let params: RunQueryParams = serde_json::from_value(args)
            .map_err(|e| TabletalkError::Tool(format!("Invalid parameters: {}", e)))?;

        let sql = params.query.trim();
        if sql.is_empty() {
            return Ok(ToolResult::error("Query is empty".to_string()));
        }

        tracing::debug!(query = %sql, "Running query");

        match self.database.query(sql, self.max_rows).await {
            Ok(result) => Ok(ToolResult::success(result.render())),
            Err(e) => match e.downcast_ref::<TabletalkError>() {
                Some(TabletalkError::Query(message)) => {
                    tracing::debug!(error = %message, "Query failed");
                    Ok(ToolResult::error(message.clone()))
                }
                _ => Err(e),
            },
        }
    }
}
