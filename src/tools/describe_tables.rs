//! describe_tables tool
//!
//! Returns the `CREATE` statement of each requested table followed by a few
//! sample rows, so the model can see column names and value shapes before
//! writing a query.

use crate::error::{Result, TabletalkError};
use crate::store::{quote_identifier, SqlDatabase};
use crate::tools::{ToolExecutor, ToolResult};
use serde::Deserialize;
use serde_json::json;

/// Registered name of the tool
pub const TOOL_NAME: &str = "describe_tables";

#[derive(Debug, Deserialize)]
struct DescribeTablesParams {
    tables: Vec<String>,
}

/// Shows schema and sample rows for a set of tables
pub struct DescribeTablesTool {
    database: SqlDatabase,
    sample_rows: usize,
}

impl DescribeTablesTool {
    /// Creates a tool bound to `database`, showing `sample_rows` rows per table
    pub fn new(database: SqlDatabase, sample_rows: usize) -> Self {
        Self {
            database,
            sample_rows,
        }
    }

    async fn describe(&self, table: &str) -> Result<String> {
        let Some(ddl) = self.database.table_ddl(table).await? else {
            return Err(TabletalkError::Tool(format!("Table '{}' does not exist", table)).into());
        };

        let mut section = format!("{}\n", ddl.trim());
        if self.sample_rows > 0 {
            let sample = self
                .database
                .query(
                    &format!(
                        "SELECT * FROM {} LIMIT {}",
                        quote_identifier(table),
                        self.sample_rows
                    ),
                    self.sample_rows,
                )
                .await?;
            section.push_str(&format!(
                "\n/*\n{} rows from {} table:\n{}*/\n",
                sample.rows.len(),
                table,
                sample.render()
            ));
        }
        Ok(section)
    }
}

#[async_trait::async_trait]
impl ToolExecutor for DescribeTablesTool {
    fn tool_definition(&self) -> serde_json::Value {
        json!({
            "name": TOOL_NAME,
            "description": "Show the schema and sample rows for the given tables. Make sure the tables exist by calling list_tables first.",
            "parameters": {
                "type": "object",
                "properties": {
                    "tables": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Names of the tables to describe"
                    }
                },
                "required": ["tables"]
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult> {
        let params: DescribeTablesParams = serde_json::from_value(args)
            .map_err(|e| TabletalkError::Tool(format!("Invalid parameters: {}", e)))?;

        if params.tables.is_empty() {
            return Ok(ToolResult::error("No tables were requested".to_string()));
        }

        let mut sections = Vec::with_capacity(params.tables.len());
        for table in &params.tables {
            match self.describe(table.trim()).await {
                Ok(section) => sections.push(section),
                Err(e) => return Ok(ToolResult::error(e.to_string())),
            }
        }

        Ok(ToolResult::success(sections.join("\n")))
    }
}
