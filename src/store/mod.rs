//! Relational data stores a session can query
//!
//! A session has at most one active [`DataStoreHandle`]. It is produced either
//! by the [`ingest`] module, which materializes an uploaded CSV file into a
//! disposable SQLite database, or by the [`connector`] module, which opens a
//! database named by a connection descriptor.
//!
//! SQLite databases are opened in-process; PostgreSQL databases are reached
//! through a small `sqlx` pool. Both sit behind [`SqlDatabase`].

use crate::error::{Result, TabletalkError};
use prettytable::{format, Cell, Row, Table};
use rusqlite::Connection;
use sqlx::postgres::PgPool;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub mod connector;
pub mod ingest;
mod postgres;
mod sqlite;

pub use connector::{connect, parse_descriptor, Descriptor};
pub use ingest::{ColumnType, RowSet, TabularIngestor};

/// SQL dialect spoken by a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// SQLite, opened in-process
    Sqlite,
    /// PostgreSQL, reached over the network
    Postgres,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite => write!(f, "SQLite"),
            Self::Postgres => write!(f, "PostgreSQL"),
        }
    }
}

#[derive(Clone)]
enum Backend {
    Sqlite(Arc<Mutex<Connection>>),
    Postgres(PgPool),
}

/// Shared handle to an open database
///
/// Clones share the same connection or pool. The SQL toolkit holds clones for
/// the duration of a single agent invocation.
#[derive(Clone)]
pub struct SqlDatabase {
    backend: Backend,
}

/// Rows produced by a query, rendered as text for the transcript and the agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    /// Column names in select order
    pub columns: Vec<String>,
    /// Cell values converted to display strings (`NULL` for SQL nulls)
    pub rows: Vec<Vec<String>>,
    /// True when more rows were available than the row cap allowed
    pub truncated: bool,
}

impl QueryResult {
    /// Render as a plain text table
    ///
    /// # Examples
    ///
    /// ```
    /// use tabletalk::store::QueryResult;
    ///
    /// let result = QueryResult {
    ///     columns: vec!["n".to_string()],
    ///     rows: vec![vec!["3".to_string()]],
    ///     truncated: false,
    /// };
    /// assert!(result.render().contains('3'));
    /// ```
    pub fn render(&self) -> String {
        if self.rows.is_empty() {
            return "(no rows)".to_string();
        }

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(Row::new(self.columns.iter().map(|c| Cell::new(c)).collect()));
        for row in &self.rows {
            table.add_row(Row::new(row.iter().map(|v| Cell::new(v)).collect()));
        }

        let mut rendered = table.to_string();
        if self.truncated {
            rendered.push_str(&format!("(showing first {} rows)\n", self.rows.len()));
        }
        rendered
    }
}

impl SqlDatabase {
    /// Wrap an open SQLite connection
    ///
    /// Attaching further database files is disabled on the connection, so
    /// queries can only see the database it was opened on.
    pub fn new(conn: Connection) -> Self {
        sqlite::restrict(&conn);
        Self {
            backend: Backend::Sqlite(Arc::new(Mutex::new(conn))),
        }
    }

    /// Wrap a PostgreSQL pool
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            backend: Backend::Postgres(pool),
        }
    }

    /// Dialect queries must be written in
    pub fn dialect(&self) -> Dialect {
        match self.backend {
            Backend::Sqlite(_) => Dialect::Sqlite,
            Backend::Postgres(_) => Dialect::Postgres,
        }
    }

    /// Names of user tables and views, sorted
    pub async fn table_names(&self) -> Result<Vec<String>> {
        match &self.backend {
            Backend::Sqlite(conn) => sqlite::table_names(conn),
            Backend::Postgres(pool) => postgres::table_names(pool).await,
        }
    }

    /// `CREATE` statement of a table or view, if it exists
    ///
    /// PostgreSQL keeps no DDL text, so one is rebuilt from the catalog.
    pub async fn table_ddl(&self, table: &str) -> Result<Option<String>> {
        match &self.backend {
            Backend::Sqlite(conn) => sqlite::table_ddl(conn, table),
            Backend::Postgres(pool) => postgres::table_ddl(pool, table).await,
        }
    }

    /// Column names of a table, in declaration order
    pub async fn columns(&self, table: &str) -> Result<Vec<String>> {
        match &self.backend {
            Backend::Sqlite(conn) => sqlite::columns(conn, table),
            Backend::Postgres(pool) => postgres::columns(pool, table).await,
        }
    }

    /// Number of rows in a table
    pub async fn row_count(&self, table: &str) -> Result<usize> {
        match &self.backend {
            Backend::Sqlite(conn) => sqlite::row_count(conn, table),
            Backend::Postgres(pool) => postgres::row_count(pool, table).await,
        }
    }

    /// Run a single read-only statement and collect up to `max_rows` rows
    ///
    /// # Errors
    ///
    /// Returns `TabletalkError::Query` if the text holds more than one
    /// statement, the statement does not compile, modifies the database, or
    /// fails while running
    pub async fn query(&self, sql: &str, max_rows: usize) -> Result<QueryResult> {
        let statement = single_statement(sql)?;
        match &self.backend {
            Backend::Sqlite(conn) => sqlite::query(conn, statement, max_rows),
            Backend::Postgres(pool) => postgres::query(pool, statement, max_rows).await,
        }
    }
}

/// Strip trailing semicolons and reject text holding several statements
pub(crate) fn single_statement(sql: &str) -> Result<&str> {
    let statement = sql
        .trim()
        .trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    if statement.is_empty() {
        return Err(TabletalkError::Query("Query is empty".to_string()).into());
    }
    if has_unquoted_semicolon(statement) {
        return Err(
            TabletalkError::Query("Only a single statement is allowed".to_string()).into(),
        );
    }
    Ok(statement)
}

fn has_unquoted_semicolon(sql: &str) -> bool {
    let mut quote: Option<char> = None;
    for c in sql.chars() {
        match (quote, c) {
            (None, '\'' | '"') => quote = Some(c),
            (Some(open), c) if c == open => quote = None,
            (None, ';') => return true,
            _ => {}
        }
    }
    false
}

/// Quote an identifier for use in generated SQL
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Where the active store came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSource {
    /// Disposable database built from an uploaded file
    Ephemeral {
        /// File name of the upload
        file_name: String,
        /// Table the rows were written to
        table: String,
        /// Location of the backing database file
        path: PathBuf,
    },
    /// Database opened from a connection descriptor
    Connected {
        /// Descriptor with any password redacted
        descriptor: String,
    },
}

impl fmt::Display for StoreSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ephemeral {
                file_name, table, ..
            } => write!(f, "CSV '{}' loaded as table {}", file_name, table),
            Self::Connected { descriptor } => write!(f, "database {}", descriptor),
        }
    }
}

/// The single active data store of a session
///
/// An ephemeral store owns the temporary directory backing it; dropping the
/// handle closes the connection and removes the directory.
pub struct DataStoreHandle {
    source: StoreSource,
    database: SqlDatabase,
    // Declared after `database` so the connection closes before the directory is removed.
    scratch: Option<TempDir>,
}

impl DataStoreHandle {
    /// Handle for a disposable store living in `scratch`
    pub fn ephemeral(source: StoreSource, database: SqlDatabase, scratch: TempDir) -> Self {
        Self {
            source,
            database,
            scratch: Some(scratch),
        }
    }

    /// Handle for an externally owned database
    pub fn connected(source: StoreSource, database: SqlDatabase) -> Self {
        Self {
            source,
            database,
            scratch: None,
        }
    }

    /// Origin of the store
    pub fn source(&self) -> &StoreSource {
        &self.source
    }

    /// Shared connection to the store
    pub fn database(&self) -> &SqlDatabase {
        &self.database
    }

    /// Temporary directory backing an ephemeral store
    pub fn scratch_dir(&self) -> Option<&std::path::Path> {
        self.scratch.as_ref().map(|dir| dir.path())
    }
}

impl fmt::Debug for DataStoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataStoreHandle")
            .field("source", &self.source)
            .finish()
    }
}
