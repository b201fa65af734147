//! In-process SQLite backend

use crate::error::{Result, TabletalkError};
use crate::store::{quote_identifier, QueryResult};
use rusqlite::limits::Limit;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

/// Forbid attaching other database files to `conn`
pub(super) fn restrict(conn: &Connection) {
    let _ = conn.set_limit(Limit::SQLITE_LIMIT_ATTACHED, 0);
}

fn sqlite_error(e: rusqlite::Error) -> anyhow::Error {
    TabletalkError::from(e).into()
}

fn lock(conn: &Arc<Mutex<Connection>>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| TabletalkError::Query("Database connection lock poisoned".to_string()).into())
}

pub(super) fn table_names(conn: &Arc<Mutex<Connection>>) -> Result<Vec<String>> {
    let conn = lock(conn)?;
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'
         ORDER BY name",
    )
    .map_err(sqlite_error)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())
        .map_err(sqlite_error)?;
    Ok(names)
}

pub(super) fn table_ddl(conn: &Arc<Mutex<Connection>>, table: &str) -> Result<Option<String>> {
    let conn = lock(conn)?;
    let ddl = conn
        .query_row(
            "SELECT sql FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
            [table],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()
        .map_err(sqlite_error)?;
    Ok(ddl.flatten())
}

pub(super) fn columns(conn: &Arc<Mutex<Connection>>, table: &str) -> Result<Vec<String>> {
    let conn = lock(conn)?;
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({})", quote_identifier(table)))
        .map_err(sqlite_error)?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())
        .map_err(sqlite_error)?;
    Ok(columns)
}

pub(super) fn row_count(conn: &Arc<Mutex<Connection>>, table: &str) -> Result<usize> {
    let conn = lock(conn)?;
    let count: i64 = conn
        .query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_identifier(table)),
            [],
            |row| row.get(0),
        )
        .map_err(sqlite_error)?;
    Ok(usize::try_from(count).unwrap_or(0))
}

pub(super) fn query(
    conn: &Arc<Mutex<Connection>>,
    sql: &str,
    max_rows: usize,
) -> Result<QueryResult> {
    let conn = lock(conn)?;
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| TabletalkError::Query(e.to_string()))?;

    if !stmt.readonly() {
        return Err(
            TabletalkError::Query("Only read-only statements are allowed".to_string()).into(),
        );
    }

    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();

    let mut rows = stmt
        .query([])
        .map_err(|e| TabletalkError::Query(e.to_string()))?;
    let mut collected = Vec::new();
    let mut truncated = false;

    while let Some(row) = rows
        .next()
        .map_err(|e| TabletalkError::Query(e.to_string()))?
    {
        if collected.len() == max_rows {
            truncated = true;
            break;
        }
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            let value = row
                .get_ref(idx)
                .map_err(|e| TabletalkError::Query(e.to_string()))?;
            values.push(display_value(value));
        }
        collected.push(values);
    }

    Ok(QueryResult {
        columns,
        rows: collected,
        truncated,
    })
}

fn display_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<blob {} bytes>", b.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_value_forms() {
        assert_eq!(display_value(ValueRef::Null), "NULL");
        assert_eq!(display_value(ValueRef::Real(1.5)), "1.5");
        assert_eq!(display_value(ValueRef::Blob(&[1, 2, 3])), "<blob 3 bytes>");
    }

    #[test]
    fn test_missing_table_is_sqlite_error() {
        let conn = Arc::new(Mutex::new(Connection::open_in_memory().unwrap()));
        let err = row_count(&conn, "ghosts").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TabletalkError>(),
            Some(TabletalkError::Sqlite(_))
        ));
    }

    #[test]
    fn test_restrict_blocks_attach() {
        let conn = Connection::open_in_memory().unwrap();
        restrict(&conn);
        assert!(conn
            .execute_batch("ATTACH ':memory:' AS other")
            .is_err());
    }
}
