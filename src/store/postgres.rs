//! PostgreSQL backend reached through a `sqlx` pool
//!
//! Queries run inside a read-only transaction that is always rolled back.
//! Statements are sent with the simple query protocol so every value comes
//! back in text form, whatever its column type.

use crate::error::{Result, TabletalkError};
use crate::store::{quote_identifier, QueryResult};
use futures::TryStreamExt;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Executor, Row};
use std::time::Duration;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

fn query_error(e: sqlx::Error) -> anyhow::Error {
    TabletalkError::Query(e.to_string()).into()
}

/// Open a small pool and wait for the first connection
pub(super) async fn open(url: &str) -> std::result::Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(url)
        .await
}

pub(super) async fn table_names(pool: &PgPool) -> Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        "SELECT table_name::text FROM information_schema.tables
         WHERE table_schema = current_schema()
         ORDER BY table_name",
    )
    .fetch_all(pool)
    .await
    .map_err(query_error)
}

async fn column_info(pool: &PgPool, table: &str) -> Result<Vec<(String, String, String)>> {
    sqlx::query_as::<_, (String, String, String)>(
        "SELECT column_name::text, data_type::text, is_nullable::text
         FROM information_schema.columns
         WHERE table_schema = current_schema() AND table_name = $1
         ORDER BY ordinal_position",
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(query_error)
}

pub(super) async fn table_ddl(pool: &PgPool, table: &str) -> Result<Option<String>> {
    let columns = column_info(pool, table).await?;
    if columns.is_empty() {
        return Ok(None);
    }

    let body = columns
        .iter()
        .map(|(name, data_type, nullable)| {
            let mut line = format!("\t{} {}", quote_identifier(name), data_type);
            if nullable == "NO" {
                line.push_str(" NOT NULL");
            }
            line
        })
        .collect::<Vec<_>>()
        .join(",\n");
    Ok(Some(format!(
        "CREATE TABLE {} (\n{}\n)",
        quote_identifier(table),
        body
    )))
}

pub(super) async fn columns(pool: &PgPool, table: &str) -> Result<Vec<String>> {
    Ok(column_info(pool, table)
        .await?
        .into_iter()
        .map(|(name, _, _)| name)
        .collect())
}

pub(super) async fn row_count(pool: &PgPool, table: &str) -> Result<usize> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
    let count = sqlx::query_scalar::<_, i64>(&sql)
        .fetch_one(pool)
        .await
        .map_err(query_error)?;
    Ok(usize::try_from(count).unwrap_or(0))
}

pub(super) async fn query(pool: &PgPool, sql: &str, max_rows: usize) -> Result<QueryResult> {
    let mut tx = pool.begin().await.map_err(query_error)?;
    (&mut *tx)
        .execute("SET TRANSACTION READ ONLY")
        .await
        .map_err(query_error)?;

    let mut columns = Vec::new();
    let mut collected = Vec::new();
    let mut truncated = false;
    {
        let mut rows = (&mut *tx).fetch(sql);
        while let Some(row) = rows.try_next().await.map_err(query_error)? {
            if columns.is_empty() {
                columns = row.columns().iter().map(|c| c.name().to_string()).collect();
            }
            if collected.len() == max_rows {
                truncated = true;
                break;
            }
            collected.push(text_values(&row)?);
        }
    }

    tx.rollback().await.map_err(query_error)?;

    Ok(QueryResult {
        columns,
        rows: collected,
        truncated,
    })
}

fn text_values(row: &PgRow) -> Result<Vec<String>> {
    (0..row.len())
        .map(|idx| {
            row.try_get_unchecked::<Option<String>, _>(idx)
                .map(|value| value.unwrap_or_else(|| "NULL".to_string()))
                .map_err(query_error)
        })
        .collect()
}
