//! Opening user-described databases
//!
//! Descriptors follow the SQLAlchemy URL shape users already paste from other
//! tools. SQLite files are opened in-process; PostgreSQL servers are reached
//! over the network.

use crate::error::{Result, TabletalkError};
use crate::store::{postgres, DataStoreHandle, SqlDatabase, StoreSource};
use rusqlite::{Connection, OpenFlags};
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// A parsed connection descriptor
#[derive(Clone, PartialEq, Eq)]
pub enum Descriptor {
    /// SQLite database file that must already exist
    SqliteFile(PathBuf),
    /// Private in-memory SQLite database
    SqliteMemory,
    /// PostgreSQL URL, normalized to the `postgresql://` scheme
    Postgres(String),
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SqliteFile(path) => f.debug_tuple("SqliteFile").field(path).finish(),
            Self::SqliteMemory => write!(f, "SqliteMemory"),
            Self::Postgres(url) => f.debug_tuple("Postgres").field(&redact(url)).finish(),
        }
    }
}

/// Parse a connection descriptor
///
/// # Errors
///
/// Returns `TabletalkError::Connection` for blank input, unsupported schemes
/// and SQLite URLs carrying a host
///
/// # Examples
///
/// ```
/// use tabletalk::store::{parse_descriptor, Descriptor};
/// use std::path::PathBuf;
///
/// assert_eq!(
///     parse_descriptor("sqlite:///shop.db").unwrap(),
///     Descriptor::SqliteFile(PathBuf::from("shop.db"))
/// );
/// assert_eq!(
///     parse_descriptor("sqlite:////var/data/shop.db").unwrap(),
///     Descriptor::SqliteFile(PathBuf::from("/var/data/shop.db"))
/// );
/// assert_eq!(
///     parse_descriptor("postgresql+psycopg2://db.example.com/shop").unwrap(),
///     Descriptor::Postgres("postgresql://db.example.com/shop".to_string())
/// );
/// assert!(parse_descriptor("mysql://db.example.com/shop").is_err());
/// ```
pub fn parse_descriptor(raw: &str) -> Result<Descriptor> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(TabletalkError::Connection("Connection descriptor is empty".to_string()).into());
    }

    let Some((scheme, rest)) = raw.split_once("://") else {
        // Bare path
        return Ok(Descriptor::SqliteFile(PathBuf::from(raw)));
    };

    let backend = scheme.split('+').next().unwrap_or(scheme).to_ascii_lowercase();
    match backend.as_str() {
        "sqlite" => parse_sqlite(raw, rest),
        "postgresql" | "postgres" => Ok(Descriptor::Postgres(format!("postgresql://{}", rest))),
        _ => {
            let scheme = Url::parse(raw)
                .map(|url| url.scheme().to_string())
                .unwrap_or_else(|_| scheme.to_string());
            Err(TabletalkError::Connection(format!(
                "Unsupported database backend '{}'; use sqlite or postgresql",
                scheme
            ))
            .into())
        }
    }
}

fn parse_sqlite(raw: &str, rest: &str) -> Result<Descriptor> {
    let rest = match rest.split_once('?') {
        Some((path, query)) => {
            tracing::warn!(options = ?option_keys(query), "Ignoring SQLite connection options");
            path
        }
        None => rest,
    };

    if rest.is_empty() {
        return Ok(Descriptor::SqliteMemory);
    }

    let Some(path) = rest.strip_prefix('/') else {
        return Err(TabletalkError::Connection(format!(
            "SQLite descriptors take no host; use sqlite:///relative.db or sqlite:////absolute.db (got '{}')",
            redact(raw)
        ))
        .into());
    };

    match path {
        "" | ":memory:" => Ok(Descriptor::SqliteMemory),
        path => Ok(Descriptor::SqliteFile(PathBuf::from(path))),
    }
}

/// Names of the options in a descriptor query string, without their values
fn option_keys(query: &str) -> Vec<&str> {
    query
        .split('&')
        .filter_map(|pair| pair.split('=').next())
        .filter(|key| !key.is_empty())
        .collect()
}

/// Open the store named by `raw`
///
/// SQLite files are opened without being created and their schema is read
/// once, so a missing or non-database file fails here. PostgreSQL URLs fail
/// here when no connection can be established.
///
/// # Errors
///
/// Returns `TabletalkError::Connection` if the descriptor is invalid or the
/// database cannot be opened
pub async fn connect(raw: &str) -> Result<DataStoreHandle> {
    let descriptor = parse_descriptor(raw)?;
    let redacted = redact(raw.trim());

    let database = match &descriptor {
        Descriptor::Postgres(url) => {
            let pool = postgres::open(url).await.map_err(|e| open_error(&redacted, e))?;
            SqlDatabase::postgres(pool)
        }
        Descriptor::SqliteMemory | Descriptor::SqliteFile(_) => {
            let conn = match &descriptor {
                Descriptor::SqliteFile(path) => Connection::open_with_flags(
                    path,
                    OpenFlags::SQLITE_OPEN_READ_WRITE
                        | OpenFlags::SQLITE_OPEN_URI
                        | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                ),
                _ => Connection::open_in_memory(),
            }
            .map_err(|e| open_error(&redacted, e))?;

            // Opening is lazy in SQLite; touch the schema so a non-database file is reported here.
            conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
                row.get::<_, i64>(0)
            })
            .map_err(|e| open_error(&redacted, e))?;
            SqlDatabase::new(conn)
        }
    };

    tracing::info!(descriptor = %redacted, dialect = %database.dialect(), "Connected to database");

    Ok(DataStoreHandle::connected(
        StoreSource::Connected {
            descriptor: redacted,
        },
        database,
    ))
}

fn open_error(redacted: &str, e: impl fmt::Display) -> TabletalkError {
    TabletalkError::Connection(format!("Failed to open {}: {}", redacted, e))
}

/// Hide any password embedded in a descriptor
pub fn redact(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            if url.set_password(Some("****")).is_ok() {
                url.to_string()
            } else {
                raw.to_string()
            }
        }
        _ => raw.to_string(),
    }
}
