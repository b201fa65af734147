//! Tabular ingestion of uploaded CSV files
//!
//! An upload is parsed into a [`RowSet`] and then written as a single table
//! into a fresh SQLite database inside its own temporary directory. Nothing
//! is published unless the whole file parses and every row is inserted.

use crate::config::IngestConfig;
use crate::error::{Result, TabletalkError};
use crate::store::{quote_identifier, DataStoreHandle, SqlDatabase, StoreSource};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

/// SQL storage class inferred for a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Every non-empty cell parses as a 64-bit integer
    Integer,
    /// Every non-empty cell parses as a finite number
    Real,
    /// Anything else
    Text,
}

impl ColumnType {
    /// Declared type used in `CREATE TABLE`
    pub fn sql_name(&self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }

    fn infer<'a>(cells: impl Iterator<Item = &'a str>) -> Self {
        let mut inferred: Option<Self> = None;
        for cell in cells.filter(|c| !c.is_empty()) {
            let this = if cell.parse::<i64>().is_ok() {
                Self::Integer
            } else if cell.parse::<f64>().map(f64::is_finite).unwrap_or(false) {
                Self::Real
            } else {
                return Self::Text;
            };
            inferred = Some(match (inferred, this) {
                (Some(Self::Real), _) | (_, Self::Real) => Self::Real,
                _ => Self::Integer,
            });
        }
        inferred.unwrap_or(Self::Text)
    }

    fn convert(&self, cell: &str) -> Value {
        if cell.is_empty() {
            return Value::Null;
        }
        match self {
            Self::Integer => cell
                .parse()
                .map(Value::Integer)
                .unwrap_or_else(|_| Value::Text(cell.to_string())),
            Self::Real => cell
                .parse()
                .map(Value::Real)
                .unwrap_or_else(|_| Value::Text(cell.to_string())),
            Self::Text => Value::Text(cell.to_string()),
        }
    }
}

/// In-memory rows parsed from an uploaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSet {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RowSet {
    /// Parse delimited text with a header row
    ///
    /// Whitespace around headers and cells is dropped, so `ada, 36` reads the
    /// same as `ada,36`.
    ///
    /// # Errors
    ///
    /// Returns `TabletalkError::Ingest` when the header is missing, a record
    /// has a different number of fields than the header, or the text is not
    /// valid UTF-8
    ///
    /// # Examples
    ///
    /// ```
    /// use tabletalk::store::RowSet;
    ///
    /// let rows = RowSet::from_reader("name,age\nada,36\n".as_bytes(), b',').unwrap();
    /// assert_eq!(rows.headers(), &["name".to_string(), "age".to_string()]);
    /// assert_eq!(rows.len(), 1);
    /// ```
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .flexible(false)
            .from_reader(reader);

        let raw_headers: Vec<String> = csv_reader
            .headers()
            .map_err(|e| TabletalkError::Ingest(format!("Failed to read header row: {}", e)))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        if raw_headers.is_empty() || raw_headers.iter().all(|h| h.trim().is_empty()) {
            return Err(TabletalkError::Ingest("File has no header row".to_string()).into());
        }

        let headers = dedupe_headers(raw_headers);

        let mut rows = Vec::new();
        for (idx, record) in csv_reader.records().enumerate() {
            let record = record.map_err(|e| {
                TabletalkError::Ingest(format!("Malformed record {}: {}", idx + 1, e))
            })?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    /// Parse a file from disk
    ///
    /// # Errors
    ///
    /// Returns `TabletalkError::Ingest` if the file cannot be opened or parsed
    pub fn from_path(path: &Path, delimiter: u8) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            TabletalkError::Ingest(format!("Failed to open {}: {}", path.display(), e))
        })?;
        Self::from_reader(std::io::BufReader::new(file), delimiter)
    }

    /// Column names after disambiguation
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows, excluding the header
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true for a header-only file
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Inferred type of every column
    pub fn column_types(&self) -> Vec<ColumnType> {
        (0..self.headers.len())
            .map(|col| ColumnType::infer(self.rows.iter().map(|row| row[col].as_str())))
            .collect()
    }
}

/// Blank names become `Unnamed: <index>`; repeats get `.1`, `.2`, ... suffixes.
fn dedupe_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    raw.into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let base = if name.trim().is_empty() {
                format!("Unnamed: {}", idx)
            } else {
                name
            };
            let mut candidate = base.clone();
            let mut suffix = 1;
            while seen.contains(&candidate.to_lowercase()) {
                candidate = format!("{}.{}", base, suffix);
                suffix += 1;
            }
            seen.insert(candidate.to_lowercase());
            candidate
        })
        .collect()
}

/// Materializes uploaded files into disposable SQLite stores
#[derive(Debug, Clone)]
pub struct TabularIngestor {
    table_name: String,
    delimiter: u8,
}

impl TabularIngestor {
    /// Create an ingestor from configuration
    pub fn new(config: &IngestConfig) -> Self {
        Self {
            table_name: config.table_name.clone(),
            delimiter: u8::try_from(config.delimiter).unwrap_or(b','),
        }
    }

    /// Ingest a file from disk
    ///
    /// # Errors
    ///
    /// Returns `TabletalkError::Ingest` if the file is unreadable or malformed,
    /// or if the disposable store cannot be created
    pub fn ingest_path(&self, path: &Path) -> Result<DataStoreHandle> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if !is_csv {
            tracing::warn!("Upload {} does not have a .csv extension", file_name);
        }

        let rows = RowSet::from_path(path, self.delimiter)?;
        self.materialize(&rows, &file_name)
    }

    /// Ingest already-open delimited text
    pub fn ingest_reader<R: Read>(&self, reader: R, file_name: &str) -> Result<DataStoreHandle> {
        let rows = RowSet::from_reader(reader, self.delimiter)?;
        self.materialize(&rows, file_name)
    }

    /// Write `rows` as a single table into a new disposable store
    pub fn materialize(&self, rows: &RowSet, file_name: &str) -> Result<DataStoreHandle> {
        let scratch = tempfile::Builder::new()
            .prefix("tabletalk-")
            .tempdir()
            .map_err(|e| {
                TabletalkError::Ingest(format!("Failed to allocate disposable store: {}", e))
            })?;
        let path = scratch.path().join(format!("{}.db", self.table_name));

        let mut conn = Connection::open(&path).map_err(|e| {
            TabletalkError::Ingest(format!("Failed to create disposable store: {}", e))
        })?;
        self.write_table(&mut conn, rows)
            .map_err(|e| TabletalkError::Ingest(format!("Failed to write rows: {}", e)))?;

        tracing::info!(
            file = %file_name,
            table = %self.table_name,
            rows = rows.len(),
            columns = rows.headers().len(),
            "Materialized upload into disposable store"
        );

        let source = StoreSource::Ephemeral {
            file_name: file_name.to_string(),
            table: self.table_name.clone(),
            path,
        };
        Ok(DataStoreHandle::ephemeral(
            source,
            SqlDatabase::new(conn),
            scratch,
        ))
    }

    fn write_table(&self, conn: &mut Connection, rows: &RowSet) -> rusqlite::Result<()> {
        let types = rows.column_types();
        let column_defs = rows
            .headers()
            .iter()
            .zip(&types)
            .map(|(name, ty)| format!("{} {}", quote_identifier(name), ty.sql_name()))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; types.len()].join(", ");

        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "CREATE TABLE {} ({})",
                quote_identifier(&self.table_name),
                column_defs
            ),
            [],
        )?;
        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {} VALUES ({})",
                quote_identifier(&self.table_name),
                placeholders
            ))?;
            for row in rows.rows() {
                let values = row.iter().zip(&types).map(|(cell, ty)| ty.convert(cell));
                insert.execute(params_from_iter(values))?;
            }
        }
        tx.commit()
    }
}
