//! SQLite layer store
//!
//! Every layer table lives in one database file. Columns are created
//! without declared types; cells keep the storage class they were written
//! with and are read back as text.

use crate::data::{Asset, RawTable};
use crate::error::{PipelineError, Result};
use crate::store::{check_row_widths, CellValue, LayerStore};
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};
use std::path::Path;
use tracing::{debug, error};

impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CellValue::Null => ToSqlOutput::Owned(Value::Null),
            CellValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            CellValue::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            CellValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            CellValue::Date(d) => ToSqlOutput::Owned(Value::Text(d.format("%Y-%m-%d").to_string())),
        })
    }
}

/// Layer store backed by a SQLite database
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;");
        debug!(path = %path.as_ref().display(), "opened sqlite store");
        Ok(Self { conn })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Underlying connection, e.g. for seeding raw tables
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Write a raw ingest table for an asset, replacing any previous rows
    pub fn write_raw(&mut self, asset: Asset, raw: &RawTable) -> Result<usize> {
        let columns: Vec<&str> = raw.headers().iter().map(String::as_str).collect();
        let rows: Vec<Vec<CellValue>> = raw
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.clone().map_or(CellValue::Null, CellValue::Text))
                    .collect()
            })
            .collect();
        self.replace_table(asset.bronze_table(), &columns, &rows)
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

/// Double-quote an identifier; table and column names come from headers.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn value_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
    }
}

fn write_rows(
    tx: &Transaction<'_>,
    table: &str,
    columns: &[&str],
    rows: &[Vec<CellValue>],
) -> rusqlite::Result<usize> {
    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");

    tx.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {} ({});",
        quote_ident(table),
        column_list
    ))?;
    tx.execute(&format!("DELETE FROM {}", quote_ident(table)), [])?;

    let mut stmt = tx.prepare(&format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        column_list,
        placeholders
    ))?;
    for row in rows {
        stmt.execute(params_from_iter(row.iter()))?;
    }
    Ok(rows.len())
}

impl LayerStore for SqliteStore {
    fn load_table(&self, table: &str) -> Result<RawTable> {
        if !self.table_exists(table)? {
            return Err(PipelineError::StoreError(format!("Table not found: {}", table)));
        }

        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {} ORDER BY rowid", quote_ident(table)))?;
        let headers: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = headers.len();

        let mut raw = RawTable::new(headers);
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let cells = (0..width)
                .map(|i| row.get_ref(i).map(value_text))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            raw.push_row(cells)?;
        }
        Ok(raw)
    }

    fn replace_table(
        &mut self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<CellValue>],
    ) -> Result<usize> {
        check_row_widths(table, columns, rows)?;
        if columns.is_empty() {
            return Err(PipelineError::WriteError {
                table: table.to_string(),
                reason: "no columns given".to_string(),
            });
        }

        let write_error = |e: rusqlite::Error| {
            error!(table, error = %e, "table replacement failed, rolled back");
            PipelineError::WriteError {
                table: table.to_string(),
                reason: e.to_string(),
            }
        };

        // Dropping an uncommitted transaction rolls it back.
        let tx = self.conn.transaction().map_err(write_error)?;
        let written = write_rows(&tx, table, columns, rows).map_err(write_error)?;
        tx.commit().map_err(write_error)?;

        debug!(table, rows = written, "replaced table");
        Ok(written)
    }
}
