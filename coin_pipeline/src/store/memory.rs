//! In-process layer store

use crate::data::{Asset, RawTable};
use crate::error::{PipelineError, Result};
use crate::store::{check_row_widths, CellValue, LayerStore};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
struct StoredTable {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

/// Layer store backed by a hash map of tables
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: HashMap<String, StoredTable>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the raw ingest table of an asset
    pub fn insert_raw(&mut self, asset: Asset, raw: RawTable) {
        let rows = raw
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.clone().map_or(CellValue::Null, CellValue::Text))
                    .collect()
            })
            .collect();

        self.tables.insert(
            asset.bronze_table().to_string(),
            StoredTable {
                columns: raw.headers().to_vec(),
                rows,
            },
        );
    }

    /// Check whether a table exists
    pub fn contains_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    /// Typed rows of a table, as written
    pub fn rows(&self, table: &str) -> Option<&[Vec<CellValue>]> {
        self.tables.get(table).map(|t| t.rows.as_slice())
    }

    /// Number of rows in a table, 0 if missing
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, |t| t.rows.len())
    }
}

impl LayerStore for MemoryStore {
    fn load_table(&self, table: &str) -> Result<RawTable> {
        let stored = self
            .tables
            .get(table)
            .ok_or_else(|| PipelineError::StoreError(format!("Table not found: {}", table)))?;

        let mut raw = RawTable::new(stored.columns.clone());
        for row in &stored.rows {
            raw.push_row(row.iter().map(CellValue::to_text).collect())?;
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

        // The new table is fully built before the old one is swapped out.
        let replacement = StoredTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows.to_vec(),
        };
        self.tables.insert(table.to_string(), replacement);

        debug!(table, rows = rows.len(), "replaced table");
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_discards_previous_rows() {
        let mut store = MemoryStore::new();
        let cols = ["A", "B"];
        let first = vec![
            vec![CellValue::Integer(1), CellValue::Text("x".into())],
            vec![CellValue::Integer(2), CellValue::Null],
        ];
        assert_eq!(store.replace_table("t", &cols, &first).unwrap(), 2);

        let second = vec![vec![CellValue::Integer(3), CellValue::real(f64::NAN)]];
        assert_eq!(store.replace_table("t", &cols, &second).unwrap(), 1);

        let loaded = store.load_table("t").unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.rows()[0], vec![Some("3".to_string()), None]);
    }

    #[test]
    fn test_width_mismatch_keeps_previous_content() {
        let mut store = MemoryStore::new();
        let cols = ["A"];
        store
            .replace_table("t", &cols, &[vec![CellValue::Integer(7)]])
            .unwrap();

        let bad = vec![vec![CellValue::Integer(1), CellValue::Integer(2)]];
        let result = store.replace_table("t", &cols, &bad);
        assert!(matches!(result, Err(PipelineError::WriteError { .. })));
        assert_eq!(store.rows("t").unwrap(), &[vec![CellValue::Integer(7)]]);
    }

    #[test]
    fn test_missing_table() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.load_raw(Asset::Bitcoin),
            Err(PipelineError::StoreError(_))
        ));
    }
}
