//! Layer storage: truncate-and-load tables for every layer
//!
//! Stores are explicit handles passed into the pipeline. A
//! [`LayerStore::replace_table`] call is all-or-nothing: either the new row
//! set fully replaces the table, or the previous content stays visible and a
//! `WriteError` is returned.

use crate::conform::parse_date;
use crate::data::{Asset, ConformedSeries, RawTable};
use crate::error::{PipelineError, Result};
use crate::features::FeatureRow;
use crate::forecast::{ForecastRecord, Horizon};
use chrono::NaiveDate;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Forecast table shared by both assets
pub const PLATINUM_TABLE: &str = "platinum_crypto_horizon";

/// Columns of the conformed (silver) tables
pub const SILVER_COLUMNS: &[&str] = &[
    "PriceDate",
    "Open",
    "High",
    "Low",
    "Close",
    "Volume",
    "DailyReturn",
    "VolumeMillions",
    "Coin",
];

/// Columns of the feature (gold) tables
pub const GOLD_COLUMNS: &[&str] = &[
    "PriceDate",
    "Open",
    "High",
    "Low",
    "Close",
    "Volume",
    "DailyReturn",
    "LogReturn",
    "VolumeMillions",
    "Coin",
    "CumulativeReturn",
    "Drawdown",
    "Year",
    "Month",
    "DayOfWeek",
    "SMA7",
    "SMA30",
    "SMA90",
    "Vol7",
    "Vol30",
    "Vol90",
    "VolAvg30",
];

/// Columns of the forecast (platinum) table
pub const PLATINUM_COLUMNS: &[&str] = &[
    "Coin",
    "HorizonLabel",
    "TargetDate",
    "Forecast",
    "ReturnPct",
];

/// A typed cell written to a layer table
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Date(NaiveDate),
}

impl CellValue {
    /// Real cell; non-finite values are stored as NULL
    pub fn real(value: f64) -> Self {
        if value.is_finite() {
            CellValue::Real(value)
        } else {
            CellValue::Null
        }
    }

    /// Optional real cell
    pub fn opt_real(value: Option<f64>) -> Self {
        value.map_or(CellValue::Null, CellValue::real)
    }

    /// Volume cell
    pub fn volume(value: u64) -> Self {
        CellValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }

    /// Text rendering used when a table is read back untyped
    pub fn to_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Integer(i) => Some(i.to_string()),
            CellValue::Real(f) => Some(f.to_string()),
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }
}

/// Read and full-replacement write access to the layer tables
pub trait LayerStore {
    /// Read a whole table as untyped rows
    fn load_table(&self, table: &str) -> Result<RawTable>;

    /// Atomically clear `table` and write `rows`; returns the number of rows written
    fn replace_table(
        &mut self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<CellValue>],
    ) -> Result<usize>;

    /// Read the raw ingest rows of an asset
    fn load_raw(&self, asset: Asset) -> Result<RawTable> {
        self.load_table(asset.bronze_table())
    }
}

/// Reject rows whose width differs from the column list
pub(crate) fn check_row_widths(
    table: &str,
    columns: &[&str],
    rows: &[Vec<CellValue>],
) -> Result<()> {
    if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
        return Err(PipelineError::WriteError {
            table: table.to_string(),
            reason: format!(
                "row {} has {} values but {} columns were given",
                idx,
                row.len(),
                columns.len()
            ),
        });
    }
    Ok(())
}

/// Silver rows of a conformed series
pub fn silver_rows(series: &ConformedSeries) -> Vec<Vec<CellValue>> {
    series
        .rows()
        .iter()
        .map(|row| {
            let p = &row.point;
            vec![
                CellValue::Date(p.date),
                CellValue::real(p.data.open),
                CellValue::real(p.data.high),
                CellValue::real(p.data.low),
                CellValue::real(p.data.close),
                CellValue::volume(p.data.volume),
                CellValue::opt_real(row.daily_return),
                CellValue::real(p.data.volume as f64 * 1e-6),
                CellValue::Text(p.asset_label.clone()),
            ]
        })
        .collect()
}

/// Gold rows of engineered features
pub fn gold_rows(rows: &[FeatureRow]) -> Vec<Vec<CellValue>> {
    rows.iter()
        .map(|r| {
            vec![
                CellValue::Date(r.date),
                CellValue::real(r.data.open),
                CellValue::real(r.data.high),
                CellValue::real(r.data.low),
                CellValue::real(r.data.close),
                CellValue::volume(r.data.volume),
                CellValue::opt_real(r.daily_return),
                CellValue::real(r.log_return),
                CellValue::real(r.volume_millions),
                CellValue::Text(r.asset_label.clone()),
                CellValue::real(r.cumulative_return),
                CellValue::real(r.drawdown),
                CellValue::Integer(i64::from(r.year)),
                CellValue::Integer(i64::from(r.month)),
                CellValue::Integer(i64::from(r.weekday)),
                CellValue::real(r.sma7),
                CellValue::real(r.sma30),
                CellValue::real(r.sma90),
                CellValue::opt_real(r.vol7),
                CellValue::opt_real(r.vol30),
                CellValue::opt_real(r.vol90),
                CellValue::real(r.vol_avg30),
            ]
        })
        .collect()
}

/// Platinum rows of forecast records
pub fn platinum_rows(records: &[ForecastRecord]) -> Vec<Vec<CellValue>> {
    records
        .iter()
        .map(|r| {
            vec![
                CellValue::Text(r.coin.clone()),
                CellValue::Text(r.horizon.label().to_string()),
                CellValue::Date(r.target_date),
                CellValue::real(r.forecast),
                CellValue::real(r.return_pct),
            ]
        })
        .collect()
}

fn required_column(table: &RawTable, name: &str) -> Result<usize> {
    table.column_index(name).ok_or_else(|| {
        PipelineError::SchemaError(format!(
            "No {} column found; columns: {}",
            name,
            table.headers().join(", ")
        ))
    })
}

fn text_at<'a>(row: &'a [Option<String>], idx: usize) -> Option<&'a str> {
    row.get(idx).and_then(|c| c.as_deref()).map(str::trim)
}

/// `(PriceDate, Close)` pairs from a gold table read back from a store
///
/// Rows with an unparseable date or close are skipped.
pub fn close_history_from_table(table: &RawTable) -> Result<Vec<(NaiveDate, f64)>> {
    let date_idx = required_column(table, "PriceDate")?;
    let close_idx = required_column(table, "Close")?;

    Ok(table
        .rows()
        .iter()
        .filter_map(|row| {
            let date = parse_date(text_at(row, date_idx)?)?;
            let close = text_at(row, close_idx)?.parse::<f64>().ok()?;
            Some((date, close))
        })
        .collect())
}

/// Forecast records from a platinum table read back from a store
pub fn forecast_records_from_table(table: &RawTable) -> Result<Vec<ForecastRecord>> {
    let idx: Vec<usize> = PLATINUM_COLUMNS
        .iter()
        .map(|c| required_column(table, c))
        .collect::<Result<_>>()?;

    table
        .rows()
        .iter()
        .map(|row| -> Result<ForecastRecord> {
            let field = |i: usize| {
                text_at(row, idx[i]).ok_or_else(|| {
                    PipelineError::SchemaError(format!("Missing {} value", PLATINUM_COLUMNS[i]))
                })
            };
            let number = |i: usize| -> Result<f64> {
                field(i)?.parse::<f64>().map_err(|e| {
                    PipelineError::SchemaError(format!("Bad {} value: {}", PLATINUM_COLUMNS[i], e))
                })
            };

            let horizon = Horizon::from_label(field(1)?).ok_or_else(|| {
                PipelineError::SchemaError(format!(
                    "Unknown horizon label: {}",
                    row_text(row, idx[1])
                ))
            })?;
            let target_date = parse_date(field(2)?).ok_or_else(|| {
                PipelineError::SchemaError(format!("Bad target date: {}", row_text(row, idx[2])))
            })?;

            Ok(ForecastRecord {
                coin: field(0)?.to_string(),
                horizon,
                target_date,
                forecast: number(3)?,
                return_pct: number(4)?,
            })
        })
        .collect()
}

fn row_text(row: &[Option<String>], idx: usize) -> String {
    text_at(row, idx).unwrap_or_default().to_string()
}
