//! Per-asset records for each layer of the pipeline

use crate::error::{PipelineError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two assets the pipeline tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Asset {
    #[serde(rename = "BTC", alias = "Bitcoin", alias = "btc")]
    Bitcoin,
    #[serde(rename = "ETH", alias = "Ethereum", alias = "eth")]
    Ethereum,
}

impl Asset {
    /// Every tracked asset, in processing order
    pub const ALL: [Asset; 2] = [Asset::Bitcoin, Asset::Ethereum];

    /// Short ticker, also used as the `Coin` value of forecast records
    pub fn ticker(&self) -> &'static str {
        match self {
            Asset::Bitcoin => "BTC",
            Asset::Ethereum => "ETH",
        }
    }

    /// Human-readable label carried on every price row
    pub fn label(&self) -> &'static str {
        match self {
            Asset::Bitcoin => "Bitcoin",
            Asset::Ethereum => "Ethereum",
        }
    }

    /// Market data symbol of the upstream feed
    pub fn symbol(&self) -> &'static str {
        match self {
            Asset::Bitcoin => "BTC-USD",
            Asset::Ethereum => "ETH-USD",
        }
    }

    /// Raw ingest table
    pub fn bronze_table(&self) -> &'static str {
        match self {
            Asset::Bitcoin => "raw_btc_prices_bnz",
            Asset::Ethereum => "raw_eth_prices_bnz",
        }
    }

    /// Conformed series table
    pub fn silver_table(&self) -> &'static str {
        match self {
            Asset::Bitcoin => "raw_btc_prices_sil",
            Asset::Ethereum => "raw_eth_prices_sil",
        }
    }

    /// Engineered features table
    pub fn gold_table(&self) -> &'static str {
        match self {
            Asset::Bitcoin => "gold_btc_prices",
            Asset::Ethereum => "gold_eth_prices",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ticker())
    }
}

impl FromStr for Asset {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Asset::ALL
            .into_iter()
            .find(|a| {
                wanted.eq_ignore_ascii_case(a.ticker())
                    || wanted.eq_ignore_ascii_case(a.label())
                    || wanted.eq_ignore_ascii_case(a.symbol())
            })
            .ok_or_else(|| PipelineError::InvalidParameter(format!("Unknown asset: {}", s)))
    }
}

/// Untyped rows as read from a store: header names plus optional text cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Create an empty table with the given headers
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; it must have one cell per header
    pub fn push_row(&mut self, row: Vec<Option<String>>) -> Result<()> {
        if row.len() != self.headers.len() {
            return Err(PipelineError::SchemaError(format!(
                "Row has {} cells but table has {} columns",
                row.len(),
                self.headers.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Builder-style helper for rows of plain text cells
    pub fn with_row<S: AsRef<str>>(mut self, cells: &[S]) -> Result<Self> {
        let row = cells.iter().map(|c| Some(c.as_ref().to_string())).collect();
        self.push_row(row)?;
        Ok(self)
    }

    /// Get the header names
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Get the rows
    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    /// Index of a header, compared case-insensitively
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    }

    /// Check if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get the number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Represents OHLCV (Open, High, Low, Close, Volume) data for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvData {
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Volume
    pub volume: u64,
}

/// One calendar day for one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Date of the data point
    pub date: NaiveDate,
    /// OHLCV data
    pub data: OhlcvData,
    /// Asset tag, e.g. "Bitcoin"
    pub asset_label: String,
}

/// A conformed day: the price point plus its period-over-period return
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConformedRow {
    pub point: PricePoint,
    /// Fractional change in close vs. the previous day, undefined on the first row
    pub daily_return: Option<f64>,
}

/// Calendar-complete, deduplicated daily series for one asset
#[derive(Debug, Clone, PartialEq)]
pub struct ConformedSeries {
    asset: Asset,
    rows: Vec<ConformedRow>,
}

impl ConformedSeries {
    /// Wrap rows that already satisfy the conformed invariants
    ///
    /// Rows must be non-empty, one day apart and carry positive prices.
    pub fn new(asset: Asset, rows: Vec<ConformedRow>) -> Result<Self> {
        if rows.is_empty() {
            return Err(PipelineError::EmptySeriesError(asset.to_string()));
        }

        for pair in rows.windows(2) {
            let (prev, next) = (&pair[0].point.date, &pair[1].point.date);
            if prev.succ_opt() != Some(*next) {
                return Err(PipelineError::InvalidParameter(format!(
                    "Conformed series must be gapless: {} is followed by {}",
                    prev, next
                )));
            }
        }

        if let Some(bad) = rows.iter().find(|r| !has_positive_prices(&r.point.data)) {
            return Err(PipelineError::InvalidParameter(format!(
                "Non-positive price on {}",
                bad.point.date
            )));
        }

        Ok(Self { asset, rows })
    }

    /// Get the asset
    pub fn asset(&self) -> Asset {
        self.asset
    }

    /// Get the rows in date order
    pub fn rows(&self) -> &[ConformedRow] {
        &self.rows
    }

    /// Get the close prices as a vector
    pub fn close_prices(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.point.data.close).collect()
    }

    /// First date of the series
    pub fn first_date(&self) -> NaiveDate {
        self.rows[0].point.date
    }

    /// Last date of the series
    pub fn last_date(&self) -> NaiveDate {
        self.rows[self.rows.len() - 1].point.date
    }

    /// Get the length of the series
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub(crate) fn has_positive_prices(data: &OhlcvData) -> bool {
    [data.open, data.high, data.low, data.close]
        .iter()
        .all(|p| p.is_finite() && *p > 0.0)
}

/// Dense daily close series used as forecasting input
#[derive(Debug, Clone, PartialEq)]
pub struct DailyCloseSeries {
    start: NaiveDate,
    values: Vec<f64>,
}

impl DailyCloseSeries {
    /// Build a dense series from dated observations
    ///
    /// Observations are sorted by date; for repeated dates the first one
    /// wins. Missing days repeat the most recent close.
    pub fn from_observations(observations: &[(NaiveDate, f64)]) -> Result<Self> {
        let mut sorted = observations.to_vec();
        sorted.sort_by_key(|(date, _)| *date);
        sorted.dedup_by_key(|(date, _)| *date);

        let (start, first) = match sorted.first() {
            Some(obs) => *obs,
            None => {
                return Err(PipelineError::InvalidParameter(
                    "Cannot build a daily series from no observations".to_string(),
                ))
            }
        };
        if let Some((date, value)) = sorted.iter().find(|(_, v)| !v.is_finite()) {
            return Err(PipelineError::InvalidParameter(format!(
                "Non-finite close {} on {}",
                value, date
            )));
        }

        let mut values = vec![first];
        let mut current = start;
        let mut last = first;
        for &(date, value) in &sorted[1..] {
            loop {
                current = next_day(current)?;
                if current == date {
                    break;
                }
                values.push(last);
            }
            values.push(value);
            last = value;
        }

        Ok(Self { start, values })
    }

    /// First date of the series
    pub fn start_date(&self) -> NaiveDate {
        self.start
    }

    /// Last date of the series
    pub fn last_date(&self) -> NaiveDate {
        self.start + chrono::Days::new((self.values.len() - 1) as u64)
    }

    /// Last observed close
    pub fn last_value(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    /// Get the daily values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the length of the series
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false; a series holds at least one value
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub(crate) fn next_day(date: NaiveDate) -> Result<NaiveDate> {
    date.succ_opt()
        .ok_or_else(|| PipelineError::InvalidParameter(format!("No day after {}", date)))
}
