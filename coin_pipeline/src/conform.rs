//! Silver layer: turn raw per-day rows into a calendar-complete series
//!
//! The conformer is robust to the usual defects of the raw feed: unordered
//! rows, repeated dates, missing days, unparseable cells and header rows
//! embedded in the data.

use crate::data::{next_day, Asset, ConformedRow, ConformedSeries, OhlcvData, PricePoint, RawTable};
use crate::error::{PipelineError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use series_math::returns::pct_change;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Recognized names of the date field, after normalization
pub const DATE_ALIASES: &[&str] = &["date", "pricedate", "price_date"];

const LABEL_ALIASES: &[&str] = &["coin", "asset", "asset_label"];

/// Cell values that mark a stray header row rather than data
pub const PLACEHOLDER_TOKENS: &[&str] = &["ticker", "price", "date", "btc-usd", "eth-usd"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Row counts collected while conforming, for logging and inspection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConformStats {
    pub input_rows: usize,
    pub placeholder_rows: usize,
    pub unparseable_dates: usize,
    pub duplicate_dates: usize,
    pub filled_days: usize,
    pub incomplete_rows: usize,
    pub output_rows: usize,
}

/// Column positions of the fields the conformer needs
#[derive(Debug, Clone, Copy)]
struct FieldMap {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    label: Option<usize>,
}

/// A parsed source row; missing or invalid values are `None`
#[derive(Debug, Clone)]
struct PartialRow {
    date: NaiveDate,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<u64>,
    label: Option<String>,
}

impl PartialRow {
    /// Forward-fill missing prices and volume from the previous (already filled) row
    fn fill_from(mut self, prev: &PartialRow) -> Self {
        self.open = self.open.or(prev.open);
        self.high = self.high.or(prev.high);
        self.low = self.low.or(prev.low);
        self.close = self.close.or(prev.close);
        self.volume = self.volume.or(prev.volume);
        self
    }

    fn into_point(self, default_label: &str) -> Option<PricePoint> {
        Some(PricePoint {
            date: self.date,
            data: OhlcvData {
                open: self.open?,
                high: self.high?,
                low: self.low?,
                close: self.close?,
                volume: self.volume?,
            },
            asset_label: self.label.unwrap_or_else(|| default_label.to_string()),
        })
    }
}

/// Conformer for one asset
#[derive(Debug, Clone)]
pub struct Conformer {
    asset: Asset,
}

impl Conformer {
    /// Create a conformer for the given asset
    pub fn new(asset: Asset) -> Self {
        Self { asset }
    }

    /// Get the asset
    pub fn asset(&self) -> Asset {
        self.asset
    }

    /// Conform a raw table into a gapless daily series
    pub fn conform(&self, raw: &RawTable) -> Result<ConformedSeries> {
        self.conform_with_stats(raw).map(|(series, _)| series)
    }

    /// Conform a raw table and report what was dropped or filled on the way
    pub fn conform_with_stats(&self, raw: &RawTable) -> Result<(ConformedSeries, ConformStats)> {
        let fields = self.resolve_fields(raw.headers())?;
        let mut stats = ConformStats {
            input_rows: raw.len(),
            ..ConformStats::default()
        };

        let mut parsed = Vec::with_capacity(raw.len());
        for cells in raw.rows() {
            if is_placeholder_row(cells) {
                stats.placeholder_rows += 1;
                continue;
            }
            match parse_row(cells, &fields) {
                Some(row) => parsed.push(row),
                None => stats.unparseable_dates += 1,
            }
        }

        // Stable sort keeps source order among equal dates, so dedup keeps the first seen.
        parsed.sort_by_key(|r| r.date);
        let before = parsed.len();
        parsed.dedup_by_key(|r| r.date);
        stats.duplicate_dates = before - parsed.len();

        let filled = forward_fill_calendar(parsed, &mut stats)?;
        let filled_len = filled.len();

        let label = self.asset.label();
        let points: Vec<PricePoint> = filled
            .into_iter()
            .filter_map(|row| row.into_point(label))
            .collect();
        // Only leading rows can stay incomplete, so dropping them keeps the calendar gapless.
        stats.incomplete_rows = filled_len - points.len();

        if points.is_empty() {
            return Err(PipelineError::EmptySeriesError(self.asset.to_string()));
        }

        let rows = attach_daily_returns(points);
        stats.output_rows = rows.len();
        debug!(asset = %self.asset, ?stats, "conform statistics");

        let series = ConformedSeries::new(self.asset, rows)?;
        info!(
            asset = %self.asset,
            rows = series.len(),
            first = %series.first_date(),
            last = %series.last_date(),
            "conformed series"
        );

        Ok((series, stats))
    }

    fn resolve_fields(&self, headers: &[String]) -> Result<FieldMap> {
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| normalize_header(h, self.asset))
            .collect();

        let find = |aliases: &[&str]| -> Option<usize> {
            aliases
                .iter()
                .find_map(|alias| normalized.iter().position(|h| h.as_str() == *alias))
        };
        let require = |field: &str, aliases: &[&str]| -> Result<usize> {
            find(aliases).ok_or_else(|| {
                PipelineError::SchemaError(format!(
                    "No {} column found for {}; columns: {}",
                    field,
                    self.asset,
                    headers.join(", ")
                ))
            })
        };

        Ok(FieldMap {
            date: require("date", DATE_ALIASES)?,
            open: require("open", &["open"])?,
            high: require("high", &["high"])?,
            low: require("low", &["low"])?,
            close: require("close", &["close"])?,
            volume: require("volume", &["volume", "vol"])?,
            label: find(LABEL_ALIASES),
        })
    }
}

/// Trim, lowercase, replace spaces with underscores and strip a `_<ticker>` suffix
pub fn normalize_header(raw: &str, asset: Asset) -> String {
    let name = raw.trim().to_lowercase().replace(' ', "_");
    let suffix = format!("_{}", asset.ticker().to_lowercase());
    if let Some(stripped) = name.strip_suffix(&suffix) {
        if !stripped.is_empty() {
            return stripped.to_string();
        }
    }
    name
}

/// Parse the date formats seen in the raw feed and the layer tables
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

fn is_placeholder_row(cells: &[Option<String>]) -> bool {
    cells.iter().flatten().any(|cell| {
        let cell = cell.trim();
        PLACEHOLDER_TOKENS
            .iter()
            .any(|token| cell.eq_ignore_ascii_case(token))
    })
}

fn cell<'a>(cells: &'a [Option<String>], idx: usize) -> Option<&'a str> {
    cells
        .get(idx)
        .and_then(|c| c.as_deref())
        .map(str::trim)
        .filter(|c| !c.is_empty())
}

fn parse_price(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.parse::<f64>().ok())
        .filter(|p| p.is_finite() && *p > 0.0)
}

fn parse_volume(raw: Option<&str>) -> Option<u64> {
    let s = raw?;
    if let Ok(v) = s.parse::<u64>() {
        return Some(v);
    }
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round() as u64)
}

fn parse_row(cells: &[Option<String>], fields: &FieldMap) -> Option<PartialRow> {
    let date = parse_date(cell(cells, fields.date)?)?;
    Some(PartialRow {
        date,
        open: parse_price(cell(cells, fields.open)),
        high: parse_price(cell(cells, fields.high)),
        low: parse_price(cell(cells, fields.low)),
        close: parse_price(cell(cells, fields.close)),
        volume: parse_volume(cell(cells, fields.volume)),
        label: fields
            .label
            .and_then(|idx| cell(cells, idx))
            .map(str::to_string),
    })
}

/// Reindex sorted, unique rows to every calendar day between the first and
/// last date, carrying the previous row forward into missing days
fn forward_fill_calendar(
    rows: Vec<PartialRow>,
    stats: &mut ConformStats,
) -> Result<Vec<PartialRow>> {
    let mut filled: Vec<PartialRow> = Vec::with_capacity(rows.len());

    for row in rows {
        let row = match filled.last() {
            Some(prev) => {
                let prev = prev.clone();
                let mut day = next_day(prev.date)?;
                while day < row.date {
                    let mut copy = prev.clone();
                    copy.date = day;
                    filled.push(copy);
                    stats.filled_days += 1;
                    day = next_day(day)?;
                }
                row.fill_from(&prev)
            }
            None => row,
        };
        filled.push(row);
    }

    Ok(filled)
}

/// Compute close-to-close returns within each asset label
fn attach_daily_returns(points: Vec<PricePoint>) -> Vec<ConformedRow> {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (idx, point) in points.iter().enumerate() {
        groups.entry(point.asset_label.as_str()).or_default().push(idx);
    }

    let mut returns = vec![None; points.len()];
    for indices in groups.values() {
        let closes: Vec<f64> = indices.iter().map(|&i| points[i].data.close).collect();
        for (&idx, r) in indices.iter().zip(pct_change(&closes)) {
            returns[idx] = r;
        }
    }

    points
        .into_iter()
        .zip(returns)
        .map(|(point, daily_return)| ConformedRow {
            point,
            daily_return,
        })
        .collect()
}
