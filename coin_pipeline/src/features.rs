//! Gold layer: derived signals over a conformed series

use crate::data::{ConformedSeries, OhlcvData};
use crate::error::Result;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use series_math::drawdown::drawdowns;
use series_math::returns::{cumulative_returns, log_returns};
use series_math::rolling::{rolling_mean, rolling_population_std};
use tracing::info;

/// Trailing windows (in days) for moving averages and volatilities
pub const ROLLING_WINDOWS: [usize; 3] = [7, 30, 90];

/// Trailing window (in days) for the average volume
pub const VOLUME_WINDOW: usize = 30;

/// A conformed day extended with engineered features
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub data: OhlcvData,
    pub asset_label: String,
    pub daily_return: Option<f64>,
    pub log_return: f64,
    pub sma7: f64,
    pub sma30: f64,
    pub sma90: f64,
    /// Population standard deviation of daily returns
    pub vol7: Option<f64>,
    pub vol30: Option<f64>,
    pub vol90: Option<f64>,
    pub vol_avg30: f64,
    pub cumulative_return: f64,
    /// Always in `(-1, 0]`
    pub drawdown: f64,
    pub volume_millions: f64,
    pub year: i32,
    /// 1-12
    pub month: u32,
    /// Monday = 0
    pub weekday: u32,
}

impl FeatureRow {
    /// Close price of the day
    pub fn close(&self) -> f64 {
        self.data.close
    }
}

/// Computes the fixed feature set for one asset
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEngine;

impl FeatureEngine {
    /// Create a new feature engine
    pub fn new() -> Self {
        Self
    }

    /// Engineer features for every day of the series except the first
    ///
    /// Statistics run over the whole series, first day included; that day is
    /// then dropped because its return-derived fields are undefined.
    pub fn engineer(&self, series: &ConformedSeries) -> Result<Vec<FeatureRow>> {
        let rows = series.rows();
        let closes = series.close_prices();
        let volumes: Vec<f64> = rows.iter().map(|r| r.point.data.volume as f64).collect();
        let daily: Vec<Option<f64>> = rows.iter().map(|r| r.daily_return).collect();

        let logs = log_returns(&closes);
        let [sma7, sma30, sma90] = [
            rolling_mean(&closes, ROLLING_WINDOWS[0])?,
            rolling_mean(&closes, ROLLING_WINDOWS[1])?,
            rolling_mean(&closes, ROLLING_WINDOWS[2])?,
        ];
        let [vol7, vol30, vol90] = [
            rolling_population_std(&daily, ROLLING_WINDOWS[0])?,
            rolling_population_std(&daily, ROLLING_WINDOWS[1])?,
            rolling_population_std(&daily, ROLLING_WINDOWS[2])?,
        ];
        let vol_avg30 = rolling_mean(&volumes, VOLUME_WINDOW)?;
        let cumulative = cumulative_returns(&daily);
        let drawdown = drawdowns(&closes)?;

        let features: Vec<FeatureRow> = rows
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, row)| {
                let date = row.point.date;
                FeatureRow {
                    date,
                    data: row.point.data.clone(),
                    asset_label: row.point.asset_label.clone(),
                    daily_return: daily[i],
                    log_return: logs[i].or(daily[i]).unwrap_or(0.0),
                    sma7: sma7[i],
                    sma30: sma30[i],
                    sma90: sma90[i],
                    vol7: vol7[i],
                    vol30: vol30[i],
                    vol90: vol90[i],
                    vol_avg30: vol_avg30[i],
                    cumulative_return: cumulative[i],
                    drawdown: drawdown[i],
                    volume_millions: row.point.data.volume as f64 * 1e-6,
                    year: date.year(),
                    month: date.month(),
                    weekday: date.weekday().num_days_from_monday(),
                }
            })
            .collect();

        info!(
            asset = %series.asset(),
            rows = features.len(),
            "engineered features"
        );

        Ok(features)
    }
}

/// `(date, close)` pairs of engineered rows, the forecaster's input
pub fn close_history(rows: &[FeatureRow]) -> Vec<(NaiveDate, f64)> {
    rows.iter().map(|r| (r.date, r.close())).collect()
}
