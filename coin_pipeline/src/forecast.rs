//! Platinum layer: multi-horizon price forecasts
//!
//! One Holt model is fitted per asset and queried at every horizon of the
//! fixed horizon table.

use crate::data::{Asset, DailyCloseSeries};
use crate::error::{PipelineError, Result};
use crate::models::holt::HoltTrend;
use crate::models::ForecastModel;
use chrono::{Days, NaiveDate};
use serde::{Serialize, Serializer};
use std::fmt;
use tracing::info;

/// Fitting needs a level and a first difference
pub const MIN_HISTORY_FLOOR: usize = 2;

/// Default first day of forecasting history
pub fn default_forecast_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Fixed forecast horizons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Horizon {
    Tomorrow,
    SevenDays,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    ThreeYears,
    FourYears,
    FiveYears,
    SevenYears,
    EightYears,
    NineYears,
    TenYears,
}

impl Horizon {
    /// Every horizon, shortest first
    pub const ALL: [Horizon; 14] = [
        Horizon::Tomorrow,
        Horizon::SevenDays,
        Horizon::OneMonth,
        Horizon::ThreeMonths,
        Horizon::SixMonths,
        Horizon::OneYear,
        Horizon::TwoYears,
        Horizon::ThreeYears,
        Horizon::FourYears,
        Horizon::FiveYears,
        Horizon::SevenYears,
        Horizon::EightYears,
        Horizon::NineYears,
        Horizon::TenYears,
    ];

    /// Label stored in the `HorizonLabel` column
    pub fn label(&self) -> &'static str {
        match self {
            Horizon::Tomorrow => "Tomorrow",
            Horizon::SevenDays => "7 Days",
            Horizon::OneMonth => "1 Month",
            Horizon::ThreeMonths => "3 Months",
            Horizon::SixMonths => "6 Months",
            Horizon::OneYear => "1 Year",
            Horizon::TwoYears => "2 Years",
            Horizon::ThreeYears => "3 Years",
            Horizon::FourYears => "4 Years",
            Horizon::FiveYears => "5 Years",
            Horizon::SevenYears => "7 Years",
            Horizon::EightYears => "8 Years",
            Horizon::NineYears => "9 Years",
            Horizon::TenYears => "10 Years",
        }
    }

    /// Length in days; years are whole multiples of 365
    pub fn days(&self) -> usize {
        match self {
            Horizon::Tomorrow => 1,
            Horizon::SevenDays => 7,
            Horizon::OneMonth => 30,
            Horizon::ThreeMonths => 90,
            Horizon::SixMonths => 180,
            Horizon::OneYear => 365,
            Horizon::TwoYears => 365 * 2,
            Horizon::ThreeYears => 365 * 3,
            Horizon::FourYears => 365 * 4,
            Horizon::FiveYears => 365 * 5,
            Horizon::SevenYears => 365 * 7,
            Horizon::EightYears => 365 * 8,
            Horizon::NineYears => 365 * 9,
            Horizon::TenYears => 365 * 10,
        }
    }

    /// Look a horizon up by its label
    pub fn from_label(label: &str) -> Option<Horizon> {
        Horizon::ALL.into_iter().find(|h| h.label() == label.trim())
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Horizon {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// One forecast per (asset, horizon)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRecord {
    /// Asset ticker, e.g. "BTC"
    pub coin: String,
    pub horizon: Horizon,
    /// Last observed date plus the horizon length
    pub target_date: NaiveDate,
    pub forecast: f64,
    /// Percentage change vs. the last observed close
    pub return_pct: f64,
}

/// Fits the trend model and projects every horizon
#[derive(Debug, Clone)]
pub struct Forecaster {
    start: NaiveDate,
    min_history: usize,
    model: HoltTrend,
}

impl Default for Forecaster {
    fn default() -> Self {
        Self {
            start: default_forecast_start(),
            min_history: MIN_HISTORY_FLOOR,
            model: HoltTrend::optimized(),
        }
    }
}

impl Forecaster {
    /// Create a forecaster using history from `start` onwards
    pub fn new(start: NaiveDate, min_history: usize) -> Result<Self> {
        if min_history < MIN_HISTORY_FLOOR {
            return Err(PipelineError::InvalidParameter(format!(
                "Minimum history must be at least {} points, got {}",
                MIN_HISTORY_FLOOR, min_history
            )));
        }

        Ok(Self {
            start,
            min_history,
            model: HoltTrend::optimized(),
        })
    }

    /// Replace the forecasting model (e.g. fixed parameters)
    pub fn with_model(mut self, model: HoltTrend) -> Self {
        self.model = model;
        self
    }

    /// Get the first date of history considered
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Get the minimum number of daily points required
    pub fn min_history(&self) -> usize {
        self.min_history
    }

    /// Observations on/after the start date and strictly before `as_of`
    pub fn select_history(
        &self,
        history: &[(NaiveDate, f64)],
        as_of: NaiveDate,
    ) -> Vec<(NaiveDate, f64)> {
        let mut selected: Vec<(NaiveDate, f64)> = history
            .iter()
            .filter(|(date, _)| *date >= self.start && *date < as_of)
            .copied()
            .collect();
        selected.sort_by_key(|(date, _)| *date);
        selected
    }

    /// Forecast every horizon from dated closes, as seen on `as_of`
    pub fn forecast(
        &self,
        asset: Asset,
        history: &[(NaiveDate, f64)],
        as_of: NaiveDate,
    ) -> Result<Vec<ForecastRecord>> {
        let selected = self.select_history(history, as_of);
        if selected.is_empty() {
            return Err(self.insufficient(asset, 0));
        }

        let series = DailyCloseSeries::from_observations(&selected)?;
        self.forecast_series(asset, &series)
    }

    /// Forecast every horizon from an already dense series
    pub fn forecast_series(
        &self,
        asset: Asset,
        series: &DailyCloseSeries,
    ) -> Result<Vec<ForecastRecord>> {
        if series.len() < self.min_history {
            return Err(self.insufficient(asset, series.len()));
        }

        let trained = self.model.train(series)?;
        let last_date = series.last_date();
        let last_close = series.last_value();

        let records = Horizon::ALL
            .iter()
            .map(|&horizon| -> Result<ForecastRecord> {
                let forecast = trained.forecast_at(horizon.days())?;
                let target_date = last_date
                    .checked_add_days(Days::new(horizon.days() as u64))
                    .ok_or_else(|| {
                        PipelineError::InvalidParameter(format!(
                            "Target date out of range for {}",
                            horizon
                        ))
                    })?;

                Ok(ForecastRecord {
                    coin: asset.ticker().to_string(),
                    horizon,
                    target_date,
                    forecast,
                    return_pct: (forecast - last_close) / last_close * 100.0,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            asset = %asset,
            points = series.len(),
            last_date = %last_date,
            last_close,
            alpha = trained.alpha(),
            beta = trained.beta(),
            "fitted trend model"
        );

        Ok(records)
    }

    fn insufficient(&self, asset: Asset, available: usize) -> PipelineError {
        PipelineError::InsufficientHistoryError {
            asset: asset.to_string(),
            required: self.min_history,
            available,
        }
    }
}
