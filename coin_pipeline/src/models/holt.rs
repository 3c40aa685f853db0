//! Additive-trend exponential smoothing (Holt's linear method)

use crate::data::DailyCloseSeries;
use crate::error::{PipelineError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
use series_math::smoothing::{fit_holt, run_holt, HoltLinear};

/// How the smoothing parameters are chosen
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SmoothingParams {
    /// Minimise the in-sample one-step squared error over the parameters
    /// and the starting level and trend
    Optimized,
    /// Use the given `alpha` (level) and `beta` (trend), seeded from the first two values
    Fixed { alpha: f64, beta: f64 },
}

/// Holt's linear trend model, no seasonal component
#[derive(Debug, Clone)]
pub struct HoltTrend {
    /// Name of the model
    name: String,
    params: SmoothingParams,
}

/// Trained Holt model
#[derive(Debug, Clone)]
pub struct TrainedHoltTrend {
    /// Name of the model
    name: String,
    state: HoltLinear,
}

impl HoltTrend {
    /// Model whose parameters are fitted to the data
    pub fn optimized() -> Self {
        Self {
            name: "Holt Linear Trend (optimized)".to_string(),
            params: SmoothingParams::Optimized,
        }
    }

    /// Model with fixed smoothing parameters
    pub fn with_params(alpha: f64, beta: f64) -> Result<Self> {
        for (label, value) in [("Alpha", alpha), ("Beta", beta)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PipelineError::InvalidParameter(format!(
                    "{} must be between 0 and 1",
                    label
                )));
            }
        }

        Ok(Self {
            name: format!("Holt Linear Trend (alpha={}, beta={})", alpha, beta),
            params: SmoothingParams::Fixed { alpha, beta },
        })
    }

    /// Get the parameter policy
    pub fn params(&self) -> SmoothingParams {
        self.params
    }
}

impl Default for HoltTrend {
    fn default() -> Self {
        Self::optimized()
    }
}

impl ForecastModel for HoltTrend {
    type Trained = TrainedHoltTrend;

    fn train(&self, data: &DailyCloseSeries) -> Result<Self::Trained> {
        let state = match self.params {
            SmoothingParams::Optimized => fit_holt(data.values())?,
            SmoothingParams::Fixed { alpha, beta } => {
                let state = run_holt(data.values(), alpha, beta)?;
                // Surface a short series now rather than on the first forecast.
                state.trend()?;
                state
            }
        };

        Ok(TrainedHoltTrend {
            name: self.name.clone(),
            state,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedHoltTrend {
    /// Fitted level smoothing parameter
    pub fn alpha(&self) -> f64 {
        self.state.alpha()
    }

    /// Fitted trend smoothing parameter
    pub fn beta(&self) -> f64 {
        self.state.beta()
    }

    /// Level at the last observation
    pub fn level(&self) -> Result<f64> {
        Ok(self.state.level()?)
    }

    /// Trend at the last observation
    pub fn trend(&self) -> Result<f64> {
        Ok(self.state.trend()?)
    }

    /// In-sample sum of squared one-step errors
    pub fn sse(&self) -> f64 {
        self.state.sse()
    }

    /// Estimated `(level, trend)` before the first observation; `None` for fixed parameters
    pub fn initial_state(&self) -> Option<(f64, f64)> {
        self.state.initial_state()
    }

    /// Point forecast exactly `step` periods ahead
    pub fn forecast_at(&self, step: usize) -> Result<f64> {
        Ok(self.state.forecast(step)?)
    }
}

impl TrainedForecastModel for TrainedHoltTrend {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let values = (1..=horizon)
            .map(|h| self.state.forecast(h))
            .collect::<std::result::Result<Vec<f64>, _>>()?;

        ForecastResult::new(values, horizon)
    }

    fn predict(&self, data: &DailyCloseSeries) -> Result<ForecastResult> {
        let predictions = self.state.fitted_values(data.values())?;
        let len = predictions.len();
        ForecastResult::new(predictions, len)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
