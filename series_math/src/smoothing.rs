//! Holt's linear (additive trend) exponential smoothing
//!
//! The model keeps a level `l` and a trend `b`, updated in error-correction
//! form for each observation `y`:
//!
//! ```text
//! e   = y - (l + b)
//! l'  = l + b + alpha * e
//! b'  = b + beta * (l' - l - b)
//! ```
//!
//! The h-step forecast is `l + h * b`. A model built with [`HoltLinear::new`]
//! seeds itself from the data (`l = y[0]`, `b = y[1] - y[0]`); one built with
//! [`HoltLinear::with_initial_state`] starts from a given state and scores
//! every observation. [`fit_holt`] picks `alpha` and `beta` in `[0, 1]` and
//! the starting state by minimising the in-sample one-step squared error.

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

const GRID_STEPS: usize = 20;
const MAX_ITERATIONS: usize = 500;
const TOLERANCE: f64 = 1e-12;

/// Double exponential smoothing state (Holt's method)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoltLinear {
    alpha: f64,
    beta: f64,
    level: Option<f64>,
    trend: Option<f64>,
    values_seen: usize,
    sse: f64,
    initial: Option<(f64, f64)>,
}

impl HoltLinear {
    /// Create a new model with fixed smoothing parameters in `[0, 1]`
    pub fn new(alpha: f64, beta: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(MathError::InvalidInput(
                "Alpha must be between 0 and 1 (inclusive)".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&beta) {
            return Err(MathError::InvalidInput(
                "Beta must be between 0 and 1 (inclusive)".to_string(),
            ));
        }

        Ok(Self {
            alpha,
            beta,
            level: None,
            trend: None,
            values_seen: 0,
            sse: 0.0,
            initial: None,
        })
    }

    /// Create a model that starts from `level` and `trend` before the first observation
    pub fn with_initial_state(alpha: f64, beta: f64, level: f64, trend: f64) -> Result<Self> {
        if !level.is_finite() || !trend.is_finite() {
            return Err(MathError::InvalidInput(format!(
                "Initial state must be finite, got level {} and trend {}",
                level, trend
            )));
        }

        let mut model = Self::new(alpha, beta)?;
        model.initial = Some((level, trend));
        model.reset();
        Ok(model)
    }

    /// Update the model with the next observation
    pub fn update(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(MathError::InvalidInput(format!(
                "Observation must be finite, got {}",
                value
            )));
        }
        self.values_seen += 1;

        match (self.level, self.trend) {
            (None, _) => {
                self.level = Some(value);
            }
            (Some(first), None) => {
                // Second observation fixes the initial trend; its one-step error is zero.
                self.trend = Some(value - first);
                self.level = Some(value);
            }
            (Some(level), Some(trend)) => {
                let predicted = level + trend;
                let error = value - predicted;
                let new_level = predicted + self.alpha * error;
                let new_trend = trend + self.beta * (new_level - level - trend);

                self.sse += error * error;
                self.level = Some(new_level);
                self.trend = Some(new_trend);
            }
        }

        Ok(())
    }

    /// Forecast `h` steps ahead of the last observation
    pub fn forecast(&self, h: usize) -> Result<f64> {
        match (self.level, self.trend) {
            (Some(level), Some(trend)) => Ok(level + (h as f64) * trend),
            _ => Err(MathError::InsufficientData(format!(
                "Holt forecast needs at least 2 observations, have {}",
                self.values_seen
            ))),
        }
    }

    /// Get the current level
    pub fn level(&self) -> Result<f64> {
        self.level
            .ok_or_else(|| MathError::InsufficientData("Level not calculated yet".to_string()))
    }

    /// Get the current trend
    pub fn trend(&self) -> Result<f64> {
        self.trend
            .ok_or_else(|| MathError::InsufficientData("Trend not calculated yet".to_string()))
    }

    /// Get the level smoothing parameter
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Get the trend smoothing parameter
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Sum of squared one-step errors seen so far
    pub fn sse(&self) -> f64 {
        self.sse
    }

    /// Number of observations consumed
    pub fn values_seen(&self) -> usize {
        self.values_seen
    }

    /// Starting `(level, trend)`, if the model was not seeded from the data
    pub fn initial_state(&self) -> Option<(f64, f64)> {
        self.initial
    }

    /// Reset the model to its starting state, keeping its parameters
    pub fn reset(&mut self) {
        self.level = self.initial.map(|(level, _)| level);
        self.trend = self.initial.map(|(_, trend)| trend);
        self.values_seen = 0;
        self.sse = 0.0;
    }

    /// One-step-ahead in-sample predictions from the starting state:
    /// `out[t]` is the forecast of `values[t]` made at `t - 1`.
    ///
    /// For a data-seeded model the first two entries equal the observations.
    pub fn fitted_values(&self, values: &[f64]) -> Result<Vec<f64>> {
        let mut model = self.clone();
        model.reset();
        let mut fitted = Vec::with_capacity(values.len());

        for &value in values {
            fitted.push(model.forecast(1).unwrap_or(value));
            model.update(value)?;
        }

        Ok(fitted)
    }
}

/// Run a model with fixed parameters over `values`
pub fn run_holt(values: &[f64], alpha: f64, beta: f64) -> Result<HoltLinear> {
    let mut model = HoltLinear::new(alpha, beta)?;
    for &value in values {
        model.update(value)?;
    }
    Ok(model)
}

/// Run a model from a given starting state over `values`
pub fn run_holt_from(
    values: &[f64],
    alpha: f64,
    beta: f64,
    level: f64,
    trend: f64,
) -> Result<HoltLinear> {
    let mut model = HoltLinear::with_initial_state(alpha, beta, level, trend)?;
    for &value in values {
        model.update(value)?;
    }
    Ok(model)
}

fn step(alpha: f64, beta: f64, level: f64, trend: f64, value: f64) -> (f64, f64) {
    let predicted = level + trend;
    let new_level = predicted + alpha * (value - predicted);
    (new_level, trend + beta * (new_level - level - trend))
}

/// Least-squares starting `(level, trend)` for fixed smoothing parameters
///
/// The one-step predictions are affine in the starting state, so the best
/// state solves a 2x2 normal system. Falls back to the data seed
/// (`y[0] - (y[1] - y[0])`, `y[1] - y[0]`) when the system is singular.
pub fn estimate_initial_state(values: &[f64], alpha: f64, beta: f64) -> Result<(f64, f64)> {
    if values.len() < 2 {
        return Err(MathError::InsufficientData(format!(
            "Need at least 2 observations to estimate a trend, have {}",
            values.len()
        )));
    }

    // Responses to zero start with the data, and to a unit level or unit trend without it.
    let mut base = (0.0, 0.0);
    let mut unit_level = (1.0, 0.0);
    let mut unit_trend = (0.0, 1.0);
    let (mut suu, mut suv, mut svv, mut suc, mut svc) = (0.0, 0.0, 0.0, 0.0, 0.0);

    for &value in values {
        let residual = value - (base.0 + base.1);
        let u = unit_level.0 + unit_level.1;
        let v = unit_trend.0 + unit_trend.1;

        suu += u * u;
        suv += u * v;
        svv += v * v;
        suc += u * residual;
        svc += v * residual;

        base = step(alpha, beta, base.0, base.1, value);
        unit_level = step(alpha, beta, unit_level.0, unit_level.1, 0.0);
        unit_trend = step(alpha, beta, unit_trend.0, unit_trend.1, 0.0);
    }

    let det = suu * svv - suv * suv;
    if det <= 1e-12 * suu * svv {
        let trend = values[1] - values[0];
        return Ok((values[0] - trend, trend));
    }

    Ok(((suc * svv - suv * svc) / det, (suu * svc - suv * suc) / det))
}

fn run_estimated(values: &[f64], alpha: f64, beta: f64) -> Result<HoltLinear> {
    let (level, trend) = estimate_initial_state(values, alpha, beta)?;
    run_holt_from(values, alpha, beta, level, trend)
}

/// Fit Holt's linear method by least squares
///
/// The starting level and trend are estimated together with the smoothing
/// parameters: for each `(alpha, beta)` the best starting state is solved
/// exactly, and a coarse grid over `[0, 1]^2` seeds a bounded Nelder-Mead
/// search over the parameters. The search is deterministic, so the same input
/// always yields the same model.
pub fn fit_holt(values: &[f64]) -> Result<HoltLinear> {
    if values.len() < 2 {
        return Err(MathError::InsufficientData(format!(
            "Need at least 2 observations to fit a trend, have {}",
            values.len()
        )));
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(MathError::InvalidInput(format!(
            "Observations must be finite, got {}",
            bad
        )));
    }

    let objective = |p: [f64; 2]| -> f64 {
        run_estimated(values, p[0], p[1])
            .map(|m| m.sse())
            .unwrap_or(f64::INFINITY)
    };

    let mut best = ([0.5, 0.5], f64::INFINITY);
    for i in 0..=GRID_STEPS {
        for j in 0..=GRID_STEPS {
            let point = [i as f64 / GRID_STEPS as f64, j as f64 / GRID_STEPS as f64];
            let score = objective(point);
            if score < best.1 {
                best = (point, score);
            }
        }
    }

    let [alpha, beta] = nelder_mead(objective, best.0, 0.5 / GRID_STEPS as f64);
    run_estimated(values, alpha, beta)
}

fn clamp_unit(p: [f64; 2]) -> [f64; 2] {
    [p[0].clamp(0.0, 1.0), p[1].clamp(0.0, 1.0)]
}

fn lerp(from: [f64; 2], to: [f64; 2], t: f64) -> [f64; 2] {
    [from[0] + t * (to[0] - from[0]), from[1] + t * (to[1] - from[1])]
}

/// Nelder-Mead minimisation of a 2-parameter function restricted to the unit square
fn nelder_mead<F>(f: F, start: [f64; 2], step: f64) -> [f64; 2]
where
    F: Fn([f64; 2]) -> f64,
{
    let offset = |x: f64| if x + step <= 1.0 { step } else { -step };
    let mut simplex: Vec<([f64; 2], f64)> = [
        start,
        [start[0] + offset(start[0]), start[1]],
        [start[0], start[1] + offset(start[1])],
    ]
    .into_iter()
    .map(|p| {
        let p = clamp_unit(p);
        (p, f(p))
    })
    .collect();

    for _ in 0..MAX_ITERATIONS {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let (best, worst) = (simplex[0].1, simplex[2].1);
        let spread = (simplex[2].0[0] - simplex[0].0[0])
            .abs()
            .max((simplex[2].0[1] - simplex[0].0[1]).abs());
        if (worst - best).abs() <= TOLERANCE * (1.0 + best.abs()) || spread <= TOLERANCE {
            break;
        }

        let centroid = lerp(simplex[0].0, simplex[1].0, 0.5);
        let worst_point = simplex[2].0;

        let reflected = clamp_unit(lerp(centroid, worst_point, -1.0));
        let f_reflected = f(reflected);

        if f_reflected < simplex[0].1 {
            let expanded = clamp_unit(lerp(centroid, worst_point, -2.0));
            let f_expanded = f(expanded);
            simplex[2] = if f_expanded < f_reflected {
                (expanded, f_expanded)
            } else {
                (reflected, f_reflected)
            };
        } else if f_reflected < simplex[1].1 {
            simplex[2] = (reflected, f_reflected);
        } else {
            let contracted = if f_reflected < worst {
                lerp(centroid, reflected, 0.5)
            } else {
                lerp(centroid, worst_point, 0.5)
            };
            let f_contracted = f(contracted);

            if f_contracted < f_reflected.min(worst) {
                simplex[2] = (contracted, f_contracted);
            } else {
                let anchor = simplex[0].0;
                for vertex in simplex.iter_mut().skip(1) {
                    let shrunk = lerp(anchor, vertex.0, 0.5);
                    *vertex = (shrunk, f(shrunk));
                }
            }
        }
    }

    simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
    simplex[0].0
}
