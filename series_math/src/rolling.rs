//! Partial-window rolling statistics
//!
//! Windows follow a "minimum one period" policy: at position `i` the window
//! covers `max(0, i - period + 1) ..= i`, so early positions are computed from
//! whatever subset is available instead of being left undefined. Undefined
//! observations occupy a slot in the window but are skipped by the statistic.

use crate::{MathError, Result};
use statrs::statistics::Statistics;
use std::collections::VecDeque;

/// Trailing window of optional observations
#[derive(Debug, Clone)]
pub struct RollingWindow {
    period: usize,
    values: VecDeque<Option<f64>>,
}

impl RollingWindow {
    /// Create a new window holding at most `period` observations
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
        })
    }

    /// Push a new observation, evicting the oldest one once the window is full
    pub fn update(&mut self, value: Option<f64>) {
        self.values.push_back(value);
        if self.values.len() > self.period {
            self.values.pop_front();
        }
    }

    /// Mean of the defined observations, `None` if there are none
    pub fn mean(&self) -> Option<f64> {
        if self.defined_count() == 0 {
            return None;
        }
        Some(self.defined().mean())
    }

    /// Population standard deviation (divisor = count) of the defined observations
    pub fn population_std_dev(&self) -> Option<f64> {
        if self.defined_count() == 0 {
            return None;
        }
        Some(self.defined().population_std_dev())
    }

    /// Number of slots currently occupied, defined or not
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the window holds no observations
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the configured period
    pub fn period(&self) -> usize {
        self.period
    }

    /// Reset the window, clearing all values
    pub fn reset(&mut self) {
        self.values.clear();
    }

    fn defined(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().flatten().copied()
    }

    fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

/// Partial-window rolling mean of a fully defined series
pub fn rolling_mean(values: &[f64], period: usize) -> Result<Vec<f64>> {
    let mut window = RollingWindow::new(period)?;
    let mut out = Vec::with_capacity(values.len());

    for &value in values {
        window.update(Some(value));
        let mean = window.mean().ok_or_else(|| {
            MathError::CalculationError("Rolling window unexpectedly empty".to_string())
        })?;
        out.push(mean);
    }

    Ok(out)
}

/// Partial-window rolling population standard deviation
///
/// Undefined inputs are skipped; a position whose window holds no defined
/// value yields `None`.
pub fn rolling_population_std(values: &[Option<f64>], period: usize) -> Result<Vec<Option<f64>>> {
    let mut window = RollingWindow::new(period)?;

    Ok(values
        .iter()
        .map(|&value| {
            window.update(value);
            window.population_std_dev()
        })
        .collect())
}
