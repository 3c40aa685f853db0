//! Running peak and drawdown

use crate::{MathError, Result};

/// Running maximum of a price series
pub fn running_max(prices: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    prices
        .iter()
        .map(|&p| {
            peak = peak.max(p);
            peak
        })
        .collect()
}

/// Drawdown from the running peak: `(p[i] - max(p[..=i])) / max(p[..=i])`.
///
/// Prices must be strictly positive, which keeps every value in `(-1, 0]`.
pub fn drawdowns(prices: &[f64]) -> Result<Vec<f64>> {
    if let Some(bad) = prices.iter().find(|p| !p.is_finite() || **p <= 0.0) {
        return Err(MathError::InvalidInput(format!(
            "Drawdown requires positive finite prices, got {}",
            bad
        )));
    }

    Ok(prices
        .iter()
        .zip(running_max(prices))
        .map(|(&p, peak)| (p - peak) / peak)
        .collect())
}
