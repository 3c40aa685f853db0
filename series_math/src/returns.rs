//! Return calculations
//!
//! Returns are aligned with the price slice they are computed from: element
//! `i` describes the move from `i - 1` to `i`, so the first element is always
//! undefined (`None`).

/// Fractional change between consecutive prices (`p[i] / p[i-1] - 1`).
///
/// A return is undefined where the previous price is zero or the ratio is not
/// finite.
pub fn pct_change(prices: &[f64]) -> Vec<Option<f64>> {
    let mut returns = Vec::with_capacity(prices.len());
    if prices.is_empty() {
        return returns;
    }

    returns.push(None);
    for w in prices.windows(2) {
        returns.push(finite(w[1] / w[0] - 1.0));
    }

    returns
}

/// Natural log of consecutive price ratios (`ln(p[i] / p[i-1])`).
pub fn log_returns(prices: &[f64]) -> Vec<Option<f64>> {
    let mut returns = Vec::with_capacity(prices.len());
    if prices.is_empty() {
        return returns;
    }

    returns.push(None);
    for w in prices.windows(2) {
        returns.push(finite((w[1] / w[0]).ln()));
    }

    returns
}

/// Compounded return since the start of the slice.
///
/// `out[i] = prod(1 + r[k] for k in 0..=i) - 1`, with undefined returns
/// counted as zero so the running product starts clean.
pub fn cumulative_returns(returns: &[Option<f64>]) -> Vec<f64> {
    let mut growth = 1.0;
    returns
        .iter()
        .map(|r| {
            growth *= 1.0 + r.unwrap_or(0.0);
            growth - 1.0
        })
        .collect()
}

fn finite(value: f64) -> Option<f64> {
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}
