//! Beta / R² estimation.
//!
//! All moments are population moments (divided by `n`), so beta is
//! `cov(x, y) / var(x)` and R² is the squared Pearson correlation.

use crate::error::{Warning, Warnings};
use serde::Serialize;
use tracing::debug;

/// Variance below which an explanatory series is treated as constant.
const VARIANCE_EPSILON: f64 = 1e-20;

/// Result of a single regression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    /// OLS slope.
    pub beta: f64,
    /// Coefficient of determination.
    pub r_squared: f64,
    /// Number of paired observations used.
    pub observations: usize,
    /// True when the explanatory series had zero variance.
    pub degenerate: bool,
}

impl LinearFit {
    const fn zero(observations: usize, degenerate: bool) -> Self {
        Self {
            beta: 0.0,
            r_squared: 0.0,
            observations,
            degenerate,
        }
    }
}

/// Regresses `y` (dependent) on `x` (explanatory).
///
/// Series of unequal length are truncated to the shorter one. Fewer than two
/// observations or a constant `x` give `beta = r_squared = 0`.
#[must_use]
pub fn ols(y: &[f64], x: &[f64]) -> LinearFit {
    let n = y.len().min(x.len());
    if n < 2 {
        return LinearFit::zero(n, false);
    }
    let (y, x) = (&y[..n], &x[..n]);
    let nf = n as f64;
    let mean_x = x.iter().sum::<f64>() / nf;
    let mean_y = y.iter().sum::<f64>() / nf;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    cov /= nf;
    var_x /= nf;
    var_y /= nf;

    if var_x <= VARIANCE_EPSILON {
        return LinearFit::zero(n, true);
    }
    let beta = cov / var_x;
    let r_squared = if var_y <= VARIANCE_EPSILON {
        0.0
    } else {
        (cov * cov / (var_x * var_y)).min(1.0)
    };
    LinearFit {
        beta,
        r_squared,
        observations: n,
        degenerate: false,
    }
}

/// Regression restricted to observations where `x < 0`.
///
/// Returns a zero fit when fewer than `min_observations` down days qualify.
#[must_use]
pub fn downside_ols(y: &[f64], x: &[f64], min_observations: usize) -> LinearFit {
    let (ys, xs): (Vec<f64>, Vec<f64>) = y
        .iter()
        .zip(x)
        .filter(|&(_, xi)| *xi < 0.0)
        .map(|(yi, xi)| (*yi, *xi))
        .unzip();
    if xs.len() < min_observations {
        return LinearFit::zero(xs.len(), false);
    }
    ols(&ys, &xs)
}

/// Full and downside regression of the portfolio on one candidate instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionFit {
    /// Candidate instrument.
    pub instrument_id: String,
    /// Full-sample beta.
    pub beta: f64,
    /// Full-sample R².
    pub r_squared: f64,
    /// Beta over down days of the instrument.
    pub downside_beta: f64,
    /// R² over down days of the instrument.
    pub downside_r_squared: f64,
    /// Paired return observations.
    pub observations: usize,
    /// Paired observations on down days.
    pub downside_observations: usize,
}

/// Fits the portfolio's returns against one instrument's returns.
///
/// Degenerate inputs are recorded in `warnings` and produce zero fits.
pub fn fit_instrument(
    instrument_id: &str,
    portfolio_returns: &[f64],
    instrument_returns: &[f64],
    min_downside_observations: usize,
    warnings: &mut Warnings,
) -> RegressionFit {
    let full = ols(portfolio_returns, instrument_returns);
    if full.degenerate {
        warnings.push(Warning::ZeroVariance {
            instrument: instrument_id.to_string(),
        });
    }
    let down = downside_ols(
        portfolio_returns,
        instrument_returns,
        min_downside_observations,
    );
    if down.observations < min_downside_observations {
        warnings.push(Warning::InsufficientDownsideData {
            instrument: instrument_id.to_string(),
            observations: down.observations,
        });
    } else if down.degenerate && !full.degenerate {
        warnings.push(Warning::ZeroDownsideVariance {
            instrument: instrument_id.to_string(),
            observations: down.observations,
        });
    }

    debug!(
        instrument = instrument_id,
        beta = full.beta,
        r_squared = full.r_squared,
        downside_beta = down.beta,
        downside_r_squared = down.r_squared,
        "regression fit"
    );

    RegressionFit {
        instrument_id: instrument_id.to_string(),
        beta: full.beta,
        r_squared: full.r_squared,
        downside_beta: down.beta,
        downside_r_squared: down.r_squared,
        observations: full.observations,
        downside_observations: down.observations,
    }
}

/// Annualized realized volatility: population standard deviation × √periods.
#[must_use]
pub fn realized_volatility(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    var.sqrt() * periods_per_year.sqrt()
}
