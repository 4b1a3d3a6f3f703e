//! Hedge instrument selection.
//!
//! Candidates are ranked by how well they explain the portfolio's down days:
//! descending downside R², ties broken by descending full-sample R². Candidates
//! that tie on both keep their configured order.

use crate::analytics::RegressionFit;
use crate::error::{Error, Result};
use std::cmp::Ordering;

fn by_downside_fit(a: &RegressionFit, b: &RegressionFit) -> Ordering {
    b.downside_r_squared
        .total_cmp(&a.downside_r_squared)
        .then_with(|| b.r_squared.total_cmp(&a.r_squared))
}

/// Returns the fits ordered best first.
#[must_use]
pub fn rank_fits(fits: &[RegressionFit]) -> Vec<&RegressionFit> {
    let mut ranked: Vec<&RegressionFit> = fits.iter().collect();
    ranked.sort_by(|a, b| by_downside_fit(a, b));
    ranked
}

/// Returns the primary instrument's fit.
///
/// # Errors
///
/// Returns `Error::NoCandidates` if `fits` is empty.
pub fn select_primary(fits: &[RegressionFit]) -> Result<&RegressionFit> {
    fits.iter()
        .min_by(|a, b| by_downside_fit(a, b))
        .ok_or(Error::NoCandidates)
}
