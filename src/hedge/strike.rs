//! Strike and expiration selection.
//!
//! The target portfolio drawdown is translated into a decline of the hedge
//! instrument through the blended sizing beta, which gives the suggested strike.
//! Unless a user override locks the run, [`tighten_strike`] then walks the strike
//! toward the money until the projected coverage is acceptable.

use crate::analytics::RegressionFit;
use crate::config::{EngineSettings, HedgeConfig, TighteningPolicy};
use crate::error::{Error, Result, Warning, Warnings};
use crate::pricing::{OptionQuote, PricingContext};
use crate::utils::{next_expiration, round_to_increment};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

/// Largest instrument decline a strike or scenario is allowed to imply.
pub const MAX_INSTRUMENT_DRAWDOWN: f64 = 0.99;

/// Blended sizing beta with the near-zero guard applied.
///
/// A magnitude below `beta_floor` is clamped to the floor, keeping the sign.
pub fn sizing_beta(
    config: &HedgeConfig,
    fit: &RegressionFit,
    beta_floor: f64,
    warnings: &mut Warnings,
) -> f64 {
    let blended = config.blended_beta(fit.beta, fit.downside_beta);
    let beta = if blended.abs() < beta_floor {
        warnings.push(Warning::NearZeroBeta {
            beta: blended,
            floor: beta_floor,
        });
        if blended < 0.0 { -beta_floor } else { beta_floor }
    } else {
        blended
    };
    if beta < 0.0 {
        warnings.push(Warning::NegativeBeta { beta });
    }
    beta
}

/// Instrument decline implied by a portfolio drawdown, in `[0, 0.99]`.
#[must_use]
pub fn implied_instrument_drawdown(portfolio_drawdown: f64, beta_used: f64) -> f64 {
    if beta_used == 0.0 {
        return 0.0;
    }
    (portfolio_drawdown / beta_used).clamp(0.0, MAX_INSTRUMENT_DRAWDOWN)
}

/// `spot × (1 − implied_instrument_drawdown)`, rounded to the listed increment.
#[must_use]
pub fn suggested_strike(
    spot: f64,
    target_drawdown: f64,
    beta_used: f64,
    strike_increment: Option<f64>,
) -> f64 {
    let decline = implied_instrument_drawdown(target_drawdown, beta_used);
    round_to_increment(spot * (1.0 - decline), strike_increment)
}

/// Expiration date for a run starting on `as_of`.
///
/// # Errors
///
/// Returns `Error::InvalidConfiguration` if the date cannot be represented.
pub fn expiration_date(
    as_of: NaiveDate,
    config: &HedgeConfig,
    settings: &EngineSettings,
) -> Result<NaiveDate> {
    next_expiration(
        as_of,
        config.days_to_expiration(),
        settings.expiration_weekday,
    )
    .ok_or_else(|| Error::invalid_config("days_to_expiration", "expiration date out of range"))
}

/// One evaluation of the tightening search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TighteningStep {
    /// Step number; 0 is the starting strike.
    pub step: u32,
    /// Out-of-the-money fraction evaluated.
    pub otm_fraction: f64,
    /// Strike evaluated.
    pub strike: f64,
    /// Model premium per share at the strike.
    pub premium_per_share: f64,
    /// Projected coverage at the target drawdown.
    pub coverage: f64,
}

/// Result of the tightening search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tightening {
    /// Quote at the final strike.
    pub quote: OptionQuote,
    /// Every strike evaluated, in order.
    pub steps: Vec<TighteningStep>,
}

impl Tightening {
    /// True if the search moved the strike.
    #[must_use]
    pub fn moved(&self) -> bool {
        self.steps.len() > 1
    }

    /// Projected coverage at the final strike.
    #[must_use]
    pub fn final_coverage(&self) -> f64 {
        self.steps.last().map_or(0.0, |s| s.coverage)
    }
}

/// Moves the strike toward the money until projected coverage is acceptable.
///
/// Starting from `start_strike`, the OTM fraction is multiplied by
/// `policy.shrink_factor` at each step, for at most `policy.max_steps` steps. The
/// search stops as soon as `projected_coverage` reaches `policy.min_coverage` or the
/// OTM fraction reaches `policy.min_otm`, whichever comes first.
///
/// # Errors
///
/// Propagates quote errors from the pricing context and failures of
/// `projected_coverage`.
pub fn tighten_strike<F>(
    context: &PricingContext,
    start_strike: f64,
    policy: &TighteningPolicy,
    strike_increment: Option<f64>,
    projected_coverage: F,
) -> Result<Tightening>
where
    F: Fn(&OptionQuote) -> Result<f64>,
{
    let spot = context.spot();
    let mut quote = context.model_quote(start_strike)?;
    let mut otm = quote.otm_fraction();
    let mut coverage = projected_coverage(&quote)?;
    let mut steps = vec![TighteningStep {
        step: 0,
        otm_fraction: otm,
        strike: quote.strike,
        premium_per_share: quote.premium_per_share,
        coverage,
    }];

    for step in 1..=policy.max_steps {
        if coverage >= policy.min_coverage || otm <= policy.min_otm {
            break;
        }
        otm = (otm * policy.shrink_factor).max(policy.min_otm);
        let strike = round_to_increment(spot * (1.0 - otm), strike_increment);
        quote = context.model_quote(strike)?;
        coverage = projected_coverage(&quote)?;
        debug!(
            instrument = %context.underlying_id,
            step,
            strike,
            otm_fraction = otm,
            coverage,
            "tightening strike"
        );
        steps.push(TighteningStep {
            step,
            otm_fraction: otm,
            strike,
            premium_per_share: quote.premium_per_share,
            coverage,
        });
    }

    Ok(Tightening { quote, steps })
}

/// How the final strike was chosen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrikeSelection {
    /// Instrument the strike applies to.
    pub instrument_id: String,
    /// Expiration date.
    pub expiration_date: NaiveDate,
    /// Blended sizing beta.
    pub beta_used: f64,
    /// Instrument decline implied by the target drawdown.
    pub implied_instrument_drawdown: f64,
    /// Strike implied by the target drawdown.
    pub suggested_strike: f64,
    /// Strike of the recommended position.
    pub final_strike: f64,
    /// Tightening steps; empty when the run was locked.
    pub tightening: Vec<TighteningStep>,
    /// True when a user override fixed the strike or price.
    pub locked: bool,
}
