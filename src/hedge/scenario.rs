//! Scenario repricing.
//!
//! Each hypothetical portfolio drawdown is translated into an instrument decline
//! through `beta_used`. The put is then repriced at the shocked spot with a
//! linearly expanded volatility:
//!
//! ```text
//! d  = drawdown / beta_used
//! S' = S × (1 − d)
//! σ' = σ + expansion_rate × (d × 100) / 100
//! gain per contract = max(0, P(S', K, σ') − premium_paid) × multiplier
//! ```

use super::strike::{MAX_INSTRUMENT_DRAWDOWN, implied_instrument_drawdown};
use crate::config::ScenarioPolicy;
use crate::error::Result;
use crate::pricing::{OptionQuote, PutInputs, put_price};
use serde::Serialize;

/// Outcome of one hypothetical drawdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenarioResult {
    /// Portfolio decline, as a fraction.
    pub portfolio_drawdown: f64,
    /// Instrument decline implied through `beta_used`.
    pub implied_instrument_drawdown: f64,
    /// Shocked spot.
    pub shocked_spot: f64,
    /// Shocked volatility.
    pub shocked_volatility: f64,
    /// Repriced premium per share.
    pub repriced_premium: f64,
    /// Gain per contract over the premium paid, floored at zero.
    pub gain_per_contract: f64,
    /// `gain_per_contract × contracts`.
    pub total_offset: f64,
    /// Fraction of the portfolio loss offset; `None` when the loss is zero.
    pub coverage_ratio: Option<f64>,
}

/// Drawdown at which the position's gain first covers the premium paid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Breakeven {
    /// Instrument decline at breakeven.
    pub instrument_drawdown: f64,
    /// `instrument_drawdown × beta_used`.
    pub portfolio_drawdown: f64,
}

/// `total_offset / (drawdown × portfolio_value)`, undefined for a zero loss.
#[must_use]
pub fn coverage_ratio(total_offset: f64, drawdown: f64, portfolio_value: f64) -> Option<f64> {
    let loss = drawdown * portfolio_value;
    if loss > 0.0 && loss.is_finite() {
        Some((total_offset / loss).max(0.0))
    } else {
        None
    }
}

/// Reprices one put position under hypothetical declines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioRepricer {
    inputs: PutInputs,
    premium_paid: f64,
    beta_used: f64,
    contracts: u64,
    multiplier: u32,
    iv_expansion_rate: f64,
}

impl ScenarioRepricer {
    /// Creates a repricer for `contracts` of `quote`.
    ///
    /// `inputs` supplies time to expiry, rate and dividend yield; spot, strike and
    /// volatility are taken from the quote.
    #[must_use]
    pub fn new(
        quote: &OptionQuote,
        inputs: &PutInputs,
        beta_used: f64,
        contracts: u64,
        multiplier: u32,
        iv_expansion_rate: f64,
    ) -> Self {
        let inputs = PutInputs {
            spot: quote.spot,
            strike: quote.strike,
            volatility: quote.implied_vol,
            ..*inputs
        };
        Self {
            inputs,
            premium_paid: quote.premium_per_share,
            beta_used,
            contracts,
            multiplier,
            iv_expansion_rate,
        }
    }

    /// Pricing inputs after an instrument decline.
    #[must_use]
    pub fn shocked_inputs(&self, instrument_drawdown: f64) -> PutInputs {
        let iv_shock_points = self.iv_expansion_rate * (instrument_drawdown * 100.0);
        PutInputs {
            spot: self.inputs.spot * (1.0 - instrument_drawdown),
            volatility: self.inputs.volatility + iv_shock_points / 100.0,
            ..self.inputs
        }
    }

    /// Gain per contract after an instrument decline.
    ///
    /// # Errors
    ///
    /// Propagates pricing failures at the shocked inputs.
    pub fn gain_per_contract(&self, instrument_drawdown: f64) -> Result<f64> {
        let repriced = put_price(&self.shocked_inputs(instrument_drawdown))?;
        Ok(self.gain_over_paid(repriced))
    }

    fn gain_over_paid(&self, repriced: f64) -> f64 {
        (repriced - self.premium_paid).max(0.0) * f64::from(self.multiplier)
    }

    /// Premium paid for the whole position.
    #[must_use]
    pub fn total_premium(&self) -> f64 {
        self.premium_paid * f64::from(self.multiplier) * self.contracts as f64
    }

    /// Reprices the position after a portfolio drawdown.
    ///
    /// # Errors
    ///
    /// Propagates pricing failures at the shocked inputs.
    pub fn evaluate(
        &self,
        portfolio_drawdown: f64,
        portfolio_value: f64,
    ) -> Result<ScenarioResult> {
        let decline = implied_instrument_drawdown(portfolio_drawdown, self.beta_used);
        let shocked = self.shocked_inputs(decline);
        let repriced = put_price(&shocked)?;
        let gain = self.gain_over_paid(repriced);
        let total_offset = gain * self.contracts as f64;
        Ok(ScenarioResult {
            portfolio_drawdown,
            implied_instrument_drawdown: decline,
            shocked_spot: shocked.spot,
            shocked_volatility: shocked.volatility,
            repriced_premium: repriced,
            gain_per_contract: gain,
            total_offset,
            coverage_ratio: coverage_ratio(total_offset, portfolio_drawdown, portfolio_value),
        })
    }

    /// Reprices the position across the policy's drawdown menu.
    ///
    /// # Errors
    ///
    /// Propagates the first pricing failure.
    pub fn run(
        &self,
        policy: &ScenarioPolicy,
        portfolio_value: f64,
    ) -> Result<Vec<ScenarioResult>> {
        policy
            .drawdowns
            .iter()
            .map(|d| self.evaluate(*d, portfolio_value))
            .collect()
    }

    /// Scans instrument declines from zero in `step` increments for the first one
    /// at which the position's gain covers the premium paid.
    ///
    /// Returns `None` for an empty position, a non-positive step, or when no decline
    /// up to the maximum reaches breakeven.
    ///
    /// # Errors
    ///
    /// Propagates pricing failures during the scan.
    pub fn breakeven(&self, step: f64) -> Result<Option<Breakeven>> {
        if self.contracts == 0 || !(step > 0.0 && step.is_finite()) {
            return Ok(None);
        }
        let premium = self.total_premium();
        let count = self.contracts as f64;
        let max_steps = (MAX_INSTRUMENT_DRAWDOWN / step).floor() as u64;
        for k in 0..=max_steps {
            let instrument_drawdown = k as f64 * step;
            if self.gain_per_contract(instrument_drawdown)? * count >= premium {
                return Ok(Some(Breakeven {
                    instrument_drawdown,
                    portfolio_drawdown: instrument_drawdown * self.beta_used,
                }));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::{PricingContext, QuoteSource};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn context() -> PricingContext {
        PricingContext {
            underlying_id: "SPY".into(),
            expiration_date: NaiveDate::from_ymd_opt(2025, 2, 7).unwrap(),
            inputs: PutInputs {
                spot: 575.0,
                strike: 575.0,
                time_to_expiry: 32.0 / 365.0,
                rate: 0.04,
                dividend_yield: 0.013,
                volatility: 0.18,
            },
            min_premium: 0.01,
        }
    }

    fn repricer(contracts: u64) -> ScenarioRepricer {
        let ctx = context();
        let quote = ctx.model_quote(540.0).unwrap();
        ScenarioRepricer::new(&quote, &ctx.inputs, 1.0, contracts, 100, 0.5)
    }

    #[test]
    fn test_shock_applies_iv_expansion() {
        let shocked = repricer(10).shocked_inputs(0.10);
        assert_relative_eq!(shocked.spot, 517.5, epsilon = 1e-9);
        assert_relative_eq!(shocked.volatility, 0.23, epsilon = 1e-12);
        assert_eq!(shocked.strike, 540.0);
    }

    #[test]
    fn test_gains_grow_with_drawdown() {
        let results = repricer(10)
            .run(&ScenarioPolicy::default(), 840_000.0)
            .unwrap();
        assert_eq!(results.len(), 4);
        for pair in results.windows(2) {
            assert!(pair[1].gain_per_contract >= pair[0].gain_per_contract);
            assert!(pair[1].total_offset >= pair[0].total_offset);
        }
        for result in &results {
            assert!(result.coverage_ratio.unwrap() >= 0.0);
        }
        let worst = results.last().unwrap();
        assert_relative_eq!(worst.total_offset, worst.gain_per_contract * 10.0);
    }

    #[test]
    fn test_coverage_undefined_at_zero_drawdown() {
        assert_eq!(coverage_ratio(1_000.0, 0.0, 840_000.0), None);
        let result = repricer(10).evaluate(0.0, 840_000.0).unwrap();
        assert_eq!(result.coverage_ratio, None);
        assert_eq!(result.gain_per_contract, 0.0);
    }

    #[test]
    fn test_manual_premium_above_model_floors_gain() {
        let ctx = context();
        let mut quote = ctx.model_quote(540.0).unwrap();
        quote.premium_per_share = 500.0;
        quote.source = QuoteSource::Manual;
        let repricer = ScenarioRepricer::new(&quote, &ctx.inputs, 1.0, 3, 100, 0.5);
        let result = repricer.evaluate(0.05, 840_000.0).unwrap();
        assert_eq!(result.gain_per_contract, 0.0);
        assert_eq!(result.coverage_ratio, Some(0.0));
        assert!(repricer.breakeven(0.001).unwrap().is_none());
    }

    #[test]
    fn test_breakeven_is_first_covering_step() {
        let repricer = repricer(10);
        let step = 0.001;
        let breakeven = repricer.breakeven(step).unwrap().unwrap();
        let d = breakeven.instrument_drawdown;
        assert!(d > 0.0 && d < 0.2);
        let premium = repricer.total_premium();
        assert!(repricer.gain_per_contract(d).unwrap() * 10.0 >= premium);
        assert!(repricer.gain_per_contract(d - step).unwrap() * 10.0 < premium);
        assert_relative_eq!(breakeven.portfolio_drawdown, d);
    }

    #[test]
    fn test_breakeven_scales_with_beta() {
        let ctx = context();
        let quote = ctx.model_quote(540.0).unwrap();
        let levered = ScenarioRepricer::new(&quote, &ctx.inputs, 2.0, 10, 100, 0.5);
        let breakeven = levered.breakeven(0.001).unwrap().unwrap();
        assert_relative_eq!(
            breakeven.portfolio_drawdown,
            breakeven.instrument_drawdown * 2.0
        );
    }

    #[test]
    fn test_breakeven_requires_contracts() {
        assert!(repricer(0).breakeven(0.001).unwrap().is_none());
        assert!(repricer(10).breakeven(0.0).unwrap().is_none());
    }
}
