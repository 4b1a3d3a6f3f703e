//! Budget sizing with a volatility-regime multiplier.

use crate::config::{HedgeConfig, VolatilityRegime};
use serde::Serialize;

/// Dollar budget available for protection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HedgeBudget {
    /// Portfolio value the budget is drawn from.
    pub portfolio_value: f64,
    /// Volatility-index level used for the regime.
    pub volatility_index_level: f64,
    /// Regime multiplier applied to the base fraction.
    pub multiplier: f64,
    /// Configured base fraction.
    pub fraction_base: f64,
    /// `fraction_base × multiplier`.
    pub fraction_effective: f64,
    /// `fraction_effective × portfolio_value`.
    pub dollars: f64,
    /// `fraction_base × portfolio_value`, before the regime multiplier.
    pub dollars_base: f64,
    /// `dollars / contract_multiplier`.
    pub per_share: f64,
}

impl HedgeBudget {
    /// True if a per-share premium exceeds the per-share budget.
    #[must_use]
    pub fn is_exceeded_by(&self, premium_per_share: f64) -> bool {
        premium_per_share > self.per_share
    }
}

/// Computes the hedge budget.
#[must_use]
pub fn size_budget(
    portfolio_value: f64,
    config: &HedgeConfig,
    regime: &VolatilityRegime,
    contract_multiplier: u32,
) -> HedgeBudget {
    let level = config.volatility_index_level();
    let multiplier = regime.multiplier(level);
    let fraction_base = config.budget_fraction_base();
    let fraction_effective = fraction_base * multiplier;
    let dollars = fraction_effective * portfolio_value;
    HedgeBudget {
        portfolio_value,
        volatility_index_level: level,
        multiplier,
        fraction_base,
        fraction_effective,
        dollars,
        dollars_base: fraction_base * portfolio_value,
        per_share: dollars / f64::from(contract_multiplier),
    }
}
