//! Position sizing.
//!
//! Two paths:
//!
//! - **Target coverage**: enough contracts for the put's delta exposure to offset
//!   `beta_used × target_drawdown × portfolio_value`, clipped by what the
//!   volatility-adjusted budget affords.
//! - **Manual override**: when a user locks a quote whose premium exceeds the
//!   per-share budget, contracts are sized from the unadjusted base budget, with a
//!   minimum of one.

use crate::pricing::OptionQuote;
use crate::utils::premium_outlay;
use rust_decimal::Decimal;
use serde::Serialize;

/// Sizing path taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingPath {
    /// Delta-based target clipped by budget affordability.
    TargetCoverage,
    /// Fixed base budget after a user override.
    ManualOverride,
}

/// Outcome of sizing a quote.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionSizing {
    /// Path taken.
    pub path: SizingPath,
    /// Contracts needed for target coverage (target path only).
    pub contracts_target: Option<u64>,
    /// Contracts the applicable budget affords.
    pub contracts_affordable: u64,
    /// Recommended contracts.
    pub contracts_final: u64,
    /// `|delta|` used in the target formula, after flooring.
    pub delta_used: f64,
    /// True when `|delta|` was raised to the floor.
    pub delta_floored: bool,
}

/// Converts a non-negative float count to `u64`, mapping NaN and negatives to 0.
fn to_count(value: f64) -> u64 {
    if value.is_nan() || value <= 0.0 {
        0
    } else {
        // Float-to-int casts saturate at u64::MAX.
        value as u64
    }
}

/// Contracts affordable within `budget_dollars`.
#[must_use]
pub fn contracts_affordable(budget_dollars: f64, premium_per_share: f64, multiplier: u32) -> u64 {
    let per_contract = premium_per_share * f64::from(multiplier);
    if per_contract <= 0.0 {
        return 0;
    }
    to_count((budget_dollars / per_contract).floor())
}

/// Target-coverage sizing.
///
/// `contracts_target = ceil(beta_used × target_drawdown × portfolio_value /
/// (|delta| × spot × multiplier))`, with `|delta|` floored at `delta_floor`.
#[must_use]
pub fn size_target_coverage(
    quote: &OptionQuote,
    beta_used: f64,
    target_drawdown: f64,
    portfolio_value: f64,
    budget_dollars: f64,
    multiplier: u32,
    delta_floor: f64,
) -> PositionSizing {
    let abs_delta = quote.delta.abs();
    let delta_floored = abs_delta < delta_floor;
    let delta_used = abs_delta.max(delta_floor);

    let exposure = beta_used * target_drawdown * portfolio_value;
    let per_contract = delta_used * quote.spot * f64::from(multiplier);
    let contracts_target = to_count((exposure / per_contract).ceil());
    let affordable = contracts_affordable(budget_dollars, quote.premium_per_share, multiplier);

    PositionSizing {
        path: SizingPath::TargetCoverage,
        contracts_target: Some(contracts_target),
        contracts_affordable: affordable,
        contracts_final: contracts_target.min(affordable),
        delta_used,
        delta_floored,
    }
}

/// Manual-override sizing from the unadjusted base budget.
#[must_use]
pub fn size_manual_override(
    quote: &OptionQuote,
    budget_dollars_base: f64,
    multiplier: u32,
) -> PositionSizing {
    let affordable = contracts_affordable(budget_dollars_base, quote.premium_per_share, multiplier);
    PositionSizing {
        path: SizingPath::ManualOverride,
        contracts_target: None,
        contracts_affordable: affordable,
        contracts_final: affordable.max(1),
        delta_used: quote.delta.abs(),
        delta_floored: false,
    }
}

/// The recommended protective put position.
///
/// Computed once per invocation and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HedgePosition {
    quote: OptionQuote,
    contracts: u64,
    total_premium: Decimal,
}

impl HedgePosition {
    /// Creates a position; `total_premium = contracts × premium_per_share × multiplier`.
    #[must_use]
    pub fn new(quote: OptionQuote, contracts: u64, multiplier: u32) -> Self {
        let total_premium = premium_outlay(contracts, quote.premium_per_share, multiplier);
        Self {
            quote,
            contracts,
            total_premium,
        }
    }

    /// The quote the position is built on.
    #[must_use]
    pub const fn quote(&self) -> &OptionQuote {
        &self.quote
    }

    /// Number of contracts.
    #[must_use]
    pub const fn contracts(&self) -> u64 {
        self.contracts
    }

    /// Total premium paid.
    #[must_use]
    pub const fn total_premium(&self) -> Decimal {
        self.total_premium
    }
}
