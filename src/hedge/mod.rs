//! Hedge construction.
//!
//! | Module | Step |
//! |--------|------|
//! | [`selector`] | picks the primary instrument from the regression fits |
//! | [`budget`] | dollar budget under the volatility regime |
//! | [`strike`] | expiration, suggested strike and the tightening search |
//! | [`sizer`] | contract count on the target-coverage or manual-override path |
//! | [`scenario`] | repricing under hypothetical drawdowns and breakeven |
//! | [`what_if`] | costs every considered quote at the recommended size |
//! | [`engine`] | runs the steps above against the collaborators |

pub mod budget;
pub mod engine;
pub mod scenario;
pub mod selector;
pub mod sizer;
pub mod strike;
pub mod what_if;

pub use budget::{HedgeBudget, size_budget};
pub use engine::{HedgeEngine, HedgeRecommendation, PORTFOLIO_SERIES_ID};
pub use scenario::{Breakeven, ScenarioRepricer, ScenarioResult, coverage_ratio};
pub use selector::{rank_fits, select_primary};
pub use sizer::{
    HedgePosition, PositionSizing, SizingPath, contracts_affordable, size_manual_override,
    size_target_coverage,
};
pub use strike::{
    MAX_INSTRUMENT_DRAWDOWN, StrikeSelection, Tightening, TighteningStep, expiration_date,
    implied_instrument_drawdown, sizing_beta, suggested_strike, tighten_strike,
};
pub use what_if::{CandidateStatus, QuoteCandidates, WhatIfRow, compare};
