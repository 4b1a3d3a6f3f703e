//! What-if comparison of every quote considered in a run.
//!
//! The contract count of the recommended position is held fixed and each
//! candidate quote is costed at that size. Nothing here changes the
//! recommendation.

use super::sizer::HedgePosition;
use crate::pricing::{OptionQuote, QuoteSource};
use crate::utils::{money_to_f64, premium_outlay};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Quotes considered during a run, in the order they were produced.
///
/// Each selection step takes the sequence by value and returns it with its own
/// quotes appended.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct QuoteCandidates(Vec<OptionQuote>);

impl QuoteCandidates {
    /// Creates an empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sequence with `quote` appended.
    #[must_use]
    pub fn with(mut self, quote: OptionQuote) -> Self {
        self.0.push(quote);
        self
    }

    /// Quotes in order.
    #[must_use]
    pub fn as_slice(&self) -> &[OptionQuote] {
        &self.0
    }

    /// Number of quotes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no quote was considered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Most recent quote.
    #[must_use]
    pub fn last(&self) -> Option<&OptionQuote> {
        self.0.last()
    }
}

/// Whether a candidate became the recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    /// The recommended quote.
    Used,
    /// Considered and passed over.
    Skipped,
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Used => write!(f, "used"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// One row of the what-if table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhatIfRow {
    /// Underlying of the quote.
    pub underlying_id: String,
    /// Strike of the quote.
    pub strike: f64,
    /// Origin of the quote.
    pub source: QuoteSource,
    /// Premium per share.
    pub premium_per_share: f64,
    /// Contracts costed (the recommended count).
    pub contracts: u64,
    /// `contracts × premium_per_share × multiplier`.
    pub spend: Decimal,
    /// `spend / portfolio_value`.
    pub spend_pct: f64,
    /// Used or skipped.
    pub status: CandidateStatus,
}

/// Costs every candidate at the recommended contract count.
///
/// The last candidate equal to the position's quote is tagged as used; when the
/// same quote was produced twice only the latest one is.
#[must_use]
pub fn compare(
    candidates: &QuoteCandidates,
    position: &HedgePosition,
    multiplier: u32,
    portfolio_value: f64,
) -> Vec<WhatIfRow> {
    let contracts = position.contracts();
    let used = candidates
        .as_slice()
        .iter()
        .rposition(|q| q == position.quote());
    candidates
        .as_slice()
        .iter()
        .enumerate()
        .map(|(i, quote)| {
            let spend = premium_outlay(contracts, quote.premium_per_share, multiplier);
            let spend_pct = if portfolio_value > 0.0 {
                money_to_f64(spend) / portfolio_value
            } else {
                0.0
            };
            WhatIfRow {
                underlying_id: quote.underlying_id.clone(),
                strike: quote.strike,
                source: quote.source,
                premium_per_share: quote.premium_per_share,
                contracts,
                spend,
                spend_pct,
                status: if Some(i) == used {
                    CandidateStatus::Used
                } else {
                    CandidateStatus::Skipped
                },
            }
        })
        .collect()
}
