//! Market data inputs: price histories and the portfolio snapshot.
//!
//! Both are produced by external collaborators (see [`crate::provider`]) and are
//! read-only to the engine. This module enforces their invariants and provides
//! the date alignment used before any return is computed.

use crate::error::{Error, Result};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single daily close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Trading date.
    pub date: NaiveDate,
    /// Closing price.
    pub close: f64,
}

impl Observation {
    /// Creates an observation.
    #[must_use]
    pub const fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Daily closing prices for one instrument, strictly ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    instrument_id: String,
    observations: Vec<Observation>,
}

impl PriceSeries {
    /// Creates a price series.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPriceSeries` if dates are not strictly ascending or a
    /// close is not a finite positive number.
    pub fn new(instrument_id: impl Into<String>, observations: Vec<Observation>) -> Result<Self> {
        let instrument_id = instrument_id.into();
        for pair in observations.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(Error::invalid_series(
                    &instrument_id,
                    format!(
                        "dates must be strictly ascending ({} follows {})",
                        pair[1].date, pair[0].date
                    ),
                ));
            }
        }
        if let Some(bad) = observations
            .iter()
            .find(|o| !o.close.is_finite() || o.close <= 0.0)
        {
            return Err(Error::invalid_series(
                &instrument_id,
                format!("close on {} is {}", bad.date, bad.close),
            ));
        }
        Ok(Self {
            instrument_id,
            observations,
        })
    }

    /// Creates a series from `(date, close)` pairs.
    ///
    /// # Errors
    ///
    /// See [`PriceSeries::new`].
    pub fn from_pairs(
        instrument_id: impl Into<String>,
        pairs: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Result<Self> {
        let observations = pairs
            .into_iter()
            .map(|(date, close)| Observation::new(date, close))
            .collect();
        Self::new(instrument_id, observations)
    }

    /// Returns the instrument identifier.
    #[must_use]
    pub fn instrument_id(&self) -> &str {
        &self.instrument_id
    }

    /// Returns the observations in date order.
    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Returns the number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Returns true if the series has no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Returns the closing prices in date order.
    #[must_use]
    pub fn closes(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.close).collect()
    }

    /// Returns the most recent close.
    #[must_use]
    pub fn latest_close(&self) -> Option<f64> {
        self.observations.last().map(|o| o.close)
    }

    /// Returns the close on a given date.
    #[must_use]
    pub fn close_on(&self, date: NaiveDate) -> Option<f64> {
        self.observations
            .binary_search_by_key(&date, |o| o.date)
            .ok()
            .map(|idx| self.observations[idx].close)
    }

    /// Drops observations outside `(as_of - lookback_days, as_of]`.
    #[must_use]
    pub fn retain_lookback(mut self, as_of: NaiveDate, lookback_days: u32) -> Self {
        let start = as_of
            .checked_sub_days(Days::new(u64::from(lookback_days)))
            .unwrap_or(NaiveDate::MIN);
        self.observations.retain(|o| o.date > start && o.date <= as_of);
        self
    }

    /// Fails if fewer than `required` observations are present.
    ///
    /// # Errors
    ///
    /// Returns `Error::InsufficientData` naming the instrument.
    pub fn require(&self, required: usize) -> Result<()> {
        if self.len() < required {
            return Err(Error::insufficient_data(
                &self.instrument_id,
                required,
                self.len(),
            ));
        }
        Ok(())
    }
}

/// Two price series joined on their common dates.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPair {
    /// Common dates, ascending.
    pub dates: Vec<NaiveDate>,
    /// Closes of the dependent series (the portfolio).
    pub dependent: Vec<f64>,
    /// Closes of the explanatory series (the candidate instrument).
    pub explanatory: Vec<f64>,
}

impl AlignedPair {
    /// Inner-joins two series on date.
    #[must_use]
    pub fn align(dependent: &PriceSeries, explanatory: &PriceSeries) -> Self {
        let mut dates = Vec::new();
        let mut dep = Vec::new();
        let mut exp = Vec::new();
        let (a, b) = (dependent.observations(), explanatory.observations());
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].date.cmp(&b[j].date) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    dates.push(a[i].date);
                    dep.push(a[i].close);
                    exp.push(b[j].close);
                    i += 1;
                    j += 1;
                }
            }
        }
        Self {
            dates,
            dependent: dep,
            explanatory: exp,
        }
    }

    /// Returns the number of aligned observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Returns true if the series share no dates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// A single holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    /// Ticker of the holding.
    pub instrument_id: String,
    /// Number of shares held.
    pub shares: f64,
    /// Current price per share.
    pub current_price: f64,
}

impl Holding {
    /// Creates a holding.
    #[must_use]
    pub fn new(instrument_id: impl Into<String>, shares: f64, current_price: f64) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            shares,
            current_price,
        }
    }

    /// Market value of the holding.
    #[must_use]
    pub fn market_value(&self) -> f64 {
        self.shares * self.current_price
    }
}

/// The set of holdings being hedged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    /// Holdings in the portfolio.
    pub positions: Vec<Holding>,
}

impl PortfolioSnapshot {
    /// Creates a validated snapshot.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPortfolio` if the snapshot is empty or any holding has
    /// non-positive shares or price.
    pub fn new(positions: Vec<Holding>) -> Result<Self> {
        let snapshot = Self { positions };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Checks the snapshot invariants.
    ///
    /// # Errors
    ///
    /// See [`PortfolioSnapshot::new`].
    pub fn validate(&self) -> Result<()> {
        if self.positions.is_empty() {
            return Err(Error::invalid_portfolio("portfolio has no holdings"));
        }
        for holding in &self.positions {
            if !(holding.shares > 0.0 && holding.shares.is_finite()) {
                return Err(Error::invalid_portfolio(format!(
                    "{} has non-positive shares ({})",
                    holding.instrument_id, holding.shares
                )));
            }
            if !(holding.current_price > 0.0 && holding.current_price.is_finite()) {
                return Err(Error::invalid_portfolio(format!(
                    "{} has non-positive price ({})",
                    holding.instrument_id, holding.current_price
                )));
            }
        }
        Ok(())
    }

    /// `Σ shares × current_price`.
    #[must_use]
    pub fn portfolio_value(&self) -> f64 {
        self.positions.iter().map(Holding::market_value).sum()
    }

    /// Builds a historical portfolio-value series from current share counts.
    ///
    /// Current shares are applied retroactively to every date on which all holdings
    /// have a close; historical share-count changes are ignored.
    ///
    /// # Errors
    ///
    /// Returns `Error::InsufficientData` naming a holding with no history.
    pub fn synthetic_series(
        &self,
        histories: &BTreeMap<String, PriceSeries>,
        series_id: &str,
    ) -> Result<PriceSeries> {
        let mut totals: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
        for holding in &self.positions {
            let history = histories
                .get(&holding.instrument_id)
                .filter(|h| !h.is_empty())
                .ok_or_else(|| Error::insufficient_data(&holding.instrument_id, 1, 0))?;
            for obs in history.observations() {
                let entry = totals.entry(obs.date).or_insert((0.0, 0));
                entry.0 += holding.shares * obs.close;
                entry.1 += 1;
            }
        }
        let count = self.positions.len();
        let pairs = totals
            .into_iter()
            .filter(|(_, (_, seen))| *seen == count)
            .map(|(date, (value, _))| (date, value));
        PriceSeries::from_pairs(series_id, pairs)
    }
}
