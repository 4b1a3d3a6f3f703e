//! Option quotes, from the model or supplied by a user.

use super::black_scholes::{PutInputs, implied_volatility, value_put};
use crate::error::{Error, Result, Warning, Warnings};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Origin of a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSource {
    /// Priced by the Black-Scholes model.
    Model,
    /// Supplied by a user through the quote prompt.
    Manual,
}

impl fmt::Display for QuoteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model => write!(f, "model"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// A single-leg put quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    /// Underlying instrument.
    pub underlying_id: String,
    /// Strike price.
    pub strike: f64,
    /// Spot price of the underlying when quoted.
    pub spot: f64,
    /// Expiration date.
    pub expiration_date: NaiveDate,
    /// Premium per share.
    pub premium_per_share: f64,
    /// Annualized implied volatility.
    pub implied_vol: f64,
    /// Put delta.
    pub delta: f64,
    /// Put gamma.
    pub gamma: f64,
    /// Put theta per calendar day.
    pub theta: f64,
    /// Put vega per unit volatility.
    pub vega: f64,
    /// Where the quote came from.
    pub source: QuoteSource,
}

impl OptionQuote {
    /// Checks `premium_per_share > 0` and `strike > 0`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidQuote` describing the violated invariant.
    pub fn validate(&self) -> Result<()> {
        if !(self.premium_per_share > 0.0 && self.premium_per_share.is_finite()) {
            return Err(Error::invalid_quote(format!(
                "{}: premium per share must be positive, got {}",
                self.underlying_id, self.premium_per_share
            )));
        }
        if !(self.strike > 0.0 && self.strike.is_finite()) {
            return Err(Error::invalid_quote(format!(
                "{}: strike must be positive, got {}",
                self.underlying_id, self.strike
            )));
        }
        Ok(())
    }

    /// Out-of-the-money fraction `1 − K/S`.
    #[must_use]
    pub fn otm_fraction(&self) -> f64 {
        1.0 - self.strike / self.spot
    }

    /// Premium per contract.
    #[must_use]
    pub fn premium_per_contract(&self, multiplier: u32) -> f64 {
        self.premium_per_share * f64::from(multiplier)
    }

    /// True if the quote was supplied by a user.
    #[must_use]
    pub fn is_manual(&self) -> bool {
        self.source == QuoteSource::Manual
    }
}

impl fmt::Display for OptionQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:.2}P @ {:.4} ({}, iv {:.1}%, delta {:.3})",
            self.underlying_id,
            crate::utils::format_expiration_yyyymmdd(self.expiration_date),
            self.strike,
            self.premium_per_share,
            self.source,
            self.implied_vol * 100.0,
            self.delta
        )
    }
}

/// Market context for quoting puts on one instrument and expiration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingContext {
    /// Instrument being quoted.
    pub underlying_id: String,
    /// Expiration date.
    pub expiration_date: NaiveDate,
    /// Pricing inputs; the strike is replaced per quote.
    pub inputs: PutInputs,
    /// Floor applied to model premiums.
    pub min_premium: f64,
}

impl PricingContext {
    /// Spot price of the instrument.
    #[must_use]
    pub const fn spot(&self) -> f64 {
        self.inputs.spot
    }

    /// Model quote at a strike.
    ///
    /// The premium is floored at the configured minimum tick so that every quote
    /// satisfies the positive-premium invariant.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidQuote` for a non-positive strike and propagates
    /// pricing failures.
    pub fn model_quote(&self, strike: f64) -> Result<OptionQuote> {
        self.check_strike(strike)?;
        let inputs = self.inputs.with_strike(strike);
        let valuation = value_put(&inputs)?;
        let quote = OptionQuote {
            underlying_id: self.underlying_id.clone(),
            strike,
            spot: inputs.spot,
            expiration_date: self.expiration_date,
            premium_per_share: valuation.price.max(self.min_premium),
            implied_vol: inputs.volatility,
            delta: valuation.greeks.delta,
            gamma: valuation.greeks.gamma,
            theta: valuation.greeks.theta,
            vega: valuation.greeks.vega,
            source: QuoteSource::Model,
        };
        quote.validate()?;
        Ok(quote)
    }

    /// Builds a quote from a user's entry.
    ///
    /// Missing pieces are filled from the model: a strike without a premium is
    /// model-priced; a premium without an implied vol has it backed out; Greeks not
    /// supplied are computed at the resulting volatility.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidQuote` if the entry has neither premium nor strike, or
    /// the resulting quote violates its invariants.
    pub fn manual_quote(
        &self,
        entry: &ManualQuote,
        default_strike: f64,
        per_contract_threshold: f64,
        multiplier: u32,
        warnings: &mut Warnings,
    ) -> Result<OptionQuote> {
        if entry.premium.is_none() && entry.strike.is_none() {
            return Err(Error::invalid_quote(format!(
                "{}: manual entry has neither premium nor strike",
                entry.underlying_id
            )));
        }
        let strike = entry.strike.unwrap_or(default_strike);
        self.check_strike(strike)?;
        let inputs = self.inputs.with_strike(strike);

        let premium = match entry.premium_per_share(per_contract_threshold, multiplier) {
            Some(p) => p,
            None => value_put(&inputs)?.price.max(self.min_premium),
        };

        let volatility = match entry.implied_vol_fraction() {
            Some(iv) => iv,
            None => match implied_volatility(premium, &inputs) {
                Some(iv) => iv,
                None => {
                    warnings.push(Warning::ImpliedVolUnavailable {
                        instrument: entry.underlying_id.clone(),
                    });
                    inputs.volatility
                }
            },
        };
        let model = value_put(&inputs.with_volatility(volatility))?.greeks;

        let quote = OptionQuote {
            underlying_id: entry.underlying_id.clone(),
            strike,
            spot: inputs.spot,
            expiration_date: self.expiration_date,
            premium_per_share: premium,
            implied_vol: volatility,
            delta: entry.delta.unwrap_or(model.delta),
            gamma: entry.gamma.unwrap_or(model.gamma),
            theta: entry.theta.unwrap_or(model.theta),
            vega: entry.vega.unwrap_or(model.vega),
            source: QuoteSource::Manual,
        };
        quote.validate()?;
        Ok(quote)
    }

    fn check_strike(&self, strike: f64) -> Result<()> {
        if strike > 0.0 && strike.is_finite() {
            Ok(())
        } else {
            Err(Error::invalid_quote(format!(
                "{}: strike must be positive, got {strike}",
                self.underlying_id
            )))
        }
    }
}

/// A user's quote or strike override for one instrument.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ManualQuote {
    /// Instrument the entry applies to.
    pub underlying_id: String,
    /// Premium, per share or per contract.
    #[serde(default)]
    pub premium: Option<f64>,
    /// Strike override.
    #[serde(default)]
    pub strike: Option<f64>,
    /// Implied volatility, as a fraction or in vol points.
    #[serde(default)]
    pub implied_vol: Option<f64>,
    /// Delta override.
    #[serde(default)]
    pub delta: Option<f64>,
    /// Gamma override.
    #[serde(default)]
    pub gamma: Option<f64>,
    /// Theta override.
    #[serde(default)]
    pub theta: Option<f64>,
    /// Vega override.
    #[serde(default)]
    pub vega: Option<f64>,
}

impl ManualQuote {
    /// Creates an entry with a premium only.
    #[must_use]
    pub fn premium(underlying_id: impl Into<String>, premium: f64) -> Self {
        Self {
            underlying_id: underlying_id.into(),
            premium: Some(premium),
            ..Self::default()
        }
    }

    /// Adds a strike override.
    #[must_use]
    pub fn with_strike(mut self, strike: f64) -> Self {
        self.strike = Some(strike);
        self
    }

    /// Premium normalized to per-share.
    ///
    /// Values at or above `per_contract_threshold` are read as per-contract prices
    /// and divided by the multiplier.
    #[must_use]
    pub fn premium_per_share(&self, per_contract_threshold: f64, multiplier: u32) -> Option<f64> {
        self.premium.map(|p| {
            if p >= per_contract_threshold {
                p / f64::from(multiplier)
            } else {
                p
            }
        })
    }

    /// Implied vol as a fraction; values above 3 are read as vol points.
    #[must_use]
    pub fn implied_vol_fraction(&self) -> Option<f64> {
        self.implied_vol
            .filter(|iv| *iv > 0.0 && iv.is_finite())
            .map(|iv| if iv > 3.0 { iv / 100.0 } else { iv })
    }
}
