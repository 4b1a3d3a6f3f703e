//! European put pricing with continuous dividend yield.
//!
//! ```text
//! d1 = (ln(S/K) + (r - q + σ²/2)·T) / (σ·√T)
//! d2 = d1 - σ·√T
//! P  = K·e^(-rT)·N(-d2) - S·e^(-qT)·N(-d1)
//! ```
//!
//! Prices and Greeks come from `optionstratlib`. The put is valued as a
//! non-dividend put on the prepaid forward `F = S·e^(-qT)`, which gives the
//! formulas above exactly; delta and gamma are mapped back to spot with the
//! `e^(-qT)` factor and theta picks up the `-q·F·N(-d1)` carry term.
//!
//! When `T ≤ 0` or `σ ≤ 0` the price collapses to intrinsic value `max(K - S, 0)`.

use crate::error::Result;
use crate::utils::DAYS_PER_YEAR;
use optionstratlib::greeks;
use optionstratlib::model::decimal::{decimal_to_f64, f64_to_decimal};
use optionstratlib::pricing::black_scholes;
use optionstratlib::volatility::implied_volatility as solve_implied_volatility;
use optionstratlib::{ExpirationDate, OptionStyle, OptionType, Options, Positive, Side};
use serde::{Deserialize, Serialize};

/// Grid density of the implied-volatility search: `100 × n` points over `(0, 1)`.
const IV_SEARCH_ITERATIONS: i64 = 10;
/// Volatility spacing of the search grid.
const IV_GRID_STEP: f64 = 1.0 / (100.0 * IV_SEARCH_ITERATIONS as f64);

/// Market inputs for pricing a single put.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PutInputs {
    /// Spot price of the underlying.
    pub spot: f64,
    /// Strike price.
    pub strike: f64,
    /// Time to expiration in years.
    pub time_to_expiry: f64,
    /// Continuously compounded risk-free rate.
    pub rate: f64,
    /// Continuous dividend yield.
    pub dividend_yield: f64,
    /// Annualized volatility.
    pub volatility: f64,
}

impl PutInputs {
    /// Returns a copy with a different strike.
    #[must_use]
    pub const fn with_strike(mut self, strike: f64) -> Self {
        self.strike = strike;
        self
    }

    /// Returns a copy with a different spot.
    #[must_use]
    pub const fn with_spot(mut self, spot: f64) -> Self {
        self.spot = spot;
        self
    }

    /// Returns a copy with a different volatility.
    #[must_use]
    pub const fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    /// True when the closed form does not apply and the price is intrinsic.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.time_to_expiry <= 0.0 || self.volatility <= 0.0 || self.spot <= 0.0
    }

    /// Intrinsic value `max(K - S, 0)`.
    #[must_use]
    pub fn intrinsic(&self) -> f64 {
        (self.strike - self.spot).max(0.0)
    }

    /// Discount factor on the underlying, `e^(-qT)`.
    #[must_use]
    pub fn carry_discount(&self) -> f64 {
        (-self.dividend_yield * self.time_to_expiry).exp()
    }

    /// Long European put on the prepaid forward, with no dividend yield.
    fn forward_put(&self) -> Result<Options> {
        Ok(Options::new(
            OptionType::European,
            Side::Long,
            String::new(),
            Positive::new(self.strike)?,
            ExpirationDate::Days(Positive::new(self.time_to_expiry * DAYS_PER_YEAR)?),
            Positive::new(self.volatility)?,
            Positive::ONE,
            Positive::new(self.spot * self.carry_discount())?,
            f64_to_decimal(self.rate)?,
            OptionStyle::Put,
            Positive::ZERO,
            None,
        ))
    }
}

/// Put sensitivities.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Greeks {
    /// ∂P/∂S, in `[-1, 0]`.
    pub delta: f64,
    /// ∂²P/∂S².
    pub gamma: f64,
    /// ∂P/∂t per calendar day.
    pub theta: f64,
    /// ∂P/∂σ per unit volatility.
    pub vega: f64,
}

impl Greeks {
    /// Vega per one volatility point.
    #[must_use]
    pub fn vega_per_point(&self) -> f64 {
        self.vega * 0.01
    }
}

/// Price and Greeks of a put.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PutValuation {
    /// Premium per share.
    pub price: f64,
    /// Sensitivities.
    pub greeks: Greeks,
}

/// Black-Scholes put price.
///
/// # Errors
///
/// Returns `Error::Pricing` when the inputs cannot be represented by the pricing
/// library (a negative strike, a non-finite value).
pub fn put_price(inputs: &PutInputs) -> Result<f64> {
    if inputs.is_degenerate() {
        return Ok(inputs.intrinsic());
    }
    let price = black_scholes(&inputs.forward_put()?)?;
    Ok(decimal_to_f64(price)?.max(0.0))
}

/// Black-Scholes put price and Greeks.
///
/// In the degenerate case delta is `-1` for an in-the-money put and `0` otherwise,
/// and the remaining Greeks are zero.
///
/// # Errors
///
/// Returns `Error::Pricing` when the pricing library rejects the inputs.
pub fn value_put(inputs: &PutInputs) -> Result<PutValuation> {
    if inputs.is_degenerate() {
        let delta = if inputs.strike > inputs.spot { -1.0 } else { 0.0 };
        return Ok(PutValuation {
            price: inputs.intrinsic(),
            greeks: Greeks {
                delta,
                ..Greeks::default()
            },
        });
    }

    let option = inputs.forward_put()?;
    let discount = inputs.carry_discount();
    let forward = inputs.spot * discount;

    let price = decimal_to_f64(black_scholes(&option)?)?.max(0.0);
    let d1 = greeks::d1(
        option.underlying_price,
        option.strike_price,
        option.risk_free_rate,
        option.expiration_date.get_years()?,
        option.implied_volatility,
    )?;
    let n_minus_d1 = decimal_to_f64(greeks::big_n(-d1)?)?;
    let carry = inputs.dividend_yield * forward * n_minus_d1 / DAYS_PER_YEAR;

    Ok(PutValuation {
        price,
        greeks: Greeks {
            delta: discount * decimal_to_f64(greeks::delta(&option)?)?,
            gamma: discount * discount * decimal_to_f64(greeks::gamma(&option)?)?,
            theta: decimal_to_f64(greeks::theta(&option)?)? - carry,
            // library vega is per volatility point
            vega: decimal_to_f64(greeks::vega(&option)?)? * 100.0,
        },
    })
}

/// Backs out the volatility that reproduces a put premium.
///
/// Grid search over `(0, 1)` in steps of 0.001. The solution is accepted only if
/// it reprices the premium to within one grid step of vega, so premiums outside
/// the attainable range and expired options give `None`.
#[must_use]
pub fn implied_volatility(premium: f64, inputs: &PutInputs) -> Option<f64> {
    if inputs.time_to_expiry <= 0.0
        || inputs.spot <= 0.0
        || !(premium > 0.0 && premium.is_finite())
    {
        return None;
    }
    let mut option = inputs.forward_put().ok()?;
    let market_price = Positive::new(premium).ok()?;
    let solved = solve_implied_volatility(market_price, &mut option, IV_SEARCH_ITERATIONS)
        .ok()?
        .to_f64();

    let valuation = value_put(&inputs.with_volatility(solved)).ok()?;
    let tolerance = valuation.greeks.vega * IV_GRID_STEP + 1e-9;
    ((valuation.price - premium).abs() <= tolerance).then_some(solved)
}
