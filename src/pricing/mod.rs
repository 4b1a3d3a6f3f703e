//! Option pricing.
//!
//! - [`black_scholes`]: European put price, Greeks and implied volatility with a
//!   continuous dividend yield, computed through `optionstratlib`.
//! - [`quote`]: [`OptionQuote`] values from the model or from a user's
//!   [`ManualQuote`], built against a [`PricingContext`].
//!
//! ## Example
//!
//! ```rust
//! use portfolio_hedge::pricing::{PutInputs, put_price};
//!
//! let inputs = PutInputs {
//!     spot: 100.0,
//!     strike: 90.0,
//!     time_to_expiry: 30.0 / 365.0,
//!     rate: 0.03,
//!     dividend_yield: 0.0,
//!     volatility: 0.20,
//! };
//! let price = put_price(&inputs).unwrap();
//! assert!(price > 0.0 && price < 90.0);
//! ```

pub mod black_scholes;
pub mod quote;

pub use black_scholes::{Greeks, PutInputs, PutValuation, implied_volatility, put_price, value_put};
pub use quote::{ManualQuote, OptionQuote, PricingContext, QuoteSource};
