//! Statistical estimation over daily price histories.
//!
//! - [`returns`]: simple period-over-period returns from aligned closes.
//! - [`regression`]: OLS beta and R², the downside-conditioned variant, and
//!   realized volatility.
//!
//! ## Example
//!
//! ```rust
//! use portfolio_hedge::analytics::{ols, simple_returns};
//!
//! let index = simple_returns(&[100.0, 101.0, 99.0, 100.0, 98.0, 99.0]);
//! let portfolio: Vec<f64> = index.iter().map(|r| 1.5 * r).collect();
//! let fit = ols(&portfolio, &index);
//! assert!((fit.beta - 1.5).abs() < 1e-9);
//! assert!((fit.r_squared - 1.0).abs() < 1e-9);
//! ```

pub mod regression;
pub mod returns;

pub use regression::{
    LinearFit, RegressionFit, downside_ols, fit_instrument, ols, realized_volatility,
};
pub use returns::{aligned_returns, simple_returns};
