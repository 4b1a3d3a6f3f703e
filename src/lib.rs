//! # Portfolio Hedge - Protective Put Sizing and Pricing
//!
//! A Rust library that sizes a protective put position for an equity portfolio.
//! Given holdings and daily price histories it finds the index instrument that best
//! explains the portfolio's down days, budgets the hedge against the current
//! volatility regime, prices puts with Black-Scholes, and stress-tests the
//! resulting position across hypothetical market declines.
//!
//! ## Key Features
//!
//! - **Downside-Aware Instrument Selection**: Candidates are ranked by the R² of a
//!   regression restricted to the instrument's down days, then by full-sample R².
//!
//! - **Volatility-Regime Budgeting**: The hedge budget shrinks in stressed markets
//!   through a configurable step schedule keyed on a volatility index.
//!
//! - **Closed-Form Pricing**: European put price, delta, gamma, theta and vega with
//!   a continuous dividend yield, plus implied volatility, built on
//!   [OptionStratLib](https://crates.io/crates/optionstratlib).
//!
//! - **Strike Tightening**: A bounded search moves a far out-of-the-money strike
//!   toward the money until projected coverage is meaningful.
//!
//! - **Scenario Repricing**: Each hypothetical drawdown is repriced with a linear
//!   implied-volatility expansion, with coverage ratios and a breakeven scan.
//!
//! - **Manual Overrides**: A user-supplied premium or strike locks the run and,
//!   when it exceeds the budget, switches sizing to the unadjusted base budget.
//!
//! - **Result-Based Error Handling**: All fallible operations return
//!   `Result<T, Error>`; degraded inputs produce [`error::Warning`] values instead.
//!
//! ## Architecture
//!
//! ```text
//! HedgeEngine
//!   ├── provider  (portfolio, price history, volatility index, config, prompt, sink)
//!   ├── market    (PriceSeries, PortfolioSnapshot, date alignment)
//!   ├── analytics (returns, beta / R², downside beta, realized volatility)
//!   ├── pricing   (Black-Scholes put, Greeks, implied vol, OptionQuote)
//!   └── hedge     (selector → budget → strike → sizer → scenario → what-if)
//! ```
//!
//! ## Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`analytics`] | Returns, regression fits and realized volatility |
//! | [`config`] | Per-run `HedgeConfig`, boundary coercion and `EngineSettings` policy |
//! | [`error`] | Error types, `Result` alias and warnings |
//! | [`hedge`] | Instrument selection, budgeting, strikes, sizing, scenarios, engine |
//! | [`market`] | Price series and portfolio snapshot |
//! | [`pricing`] | Black-Scholes put pricing and option quotes |
//! | [`provider`] | Collaborator traits and in-memory implementations |
//! | [`utils`] | Expiration dates, strike rounding and money helpers |
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{Days, NaiveDate};
//! use portfolio_hedge::config::{CandidateInstrument, EngineSettings, HedgeConfig};
//! use portfolio_hedge::hedge::HedgeEngine;
//! use portfolio_hedge::market::{Holding, PortfolioSnapshot, PriceSeries};
//! use portfolio_hedge::provider::InMemoryMarketData;
//!
//! let as_of = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
//! let history = |id: &str, start: f64, beta: f64| {
//!     let mut close = start;
//!     let pairs: Vec<_> = (0..60u64)
//!         .map(|i| {
//!             close *= 1.0 + beta * 0.01 * (i as f64 * 1.3).sin();
//!             (as_of - Days::new(59 - i), close)
//!         })
//!         .collect();
//!     PriceSeries::from_pairs(id, pairs).unwrap()
//! };
//!
//! let portfolio = PortfolioSnapshot::new(vec![Holding::new("FUND", 1_000.0, 840.0)]).unwrap();
//! let data = InMemoryMarketData::new(portfolio)
//!     .with_history(history("FUND", 840.0, 1.2))
//!     .with_history(history("SPY", 575.0, 1.0))
//!     .with_volatility_index(18.0);
//!
//! let settings = EngineSettings::default()
//!     .with_candidates(vec![CandidateInstrument::new("SPY", 0.013)]);
//! let engine = HedgeEngine::from_market_data(&data).with_settings(settings);
//! let config = HedgeConfig::new(0.005, 0.10, 30, 0.5, 0.0).unwrap();
//!
//! let recommendation = engine.run(&config, as_of).unwrap();
//! assert_eq!(recommendation.primary_instrument, "SPY");
//! assert!(recommendation.contracts() <= recommendation.sizing.contracts_affordable);
//! ```
//!
//! ## Examples
//!
//! Runnable programs live in `demos/`:
//!
//! | Example | Description |
//! |---------|-------------|
//! | `headless_run` | JSON config, model pricing and a published JSON line |
//! | `manual_override` | A per-contract manual premium locking a stressed-market run |
//!
//! ```bash
//! cargo run --example headless_run
//! cargo run --example manual_override
//! ```
//!
//! ## Benchmarks
//!
//! - **pricing_bench**: put pricing, Greeks and implied volatility
//! - **regression_bench**: returns and beta / R² over growing histories
//! - **engine_bench**: a full engine run
//!
//! Run benchmarks with:
//! ```bash
//! cargo bench
//! cargo bench -- pricing_benches
//! ```
//!
//! ## Dependencies
//!
//! - **optionstratlib** (0.13): Black-Scholes pricing, Greeks and implied volatility
//! - **rust_decimal** (1.39): Exact premium and spend totals
//! - **chrono** (0.4): Trading dates and expirations
//! - **serde** / **serde_json** (1.0): Configuration and recommendation output
//! - **thiserror** (2.0): Error handling
//! - **tracing** (0.1): Structured logging
//! - **uuid** (1.19): Recommendation identifiers

pub mod analytics;
pub mod config;
pub mod error;
pub mod hedge;
pub mod market;
pub mod pricing;
pub mod provider;
pub mod utils;

pub use error::{Error, Result};
