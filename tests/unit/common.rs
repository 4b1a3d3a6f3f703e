//! Shared fixtures for the integration tests.

use chrono::{Days, NaiveDate};
use portfolio_hedge::config::{CandidateInstrument, EngineSettings};
use portfolio_hedge::market::{Holding, PortfolioSnapshot, PriceSeries};
use portfolio_hedge::provider::InMemoryMarketData;
use std::sync::Once;

static TRACING: Once = Once::new();

/// Installs a test subscriber once; `RUST_LOG` selects the level.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
}

/// Sixty deterministic daily index returns of about ±1%.
pub fn index_returns() -> Vec<f64> {
    (0..60).map(|i| 0.01 * (f64::from(i) * 1.3).sin()).collect()
}

/// Compounds `returns` from `start` into a daily series ending on [`as_of`].
pub fn series(id: &str, start: f64, returns: &[f64]) -> PriceSeries {
    let first = as_of() - Days::new(returns.len() as u64);
    let mut close = start;
    let mut pairs = vec![(first, close)];
    for (i, r) in returns.iter().enumerate() {
        close *= 1.0 + r;
        pairs.push((first + Days::new(i as u64 + 1), close));
    }
    PriceSeries::from_pairs(id, pairs).unwrap()
}

/// A single-fund portfolio worth $840,000 that moves 1.2× the index.
///
/// SPY and its proxy SPLG follow the index exactly; IWM is only loosely related.
pub fn market(volatility_index: f64) -> InMemoryMarketData {
    let idx = index_returns();
    let fund: Vec<f64> = idx.iter().map(|r| 1.2 * r).collect();
    let small_caps: Vec<f64> = idx
        .iter()
        .enumerate()
        .map(|(i, r)| 0.5 * r + 0.004 * (i as f64 * 2.9).cos())
        .collect();
    let portfolio = PortfolioSnapshot::new(vec![Holding::new("FUND", 1_000.0, 840.0)]).unwrap();
    InMemoryMarketData::new(portfolio)
        .with_history(series("FUND", 840.0, &fund))
        .with_history(series("SPY", 575.0, &idx))
        .with_history(series("SPLG", 57.5, &idx))
        .with_history(series("IWM", 210.0, &small_caps))
        .with_volatility_index(volatility_index)
}

pub fn settings() -> EngineSettings {
    EngineSettings::default().with_candidates(vec![
        CandidateInstrument::new("SPY", 0.013).with_proxy("SPLG", 0.013),
        CandidateInstrument::new("IWM", 0.012),
    ])
}
