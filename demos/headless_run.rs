//! Headless Hedge Run Example
//!
//! This example runs the hedge engine with no quote prompt:
//! - A two-holding portfolio and four candidate index instruments
//! - Configuration read from JSON with percent strings
//! - Model pricing, strike tightening and target-coverage sizing
//! - The recommendation published as one JSON line on stdout
//!
//! Run with: `cargo run --example headless_run`

use chrono::{Days, NaiveDate};
use portfolio_hedge::config::{CandidateInstrument, EngineSettings};
use portfolio_hedge::hedge::HedgeEngine;
use portfolio_hedge::market::{Holding, PortfolioSnapshot, PriceSeries};
use portfolio_hedge::provider::{InMemoryMarketData, JsonLinesSink, StaticConfigReader};
use tracing::info;

/// Ninety daily closes ending on `as_of`, moving `beta` times a common index path.
fn history(id: &str, as_of: NaiveDate, start: f64, beta: f64, noise: f64) -> PriceSeries {
    let mut close = start;
    let pairs: Vec<_> = (0..90u64)
        .map(|i| {
            let x = i as f64;
            close *= 1.0 + beta * 0.01 * (x * 1.3).sin() + noise * (x * 2.9).cos();
            (as_of - Days::new(89 - i), close)
        })
        .collect();
    PriceSeries::from_pairs(id, pairs).unwrap()
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("=== Headless Hedge Run Example ===");

    let as_of = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
    let portfolio = PortfolioSnapshot::new(vec![
        Holding::new("GROWTH", 1_200.0, 410.0),
        Holding::new("VALUE", 2_500.0, 132.0),
    ])
    .unwrap();
    info!("Portfolio value: {:.2}", portfolio.portfolio_value());

    let data = InMemoryMarketData::new(portfolio)
        .with_history(history("GROWTH", as_of, 410.0, 1.4, 0.002))
        .with_history(history("VALUE", as_of, 132.0, 0.8, 0.001))
        .with_history(history("SPY", as_of, 575.0, 1.0, 0.0))
        .with_history(history("SPLG", as_of, 67.0, 1.0, 0.0))
        .with_history(history("QQQ", as_of, 520.0, 1.2, 0.003))
        .with_history(history("IWM", as_of, 210.0, 0.6, 0.004))
        .with_volatility_index(21.5);

    let settings = EngineSettings::default().with_candidates(vec![
        CandidateInstrument::new("SPY", 0.013).with_proxy("SPLG", 0.013),
        CandidateInstrument::new("QQQ", 0.006),
        CandidateInstrument::new("IWM", 0.012),
    ]);
    let engine = HedgeEngine::from_market_data(&data).with_settings(settings);

    let reader = StaticConfigReader::from_json_str(
        r#"{
            "budget_fraction_base": "0.5%",
            "target_drawdown": "10%",
            "days_to_expiration": 30,
            "downside_weight": 0.5
        }"#,
    )
    .unwrap();

    let mut sink = JsonLinesSink::new(std::io::stdout());
    let rec = engine.run_and_publish(&reader, &mut sink, as_of).unwrap();

    info!("\n--- Instrument Fits ---");
    for fit in &rec.fits {
        info!(
            "{:<5} beta {:.3}  R² {:.3}  downside beta {:.3}  downside R² {:.3}",
            fit.instrument_id, fit.beta, fit.r_squared, fit.downside_beta, fit.downside_r_squared
        );
    }

    info!("\n--- Recommendation ---");
    info!("Primary instrument: {}", rec.primary_instrument);
    info!("Budget: {:.2} ({:.2} per share)", rec.budget.dollars, rec.budget.per_share);
    info!("Quote: {}", rec.quote());
    info!("Contracts: {}", rec.contracts());
    info!("Total premium: {}", rec.total_premium());

    info!("\n--- Scenarios ---");
    for s in &rec.scenarios {
        info!(
            "portfolio -{:.0}%  offset {:.2}  coverage {}",
            s.portfolio_drawdown * 100.0,
            s.total_offset,
            s.coverage_ratio
                .map_or_else(|| "n/a".to_string(), |c| format!("{:.1}%", c * 100.0))
        );
    }
    match rec.breakeven {
        Some(b) => info!("Breakeven portfolio drawdown: {:.1}%", b.portfolio_drawdown * 100.0),
        None => info!("Breakeven not reached"),
    }

    for warning in &rec.warnings {
        info!("Warning: {warning}");
    }
    info!("Published {} recommendation(s)", sink.published());
}
