//! Manual Override Example
//!
//! This example shows a user-entered quote taking over a run:
//! - A stressed market (volatility index at 35) shrinks the hedge budget
//! - The prompt answers with a per-contract premium and a strike
//! - The entry locks the run, so strike tightening is skipped
//! - A premium above the per-share budget is sized from the base budget
//!
//! Run with: `cargo run --example manual_override`

use chrono::{Days, NaiveDate};
use portfolio_hedge::config::{CandidateInstrument, EngineSettings, HedgeConfig};
use portfolio_hedge::hedge::HedgeEngine;
use portfolio_hedge::market::{Holding, PortfolioSnapshot, PriceSeries};
use portfolio_hedge::pricing::ManualQuote;
use portfolio_hedge::provider::{InMemoryMarketData, ScriptedQuotePrompt};
use tracing::info;

fn history(id: &str, as_of: NaiveDate, start: f64, beta: f64) -> PriceSeries {
    let mut close = start;
    let pairs: Vec<_> = (0..60u64)
        .map(|i| {
            close *= 1.0 + beta * 0.01 * (i as f64 * 1.3).sin();
            (as_of - Days::new(59 - i), close)
        })
        .collect();
    PriceSeries::from_pairs(id, pairs).unwrap()
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("=== Manual Override Example ===");

    let as_of = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
    let portfolio = PortfolioSnapshot::new(vec![Holding::new("FUND", 1_000.0, 840.0)]).unwrap();
    let data = InMemoryMarketData::new(portfolio)
        .with_history(history("FUND", as_of, 840.0, 1.2))
        .with_history(history("SPY", as_of, 575.0, 1.0))
        .with_volatility_index(35.0);

    // $1,500 per contract is read as $15.00 per share.
    let entry = ManualQuote::premium("SPY", 1_500.0).with_strike(540.0);
    let prompt = ScriptedQuotePrompt::new().with_entry(entry);
    let settings =
        EngineSettings::default().with_candidates(vec![CandidateInstrument::new("SPY", 0.013)]);
    let engine = HedgeEngine::from_market_data(&data)
        .with_settings(settings)
        .with_prompt(&prompt);

    let config = HedgeConfig::new(0.005, 0.10, 30, 0.5, 0.0).unwrap();
    let rec = engine.run(&config, as_of).unwrap();

    info!("\n--- Prompt ---");
    for request in prompt.requests() {
        info!(
            "{} exp {}: suggested strike {:.2}, model premium {:.2}, budget {:.2} per share",
            request.underlying_id,
            request.expiration_date,
            request.suggested_strike,
            request.model_premium_per_share,
            request.budget_per_share
        );
    }

    info!("\n--- Budget ---");
    info!("Regime multiplier: {}", rec.budget.multiplier);
    info!("Adjusted budget: {:.2}", rec.budget.dollars);
    info!("Base budget: {:.2}", rec.budget.dollars_base);

    info!("\n--- Position ---");
    info!("Locked: {}", rec.locked);
    info!("Quote: {}", rec.quote());
    info!("Sizing path: {:?}", rec.sizing.path);
    info!("Contracts: {}", rec.contracts());
    info!("Total premium: {}", rec.total_premium());

    info!("\n--- What-If ---");
    for row in &rec.what_if {
        info!(
            "{:<4} K={:<8.2} {} {:.2}/sh  spend {} ({:.3}%)  {:?}",
            row.underlying_id,
            row.strike,
            row.source,
            row.premium_per_share,
            row.spend,
            row.spend_pct * 100.0,
            row.status
        );
    }

    info!("\n{}", serde_json::to_string_pretty(&rec).unwrap());
}
