//! End-to-end tests for the hedge engine.

use crate::common::{as_of, init_tracing, market, series, settings};
use chrono::NaiveDate;
use portfolio_hedge::Error;
use portfolio_hedge::config::{CandidateInstrument, ConfigValue, HedgeConfig, RawHedgeConfig};
use portfolio_hedge::error::Warning;
use portfolio_hedge::hedge::{CandidateStatus, HedgeEngine, HedgeRecommendation, SizingPath};
use portfolio_hedge::market::{Holding, PortfolioSnapshot, PriceSeries};
use portfolio_hedge::pricing::{ManualQuote, QuoteSource};
use portfolio_hedge::provider::{
    InMemoryMarketData, JsonLinesSink, ScriptedQuotePrompt, StaticConfigReader,
};

fn config(budget_fraction: f64) -> HedgeConfig {
    HedgeConfig::new(budget_fraction, 0.10, 30, 0.5, 0.0).unwrap()
}

fn assert_used_spend_matches(rec: &HedgeRecommendation) {
    let used: Vec<_> = rec
        .what_if
        .iter()
        .filter(|row| row.status == CandidateStatus::Used)
        .collect();
    assert_eq!(used.len(), 1);
    assert_eq!(used[0].spend, rec.total_premium());
    assert_eq!(used[0].underlying_id, rec.chosen_instrument);
    assert!(rec.what_if.iter().all(|row| row.contracts == rec.contracts()));
}

#[test]
fn test_headless_run_end_to_end() {
    init_tracing();
    let data = market(18.0);
    let engine = HedgeEngine::from_market_data(&data).with_settings(settings());
    let rec = engine.run(&config(0.005), as_of()).unwrap();

    assert_eq!(rec.fits.len(), 2);
    assert_eq!(rec.primary_instrument, "SPY");
    assert_eq!(rec.chosen_instrument, "SPY");
    assert!((rec.beta_used - 1.2).abs() < 1e-6);
    assert!((rec.portfolio_value - 840_000.0).abs() < 1e-6);
    assert!((rec.budget.dollars - 4_200.0).abs() < 1e-6);
    assert!(!rec.locked);

    let selection = &rec.strike_selection;
    assert_eq!(
        selection.expiration_date,
        NaiveDate::from_ymd_opt(2025, 8, 1).unwrap()
    );
    let spot = rec.quote().spot;
    assert!((selection.suggested_strike - spot * (1.0 - 0.1 / rec.beta_used)).abs() < 1e-6);
    assert!(!selection.tightening.is_empty());
    assert!(selection.final_strike >= selection.suggested_strike);

    assert_eq!(rec.sizing.path, SizingPath::TargetCoverage);
    assert!(rec.contracts() <= rec.sizing.contracts_affordable);
    assert_eq!(rec.quote().source, QuoteSource::Model);

    let drawdowns: Vec<f64> = rec.scenarios.iter().map(|s| s.portfolio_drawdown).collect();
    assert_eq!(drawdowns, vec![0.01, 0.05, 0.10, 0.20]);
    assert!(rec.scenarios.iter().all(|s| s.coverage_ratio.unwrap() >= 0.0));
    assert_used_spend_matches(&rec);
}

#[test]
fn test_proxy_replaces_over_budget_primary() {
    init_tracing();
    // VIX 30 quarters the budget: $210, or $2.10 per share.
    let data = market(30.0);
    let engine = HedgeEngine::from_market_data(&data).with_settings(settings());
    let rec = engine.run(&config(0.001), as_of()).unwrap();

    assert_eq!(rec.primary_instrument, "SPY");
    assert_eq!(rec.chosen_instrument, "SPLG");
    assert!((rec.budget.per_share - 2.1).abs() < 1e-9);
    assert_eq!(rec.what_if[0].underlying_id, "SPY");
    assert_eq!(rec.what_if[0].status, CandidateStatus::Skipped);
    assert!(rec.what_if[0].premium_per_share > rec.budget.per_share);
    assert!(rec.contracts() >= 1);
    assert!(
        !rec.warnings
            .iter()
            .any(|w| matches!(w, Warning::OverBudget { .. }))
    );
    assert_used_spend_matches(&rec);
}

fn over_budget_for<'a>(rec: &'a HedgeRecommendation, id: &str) -> Option<&'a Warning> {
    rec.warnings
        .iter()
        .find(|w| matches!(w, Warning::OverBudget { instrument, .. } if instrument == id))
}

#[test]
fn test_over_budget_primary_without_proxy_is_kept_and_flagged() {
    init_tracing();
    let data = market(30.0);
    let engine = HedgeEngine::from_market_data(&data).with_settings(settings().with_candidates(
        vec![
            CandidateInstrument::new("SPY", 0.013),
            CandidateInstrument::new("IWM", 0.012),
        ],
    ));
    let rec = engine.run(&config(0.001), as_of()).unwrap();

    assert_eq!(rec.primary_instrument, "SPY");
    assert_eq!(rec.chosen_instrument, "SPY");
    let Some(Warning::OverBudget {
        premium_per_share,
        budget_per_share,
        ..
    }) = over_budget_for(&rec, "SPY")
    else {
        panic!("expected an over-budget warning for SPY: {:?}", rec.warnings);
    };
    assert!((budget_per_share - 2.1).abs() < 1e-9);
    assert!(premium_per_share > budget_per_share);
    assert!(rec.what_if.iter().all(|row| row.underlying_id == "SPY"));
    assert_used_spend_matches(&rec);
}

#[test]
fn test_proxy_still_over_budget_is_flagged() {
    init_tracing();
    // $2.10 after the VIX 30 multiplier: two cents per share.
    let data = market(30.0);
    let engine = HedgeEngine::from_market_data(&data).with_settings(settings());
    let rec = engine.run(&config(0.000_01), as_of()).unwrap();

    assert_eq!(rec.chosen_instrument, "SPLG");
    assert!(over_budget_for(&rec, "SPY").is_none());
    let Some(Warning::OverBudget {
        premium_per_share,
        budget_per_share,
        ..
    }) = over_budget_for(&rec, "SPLG")
    else {
        panic!("expected an over-budget warning for SPLG: {:?}", rec.warnings);
    };
    assert!(premium_per_share > budget_per_share);
    assert_eq!(rec.sizing.contracts_affordable, 0);
    assert_eq!(rec.contracts(), 0);
    assert!(rec.breakeven.is_none());
    assert!(
        rec.warnings
            .iter()
            .any(|w| matches!(w, Warning::ZeroContracts { instrument } if instrument == "SPLG"))
    );
}

#[test]
fn test_near_zero_delta_reaches_recommendation() {
    init_tracing();
    let data = market(18.0);
    let entry = ManualQuote {
        delta: Some(0.0),
        ..ManualQuote::premium("SPY", 1.0)
    };
    let prompt = ScriptedQuotePrompt::new().with_entry(entry);
    let engine = HedgeEngine::from_market_data(&data)
        .with_settings(settings())
        .with_prompt(&prompt);
    let rec = engine.run(&config(0.005), as_of()).unwrap();

    assert!(rec.locked);
    assert_eq!(rec.sizing.path, SizingPath::TargetCoverage);
    assert!(rec.sizing.delta_floored);
    assert_eq!(rec.sizing.delta_used, 1e-4);
    // $4,200 at $100 a contract.
    assert_eq!(rec.sizing.contracts_affordable, 42);
    assert_eq!(rec.contracts(), 42);
    let Some(Warning::NearZeroDelta {
        delta,
        floor,
        contracts_target,
    }) = rec
        .warnings
        .iter()
        .find(|w| matches!(w, Warning::NearZeroDelta { .. }))
    else {
        panic!("expected a near-zero delta warning: {:?}", rec.warnings);
    };
    assert_eq!(*delta, 0.0);
    assert_eq!(*floor, 1e-4);
    assert_eq!(Some(*contracts_target), rec.sizing.contracts_target);
    assert!(*contracts_target > 10_000);
}

#[test]
fn test_manual_override_sizes_from_base_budget() {
    init_tracing();
    // VIX 35: adjusted budget $1,050 ($10.50 per share), base budget $4,200.
    let data = market(35.0);
    let prompt = ScriptedQuotePrompt::new().with_entry(ManualQuote::premium("SPY", 15.0));
    let engine = HedgeEngine::from_market_data(&data)
        .with_settings(settings())
        .with_prompt(&prompt);
    let rec = engine.run(&config(0.005), as_of()).unwrap();

    assert!(rec.locked);
    assert!(rec.strike_selection.tightening.is_empty());
    assert_eq!(rec.sizing.path, SizingPath::ManualOverride);
    assert_eq!(rec.quote().premium_per_share, 15.0);
    assert_eq!(rec.contracts(), 2);
    assert_eq!(rec.total_premium(), rust_decimal::Decimal::from(3_000));
    assert_eq!(prompt.requests().len(), 1);
    assert_eq!(prompt.requests()[0].underlying_id, "SPY");
    assert_used_spend_matches(&rec);
}

#[test]
fn test_per_contract_manual_premium_within_budget() {
    let data = market(18.0);
    let prompt = ScriptedQuotePrompt::new().with_entry(ManualQuote::premium("SPY", 350.0));
    let engine = HedgeEngine::from_market_data(&data)
        .with_settings(settings())
        .with_prompt(&prompt);
    let rec = engine.run(&config(0.005), as_of()).unwrap();

    assert!(rec.locked);
    assert_eq!(rec.quote().premium_per_share, 3.5);
    assert_eq!(rec.sizing.path, SizingPath::TargetCoverage);
    assert_eq!(rec.sizing.contracts_affordable, 12);
    assert!(rec.contracts() <= 12);
}

#[test]
fn test_missing_holding_history_names_holding() {
    let portfolio = PortfolioSnapshot::new(vec![
        Holding::new("FUND", 1_000.0, 840.0),
        Holding::new("GHOST", 10.0, 50.0),
    ])
    .unwrap();
    let reference = market(18.0);
    let mut data = InMemoryMarketData::new(portfolio).with_volatility_index(18.0);
    for id in ["FUND", "SPY", "SPLG", "IWM"] {
        let history = reference_history(&reference, id);
        data = data.with_history(history);
    }
    let engine = HedgeEngine::from_market_data(&data).with_settings(settings());
    let err = engine.run(&config(0.005), as_of()).unwrap_err();
    assert!(matches!(err, Error::InsufficientData { ref instrument, .. } if instrument == "GHOST"));
}

fn reference_history(data: &InMemoryMarketData, id: &str) -> PriceSeries {
    use portfolio_hedge::provider::PriceHistoryProvider;
    data.price_history(id, as_of(), 365).unwrap()
}

#[test]
fn test_zero_variance_candidate_is_flagged() {
    let data = market(18.0).with_history(series("FLAT", 100.0, &[0.0; 60]));
    let engine = HedgeEngine::from_market_data(&data).with_settings(
        settings().with_candidates(vec![
            CandidateInstrument::new("FLAT", 0.0),
            CandidateInstrument::new("SPY", 0.013),
        ]),
    );
    let rec = engine.run(&config(0.005), as_of()).unwrap();

    assert_eq!(rec.primary_instrument, "SPY");
    let flat = &rec.fits[0];
    assert_eq!(flat.beta, 0.0);
    assert_eq!(flat.r_squared, 0.0);
    assert!(rec.warnings.iter().any(
        |w| matches!(w, Warning::ZeroVariance { instrument } if instrument == "FLAT")
    ));
}

#[test]
fn test_empty_candidate_list_fails_fast() {
    let data = market(18.0);
    let engine =
        HedgeEngine::from_market_data(&data).with_settings(settings().with_candidates(Vec::new()));
    assert!(matches!(
        engine.run(&config(0.005), as_of()),
        Err(Error::NoCandidates)
    ));
}

#[test]
fn test_invalid_config_is_not_published() {
    let data = market(18.0);
    let engine = HedgeEngine::from_market_data(&data).with_settings(settings());
    let reader = StaticConfigReader::new(RawHedgeConfig {
        budget_fraction_base: ConfigValue::from("-1"),
        target_drawdown: ConfigValue::from(0.10),
        days_to_expiration: ConfigValue::from(30.0),
        downside_weight: None,
        volatility_index_level: None,
    });
    let mut sink = JsonLinesSink::new(Vec::new());
    let err = engine
        .run_and_publish(&reader, &mut sink, as_of())
        .unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(sink.published(), 0);
    assert!(sink.into_inner().is_empty());
}

#[test]
fn test_run_and_publish_writes_one_json_line() {
    let data = market(18.0);
    let engine = HedgeEngine::from_market_data(&data).with_settings(settings());
    let reader = StaticConfigReader::from_json_str(
        r#"{"budget_fraction_base": "0.5%", "target_drawdown": "10%", "days_to_expiration": "30"}"#,
    )
    .unwrap();
    let mut sink = JsonLinesSink::new(Vec::new());
    let rec = engine.run_and_publish(&reader, &mut sink, as_of()).unwrap();
    assert_eq!(sink.published(), 1);

    let bytes = sink.into_inner();
    let text = String::from_utf8(bytes).unwrap();
    assert_eq!(text.lines().count(), 1);
    let value: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
    assert_eq!(value["primary_instrument"], "SPY");
    assert_eq!(value["id"], rec.id.to_string());
    assert!(value["warnings"].is_array());
    assert_eq!(value["scenarios"].as_array().unwrap().len(), 4);
}
