//! Integration tests for configuration coercion and policy loading.

use chrono::Weekday;
use portfolio_hedge::config::{ConfigValue, EngineSettings, RawHedgeConfig};

fn raw(budget: ConfigValue, drawdown: ConfigValue, days: ConfigValue) -> RawHedgeConfig {
    RawHedgeConfig {
        budget_fraction_base: budget,
        target_drawdown: drawdown,
        days_to_expiration: days,
        downside_weight: None,
        volatility_index_level: None,
    }
}

#[test]
fn test_percent_and_fraction_inputs_agree() {
    let as_percent = raw("0.5%".into(), "10 %".into(), " 30 ".into())
        .coerce()
        .unwrap();
    let as_fraction = raw(0.005.into(), 0.10.into(), 30.0.into()).coerce().unwrap();
    assert!((as_percent.budget_fraction_base() - as_fraction.budget_fraction_base()).abs() < 1e-15);
    assert!((as_percent.target_drawdown() - as_fraction.target_drawdown()).abs() < 1e-15);
    assert_eq!(as_percent.days_to_expiration(), 30);
    assert_eq!(as_percent.downside_weight(), 0.5);
}

#[test]
fn test_oversized_values_are_clamped() {
    let config = raw("250%".into(), 15.0.into(), 29.6.into()).coerce().unwrap();
    assert_eq!(config.budget_fraction_base(), 1.0);
    assert!((config.target_drawdown() - 0.15).abs() < 1e-12);
    assert_eq!(config.days_to_expiration(), 30);
}

#[test]
fn test_bad_values_name_the_field() {
    let cases = [
        (raw(0.0.into(), 0.1.into(), 30.0.into()), "budget_fraction_base"),
        (raw(0.005.into(), "ten".into(), 30.0.into()), "target_drawdown"),
        (raw(0.005.into(), 0.1.into(), 0.2.into()), "days_to_expiration"),
    ];
    for (input, field) in cases {
        let err = input.coerce().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains(field), "{err}");
    }
}

#[test]
fn test_settings_from_partial_json() {
    let settings = EngineSettings::from_json_str(
        r#"{
            "risk_free_rate": 0.05,
            "expiration_weekday": "Thu",
            "strike_increment": 5.0,
            "scenarios": {
                "drawdowns": [0.02, 0.15],
                "iv_expansion_rate": 0.75,
                "breakeven_step": 0.005
            }
        }"#,
    )
    .unwrap();
    assert_eq!(settings.risk_free_rate, 0.05);
    assert_eq!(settings.expiration_weekday, Weekday::Thu);
    assert_eq!(settings.strike_increment, Some(5.0));
    assert_eq!(settings.scenarios.drawdowns, vec![0.02, 0.15]);
    assert_eq!(settings.candidates.len(), 4);
    assert_eq!(settings.contract_multiplier, 100);
}

#[test]
fn test_settings_reject_inconsistent_policy() {
    let err = EngineSettings::from_json_str(
        r#"{"tightening": {
            "max_steps": 5, "shrink_factor": 1.5, "min_coverage": 0.3, "min_otm": 0.02
        }}"#,
    )
    .unwrap_err();
    assert!(err.is_configuration());
    assert!(EngineSettings::from_json_str("{not json").is_err());
}
