//! Integration tests for put pricing and sizing arithmetic.

use approx::assert_relative_eq;
use portfolio_hedge::config::{HedgeConfig, VolatilityRegime};
use portfolio_hedge::hedge::{contracts_affordable, size_budget, suggested_strike};
use portfolio_hedge::pricing::{PutInputs, put_price};

fn inputs() -> PutInputs {
    PutInputs {
        spot: 100.0,
        strike: 90.0,
        time_to_expiry: 30.0 / 365.0,
        rate: 0.03,
        dividend_yield: 0.0,
        volatility: 0.20,
    }
}

#[test]
fn test_otm_put_sanity_bound() {
    let p = inputs();
    let price = put_price(&p).unwrap();
    assert!(price > 0.0);
    assert!(price < p.strike * (-p.rate * p.time_to_expiry).exp());
}

#[test]
fn test_price_converges_to_intrinsic_near_expiry() {
    for strike in [90.0, 100.0, 110.0] {
        for volatility in [0.1, 0.2, 0.6] {
            let p = PutInputs {
                strike,
                volatility,
                time_to_expiry: 1e-9,
                ..inputs()
            };
            let intrinsic = (strike - p.spot).max(0.0);
            assert!(
                (put_price(&p).unwrap() - intrinsic).abs() < 1e-3,
                "K={strike} σ={volatility}"
            );
        }
    }
}

#[test]
fn test_price_non_increasing_in_spot() {
    let mut previous = f64::INFINITY;
    for spot in (60..=140).map(f64::from) {
        let price = put_price(&inputs().with_spot(spot)).unwrap();
        assert!(price <= previous + 1e-12, "spot {spot}");
        previous = price;
    }
}

#[test]
fn test_price_non_decreasing_in_volatility() {
    let mut previous = 0.0;
    for step in 1..=60 {
        let volatility = f64::from(step) * 0.02;
        let price = put_price(&inputs().with_volatility(volatility)).unwrap();
        assert!(price + 1e-12 >= previous, "σ {volatility}");
        previous = price;
    }
}

#[test]
fn test_reference_portfolio_arithmetic() {
    let config = HedgeConfig::new(0.005, 0.10, 30, 0.5, 15.0).unwrap();
    let budget = size_budget(840_000.0, &config, &VolatilityRegime::default(), 100);
    assert_relative_eq!(budget.dollars, 4_200.0, epsilon = 1e-9);
    assert_relative_eq!(suggested_strike(575.0, 0.10, 1.0, None), 517.5, epsilon = 1e-9);
    assert_eq!(contracts_affordable(budget.dollars, 3.5, 100), 12);
}
