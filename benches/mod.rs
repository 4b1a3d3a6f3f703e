//! Benchmarks for the portfolio-hedge library.
//!
//! - **pricing_bench**: put pricing, Greeks and implied volatility
//! - **regression_bench**: returns, beta / R² and realized volatility
//! - **engine_bench**: complete hedge computations


use criterion::{criterion_group, criterion_main};

// Put pricing benchmarks
criterion_group!(
    pricing_benches,
    pricing_bench::pricing_operations,
    pricing_bench::pricing_scaling,
);

// Regression benchmarks
criterion_group!(regression_benches, regression_bench::regression_scaling);

// Engine benchmarks
criterion_group!(engine_benches, engine_bench::engine_operations);

criterion_main!(pricing_benches, regression_benches, engine_benches);
