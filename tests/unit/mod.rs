//! Integration tests for the portfolio-hedge library.

mod common;
mod config_tests;
mod engine_tests;
mod pricing_tests;
mod provider_tests;
