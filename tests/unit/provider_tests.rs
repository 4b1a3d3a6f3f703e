//! Integration tests for the collaborator implementations.

use crate::common::{as_of, init_tracing, market, settings};
use portfolio_hedge::config::HedgeConfig;
use portfolio_hedge::hedge::HedgeEngine;
use portfolio_hedge::provider::{JsonLinesSink, OutputSink};
use std::io::{self, Write};

struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_sink_write_failure_is_not_fatal() {
    init_tracing();
    let data = market(18.0);
    let engine = HedgeEngine::from_market_data(&data).with_settings(settings());
    let config = HedgeConfig::new(0.005, 0.10, 30, 0.5, 0.0).unwrap();
    let rec = engine.run(&config, as_of()).unwrap();

    let mut sink = JsonLinesSink::new(BrokenPipe);
    sink.publish(&rec);
    sink.publish(&rec);
    assert_eq!(sink.published(), 0);
    assert_eq!(sink.failed(), 2);
}

#[test]
fn test_sink_appends_lines() {
    let data = market(18.0);
    let engine = HedgeEngine::from_market_data(&data).with_settings(settings());
    let config = HedgeConfig::new(0.005, 0.10, 30, 0.5, 0.0).unwrap();
    let first = engine.run(&config, as_of()).unwrap();
    let second = engine.run(&config, as_of()).unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(first.contracts(), second.contracts());

    let mut sink = JsonLinesSink::new(Vec::new());
    sink.publish(&first);
    sink.publish(&second);
    let text = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(text.lines().count(), 2);
}
