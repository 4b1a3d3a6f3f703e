//! External collaborators of the hedge engine.
//!
//! Every piece of I/O the engine performs goes through one of these traits. Calls
//! are synchronous; errors returned by a collaborator propagate out of the engine
//! unchanged.
//!
//! | Trait | Supplies |
//! |-------|----------|
//! | [`PortfolioProvider`] | holdings and current prices |
//! | [`PriceHistoryProvider`] | daily closes over a lookback window |
//! | [`VolatilityIndexReader`] | the current volatility-index level |
//! | [`ConfigReader`] | loosely-typed [`RawHedgeConfig`] |
//! | [`QuotePrompt`] | an optional manual quote or strike override |
//! | [`OutputSink`] | receives the finished [`HedgeRecommendation`] |
//!
//! In-memory implementations are provided for batch runs and tests.

use crate::config::RawHedgeConfig;
use crate::error::{Error, Result};
use crate::hedge::HedgeRecommendation;
use crate::market::{PortfolioSnapshot, PriceSeries};
use crate::pricing::ManualQuote;
use chrono::NaiveDate;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::Write;
use tracing::{debug, error};

/// Supplies the portfolio being hedged.
pub trait PortfolioProvider {
    /// Current holdings.
    ///
    /// # Errors
    ///
    /// Implementations report their own acquisition failures.
    fn portfolio(&self) -> Result<PortfolioSnapshot>;
}

/// Supplies daily price histories.
pub trait PriceHistoryProvider {
    /// Closes for `instrument_id` within `lookback_days` calendar days ending on
    /// `as_of`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InsufficientData` when no history exists for the instrument.
    fn price_history(
        &self,
        instrument_id: &str,
        as_of: NaiveDate,
        lookback_days: u32,
    ) -> Result<PriceSeries>;
}

/// Supplies the current volatility-index level.
pub trait VolatilityIndexReader {
    /// Level in index points (e.g., 18.5).
    ///
    /// # Errors
    ///
    /// Implementations report their own acquisition failures.
    fn volatility_index_level(&self) -> Result<f64>;
}

/// Supplies the per-run configuration before coercion.
pub trait ConfigReader {
    /// Raw configuration values.
    ///
    /// # Errors
    ///
    /// Implementations report their own read failures.
    fn read_config(&self) -> Result<RawHedgeConfig>;
}

/// What the engine shows a user when asking for a quote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteRequest {
    /// Instrument to quote.
    pub underlying_id: String,
    /// Expiration date of the put.
    pub expiration_date: NaiveDate,
    /// Strike the engine would use.
    pub suggested_strike: f64,
    /// Model premium per share at the suggested strike.
    pub model_premium_per_share: f64,
    /// Per-share budget.
    pub budget_per_share: f64,
}

/// Asks a user for a manual quote or strike override.
pub trait QuotePrompt {
    /// Returns the user's entry, or `None` to keep the model quote.
    ///
    /// Headless implementations return `None`.
    fn request_quote(&self, request: &QuoteRequest) -> Option<ManualQuote>;
}

/// Receives finished recommendations; write-only and fire-and-forget.
pub trait OutputSink {
    /// Publishes one recommendation.
    fn publish(&mut self, recommendation: &HedgeRecommendation);
}

/// Portfolio, price histories and volatility index held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMarketData {
    portfolio: PortfolioSnapshot,
    histories: BTreeMap<String, PriceSeries>,
    volatility_index_level: f64,
}

impl InMemoryMarketData {
    /// Creates a data set for a portfolio.
    #[must_use]
    pub fn new(portfolio: PortfolioSnapshot) -> Self {
        Self {
            portfolio,
            ..Self::default()
        }
    }

    /// Adds or replaces the history of one instrument.
    #[must_use]
    pub fn with_history(mut self, series: PriceSeries) -> Self {
        self.histories
            .insert(series.instrument_id().to_string(), series);
        self
    }

    /// Sets the volatility-index level.
    #[must_use]
    pub const fn with_volatility_index(mut self, level: f64) -> Self {
        self.volatility_index_level = level;
        self
    }

    /// Instruments with a stored history.
    pub fn instruments(&self) -> impl Iterator<Item = &str> {
        self.histories.keys().map(String::as_str)
    }
}

impl PortfolioProvider for InMemoryMarketData {
    fn portfolio(&self) -> Result<PortfolioSnapshot> {
        Ok(self.portfolio.clone())
    }
}

impl PriceHistoryProvider for InMemoryMarketData {
    fn price_history(
        &self,
        instrument_id: &str,
        as_of: NaiveDate,
        lookback_days: u32,
    ) -> Result<PriceSeries> {
        let series = self
            .histories
            .get(instrument_id)
            .ok_or_else(|| Error::insufficient_data(instrument_id, 1, 0))?;
        Ok(series.clone().retain_lookback(as_of, lookback_days))
    }
}

impl VolatilityIndexReader for InMemoryMarketData {
    fn volatility_index_level(&self) -> Result<f64> {
        Ok(self.volatility_index_level)
    }
}

/// Returns the same raw configuration on every read.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticConfigReader(RawHedgeConfig);

impl StaticConfigReader {
    /// Wraps a raw configuration.
    #[must_use]
    pub const fn new(config: RawHedgeConfig) -> Self {
        Self(config)
    }

    /// Parses a raw configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` for malformed input.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(Self(serde_json::from_str(json)?))
    }
}

impl ConfigReader for StaticConfigReader {
    fn read_config(&self) -> Result<RawHedgeConfig> {
        Ok(self.0.clone())
    }
}

/// Answers quote requests from a fixed script keyed by instrument.
///
/// Every request is recorded; instruments without an entry get `None`.
#[derive(Debug, Default)]
pub struct ScriptedQuotePrompt {
    entries: BTreeMap<String, ManualQuote>,
    requests: RefCell<Vec<QuoteRequest>>,
}

impl ScriptedQuotePrompt {
    /// Creates a prompt that never answers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an answer for the entry's instrument.
    #[must_use]
    pub fn with_entry(mut self, entry: ManualQuote) -> Self {
        self.entries.insert(entry.underlying_id.clone(), entry);
        self
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<QuoteRequest> {
        self.requests.borrow().clone()
    }
}

impl QuotePrompt for ScriptedQuotePrompt {
    fn request_quote(&self, request: &QuoteRequest) -> Option<ManualQuote> {
        self.requests.borrow_mut().push(request.clone());
        let answer = self.entries.get(&request.underlying_id).cloned();
        debug!(
            instrument = %request.underlying_id,
            answered = answer.is_some(),
            "quote prompt"
        );
        answer
    }
}

/// Writes each recommendation as one line of JSON.
///
/// Write failures are logged and counted, never returned.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
    published: usize,
    failed: usize,
}

impl<W: Write> JsonLinesSink<W> {
    /// Creates a sink over a writer.
    pub const fn new(writer: W) -> Self {
        Self {
            writer,
            published: 0,
            failed: 0,
        }
    }

    /// Recommendations written successfully.
    #[must_use]
    pub const fn published(&self) -> usize {
        self.published
    }

    /// Recommendations that failed to write.
    #[must_use]
    pub const fn failed(&self) -> usize {
        self.failed
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, recommendation: &HedgeRecommendation) -> Result<()> {
        serde_json::to_writer(&mut self.writer, recommendation)?;
        self.writer
            .write_all(b"\n")
            .and_then(|()| self.writer.flush())
            .map_err(|e| Error::provider("output_sink", e.to_string()))
    }
}

impl<W: Write> OutputSink for JsonLinesSink<W> {
    fn publish(&mut self, recommendation: &HedgeRecommendation) {
        match self.write_line(recommendation) {
            Ok(()) => self.published += 1,
            Err(e) => {
                self.failed += 1;
                error!(id = %recommendation.id, error = %e, "failed to publish recommendation");
            }
        }
    }
}
