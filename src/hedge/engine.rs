//! One hedge computation, from collaborator reads to the finished recommendation.
//!
//! ```text
//! settings/config ─► portfolio ─► price histories ─► regression fits
//!       ─► primary instrument ─► budget ─► expiration + strike ─► model quote
//!       ─► proxy (over budget) ─► manual override | strike tightening
//!       ─► sizing ─► scenarios + breakeven ─► what-if ─► HedgeRecommendation
//! ```

use super::budget::{HedgeBudget, size_budget};
use super::scenario::{Breakeven, ScenarioRepricer, ScenarioResult};
use super::selector::select_primary;
use super::sizer::{HedgePosition, PositionSizing, size_manual_override, size_target_coverage};
use super::strike::{
    StrikeSelection, expiration_date, implied_instrument_drawdown, sizing_beta, suggested_strike,
    tighten_strike,
};
use super::what_if::{QuoteCandidates, WhatIfRow, compare};
use crate::analytics::{
    RegressionFit, aligned_returns, fit_instrument, realized_volatility, simple_returns,
};
use crate::config::{EngineSettings, HedgeConfig};
use crate::error::{Error, Result, Warning, Warnings};
use crate::market::{AlignedPair, PriceSeries};
use crate::pricing::{ManualQuote, OptionQuote, PricingContext, PutInputs};
use crate::provider::{
    ConfigReader, OutputSink, PortfolioProvider, PriceHistoryProvider, QuotePrompt, QuoteRequest,
    VolatilityIndexReader,
};
use crate::utils::{round_to_increment, year_fraction};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Identifier of the synthetic portfolio-value series.
pub const PORTFOLIO_SERIES_ID: &str = "PORTFOLIO";

/// Everything one run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HedgeRecommendation {
    /// Unique identifier of the run.
    pub id: Uuid,
    /// Date the run was computed for.
    pub as_of: NaiveDate,
    /// Portfolio value at current prices.
    pub portfolio_value: f64,
    /// Regression fit of every candidate, in candidate order.
    pub fits: Vec<RegressionFit>,
    /// Best-fitting candidate.
    pub primary_instrument: String,
    /// Instrument the position is on; the proxy when it replaced the primary.
    pub chosen_instrument: String,
    /// Blended sizing beta of the primary.
    pub beta_used: f64,
    /// Budget.
    pub budget: HedgeBudget,
    /// Strike and expiration choice.
    pub strike_selection: StrikeSelection,
    /// Recommended position.
    pub position: HedgePosition,
    /// How the contract count was reached.
    pub sizing: PositionSizing,
    /// Scenario table.
    pub scenarios: Vec<ScenarioResult>,
    /// Breakeven drawdown, when reached.
    pub breakeven: Option<Breakeven>,
    /// What-if table.
    pub what_if: Vec<WhatIfRow>,
    /// Non-fatal conditions raised during the run.
    pub warnings: Vec<Warning>,
    /// True when a manual entry fixed the quote.
    pub locked: bool,
}

impl HedgeRecommendation {
    /// Recommended contracts.
    #[must_use]
    pub const fn contracts(&self) -> u64 {
        self.position.contracts()
    }

    /// Total premium of the position.
    #[must_use]
    pub const fn total_premium(&self) -> Decimal {
        self.position.total_premium()
    }

    /// Quote the position is built on.
    #[must_use]
    pub const fn quote(&self) -> &OptionQuote {
        self.position.quote()
    }
}

/// The instrument currently carrying the hedge and its quote.
struct Chosen {
    context: PricingContext,
    quote: OptionQuote,
}

/// Computes hedge recommendations from its collaborators.
pub struct HedgeEngine<'a> {
    portfolio: &'a dyn PortfolioProvider,
    prices: &'a dyn PriceHistoryProvider,
    volatility: &'a dyn VolatilityIndexReader,
    prompt: Option<&'a dyn QuotePrompt>,
    settings: EngineSettings,
}

impl<'a> HedgeEngine<'a> {
    /// Creates an engine with default settings and no quote prompt.
    #[must_use]
    pub fn new(
        portfolio: &'a dyn PortfolioProvider,
        prices: &'a dyn PriceHistoryProvider,
        volatility: &'a dyn VolatilityIndexReader,
    ) -> Self {
        Self {
            portfolio,
            prices,
            volatility,
            prompt: None,
            settings: EngineSettings::default(),
        }
    }

    /// Creates an engine reading everything from one market-data source.
    #[must_use]
    pub fn from_market_data<M>(data: &'a M) -> Self
    where
        M: PortfolioProvider + PriceHistoryProvider + VolatilityIndexReader,
    {
        Self::new(data, data, data)
    }

    /// Adds a quote prompt.
    #[must_use]
    pub fn with_prompt(mut self, prompt: &'a dyn QuotePrompt) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Replaces the policy settings.
    #[must_use]
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Policy settings in use.
    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Reads and coerces the configuration, runs, and publishes the result.
    ///
    /// # Errors
    ///
    /// Propagates configuration, collaborator and computation errors; nothing is
    /// published on error.
    pub fn run_and_publish(
        &self,
        reader: &dyn ConfigReader,
        sink: &mut dyn OutputSink,
        as_of: NaiveDate,
    ) -> Result<HedgeRecommendation> {
        let config = reader.read_config()?.coerce()?;
        let recommendation = self.run(&config, as_of)?;
        sink.publish(&recommendation);
        Ok(recommendation)
    }

    /// Computes a recommendation for `as_of`.
    ///
    /// The volatility-index reader's level replaces the configured one when it is
    /// positive.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidConfiguration` or `Error::NoCandidates` for bad settings.
    /// - `Error::InvalidPortfolio` for an empty or malformed portfolio.
    /// - `Error::InsufficientData` naming the first instrument short of history.
    /// - Any error returned by a collaborator, unchanged.
    pub fn run(&self, config: &HedgeConfig, as_of: NaiveDate) -> Result<HedgeRecommendation> {
        let settings = &self.settings;
        settings.validate()?;
        let level = self.volatility.volatility_index_level()?;
        let config = if level > 0.0 {
            config.with_volatility_index_level(level)?
        } else {
            *config
        };

        let portfolio = self.portfolio.portfolio()?;
        portfolio.validate()?;
        let portfolio_value = portfolio.portfolio_value();

        let mut histories: BTreeMap<String, PriceSeries> = BTreeMap::new();
        let wanted = portfolio
            .positions
            .iter()
            .map(|h| h.instrument_id.as_str())
            .chain(settings.candidates.iter().map(|c| c.id.as_str()));
        for id in wanted {
            if !histories.contains_key(id) {
                let series = self.history(id, as_of)?;
                histories.insert(id.to_string(), series);
            }
        }
        let synthetic = portfolio.synthetic_series(&histories, PORTFOLIO_SERIES_ID)?;
        synthetic.require(settings.min_observations)?;

        let mut warnings = Warnings::new();
        let mut fits = Vec::with_capacity(settings.candidates.len());
        for candidate in &settings.candidates {
            let series = histories.get(&candidate.id).ok_or_else(|| {
                Error::insufficient_data(&candidate.id, settings.min_observations, 0)
            })?;
            let pair = AlignedPair::align(&synthetic, series);
            if pair.len() < settings.min_observations {
                return Err(Error::insufficient_data(
                    &candidate.id,
                    settings.min_observations,
                    pair.len(),
                ));
            }
            let (portfolio_returns, instrument_returns) = aligned_returns(&pair);
            fits.push(fit_instrument(
                &candidate.id,
                &portfolio_returns,
                &instrument_returns,
                settings.min_downside_observations,
                &mut warnings,
            ));
        }

        let primary = select_primary(&fits)?.clone();
        let beta_used = sizing_beta(&config, &primary, settings.beta_floor, &mut warnings);
        let multiplier = settings.contract_multiplier;
        let budget = size_budget(portfolio_value, &config, &settings.regime, multiplier);
        let expiry = expiration_date(as_of, &config, settings)?;
        let time_to_expiry = year_fraction(as_of, expiry);
        let target = config.target_drawdown();

        let primary_series = histories
            .get(&primary.instrument_id)
            .ok_or_else(|| Error::insufficient_data(&primary.instrument_id, 1, 0))?;
        let primary_dividend = settings
            .candidate(&primary.instrument_id)
            .map_or(0.0, |c| c.dividend_yield);
        let context = self.pricing_context(
            &primary.instrument_id,
            primary_dividend,
            primary_series,
            expiry,
            time_to_expiry,
            &config,
            &mut warnings,
        )?;
        let suggested = suggested_strike(
            context.spot(),
            target,
            beta_used,
            settings.strike_increment,
        );
        let quote = context.model_quote(suggested)?;
        let candidates = QuoteCandidates::new().with(quote.clone());

        let (chosen, candidates) = self.consider_proxy(
            &primary.instrument_id,
            Chosen { context, quote },
            candidates,
            &budget,
            as_of,
            &config,
            &mut warnings,
        )?;
        let suggested = chosen.quote.strike;

        let (chosen, candidates, locked) =
            self.apply_override(chosen, candidates, &budget, &mut warnings)?;

        let (chosen, candidates, tightening) = if locked {
            (chosen, candidates, Vec::new())
        } else {
            let projected = |q: &OptionQuote| {
                let sizing = size_target_coverage(
                    q,
                    beta_used,
                    target,
                    portfolio_value,
                    budget.dollars,
                    multiplier,
                    settings.delta_floor,
                );
                ScenarioRepricer::new(
                    q,
                    &chosen.context.inputs,
                    beta_used,
                    sizing.contracts_final,
                    multiplier,
                    settings.scenarios.iv_expansion_rate,
                )
                .evaluate(target, portfolio_value)
                .map(|result| result.coverage_ratio.unwrap_or(0.0))
            };
            let tightening = tighten_strike(
                &chosen.context,
                chosen.quote.strike,
                &settings.tightening,
                settings.strike_increment,
                projected,
            )?;
            let candidates = if tightening.moved() {
                candidates.with(tightening.quote.clone())
            } else {
                candidates
            };
            let chosen = Chosen {
                quote: tightening.quote,
                context: chosen.context,
            };
            (chosen, candidates, tightening.steps)
        };

        let over_budget = budget.is_exceeded_by(chosen.quote.premium_per_share);
        let sizing = if locked && chosen.quote.is_manual() && over_budget {
            size_manual_override(&chosen.quote, budget.dollars_base, multiplier)
        } else {
            size_target_coverage(
                &chosen.quote,
                beta_used,
                target,
                portfolio_value,
                budget.dollars,
                multiplier,
                settings.delta_floor,
            )
        };
        if sizing.delta_floored {
            warnings.push(Warning::NearZeroDelta {
                delta: chosen.quote.delta,
                floor: settings.delta_floor,
                contracts_target: sizing.contracts_target.unwrap_or(0),
            });
        }
        if sizing.contracts_final == 0 {
            warnings.push(Warning::ZeroContracts {
                instrument: chosen.quote.underlying_id.clone(),
            });
        }

        let strike_selection = StrikeSelection {
            instrument_id: chosen.quote.underlying_id.clone(),
            expiration_date: expiry,
            beta_used,
            implied_instrument_drawdown: implied_instrument_drawdown(target, beta_used),
            suggested_strike: suggested,
            final_strike: chosen.quote.strike,
            tightening,
            locked,
        };

        let position = HedgePosition::new(chosen.quote, sizing.contracts_final, multiplier);
        let repricer = ScenarioRepricer::new(
            position.quote(),
            &chosen.context.inputs,
            beta_used,
            position.contracts(),
            multiplier,
            settings.scenarios.iv_expansion_rate,
        );
        let scenarios = repricer.run(&settings.scenarios, portfolio_value)?;
        let breakeven = repricer.breakeven(settings.scenarios.breakeven_step)?;
        let what_if = compare(&candidates, &position, multiplier, portfolio_value);

        info!(
            primary = %primary.instrument_id,
            instrument = %position.quote().underlying_id,
            strike = position.quote().strike,
            expiration = %expiry,
            contracts = position.contracts(),
            total_premium = %position.total_premium(),
            locked,
            warnings = warnings.as_slice().len(),
            "hedge recommendation"
        );

        Ok(HedgeRecommendation {
            id: Uuid::new_v4(),
            as_of,
            portfolio_value,
            fits,
            primary_instrument: primary.instrument_id,
            chosen_instrument: position.quote().underlying_id.clone(),
            beta_used,
            budget,
            strike_selection,
            position,
            sizing,
            scenarios,
            breakeven,
            what_if,
            warnings: warnings.into_vec(),
            locked,
        })
    }

    fn history(&self, instrument_id: &str, as_of: NaiveDate) -> Result<PriceSeries> {
        let series = self
            .prices
            .price_history(instrument_id, as_of, self.settings.lookback_days)?
            .retain_lookback(as_of, self.settings.lookback_days);
        series.require(self.settings.min_observations)?;
        Ok(series)
    }

    /// Volatility for model pricing: index level, then realized, then fallback.
    fn estimate_volatility(
        &self,
        instrument_id: &str,
        series: &PriceSeries,
        config: &HedgeConfig,
        warnings: &mut Warnings,
    ) -> f64 {
        let level = config.volatility_index_level();
        if level > 0.0 {
            return level / 100.0;
        }
        let realized = realized_volatility(
            &simple_returns(&series.closes()),
            self.settings.trading_days_per_year,
        );
        if realized > 0.0 && realized.is_finite() {
            return realized;
        }
        let fallback = self.settings.fallback_volatility;
        warnings.push(Warning::VolatilityFallback {
            instrument: instrument_id.to_string(),
            volatility: fallback,
        });
        fallback
    }

    #[allow(clippy::too_many_arguments)]
    fn pricing_context(
        &self,
        instrument_id: &str,
        dividend_yield: f64,
        series: &PriceSeries,
        expiration_date: NaiveDate,
        time_to_expiry: f64,
        config: &HedgeConfig,
        warnings: &mut Warnings,
    ) -> Result<PricingContext> {
        let spot = series
            .latest_close()
            .ok_or_else(|| Error::insufficient_data(instrument_id, 1, 0))?;
        let volatility = self.estimate_volatility(instrument_id, series, config, warnings);
        Ok(PricingContext {
            underlying_id: instrument_id.to_string(),
            expiration_date,
            inputs: PutInputs {
                spot,
                strike: spot,
                time_to_expiry,
                rate: self.settings.risk_free_rate,
                dividend_yield,
                volatility,
            },
            min_premium: self.settings.min_model_premium,
        })
    }

    /// Switches to the primary's proxy when the primary is over budget.
    ///
    /// The proxy is quoted at the primary's OTM fraction on its own spot.
    #[allow(clippy::too_many_arguments)]
    fn consider_proxy(
        &self,
        primary_id: &str,
        chosen: Chosen,
        candidates: QuoteCandidates,
        budget: &HedgeBudget,
        as_of: NaiveDate,
        config: &HedgeConfig,
        warnings: &mut Warnings,
    ) -> Result<(Chosen, QuoteCandidates)> {
        if !budget.is_exceeded_by(chosen.quote.premium_per_share) {
            return Ok((chosen, candidates));
        }
        let Some(proxy) = self
            .settings
            .candidate(primary_id)
            .and_then(|c| c.proxy.as_ref())
        else {
            warnings.push(Warning::OverBudget {
                instrument: primary_id.to_string(),
                premium_per_share: chosen.quote.premium_per_share,
                budget_per_share: budget.per_share,
            });
            return Ok((chosen, candidates));
        };

        let series = self.history(&proxy.id, as_of)?;
        let context = self.pricing_context(
            &proxy.id,
            proxy.dividend_yield,
            &series,
            chosen.context.expiration_date,
            chosen.context.inputs.time_to_expiry,
            config,
            warnings,
        )?;
        let strike = round_to_increment(
            context.spot() * (1.0 - chosen.quote.otm_fraction()),
            self.settings.strike_increment,
        );
        let quote = context.model_quote(strike)?;
        debug!(
            primary = primary_id,
            proxy = %proxy.id,
            primary_premium = chosen.quote.premium_per_share,
            proxy_premium = quote.premium_per_share,
            "primary over budget, switching to proxy"
        );
        if budget.is_exceeded_by(quote.premium_per_share) {
            warnings.push(Warning::OverBudget {
                instrument: proxy.id.clone(),
                premium_per_share: quote.premium_per_share,
                budget_per_share: budget.per_share,
            });
        }
        let candidates = candidates.with(quote.clone());
        Ok((Chosen { context, quote }, candidates))
    }

    /// Asks the prompt for a manual entry on the chosen instrument.
    ///
    /// A returned entry locks the run.
    fn apply_override(
        &self,
        chosen: Chosen,
        candidates: QuoteCandidates,
        budget: &HedgeBudget,
        warnings: &mut Warnings,
    ) -> Result<(Chosen, QuoteCandidates, bool)> {
        let Some(prompt) = self.prompt else {
            return Ok((chosen, candidates, false));
        };
        let request = QuoteRequest {
            underlying_id: chosen.context.underlying_id.clone(),
            expiration_date: chosen.context.expiration_date,
            suggested_strike: chosen.quote.strike,
            model_premium_per_share: chosen.quote.premium_per_share,
            budget_per_share: budget.per_share,
        };
        let Some(entry) = prompt.request_quote(&request) else {
            return Ok((chosen, candidates, false));
        };
        let entry = ManualQuote {
            underlying_id: chosen.context.underlying_id.clone(),
            ..entry
        };
        let quote = chosen.context.manual_quote(
            &entry,
            chosen.quote.strike,
            self.settings.per_contract_threshold,
            self.settings.contract_multiplier,
            warnings,
        )?;
        info!(quote = %quote, "manual quote locks the run");
        let candidates = candidates.with(quote.clone());
        Ok((
            Chosen {
                context: chosen.context,
                quote,
            },
            candidates,
            true,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CandidateInstrument;
    use crate::market::{Holding, PortfolioSnapshot};
    use crate::provider::{InMemoryMarketData, ScriptedQuotePrompt};
    use chrono::Days;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    fn series(id: &str, start: f64, returns: &[f64]) -> PriceSeries {
        let first = as_of() - Days::new(returns.len() as u64);
        let mut close = start;
        let mut pairs = vec![(first, close)];
        for (i, r) in returns.iter().enumerate() {
            close *= 1.0 + r;
            pairs.push((first + Days::new(i as u64 + 1), close));
        }
        PriceSeries::from_pairs(id, pairs).unwrap()
    }

    fn index_returns() -> Vec<f64> {
        (0..60)
            .map(|i| 0.01 * ((i as f64) * 1.3).sin())
            .collect()
    }

    fn market() -> InMemoryMarketData {
        let idx = index_returns();
        let noisy: Vec<f64> = idx
            .iter()
            .enumerate()
            .map(|(i, r)| 0.5 * r + 0.004 * ((i as f64) * 2.9).cos())
            .collect();
        let held: Vec<f64> = idx.iter().map(|r| 1.2 * r).collect();
        let portfolio = PortfolioSnapshot::new(vec![Holding::new("FUND", 1_000.0, 840.0)]).unwrap();
        InMemoryMarketData::new(portfolio)
            .with_history(series("FUND", 840.0, &held))
            .with_history(series("SPY", 575.0, &idx))
            .with_history(series("IWM", 210.0, &noisy))
            .with_volatility_index(18.0)
    }

    fn settings() -> EngineSettings {
        EngineSettings::default().with_candidates(vec![
            CandidateInstrument::new("SPY", 0.013),
            CandidateInstrument::new("IWM", 0.012),
        ])
    }

    fn config() -> HedgeConfig {
        HedgeConfig::new(0.005, 0.10, 30, 0.5, 0.0).unwrap()
    }

    #[test]
    fn test_run_selects_best_fit_and_sizes_within_budget() {
        let data = market();
        let engine = HedgeEngine::from_market_data(&data).with_settings(settings());
        let rec = engine.run(&config(), as_of()).unwrap();

        assert_eq!(rec.primary_instrument, "SPY");
        assert_eq!(rec.chosen_instrument, "SPY");
        assert!((rec.beta_used - 1.2).abs() < 1e-6);
        assert!(!rec.locked);
        assert!(rec.contracts() <= rec.sizing.contracts_affordable);
        assert!(rec.total_premium() <= crate::utils::to_money(rec.budget.dollars));
        assert_eq!(rec.scenarios.len(), 4);
        assert_eq!(rec.strike_selection.expiration_date.format("%a").to_string(), "Fri");
    }

    #[test]
    fn test_manual_quote_locks_and_skips_tightening() {
        let data = market();
        let prompt = ScriptedQuotePrompt::new().with_entry(ManualQuote::premium("SPY", 3.5));
        let engine = HedgeEngine::from_market_data(&data)
            .with_settings(settings())
            .with_prompt(&prompt);
        let rec = engine.run(&config(), as_of()).unwrap();

        assert!(rec.locked);
        assert!(rec.strike_selection.tightening.is_empty());
        assert!(rec.quote().is_manual());
        assert_eq!(rec.quote().premium_per_share, 3.5);
        assert_eq!(prompt.requests().len(), 1);
    }

    #[test]
    fn test_short_history_names_instrument() {
        let idx = index_returns();
        let data = market().with_history(series("IWM", 210.0, &idx[..10]));
        let engine = HedgeEngine::from_market_data(&data).with_settings(settings());
        let err = engine.run(&config(), as_of()).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientData { ref instrument, .. } if instrument == "IWM"
        ));
    }
}
