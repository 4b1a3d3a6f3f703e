//! Hedge configuration and engine policy.
//!
//! Two layers live here:
//!
//! - [`HedgeConfig`]: the per-run inputs (budget fraction, target drawdown, days to
//!   expiration, downside weight, volatility-index level). It can only be built
//!   validated, either directly with [`HedgeConfig::new`] or from loosely-typed
//!   input with [`RawHedgeConfig::coerce`].
//! - [`EngineSettings`]: tunable policy constants (candidate instruments, volatility
//!   regime bands, tightening search, scenario menu, thresholds). All fields have
//!   defaults and the whole struct can be loaded from JSON.

use crate::error::{Error, Result};
use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Validated per-run hedge configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HedgeConfig {
    budget_fraction_base: f64,
    target_drawdown: f64,
    days_to_expiration: u32,
    downside_weight: f64,
    volatility_index_level: f64,
}

impl HedgeConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfiguration` naming the first field outside its domain:
    /// `budget_fraction_base` and `target_drawdown` in `(0, 1]`, `days_to_expiration > 0`,
    /// `downside_weight` in `[0, 1]`, `volatility_index_level >= 0`.
    pub fn new(
        budget_fraction_base: f64,
        target_drawdown: f64,
        days_to_expiration: u32,
        downside_weight: f64,
        volatility_index_level: f64,
    ) -> Result<Self> {
        check_unit_interval("budget_fraction_base", budget_fraction_base, false)?;
        check_unit_interval("target_drawdown", target_drawdown, false)?;
        check_unit_interval("downside_weight", downside_weight, true)?;
        if days_to_expiration == 0 {
            return Err(Error::invalid_config(
                "days_to_expiration",
                "must be at least one day",
            ));
        }
        if !volatility_index_level.is_finite() || volatility_index_level < 0.0 {
            return Err(Error::invalid_config(
                "volatility_index_level",
                format!("must be a non-negative number, got {volatility_index_level}"),
            ));
        }
        Ok(Self {
            budget_fraction_base,
            target_drawdown,
            days_to_expiration,
            downside_weight,
            volatility_index_level,
        })
    }

    /// Base fraction of portfolio value to spend on protection.
    #[must_use]
    pub const fn budget_fraction_base(&self) -> f64 {
        self.budget_fraction_base
    }

    /// Portfolio drawdown the hedge is sized against.
    #[must_use]
    pub const fn target_drawdown(&self) -> f64 {
        self.target_drawdown
    }

    /// Minimum days until expiration.
    #[must_use]
    pub const fn days_to_expiration(&self) -> u32 {
        self.days_to_expiration
    }

    /// Weight given to downside beta when blending.
    #[must_use]
    pub const fn downside_weight(&self) -> f64 {
        self.downside_weight
    }

    /// Current volatility-index level (e.g., VIX).
    #[must_use]
    pub const fn volatility_index_level(&self) -> f64 {
        self.volatility_index_level
    }

    /// Returns a copy with a different volatility-index level.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfiguration` if the level is negative or not finite.
    pub fn with_volatility_index_level(self, level: f64) -> Result<Self> {
        Self::new(
            self.budget_fraction_base,
            self.target_drawdown,
            self.days_to_expiration,
            self.downside_weight,
            level,
        )
    }

    /// Blends downside beta and full-sample beta into the sizing beta.
    ///
    /// `beta_used = w × downside_beta + (1 − w) × beta`
    #[must_use]
    pub fn blended_beta(&self, beta: f64, downside_beta: f64) -> f64 {
        self.downside_weight * downside_beta + (1.0 - self.downside_weight) * beta
    }
}

fn check_unit_interval(field: &str, value: f64, allow_zero: bool) -> Result<()> {
    let lower_ok = if allow_zero { value >= 0.0 } else { value > 0.0 };
    if !value.is_finite() || !lower_ok || value > 1.0 {
        let domain = if allow_zero { "[0, 1]" } else { "(0, 1]" };
        return Err(Error::invalid_config(
            field,
            format!("must be in {domain}, got {value}"),
        ));
    }
    Ok(())
}

/// A loosely-typed configuration value as read from a cell or a form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// A numeric value.
    Number(f64),
    /// A textual value such as `"0.5%"` or `" 10 "`.
    Text(String),
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl ConfigValue {
    /// Parses the value, returning the number and whether it carried a `%` sign.
    fn parse(&self, field: &str) -> Result<(f64, bool)> {
        match self {
            Self::Number(n) => Ok((*n, false)),
            Self::Text(text) => {
                let trimmed = text.trim();
                let (digits, percent) = match trimmed.strip_suffix('%') {
                    Some(rest) => (rest.trim(), true),
                    None => (trimmed, false),
                };
                let value = digits.replace(',', "").parse::<f64>().map_err(|_| {
                    Error::invalid_config(field, format!("`{text}` is not a number"))
                })?;
                Ok((value, percent))
            }
        }
    }
}

/// Configuration as delivered by a configuration reader, before coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHedgeConfig {
    /// Budget fraction, either as a fraction (`0.005`) or a percentage (`0.5%`, `"0.5 %"`).
    pub budget_fraction_base: ConfigValue,
    /// Target drawdown, fraction or percentage.
    pub target_drawdown: ConfigValue,
    /// Days to expiration.
    pub days_to_expiration: ConfigValue,
    /// Downside weight, fraction or percentage. Defaults to `0.5` when absent.
    #[serde(default)]
    pub downside_weight: Option<ConfigValue>,
    /// Volatility-index level. Defaults to `0` (unknown) when absent.
    #[serde(default)]
    pub volatility_index_level: Option<ConfigValue>,
}

/// Downside weight applied when the reader supplies none.
pub const DEFAULT_DOWNSIDE_WEIGHT: f64 = 0.5;

impl RawHedgeConfig {
    /// Coerces the raw values into a validated [`HedgeConfig`].
    ///
    /// Text is trimmed and may end in `%`. Fraction fields above 1 are read as
    /// percentages, then clamped into `(0, 1]` (`[0, 1]` for the downside weight).
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfiguration` for unparseable, non-finite, zero or
    /// negative values.
    pub fn coerce(&self) -> Result<HedgeConfig> {
        let budget = coerce_fraction("budget_fraction_base", &self.budget_fraction_base, false)?;
        let drawdown = coerce_fraction("target_drawdown", &self.target_drawdown, false)?;
        let weight = match &self.downside_weight {
            Some(value) => coerce_fraction("downside_weight", value, true)?,
            None => DEFAULT_DOWNSIDE_WEIGHT,
        };

        let (days, _) = self.days_to_expiration.parse("days_to_expiration")?;
        if !days.is_finite() || days.round() < 1.0 {
            return Err(Error::invalid_config(
                "days_to_expiration",
                format!("must be at least one day, got {days}"),
            ));
        }
        let days = days.round().min(f64::from(u32::MAX)) as u32;

        let level = match &self.volatility_index_level {
            Some(value) => value.parse("volatility_index_level")?.0,
            None => 0.0,
        };

        HedgeConfig::new(budget, drawdown, days, weight, level)
    }
}

fn coerce_fraction(field: &str, value: &ConfigValue, allow_zero: bool) -> Result<f64> {
    let (number, percent) = value.parse(field)?;
    if !number.is_finite() {
        return Err(Error::invalid_config(field, "must be a finite number"));
    }
    let fraction = if percent || number > 1.0 {
        number / 100.0
    } else {
        number
    };
    if fraction < 0.0 {
        return Err(Error::invalid_config(
            field,
            format!("must not be negative, got {fraction}"),
        ));
    }
    if fraction == 0.0 && !allow_zero {
        return Err(Error::invalid_config(field, "must be greater than zero"));
    }
    Ok(fraction.min(1.0))
}

/// A step in the volatility-regime budget schedule.
///
/// The multiplier applies from `threshold` (inclusive) up to the next band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityBand {
    /// Volatility-index level at which this band starts.
    pub threshold: f64,
    /// Budget multiplier within the band.
    pub multiplier: f64,
}

/// Step function mapping a volatility-index level to a budget multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityRegime {
    /// Multiplier below the first band.
    pub base_multiplier: f64,
    /// Bands in ascending threshold order.
    pub bands: Vec<VolatilityBand>,
}

impl Default for VolatilityRegime {
    fn default() -> Self {
        Self {
            base_multiplier: 1.0,
            bands: vec![
                VolatilityBand {
                    threshold: 20.0,
                    multiplier: 0.75,
                },
                VolatilityBand {
                    threshold: 25.0,
                    multiplier: 0.50,
                },
                VolatilityBand {
                    threshold: 30.0,
                    multiplier: 0.25,
                },
            ],
        }
    }
}

impl VolatilityRegime {
    /// Returns the budget multiplier for a volatility-index level.
    #[must_use]
    pub fn multiplier(&self, level: f64) -> f64 {
        self.bands
            .iter()
            .take_while(|band| level >= band.threshold)
            .last()
            .map_or(self.base_multiplier, |band| band.multiplier)
    }

    fn validate(&self) -> Result<()> {
        if !(self.base_multiplier > 0.0 && self.base_multiplier <= 1.0) {
            return Err(Error::invalid_config(
                "regime.base_multiplier",
                "must be in (0, 1]",
            ));
        }
        for pair in self.bands.windows(2) {
            if pair[1].threshold <= pair[0].threshold {
                return Err(Error::invalid_config(
                    "regime.bands",
                    "thresholds must be strictly ascending",
                ));
            }
        }
        if self
            .bands
            .iter()
            .any(|band| !(band.multiplier > 0.0 && band.multiplier <= 1.0))
        {
            return Err(Error::invalid_config(
                "regime.bands",
                "multipliers must be in (0, 1]",
            ));
        }
        Ok(())
    }
}

/// A lower-premium instrument tracking the same index as a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyInstrument {
    /// Ticker of the proxy.
    pub id: String,
    /// Continuous dividend yield of the proxy.
    #[serde(default)]
    pub dividend_yield: f64,
}

/// An index instrument evaluated as a hedge vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateInstrument {
    /// Ticker of the candidate.
    pub id: String,
    /// Continuous dividend yield of the candidate.
    #[serde(default)]
    pub dividend_yield: f64,
    /// Optional lower-premium proxy.
    #[serde(default)]
    pub proxy: Option<ProxyInstrument>,
}

impl CandidateInstrument {
    /// Creates a candidate without a proxy.
    #[must_use]
    pub fn new(id: impl Into<String>, dividend_yield: f64) -> Self {
        Self {
            id: id.into(),
            dividend_yield,
            proxy: None,
        }
    }

    /// Attaches a proxy instrument.
    #[must_use]
    pub fn with_proxy(mut self, id: impl Into<String>, dividend_yield: f64) -> Self {
        self.proxy = Some(ProxyInstrument {
            id: id.into(),
            dividend_yield,
        });
        self
    }
}

/// Parameters of the automatic strike-tightening search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TighteningPolicy {
    /// Maximum number of shrink steps.
    pub max_steps: u32,
    /// Factor applied to the OTM fraction at each step.
    pub shrink_factor: f64,
    /// Projected coverage at which the search stops.
    pub min_coverage: f64,
    /// OTM fraction below which the strike is not moved.
    pub min_otm: f64,
}

impl Default for TighteningPolicy {
    fn default() -> Self {
        Self {
            max_steps: 5,
            shrink_factor: 0.9,
            min_coverage: 0.30,
            min_otm: 0.02,
        }
    }
}

/// Scenario menu and repricing heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioPolicy {
    /// Hypothetical portfolio drawdowns, as fractions.
    pub drawdowns: Vec<f64>,
    /// Implied-vol points added per 1% decline of the instrument.
    pub iv_expansion_rate: f64,
    /// Instrument-drawdown increment of the breakeven scan.
    pub breakeven_step: f64,
}

impl Default for ScenarioPolicy {
    fn default() -> Self {
        Self {
            drawdowns: vec![0.01, 0.05, 0.10, 0.20],
            iv_expansion_rate: 0.5,
            breakeven_step: 0.001,
        }
    }
}

/// Tunable policy for the hedge engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Candidate hedge instruments, evaluated in order.
    pub candidates: Vec<CandidateInstrument>,
    /// Volatility-regime budget schedule.
    pub regime: VolatilityRegime,
    /// Strike-tightening search parameters.
    pub tightening: TighteningPolicy,
    /// Scenario repricing parameters.
    pub scenarios: ScenarioPolicy,
    /// Continuously compounded risk-free rate.
    pub risk_free_rate: f64,
    /// Minimum aligned daily observations per instrument.
    pub min_observations: usize,
    /// Minimum down days for a downside regression.
    pub min_downside_observations: usize,
    /// Calendar days of price history retained.
    pub lookback_days: u32,
    /// Weekday on which listed options expire.
    pub expiration_weekday: Weekday,
    /// Floor applied to `|delta|` in the coverage formula.
    pub delta_floor: f64,
    /// Floor applied to `|beta_used|`.
    pub beta_floor: f64,
    /// Manual premiums at or above this value are read as per-contract.
    pub per_contract_threshold: f64,
    /// Shares per option contract.
    pub contract_multiplier: u32,
    /// Volatility used when no estimate is available.
    pub fallback_volatility: f64,
    /// Smallest premium a model quote may carry.
    pub min_model_premium: f64,
    /// Listed strike spacing; strikes are not rounded when absent.
    pub strike_increment: Option<f64>,
    /// Trading days per year for annualizing realized volatility.
    pub trading_days_per_year: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            candidates: vec![
                CandidateInstrument::new("SPY", 0.013).with_proxy("SPLG", 0.013),
                CandidateInstrument::new("QQQ", 0.006).with_proxy("QQQM", 0.006),
                CandidateInstrument::new("IWM", 0.012),
                CandidateInstrument::new("DIA", 0.017),
            ],
            regime: VolatilityRegime::default(),
            tightening: TighteningPolicy::default(),
            scenarios: ScenarioPolicy::default(),
            risk_free_rate: 0.04,
            min_observations: 30,
            min_downside_observations: 5,
            lookback_days: 120,
            expiration_weekday: Weekday::Fri,
            delta_floor: 1e-4,
            beta_floor: 0.05,
            per_contract_threshold: 20.0,
            contract_multiplier: 100,
            fallback_volatility: 0.20,
            min_model_premium: 0.01,
            strike_increment: None,
            trading_days_per_year: 252.0,
        }
    }
}

impl EngineSettings {
    /// Parses settings from JSON; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` for malformed JSON and
    /// `Error::InvalidConfiguration` for inconsistent policy.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Returns a copy with a different candidate list.
    #[must_use]
    pub fn with_candidates(mut self, candidates: Vec<CandidateInstrument>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Looks up a candidate by ticker.
    #[must_use]
    pub fn candidate(&self, id: &str) -> Option<&CandidateInstrument> {
        self.candidates.iter().find(|c| c.id == id)
    }

    /// Checks the policy for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoCandidates` for an empty candidate list and
    /// `Error::InvalidConfiguration` naming the first inconsistent field.
    pub fn validate(&self) -> Result<()> {
        if self.candidates.is_empty() {
            return Err(Error::NoCandidates);
        }
        self.regime.validate()?;

        let t = &self.tightening;
        if !(t.shrink_factor > 0.0 && t.shrink_factor < 1.0) {
            return Err(Error::invalid_config(
                "tightening.shrink_factor",
                "must be in (0, 1)",
            ));
        }
        if !(t.min_otm >= 0.0 && t.min_otm < 1.0) {
            return Err(Error::invalid_config("tightening.min_otm", "must be in [0, 1)"));
        }
        if !(t.min_coverage > 0.0) {
            return Err(Error::invalid_config(
                "tightening.min_coverage",
                "must be positive",
            ));
        }

        let s = &self.scenarios;
        if s.drawdowns.iter().any(|d| !(*d > 0.0 && *d <= 1.0)) {
            return Err(Error::invalid_config(
                "scenarios.drawdowns",
                "each drawdown must be in (0, 1]",
            ));
        }
        if !(s.iv_expansion_rate >= 0.0 && s.iv_expansion_rate.is_finite()) {
            return Err(Error::invalid_config(
                "scenarios.iv_expansion_rate",
                "must be non-negative",
            ));
        }
        if !(s.breakeven_step > 0.0 && s.breakeven_step < 1.0) {
            return Err(Error::invalid_config(
                "scenarios.breakeven_step",
                "must be in (0, 1)",
            ));
        }

        if !self.risk_free_rate.is_finite() {
            return Err(Error::invalid_config("risk_free_rate", "must be finite"));
        }
        if self.min_observations < 2 {
            return Err(Error::invalid_config("min_observations", "must be at least 2"));
        }
        if self.lookback_days == 0 {
            return Err(Error::invalid_config("lookback_days", "must be positive"));
        }
        if self.contract_multiplier == 0 {
            return Err(Error::invalid_config(
                "contract_multiplier",
                "must be positive",
            ));
        }
        for (field, value) in [
            ("delta_floor", self.delta_floor),
            ("beta_floor", self.beta_floor),
            ("per_contract_threshold", self.per_contract_threshold),
            ("fallback_volatility", self.fallback_volatility),
            ("min_model_premium", self.min_model_premium),
            ("trading_days_per_year", self.trading_days_per_year),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(Error::invalid_config(field, "must be positive"));
            }
        }
        Ok(())
    }
}
