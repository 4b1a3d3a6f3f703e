//! Error and warning types for the portfolio hedge engine.
//!
//! Fatal conditions are reported through [`Error`] and abort an invocation before
//! any [`HedgePosition`](crate::hedge::HedgePosition) is produced. Degraded but
//! recoverable conditions are reported as [`Warning`] values that travel with the
//! final recommendation.

use optionstratlib::error::{DecimalError, GreeksError, PricingError};
use serde::Serialize;
use thiserror::Error;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a hedge computation.
#[derive(Debug, Error)]
pub enum Error {
    /// Fewer aligned observations than required for an instrument.
    #[error(
        "insufficient data for {instrument}: {available} aligned observations, {required} required"
    )]
    InsufficientData {
        /// The instrument (or the synthetic portfolio) lacking data.
        instrument: String,
        /// Minimum number of observations required.
        required: usize,
        /// Number of observations actually available.
        available: usize,
    },

    /// A configuration field is outside its valid domain after coercion.
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfiguration {
        /// The offending field name.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A price series violates its ordering or value invariants.
    #[error("invalid price series for {instrument}: {reason}")]
    InvalidPriceSeries {
        /// The instrument identifier.
        instrument: String,
        /// Why the series was rejected.
        reason: String,
    },

    /// The portfolio snapshot is empty or contains an invalid position.
    #[error("invalid portfolio: {0}")]
    InvalidPortfolio(String),

    /// An option quote violates its invariants.
    #[error("invalid option quote: {0}")]
    InvalidQuote(String),

    /// No hedge candidates were configured.
    #[error("no hedge candidates configured")]
    NoCandidates,

    /// An external collaborator failed to deliver data.
    #[error("{collaborator} failed: {message}")]
    Provider {
        /// Name of the collaborator that failed.
        collaborator: String,
        /// Failure description as reported by the collaborator.
        message: String,
    },

    /// The pricing library rejected its inputs.
    #[error("pricing error: {0}")]
    Pricing(String),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Creates an `InsufficientData` error.
    pub fn insufficient_data(
        instrument: impl Into<String>,
        required: usize,
        available: usize,
    ) -> Self {
        Self::InsufficientData {
            instrument: instrument.into(),
            required,
            available,
        }
    }

    /// Creates an `InvalidConfiguration` error.
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidPriceSeries` error.
    pub fn invalid_series(instrument: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPriceSeries {
            instrument: instrument.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidPortfolio` error.
    pub fn invalid_portfolio(reason: impl Into<String>) -> Self {
        Self::InvalidPortfolio(reason.into())
    }

    /// Creates an `InvalidQuote` error.
    pub fn invalid_quote(reason: impl Into<String>) -> Self {
        Self::InvalidQuote(reason.into())
    }

    /// Creates a `Provider` error for a failing collaborator.
    pub fn provider(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            collaborator: collaborator.into(),
            message: message.into(),
        }
    }

    /// Creates a `Pricing` error.
    pub fn pricing(reason: impl Into<String>) -> Self {
        Self::Pricing(reason.into())
    }

    /// Returns true if the error was raised by configuration validation.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::InvalidConfiguration { .. })
    }
}

impl From<PricingError> for Error {
    fn from(err: PricingError) -> Self {
        Self::pricing(err.to_string())
    }
}

impl From<GreeksError> for Error {
    fn from(err: GreeksError) -> Self {
        Self::pricing(err.to_string())
    }
}

impl From<DecimalError> for Error {
    fn from(err: DecimalError) -> Self {
        Self::pricing(err.to_string())
    }
}

/// Non-fatal conditions detected while computing a hedge.
///
/// Every warning is logged through `tracing` when raised and is also attached to
/// the recommendation, so consumers can detect the degraded-confidence path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// The explanatory return series had zero variance; beta and R² were set to 0.
    ZeroVariance { instrument: String },
    /// Every down day had the same return; downside beta and R² were set to 0.
    ZeroDownsideVariance {
        instrument: String,
        observations: usize,
    },
    /// Fewer than the minimum down days were available; downside fit set to 0.
    InsufficientDownsideData {
        instrument: String,
        observations: usize,
    },
    /// `beta_used` was too close to zero and was clamped to the floor.
    NearZeroBeta { beta: f64, floor: f64 },
    /// `beta_used` is negative; a protective put does not hedge this exposure.
    NegativeBeta { beta: f64 },
    /// Put delta was too close to zero and was floored; the target is unreliable.
    NearZeroDelta {
        delta: f64,
        floor: f64,
        contracts_target: u64,
    },
    /// The chosen premium exceeds the per-share budget.
    OverBudget {
        instrument: String,
        premium_per_share: f64,
        budget_per_share: f64,
    },
    /// Sizing produced no contracts.
    ZeroContracts { instrument: String },
    /// No usable volatility estimate; the configured fallback was used.
    VolatilityFallback { instrument: String, volatility: f64 },
    /// Implied volatility could not be backed out of a manual premium.
    ImpliedVolUnavailable { instrument: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroVariance { instrument } => {
                write!(f, "{instrument}: zero variance in returns, beta set to 0")
            }
            Self::ZeroDownsideVariance {
                instrument,
                observations,
            } => write!(
                f,
                "{instrument}: {observations} identical down-day returns, downside fit set to 0"
            ),
            Self::InsufficientDownsideData {
                instrument,
                observations,
            } => write!(
                f,
                "{instrument}: only {observations} down days, downside fit set to 0"
            ),
            Self::NearZeroBeta { beta, floor } => {
                write!(f, "beta {beta:.4} clamped to magnitude {floor}")
            }
            Self::NegativeBeta { beta } => write!(f, "negative beta {beta:.4}"),
            Self::NearZeroDelta {
                delta,
                floor,
                contracts_target,
            } => write!(
                f,
                "delta {delta:.6} floored at {floor}, unreliable target of {contracts_target}"
            ),
            Self::OverBudget {
                instrument,
                premium_per_share,
                budget_per_share,
            } => write!(
                f,
                "{instrument}: premium {premium_per_share:.2} over budget {budget_per_share:.2}"
            ),
            Self::ZeroContracts { instrument } => {
                write!(f, "{instrument}: budget affords no contracts")
            }
            Self::VolatilityFallback {
                instrument,
                volatility,
            } => write!(f, "{instrument}: using fallback volatility {volatility}"),
            Self::ImpliedVolUnavailable { instrument } => {
                write!(f, "{instrument}: implied volatility unavailable for manual premium")
            }
        }
    }
}

/// Collects warnings for one computation, logging each as it is raised.
#[derive(Debug, Default, Clone)]
pub struct Warnings(Vec<Warning>);

impl Warnings {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning and emits it through `tracing`.
    pub fn push(&mut self, warning: Warning) {
        tracing::warn!(warning = %warning, "degraded hedge input");
        self.0.push(warning);
    }

    /// Returns true if no warnings were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the recorded warnings.
    #[must_use]
    pub fn as_slice(&self) -> &[Warning] {
        &self.0
    }

    /// Consumes the collector and returns the warnings.
    #[must_use]
    pub fn into_vec(self) -> Vec<Warning> {
        self.0
    }
}
