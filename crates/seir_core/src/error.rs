//! Error taxonomy for model construction and simulation runs.
//!
//! Configuration errors concern the integration method, validation errors
//! concern parameter and scenario values. Both are raised before any
//! integration work starts. Numeric instability is not an error; see
//! [`crate::simulation::NumericWarning`].

use thiserror::Error;

/// Result alias used across the crate.
pub type SeirResult<T> = Result<T, SeirError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("Unknown integration method '{0}'")]
    UnknownMethod(String),

    #[error("Malformed tableau: {0}")]
    MalformedTableau(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("population must be positive, got {0}")]
    NonPositivePopulation(f64),

    #[error("population ({population}) must exceed the seed count {seeds}")]
    PopulationNotAboveSeeds { population: f64, seeds: f64 },

    #[error("initial seed count '{name}' must be non-negative, got {value}")]
    NegativeSeed { name: &'static str, value: f64 },

    #[error("reduction_percent must lie in [0, 100], got {0}")]
    ReductionPercentOutOfRange(f64),

    #[error("reduction_start_day must be non-negative, got {0}")]
    NegativeStartDay(f64),

    #[error("days must be at least 1")]
    NoDays,

    #[error("pSevere + cfr must not exceed 1, got {0}")]
    ProbabilitiesExceedOne(f64),

    #[error("'{name}' must lie in [0, 1], got {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },

    #[error("duration '{name}' must be positive, got {value}")]
    NonPositiveDuration { name: &'static str, value: f64 },

    #[error("step size dt must be positive, got {0}")]
    NonPositiveStep(f64),

    #[error("r0 must be non-negative, got {0}")]
    NegativeR0(f64),

    #[error("'{name}' must be finite")]
    NonFinite { name: &'static str },
}

#[derive(Debug, Error)]
pub enum SeirError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}
