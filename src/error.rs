//! Errors raised while configuring or running a Metropolis chain.

use thiserror::Error;

/// Error a [`Target`](crate::distributions::Target) returns when it cannot
/// evaluate its density at a point.
pub type TargetError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum MetropolisError {
    /// Rejected before the first iteration.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// The starting point has zero, negative or undefined density, so the first
    /// acceptance ratio would be undefined.
    #[error("target density at the starting point is degenerate (log density = {log_density})")]
    DegenerateDensity { log_density: f64 },

    #[error("point has dimension {found}, but the target expects {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("target density evaluation failed")]
    EvaluationFailure {
        #[source]
        source: TargetError,
    },

    #[error("run cancelled after {completed} of {requested} proposals")]
    Cancelled { completed: usize, requested: usize },
}

impl MetropolisError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}

impl From<TargetError> for MetropolisError {
    fn from(source: TargetError) -> Self {
        Self::EvaluationFailure { source }
    }
}

pub type Result<T> = std::result::Result<T, MetropolisError>;
