//! Error type of the derivation steps.

use polars::prelude::PolarsError;
use thiserror::Error;

use cohort_model::{CohortError, ConfigurationError, InvariantViolation};

#[derive(Debug, Error)]
pub enum TransformError {
    /// A configuration or invariant failure of the cohort rules.
    #[error(transparent)]
    Cohort(#[from] CohortError),

    /// Failed DataFrame operation.
    #[error("DataFrame operation failed: {0}")]
    Frame(#[from] PolarsError),
}

impl TransformError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, TransformError::Cohort(err) if err.is_configuration())
    }

    pub fn is_invariant(&self) -> bool {
        matches!(self, TransformError::Cohort(err) if err.is_invariant())
    }
}

impl From<ConfigurationError> for TransformError {
    fn from(err: ConfigurationError) -> Self {
        Self::Cohort(err.into())
    }
}

impl From<InvariantViolation> for TransformError {
    fn from(err: InvariantViolation) -> Self {
        Self::Cohort(err.into())
    }
}

pub type Result<T> = std::result::Result<T, TransformError>;
