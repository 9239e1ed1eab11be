//! Error taxonomy for cohort construction.
//!
//! Two kinds of failure exist and both are fatal:
//!
//! - [`ConfigurationError`]: a required key, column or option is absent or invalid.
//! - [`InvariantViolation`]: the data reached a state the algorithms guarantee
//!   cannot happen. The run is aborted rather than emitting a partial cohort.
//!
//! Empty input is not an error; every operation returns an empty result.

use thiserror::Error;

use crate::ids::{AdmissionId, KeyPart, SubjectId};

#[derive(Debug, Error)]
pub enum CohortError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
}

impl CohortError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, CohortError::Configuration(_))
    }

    pub fn is_invariant(&self) -> bool {
        matches!(self, CohortError::Invariant(_))
    }
}

/// A required grouping key, column or option is missing or unusable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("column '{column}' not found in {table}")]
    MissingColumn { table: String, column: String },

    #[error("grouping key '{key}' not present in {table}")]
    MissingKey { table: String, key: KeyPart },

    #[error("column '{column}' present in both {left} and {right}")]
    DuplicateColumn {
        column: String,
        left: String,
        right: String,
    },

    #[error("column '{column}' in {table} has unsupported type {dtype}")]
    UnsupportedColumn {
        table: String,
        column: String,
        dtype: String,
    },

    #[error("subject {subject_id} appears more than once in {table}")]
    DuplicateId { table: String, subject_id: SubjectId },

    #[error("score {score} for subject {subject_id} is not a probability")]
    InvalidScore { subject_id: SubjectId, score: f64 },

    #[error("invalid option {name}: {reason}")]
    InvalidOption { name: String, reason: String },
}

/// A guarantee of the pipeline or matcher was broken.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    #[error(
        "admission {admission_id} of subject {subject_id} has a flagged record that fits no labeling window"
    )]
    UnclassifiedAdmission {
        subject_id: SubjectId,
        admission_id: AdmissionId,
    },

    #[error("untreated subject {subject_id} was matched more than once")]
    ReusedControl { subject_id: SubjectId },

    #[error("match distance {distance} exceeds caliper threshold {threshold}")]
    DistanceAboveThreshold { distance: f64, threshold: f64 },
}

pub type Result<T> = std::result::Result<T, CohortError>;
