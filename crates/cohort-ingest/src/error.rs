//! Error types for cohort data ingestion.

use std::path::PathBuf;

use thiserror::Error;

use cohort_model::CohortError;

/// Errors that can occur while loading cohort inputs.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// CSV file not found.
    #[error("CSV file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Failed to read file metadata.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === CSV Parsing Errors ===
    /// Failed to parse CSV with Polars.
    #[error("failed to parse CSV {path}: {message}")]
    CsvParse { path: PathBuf, message: String },

    // === Conversion Errors ===
    /// A cell could not be read as the type its role requires.
    #[error("invalid {column} value '{value}' in {table} at row {row}")]
    InvalidValue {
        table: String,
        column: String,
        row: usize,
        value: String,
    },

    /// Failed DataFrame operation.
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },

    /// A required column or key is absent.
    #[error(transparent)]
    Cohort(#[from] CohortError),
}

impl From<polars::prelude::PolarsError> for IngestError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

impl From<cohort_model::ConfigurationError> for IngestError {
    fn from(err: cohort_model::ConfigurationError) -> Self {
        Self::Cohort(err.into())
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IngestError::FileNotFound {
            path: PathBuf::from("/data/admissions.csv"),
        };
        assert_eq!(err.to_string(), "CSV file not found: /data/admissions.csv");
    }

    #[test]
    fn test_error_from_polars() {
        let polars_err = polars::prelude::PolarsError::ColumnNotFound("test".into());
        let ingest_err: IngestError = polars_err.into();
        assert!(matches!(ingest_err, IngestError::DataFrame { .. }));
    }

    #[test]
    fn test_configuration_error_is_passed_through() {
        let err: IngestError = cohort_model::ConfigurationError::MissingColumn {
            table: "admissions".to_string(),
            column: "hadm_id".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "configuration error: column 'hadm_id' not found in admissions");
    }
}
