//! Cohort input loading.
//!
//! Reads CSV files into Polars DataFrames and normalizes them to the canonical
//! column names and types of [`cohort_model::columns`]:
//!
//! - criteria and attribute tables (keys, optional stay and time, criteria)
//! - the admission table
//! - the diagnosis table
//! - propensity score tables, read into [`PropensityRecord`](cohort_model::PropensityRecord)s

mod error;
mod frame;
mod reader;

use std::path::Path;

use polars::prelude::DataFrame;

use cohort_model::{ColumnMapping, PropensityRecord};

// === Error Types ===
pub use error::{IngestError, Result};

// === CSV Reading ===
pub use reader::{check_file, read_csv};

// === Frame Conversion ===
pub use frame::{admissions_frame, diagnoses_frame, propensity_from_frame, timeline_frame};

/// Read a criteria or attribute CSV; `name` labels errors.
pub fn load_timeline(path: &Path, name: &str, mapping: &ColumnMapping) -> Result<DataFrame> {
    timeline_frame(&read_csv(path)?, name, mapping)
}

/// Read the admission CSV.
pub fn load_admissions(path: &Path, mapping: &ColumnMapping) -> Result<DataFrame> {
    admissions_frame(&read_csv(path)?, mapping)
}

/// Read the diagnosis CSV.
pub fn load_diagnoses(path: &Path, mapping: &ColumnMapping) -> Result<DataFrame> {
    diagnoses_frame(&read_csv(path)?, mapping)
}

/// Read a propensity score CSV.
pub fn load_propensity(path: &Path, mapping: &ColumnMapping) -> Result<Vec<PropensityRecord>> {
    propensity_from_frame(&read_csv(path)?, mapping)
}
