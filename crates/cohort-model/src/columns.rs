//! Canonical column names of the frames handed between crates.
//!
//! Ingestion renames mapped input columns to these; everything downstream of
//! it refers to columns only through this module.

pub const SUBJECT_ID: &str = "subject_id";
pub const ADMISSION_ID: &str = "admission_id";
pub const STAY_ID: &str = "stay_id";
pub const TIMESTAMP: &str = "timestamp";

pub const ADMIT_TIME: &str = "admit_time";
pub const DISCHARGE_TIME: &str = "discharge_time";
pub const INDEX_TIME: &str = "index_time";

pub const DIAGNOSIS_CODE: &str = "diagnosis_code";
pub const DIAGNOSIS_TIME: &str = "diagnosis_time";
