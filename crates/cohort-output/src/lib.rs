//! Output generation for cohort runs.
//!
//! Labels, matches and diagnosis features are turned into Polars DataFrames
//! and written as CSV.

pub mod csv;
pub mod frames;

pub use csv::{
    FEATURES_FILE, LABELS_FILE, MATCHES_FILE, ensure_parent_dir, write_csv, write_features,
    write_labels, write_matches,
};
pub use frames::{features_frame, labels_frame, matches_frame};
