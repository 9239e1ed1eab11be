//! CSV writers for label and match tables.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use tracing::info;

use cohort_match::MatchReport;
use cohort_model::{ColumnMapping, Label};

use crate::frames::{features_frame, labels_frame, matches_frame};

/// File name of the label table inside an output directory.
pub const LABELS_FILE: &str = "labels.csv";

/// File name of the match table inside an output directory.
pub const MATCHES_FILE: &str = "matches.csv";

/// File name of the diagnosis feature matrix inside an output directory.
pub const FEATURES_FILE: &str = "diagnosis_features.csv";

/// Ensure a parent directory exists for a file path.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    Ok(())
}

/// Write a DataFrame as a comma-separated file with a header row.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), rows = df.height(), "wrote CSV");
    Ok(())
}

/// Write `labels.csv` into `dir` and return its path.
pub fn write_labels(dir: &Path, labels: &[Label], mapping: &ColumnMapping) -> Result<PathBuf> {
    let path = dir.join(LABELS_FILE);
    let mut df = labels_frame(labels, mapping).context("build label table")?;
    write_csv(&mut df, &path)?;
    Ok(path)
}

/// Write `matches.csv` into `dir` and return its path.
pub fn write_matches(dir: &Path, report: &MatchReport) -> Result<PathBuf> {
    let path = dir.join(MATCHES_FILE);
    let mut df = matches_frame(report).context("build match table")?;
    write_csv(&mut df, &path)?;
    Ok(path)
}

/// Write `diagnosis_features.csv` into `dir` and return its path.
pub fn write_features(
    dir: &Path,
    features: &DataFrame,
    mapping: &ColumnMapping,
) -> Result<PathBuf> {
    let path = dir.join(FEATURES_FILE);
    let mut df = features_frame(features, mapping).context("build feature table")?;
    write_csv(&mut df, &path)?;
    Ok(path)
}
