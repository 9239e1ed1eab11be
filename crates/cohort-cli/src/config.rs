//! Run options: JSON config file plus command-line overrides.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use cohort_model::CohortOptions;

/// Flag values that take precedence over the config file.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionOverrides {
    pub caliper: Option<f64>,
    pub exclusion_window_hours: Option<f64>,
}

/// Read options from a JSON file; keys left out keep their defaults.
pub fn read_options(path: &Path) -> Result<CohortOptions> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))
}

/// Defaults, then the config file, then flags; the result is validated.
pub fn resolve_options(config: Option<&Path>, overrides: OptionOverrides) -> Result<CohortOptions> {
    let mut options = match config {
        Some(path) => read_options(path)?,
        None => CohortOptions::default(),
    };
    if let Some(caliper) = overrides.caliper {
        options.matching.caliper = caliper;
    }
    if let Some(hours) = overrides.exclusion_window_hours {
        options.labeling.exclusion_window_hours = hours;
    }
    options.validate().context("invalid options")?;
    Ok(options)
}
