//! Option resolution from config files and flags.

use std::io::Write;

use cohort_cli::config::{OptionOverrides, read_options, resolve_options};
use cohort_model::CohortOptions;
use tempfile::NamedTempFile;

fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

#[test]
fn defaults_without_config() {
    let options = resolve_options(None, OptionOverrides::default()).unwrap();
    assert_eq!(options, CohortOptions::default());
}

#[test]
fn partial_config_keeps_other_defaults() {
    let file = config_file(r#"{"matching": {"caliper": 0.1}, "columns": {"admission_id": "visit"}}"#);
    let options = read_options(file.path()).unwrap();
    assert_eq!(options.matching.caliper, 0.1);
    assert_eq!(options.matching.clip_low, 0.025);
    assert_eq!(options.columns.admission_id, "visit");
    assert_eq!(options.columns.subject_id, "subject_id");
    assert_eq!(options.labeling.exclusion_window_hours, 15.0);
}

#[test]
fn flags_win_over_config() {
    let file = config_file(r#"{"matching": {"caliper": 0.1}, "labeling": {"exclusion_window_hours": 10}}"#);
    let overrides = OptionOverrides {
        caliper: Some(0.5),
        exclusion_window_hours: None,
    };
    let options = resolve_options(Some(file.path()), overrides).unwrap();
    assert_eq!(options.matching.caliper, 0.5);
    assert_eq!(options.labeling.exclusion_window_hours, 10.0);
}

#[test]
fn invalid_override_is_rejected() {
    let overrides = OptionOverrides {
        caliper: Some(-0.25),
        ..OptionOverrides::default()
    };
    let err = resolve_options(None, overrides).unwrap_err();
    assert!(format!("{err:#}").contains("caliper"));
}

#[test]
fn malformed_config_names_the_file() {
    let file = config_file("{not json");
    let err = read_options(file.path()).unwrap_err();
    assert!(err.to_string().contains(&file.path().display().to_string()));
}
