//! Typed records to DataFrames.

use polars::prelude::{DataFrame, IntoColumn, NamedFrom, PolarsResult, Series};

use cohort_common::format_timestamp;
use cohort_match::MatchReport;
use cohort_model::columns::SUBJECT_ID;
use cohort_model::{ColumnMapping, Label};

/// One row per label: keys, admission window, index time and the outcome.
///
/// Key and time columns use the input column names from `mapping`.
pub fn labels_frame(labels: &[Label], mapping: &ColumnMapping) -> PolarsResult<DataFrame> {
    let subject: Vec<i64> = labels.iter().map(|l| l.subject_id.get()).collect();
    let admission: Vec<i64> = labels.iter().map(|l| l.admission_id.get()).collect();
    let stay: Vec<Option<i64>> = labels.iter().map(|l| l.stay_id.map(|id| id.get())).collect();
    let admit: Vec<String> = labels.iter().map(|l| format_timestamp(l.admit_time)).collect();
    let discharge: Vec<String> = labels
        .iter()
        .map(|l| format_timestamp(l.discharge_time))
        .collect();
    let index: Vec<String> = labels.iter().map(|l| format_timestamp(l.index_time)).collect();
    let label: Vec<bool> = labels.iter().map(|l| l.label).collect();

    DataFrame::new(vec![
        Series::new(mapping.subject_id.as_str().into(), subject).into_column(),
        Series::new(mapping.admission_id.as_str().into(), admission).into_column(),
        Series::new(mapping.stay_id.as_str().into(), stay).into_column(),
        Series::new(mapping.admit_time.as_str().into(), admit).into_column(),
        Series::new(mapping.discharge_time.as_str().into(), discharge).into_column(),
        Series::new("index_time".into(), index).into_column(),
        Series::new("label".into(), label).into_column(),
    ])
}

/// One row per match, in match order, with its logit distance.
pub fn matches_frame(report: &MatchReport) -> PolarsResult<DataFrame> {
    let treated: Vec<i64> = report
        .matches
        .iter()
        .map(|m| m.pair.treated_id.get())
        .collect();
    let untreated: Vec<i64> = report
        .matches
        .iter()
        .map(|m| m.pair.untreated_id.get())
        .collect();
    let distance: Vec<f64> = report.matches.iter().map(|m| m.distance).collect();

    DataFrame::new(vec![
        Series::new("treated_id".into(), treated).into_column(),
        Series::new("untreated_id".into(), untreated).into_column(),
        Series::new("distance".into(), distance).into_column(),
    ])
}

/// The diagnosis feature matrix with its subject column under the mapped name.
pub fn features_frame(features: &DataFrame, mapping: &ColumnMapping) -> PolarsResult<DataFrame> {
    let mut df = features.clone();
    if mapping.subject_id != SUBJECT_ID {
        df.rename(SUBJECT_ID, mapping.subject_id.as_str().into())?;
    }
    Ok(df)
}
