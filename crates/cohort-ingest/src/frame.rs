//! Normalization of raw Polars frames into canonical cohort frames.
//!
//! Key, time, score and code columns are located through a [`ColumnMapping`]
//! and renamed to the canonical names of [`cohort_model::columns`]; every other
//! column of a criteria frame becomes a criterion. Numeric columns are read as
//! numbers (Float64), boolean and string columns as flags (Boolean). Null cells
//! stay null so that the merge and imputation steps can see them. Every cell is
//! parsed up front, so a bad value is reported with its table, column and row.

use chrono::NaiveDateTime;
use polars::prelude::{AnyValue, Column, DataFrame, DataType, IntoColumn, NamedFrom, Series};
use tracing::debug;

use cohort_common::{any_to_bool, any_to_datetime, any_to_f64, any_to_i64, any_to_string};
use cohort_model::columns::{
    ADMISSION_ID, ADMIT_TIME, DIAGNOSIS_CODE, DISCHARGE_TIME, STAY_ID, SUBJECT_ID, TIMESTAMP,
};
use cohort_model::{ColumnMapping, ConfigurationError, PropensityRecord, SubjectId, TreatmentGroup};

use crate::error::{IngestError, Result};

fn column<'a>(df: &'a DataFrame, table: &str, name: &str) -> Result<&'a Column> {
    df.column(name).map_err(|_| {
        ConfigurationError::MissingColumn {
            table: table.to_string(),
            column: name.to_string(),
        }
        .into()
    })
}

fn invalid(table: &str, column: &Column, row: usize, value: AnyValue<'_>) -> IngestError {
    IngestError::InvalidValue {
        table: table.to_string(),
        column: column.name().to_string(),
        row,
        value: any_to_string(value),
    }
}

/// Parse every cell; null cells are `None`.
fn parse_optional<T>(
    table: &str,
    column: &Column,
    parse: impl Fn(AnyValue<'_>) -> Option<T>,
) -> Result<Vec<Option<T>>> {
    (0..column.len())
        .map(|row| match column.get(row)? {
            AnyValue::Null => Ok(None),
            value => parse(value.clone())
                .map(Some)
                .ok_or_else(|| invalid(table, column, row, value)),
        })
        .collect()
}

/// Parse every cell; null cells are invalid.
fn parse_required<T>(
    table: &str,
    column: &Column,
    parse: impl Fn(AnyValue<'_>) -> Option<T>,
) -> Result<Vec<T>> {
    (0..column.len())
        .map(|row| {
            let value = column.get(row)?;
            parse(value.clone()).ok_or_else(|| invalid(table, column, row, value))
        })
        .collect()
}

fn is_numeric(dtype: &DataType) -> bool {
    dtype.is_integer() || dtype.is_float()
}

fn required_ids(table: &str, df: &DataFrame, source: &str, target: &str) -> Result<Column> {
    let ids = parse_required(table, column(df, table, source)?, any_to_i64)?;
    Ok(Series::new(target.into(), ids).into_column())
}

/// Canonical criteria frame of a raw criteria or attribute table.
///
/// Subject and admission columns are required. Stay and timestamp columns are
/// carried when the mapped columns are present; a null timestamp marks an
/// untimed record.
pub fn timeline_frame(df: &DataFrame, name: &str, mapping: &ColumnMapping) -> Result<DataFrame> {
    let mut columns = vec![
        required_ids(name, df, &mapping.subject_id, SUBJECT_ID)?,
        required_ids(name, df, &mapping.admission_id, ADMISSION_ID)?,
    ];
    if let Ok(stays) = df.column(&mapping.stay_id) {
        let stays = parse_optional(name, stays, any_to_i64)?;
        columns.push(Series::new(STAY_ID.into(), stays).into_column());
    }
    if let Ok(times) = df.column(&mapping.timestamp) {
        let times: Vec<Option<NaiveDateTime>> = parse_optional(name, times, any_to_datetime)?;
        columns.push(Series::new(TIMESTAMP.into(), times).into_column());
    }

    let keys = [
        &mapping.subject_id,
        &mapping.admission_id,
        &mapping.stay_id,
        &mapping.timestamp,
    ];
    for criterion in df.get_columns() {
        let criterion_name = criterion.name().clone();
        if keys.iter().any(|key| key.as_str() == criterion_name.as_str()) {
            continue;
        }
        let parsed = if is_numeric(criterion.dtype()) {
            Series::new(criterion_name, parse_optional(name, criterion, any_to_f64)?)
        } else {
            Series::new(criterion_name, parse_optional(name, criterion, any_to_bool)?)
        };
        columns.push(parsed.into_column());
    }
    let frame = DataFrame::new(columns)?;
    debug!(
        table = name,
        records = frame.height(),
        columns = frame.width(),
        "normalized criteria frame"
    );
    Ok(frame)
}

/// Canonical admission frame: subject, admission, admit and discharge time.
pub fn admissions_frame(df: &DataFrame, mapping: &ColumnMapping) -> Result<DataFrame> {
    const TABLE: &str = "admissions";
    let admits = parse_required(TABLE, column(df, TABLE, &mapping.admit_time)?, any_to_datetime)?;
    let discharges = parse_required(
        TABLE,
        column(df, TABLE, &mapping.discharge_time)?,
        any_to_datetime,
    )?;
    Ok(DataFrame::new(vec![
        required_ids(TABLE, df, &mapping.subject_id, SUBJECT_ID)?,
        required_ids(TABLE, df, &mapping.admission_id, ADMISSION_ID)?,
        Series::new(ADMIT_TIME.into(), admits).into_column(),
        Series::new(DISCHARGE_TIME.into(), discharges).into_column(),
    ])?)
}

/// Canonical diagnosis frame: subject, admission and diagnosis code.
///
/// Codes are kept as text; numeric-looking codes keep their digits.
pub fn diagnoses_frame(df: &DataFrame, mapping: &ColumnMapping) -> Result<DataFrame> {
    const TABLE: &str = "diagnoses";
    let codes = parse_required(TABLE, column(df, TABLE, &mapping.diagnosis_code)?, |value| {
        (!value.is_null()).then(|| any_to_string(value))
    })?;
    Ok(DataFrame::new(vec![
        required_ids(TABLE, df, &mapping.subject_id, SUBJECT_ID)?,
        required_ids(TABLE, df, &mapping.admission_id, ADMISSION_ID)?,
        Series::new(DIAGNOSIS_CODE.into(), codes).into_column(),
    ])?)
}

/// Build propensity records from a frame of scores and group indicators.
pub fn propensity_from_frame(
    df: &DataFrame,
    mapping: &ColumnMapping,
) -> Result<Vec<PropensityRecord>> {
    const TABLE: &str = "propensity scores";
    let subjects = parse_required(TABLE, column(df, TABLE, &mapping.subject_id)?, any_to_i64)?;
    let scores = parse_required(TABLE, column(df, TABLE, &mapping.score)?, any_to_f64)?;
    let groups = parse_required(TABLE, column(df, TABLE, &mapping.group)?, any_to_bool)?;
    Ok(subjects
        .into_iter()
        .zip(scores)
        .zip(groups)
        .map(|((subject, score), treated)| PropensityRecord {
            subject_id: SubjectId(subject),
            score,
            group: TreatmentGroup::from_indicator(treated),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_df(columns: Vec<Column>) -> DataFrame {
        DataFrame::new(columns).unwrap()
    }

    fn ints(name: &str, values: Vec<Option<i64>>) -> Column {
        Series::new(name.into(), values).into_column()
    }

    fn strs(name: &str, values: Vec<Option<&str>>) -> Column {
        Series::new(name.into(), values).into_column()
    }

    #[test]
    fn criteria_frame_gets_canonical_names_and_types() {
        let df = test_df(vec![
            ints("subject_id", vec![Some(1), Some(1)]),
            ints("hadm_id", vec![Some(10), Some(10)]),
            ints("icustay_id", vec![Some(100), None]),
            strs("charttime", vec![Some("2130-04-02 10:00:00"), None]),
            Series::new("hypotension".into(), vec![Some(true), None]).into_column(),
            ints("map", vec![Some(55), Some(60)]),
        ]);
        let frame = timeline_frame(&df, "hypotension", &ColumnMapping::default()).unwrap();
        let names: Vec<&str> = frame
            .get_column_names()
            .into_iter()
            .map(|name| name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![SUBJECT_ID, ADMISSION_ID, STAY_ID, TIMESTAMP, "hypotension", "map"]
        );
        let schema = frame.schema();
        assert!(matches!(schema.get(TIMESTAMP), Some(DataType::Datetime(_, None))));
        assert_eq!(schema.get("hypotension"), Some(&DataType::Boolean));
        assert_eq!(schema.get("map"), Some(&DataType::Float64));
        assert_eq!(frame.column(STAY_ID).unwrap().null_count(), 1);
        assert_eq!(frame.column(TIMESTAMP).unwrap().null_count(), 1);
        assert_eq!(frame.column("hypotension").unwrap().null_count(), 1);
    }

    #[test]
    fn attribute_frame_is_admission_keyed() {
        let df = test_df(vec![
            ints("subject_id", vec![Some(1)]),
            ints("hadm_id", vec![Some(10)]),
            strs("has_note_infection", vec![Some("yes")]),
        ]);
        let frame = timeline_frame(&df, "notes", &ColumnMapping::default()).unwrap();
        assert!(!frame.schema().contains(TIMESTAMP));
        let flags: Vec<Option<bool>> = frame
            .column("has_note_infection")
            .unwrap()
            .bool()
            .unwrap()
            .iter()
            .collect();
        assert_eq!(flags, vec![Some(true)]);
    }

    #[test]
    fn missing_key_column_is_a_configuration_error() {
        let df = test_df(vec![ints("subject_id", vec![Some(1)])]);
        let err = timeline_frame(&df, "notes", &ColumnMapping::default()).unwrap_err();
        assert!(matches!(err, IngestError::Cohort(ref e) if e.is_configuration()));
    }

    #[test]
    fn unparseable_flag_is_reported_with_its_row() {
        let df = test_df(vec![
            ints("subject_id", vec![Some(1), Some(2)]),
            ints("hadm_id", vec![Some(10), Some(20)]),
            strs("flag", vec![Some("true"), Some("maybe")]),
        ]);
        let err = timeline_frame(&df, "notes", &ColumnMapping::default()).unwrap_err();
        assert!(matches!(err, IngestError::InvalidValue { row: 1, .. }));
    }

    #[test]
    fn null_subject_is_invalid() {
        let df = test_df(vec![
            ints("subject_id", vec![Some(1), None]),
            ints("hadm_id", vec![Some(10), Some(20)]),
        ]);
        let err = timeline_frame(&df, "notes", &ColumnMapping::default()).unwrap_err();
        assert!(matches!(err, IngestError::InvalidValue { row: 1, .. }));
    }

    #[test]
    fn admissions_require_both_times() {
        let df = test_df(vec![
            ints("subject_id", vec![Some(1)]),
            ints("hadm_id", vec![Some(10)]),
            strs("admittime", vec![Some("2130-04-02 00:00:00")]),
            strs("dischtime", vec![Some("2130-04-05 06:30:00")]),
        ]);
        let frame = admissions_frame(&df, &ColumnMapping::default()).unwrap();
        assert_eq!(frame.height(), 1);
        assert!(matches!(frame.schema().get(DISCHARGE_TIME), Some(DataType::Datetime(_, None))));

        let df = test_df(vec![
            ints("subject_id", vec![Some(1)]),
            ints("hadm_id", vec![Some(10)]),
            strs("admittime", vec![Some("2130-04-02 00:00:00")]),
            strs("dischtime", vec![None]),
        ]);
        assert!(admissions_frame(&df, &ColumnMapping::default()).is_err());
    }

    #[test]
    fn diagnosis_codes_are_text() {
        let df = test_df(vec![
            ints("subject_id", vec![Some(1), Some(1)]),
            ints("hadm_id", vec![Some(10), Some(10)]),
            ints("icd9_code", vec![Some(4019), Some(25000)]),
        ]);
        let frame = diagnoses_frame(&df, &ColumnMapping::default()).unwrap();
        let codes: Vec<Option<&str>> = frame.column(DIAGNOSIS_CODE).unwrap().str().unwrap().iter().collect();
        assert_eq!(codes, vec![Some("4019"), Some("25000")]);
    }

    #[test]
    fn propensity_groups_from_indicator() {
        let df = test_df(vec![
            ints("subject_id", vec![Some(1), Some(2)]),
            Series::new("propensity_score".into(), vec![0.3, 0.7]).into_column(),
            ints("treated", vec![Some(1), Some(0)]),
        ]);
        let records = propensity_from_frame(&df, &ColumnMapping::default()).unwrap();
        assert_eq!(records[0].group, TreatmentGroup::Treated);
        assert_eq!(records[1].group, TreatmentGroup::Untreated);
        assert_eq!(records[1].score, 0.7);
    }
}
