//! Diagnosis features of a labeled cohort.
//!
//! Diagnoses of admissions discharged before a subject's index time are kept,
//! scored by information content `IC = log2(N / n)` (N cohort subjects, n of them
//! carrying the code), restricted to an IC band and counted per subject in two
//! time bins:
//!
//! - `RECENT_<code>`: diagnosed at most `recent_days` before the index time;
//! - `PRIOR_<code>`: diagnosed earlier than that.
//!
//! A diagnosis is timed at its admission's discharge.

use std::collections::BTreeSet;

use polars::prelude::*;
use tracing::{debug, info, info_span};

use cohort_model::columns::{
    ADMISSION_ID, ADMIT_TIME, DIAGNOSIS_CODE, DIAGNOSIS_TIME, DISCHARGE_TIME, INDEX_TIME,
    SUBJECT_ID,
};
use cohort_model::{ConfigurationError, FeatureOptions, Label};

use crate::error::Result;
use crate::frame::AdmissionTable;

/// Information content column of [`information_content`].
pub const IC: &str = "ic";
const PATIENTS: &str = "patients";
const RECENT: &str = "recent";
const MILLIS_PER_DAY: f64 = 86_400_000.0;

fn diagnosis_table(diagnoses: &DataFrame) -> Result<LazyFrame> {
    for column in [SUBJECT_ID, ADMISSION_ID, DIAGNOSIS_CODE] {
        if !diagnoses.schema().contains(column) {
            return Err(ConfigurationError::MissingColumn {
                table: "diagnoses".to_string(),
                column: column.to_string(),
            }
            .into());
        }
    }
    Ok(diagnoses.clone().lazy().select([
        col(SUBJECT_ID).strict_cast(DataType::Int64),
        col(ADMISSION_ID).strict_cast(DataType::Int64),
        col(DIAGNOSIS_CODE).cast(DataType::String),
    ]))
}

fn label_table(labels: &[Label]) -> Result<DataFrame> {
    let subjects: Vec<i64> = labels.iter().map(|label| label.subject_id.get()).collect();
    let index_times: Vec<_> = labels.iter().map(|label| label.index_time).collect();
    Ok(DataFrame::new(vec![
        Series::new(SUBJECT_ID.into(), subjects).into_column(),
        Series::new(INDEX_TIME.into(), index_times).into_column(),
    ])?)
}

fn inner_join(left: LazyFrame, right: LazyFrame, on: &[&str]) -> LazyFrame {
    let keys: Vec<Expr> = on.iter().map(|name| col(*name)).collect();
    let mut args = JoinArgs::new(JoinType::Inner);
    args.maintain_order = MaintainOrderJoin::Left;
    left.join(right, &keys, &keys, args)
}

/// Diagnoses of each labeled subject made before its index time.
///
/// Only admissions discharged strictly before the index time (and not before
/// they began) contribute. Columns: subject, admission, code, diagnosis time,
/// index time.
pub fn diagnoses_before_index(
    admissions: &AdmissionTable,
    diagnoses: &DataFrame,
    labels: &[Label],
) -> Result<DataFrame> {
    let windows = admissions.lazy().select([
        col(SUBJECT_ID),
        col(ADMISSION_ID),
        col(ADMIT_TIME),
        col(DISCHARGE_TIME),
    ]);
    let coded = inner_join(windows, diagnosis_table(diagnoses)?, &[SUBJECT_ID, ADMISSION_ID]);
    let dx = inner_join(coded, label_table(labels)?.lazy(), &[SUBJECT_ID])
        .filter(
            col(DISCHARGE_TIME)
                .lt(col(INDEX_TIME))
                .and(col(DISCHARGE_TIME).gt_eq(col(ADMIT_TIME))),
        )
        .select([
            col(SUBJECT_ID),
            col(ADMISSION_ID),
            col(DIAGNOSIS_CODE),
            col(DISCHARGE_TIME).alias(DIAGNOSIS_TIME),
            col(INDEX_TIME),
        ])
        .collect()?;
    debug!(
        diagnoses = diagnoses.height(),
        kept = dx.height(),
        "selected diagnoses before index time"
    );
    Ok(dx)
}

/// Information content of every code, ordered by code.
pub fn information_content(dx: &DataFrame, patients: usize) -> Result<DataFrame> {
    Ok(dx
        .clone()
        .lazy()
        .group_by([col(DIAGNOSIS_CODE)])
        .agg([col(SUBJECT_ID).n_unique().alias(PATIENTS)])
        .select([
            col(DIAGNOSIS_CODE),
            (lit(patients as f64) / col(PATIENTS).cast(DataType::Float64))
                .log(lit(2.0))
                .alias(IC),
        ])
        .sort([DIAGNOSIS_CODE], SortMultipleOptions::default())
        .collect()?)
}

/// Keep diagnoses whose code's IC lies within `[min_ic, max_ic]`.
pub fn filter_information_content(
    dx: &DataFrame,
    ic: &DataFrame,
    options: &FeatureOptions,
) -> Result<DataFrame> {
    let kept = inner_join(dx.clone().lazy(), ic.clone().lazy(), &[DIAGNOSIS_CODE])
        .filter(
            col(IC)
                .gt_eq(lit(options.min_ic))
                .and(col(IC).lt_eq(lit(options.max_ic))),
        )
        .drop(cols([IC]))
        .collect()?;
    debug!(
        diagnoses = dx.height(),
        kept = kept.height(),
        min_ic = options.min_ic,
        max_ic = options.max_ic,
        "filtered diagnoses by information content"
    );
    Ok(kept)
}

/// Per-subject diagnosis counts, one row per subject ordered by id.
///
/// Columns are `subject_id`, then `PRIOR_<code>` for every code, then
/// `RECENT_<code>`, codes in ascending order. A code a subject never had
/// counts 0.
pub fn diagnosis_features(dx: &DataFrame, options: &FeatureOptions) -> Result<DataFrame> {
    let codes: BTreeSet<String> = dx
        .column(DIAGNOSIS_CODE)?
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();
    let count = |code: &str, recent: bool, prefix: &str| {
        let bin = if recent { col(RECENT) } else { col(RECENT).not() };
        col(DIAGNOSIS_CODE)
            .eq(lit(code))
            .and(bin)
            .cast(DataType::Int64)
            .sum()
            .alias(format!("{prefix}_{code}"))
    };
    let counts: Vec<Expr> = codes
        .iter()
        .map(|code| count(code, false, "PRIOR"))
        .chain(codes.iter().map(|code| count(code, true, "RECENT")))
        .collect();

    let recent_millis = options.recent_days * MILLIS_PER_DAY;
    let features = dx
        .clone()
        .lazy()
        .with_column(
            (col(INDEX_TIME) - col(DIAGNOSIS_TIME))
                .dt()
                .total_milliseconds()
                .cast(DataType::Float64)
                .lt_eq(lit(recent_millis))
                .alias(RECENT),
        )
        .group_by([col(SUBJECT_ID)])
        .agg(counts)
        .sort([SUBJECT_ID], SortMultipleOptions::default())
        .collect()?;
    Ok(features)
}

/// Diagnosis feature matrix of a labeled cohort.
pub fn build_diagnosis_features(
    admissions: &AdmissionTable,
    diagnoses: &DataFrame,
    labels: &[Label],
    options: &FeatureOptions,
) -> Result<DataFrame> {
    let span = info_span!("diagnosis_features");
    let _guard = span.enter();
    options.validate()?;
    let dx = diagnoses_before_index(admissions, diagnoses, labels)?;
    let ic = information_content(&dx, labels.len())?;
    let selected = filter_information_content(&dx, &ic, options)?;
    let features = diagnosis_features(&selected, options)?;
    info!(
        subjects = features.height(),
        features = features.width().saturating_sub(1),
        "built diagnosis features"
    );
    Ok(features)
}
