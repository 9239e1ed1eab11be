//! End-to-end cohort runs over small hand-built sources.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use cohort_model::columns::{ADMISSION_ID, STAY_ID, SUBJECT_ID, TIMESTAMP};
use cohort_model::{Admission, AdmissionId, CohortOptions, StayId, SubjectId};
use cohort_transform::{AdmissionTable, CohortPipeline, CohortSources, Timeline};
use polars::prelude::*;

fn admit(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2130, 4, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn chart(day: u32, hours: i64) -> Option<NaiveDateTime> {
    Some(admit(day) + TimeDelta::hours(hours))
}

fn criteria() -> Timeline {
    // Subject 1, admission 11: shock at 16h. Admission 10 never meets the criteria.
    // Subject 2: shock at 3h, excluded. Subject 3: one criterion only.
    let df = df! {
        SUBJECT_ID => [1i64, 1, 2, 3],
        ADMISSION_ID => [11i64, 10, 20, 30],
        STAY_ID => [110i64, 100, 200, 300],
        TIMESTAMP => [chart(10, 16), chart(1, 20), chart(2, 3), chart(3, 20)],
        "criteria_1" => [true, true, true, false],
        "criteria_2" => [true, false, true, false],
        "criteria_3" => [false, false, true, true],
        "criteria_4" => [false, false, true, false],
    }
    .unwrap();
    Timeline::new("criteria", df).unwrap()
}

fn attribute(name: &str, column: &str, rows: &[(i64, i64)]) -> Timeline {
    let df = df! {
        SUBJECT_ID => rows.iter().map(|row| row.0).collect::<Vec<_>>(),
        ADMISSION_ID => rows.iter().map(|row| row.1).collect::<Vec<_>>(),
        column => vec![true; rows.len()],
    }
    .unwrap();
    Timeline::new(name, df).unwrap()
}

fn charted(name: &str, column: &str) -> Timeline {
    let df = df! {
        SUBJECT_ID => [1i64, 2],
        ADMISSION_ID => [11i64, 20],
        STAY_ID => [110i64, 200],
        TIMESTAMP => [chart(10, 16), chart(2, 3)],
        column => [true, true],
    }
    .unwrap();
    Timeline::new(name, df).unwrap()
}

fn admission(subject: i64, hadm: i64, day: u32, hours: i64) -> Admission {
    Admission {
        subject_id: SubjectId(subject),
        admission_id: AdmissionId(hadm),
        admit_time: admit(day),
        discharge_time: admit(day) + TimeDelta::hours(hours),
    }
}

fn admissions() -> Vec<Admission> {
    vec![
        admission(1, 10, 1, 72),
        admission(1, 11, 10, 72),
        admission(2, 20, 2, 72),
        admission(3, 30, 3, 72),
    ]
}

fn sources_with(admissions: &[Admission]) -> CohortSources {
    CohortSources {
        criteria: criteria(),
        infections: vec![
            attribute("icd9", "has_icd9_infection", &[(1, 11), (2, 20)]),
            attribute("notes", "has_note_infection", &[(3, 30)]),
        ],
        dysfunction: attribute(
            "dysfunction",
            "has_organ_dysfunction",
            &[(1, 11), (2, 20), (3, 30)],
        ),
        terminal_attributes: vec![
            charted("hypotension", "hypotension"),
            charted("fluid", "adequate_fluid"),
        ],
        admissions: AdmissionTable::from_admissions(admissions).unwrap(),
    }
}

fn sources() -> CohortSources {
    sources_with(&admissions())
}

#[test]
fn labels_one_admission_per_subject() {
    let run = CohortPipeline::new(CohortOptions::default())
        .run(sources())
        .unwrap();
    let labels: Vec<(i64, i64, bool)> = run
        .labels
        .iter()
        .map(|label| (label.subject_id.get(), label.admission_id.get(), label.label))
        .collect();
    assert_eq!(labels, vec![(1, 11, true), (3, 30, false)]);
    assert_eq!(run.labels[0].stay_id, Some(StayId(110)));
    assert_eq!(run.labels[0].index_time, admit(10) + TimeDelta::hours(12));
}

#[test]
fn summary_counts_every_step() {
    let run = CohortPipeline::new(CohortOptions::default())
        .run(sources())
        .unwrap();
    let summary = run.summary;
    assert_eq!(summary.criteria_records, 4);
    assert_eq!(summary.primary_flagged, 2);
    assert_eq!(summary.escalated_flagged, 2);
    assert_eq!(summary.terminal_flagged, 2);
    assert_eq!(summary.admissions_total, 4);
    assert_eq!(summary.admissions_attached, 4);
    assert_eq!(summary.excluded, 1);
    assert_eq!(summary.positive, 1);
    assert_eq!(summary.negative, 1);
    assert_eq!(summary.labeled(), 2);
}

#[test]
fn longer_window_turns_late_flag_into_exclusion() {
    let mut options = CohortOptions::default();
    options.labeling.exclusion_window_hours = 17.0;
    let run = CohortPipeline::new(options).run(sources()).unwrap();
    // Subject 1's latest admission is excluded; the earlier one survives.
    let subject_one: Vec<_> = run
        .labels
        .iter()
        .filter(|label| label.subject_id == SubjectId(1))
        .collect();
    assert_eq!(subject_one.len(), 1);
    assert_eq!(subject_one[0].admission_id, AdmissionId(10));
    assert!(!subject_one[0].label);
}

#[test]
fn short_admissions_are_not_labeled() {
    let mut rows = admissions();
    rows[3] = admission(3, 30, 3, 6);
    let run = CohortPipeline::new(CohortOptions::default())
        .run(sources_with(&rows))
        .unwrap();
    assert_eq!(run.summary.admissions_kept, 3);
    assert!(run.labels.iter().all(|label| label.subject_id != SubjectId(3)));
}

#[test]
fn subject_limit_restricts_the_run() {
    let run = CohortPipeline::new(CohortOptions::default())
        .with_subject_limit(Some(1))
        .run(sources())
        .unwrap();
    assert_eq!(run.labels.len(), 1);
    assert_eq!(run.labels[0].subject_id, SubjectId(1));
    assert_eq!(run.summary.admissions_total, 2);
}

#[test]
fn missing_infection_source_is_a_configuration_error() {
    let mut input = sources();
    input.infections.pop();
    let err = CohortPipeline::new(CohortOptions::default())
        .run(input)
        .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn invalid_options_are_rejected_before_any_work() {
    let mut options = CohortOptions::default();
    options.matching.caliper = f64::NAN;
    let err = CohortPipeline::new(options).run(sources()).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn out_of_range_index_offset_is_rejected() {
    let mut options = CohortOptions::default();
    options.labeling.index_offset_hours = 1e12;
    let err = CohortPipeline::new(options).run(sources()).unwrap_err();
    assert!(err.is_configuration());
}
