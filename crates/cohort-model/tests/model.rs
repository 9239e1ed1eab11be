//! Tests for cohort-model types.

use chrono::NaiveDate;
use cohort_model::{
    CohortOptions, EntityKey, KeyPart, Label, Outcome, StayId, SubjectId, TreatmentGroup,
    columns,
};

#[test]
fn outcome_maps_to_label() {
    assert_eq!(Outcome::Excluded.label(), None);
    assert_eq!(Outcome::Positive.label(), Some(true));
    assert_eq!(Outcome::Negative.label(), Some(false));
}

#[test]
fn entity_key_orders_by_subject_then_admission_then_stay() {
    let a = EntityKey::new(1, 20);
    let b = EntityKey::new(1, 20).with_stay(5);
    let c = EntityKey::new(2, 10);
    assert!(a < b);
    assert!(b < c);
    assert_eq!(b.stay_id, Some(StayId(5)));
    assert_eq!(b.to_string(), "1/20/5");
}

#[test]
fn group_from_indicator() {
    assert_eq!(TreatmentGroup::from_indicator(true), TreatmentGroup::Treated);
    assert_eq!(
        TreatmentGroup::from_indicator(false),
        TreatmentGroup::Untreated
    );
}

#[test]
fn options_deserialize_with_partial_overrides() {
    let json = r#"{ "matching": { "caliper": 0.1 }, "labeling": { "exclusion_window_hours": 6 } }"#;
    let options: CohortOptions = serde_json::from_str(json).expect("deserialize options");
    assert_eq!(options.matching.caliper, 0.1);
    assert_eq!(options.matching.clip_low, 0.025);
    assert_eq!(options.labeling.exclusion_window_hours, 6.0);
    assert_eq!(options.labeling.index_offset_hours, 12.0);
    assert_eq!(options.columns.admission_id, "hadm_id");
    assert_eq!(options.stages.min_criteria, 2);
}

#[test]
fn label_serializes() {
    let time = NaiveDate::from_ymd_opt(2130, 4, 2)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap();
    let label = Label {
        subject_id: SubjectId(3),
        admission_id: 30.into(),
        stay_id: Some(StayId(300)),
        admit_time: time,
        discharge_time: time,
        index_time: time,
        label: true,
    };
    let json = serde_json::to_string(&label).expect("serialize label");
    let round: Label = serde_json::from_str(&json).expect("deserialize label");
    assert_eq!(round, label);
}

#[test]
fn key_parts_name_canonical_columns() {
    assert_eq!(KeyPart::Admission.as_str(), columns::ADMISSION_ID);
    assert_eq!(KeyPart::from_column(columns::STAY_ID), Some(KeyPart::Stay));
    assert_eq!(KeyPart::from_column("icustay_id"), None);
    assert!(KeyPart::CHART.iter().all(|part| KeyPart::from_column(part.as_str()) == Some(*part)));
}

#[test]
fn options_read_feature_bounds() {
    let json = r#"{ "features": { "max_ic": 8 } }"#;
    let options: CohortOptions = serde_json::from_str(json).expect("deserialize options");
    assert_eq!(options.features.min_ic, 4.0);
    assert_eq!(options.features.max_ic, 8.0);
    assert!((options.features.recent_days - 182.64).abs() < 1e-9);
    assert_eq!(options.columns.diagnosis_code, "icd9_code");
}
