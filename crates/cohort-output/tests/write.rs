//! Writing label and match tables to disk.

use chrono::NaiveDate;
use cohort_match::{MatchReport, ScoredMatch};
use cohort_model::{AdmissionId, ColumnMapping, Label, Match, SubjectId};
use cohort_output::{LABELS_FILE, write_labels, write_matches};

fn label(subject: i64, positive: bool) -> Label {
    let at = NaiveDate::from_ymd_opt(2130, 4, 2)
        .unwrap()
        .and_hms_opt(6, 30, 0)
        .unwrap();
    Label {
        subject_id: SubjectId(subject),
        admission_id: AdmissionId(subject * 10),
        stay_id: None,
        admit_time: at,
        discharge_time: at,
        index_time: at,
        label: positive,
    }
}

#[test]
fn writes_labels_with_header_and_blank_stays() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_labels(
        dir.path(),
        &[label(1, true), label(2, false)],
        &ColumnMapping::default(),
    )
    .unwrap();
    assert_eq!(path, dir.path().join(LABELS_FILE));

    let text = std::fs::read_to_string(path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "subject_id,hadm_id,icustay_id,admittime,dischtime,index_time,label"
    );
    assert_eq!(
        lines[1],
        "1,10,,2130-04-02 06:30:00,2130-04-02 06:30:00,2130-04-02 06:30:00,true"
    );
    assert_eq!(lines.len(), 3);
}

#[test]
fn writes_matches_into_nested_directory() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("run").join("matching");
    let report = MatchReport {
        matches: vec![ScoredMatch {
            pair: Match {
                treated_id: SubjectId(1),
                untreated_id: SubjectId(5),
            },
            distance: 0.5,
        }],
        threshold: 1.0,
        treated: 1,
        untreated: 1,
    };
    let path = write_matches(&out, &report).unwrap();
    let text = std::fs::read_to_string(path).unwrap();
    assert_eq!(text.lines().collect::<Vec<_>>(), vec!["treated_id,untreated_id,distance", "1,5,0.5"]);
}
