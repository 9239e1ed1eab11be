//! Admission-level outcome labeling.
//!
//! With `w` the exclusion window (15h by default), measured from admission:
//!
//! - terminal flag true at any time `< w`: the admission is **excluded** and
//!   none of its records are considered further;
//! - otherwise, terminal flag true at any time `>= w`: **positive**;
//! - otherwise (never true): **negative**.
//!
//! Of a subject's surviving admissions only the one with the latest admit time
//! is kept.

use std::collections::BTreeMap;

use tracing::{info, info_span};

use cohort_model::{InvariantViolation, Label, LabelingOptions, Outcome, SubjectId};

use crate::admissions::{AdmissionTimeline, attach_admissions};
use crate::error::Result;
use crate::frame::{AdmissionTable, Timeline};

/// Decide the outcome of one admission.
///
/// A flagged event whose time cannot be placed on either side of the window
/// (untimed or NaN) means an upstream guarantee was broken and aborts the run.
pub fn decide_outcome(
    admission: &AdmissionTimeline,
    exclusion_window_hours: f64,
) -> std::result::Result<Outcome, InvariantViolation> {
    let mut before_window = false;
    let mut after_window = false;
    for event in admission.events.iter().filter(|event| event.flag) {
        match event.relative_time {
            Some(hours) if hours < exclusion_window_hours => before_window = true,
            Some(hours) if hours >= exclusion_window_hours => after_window = true,
            _ => {
                return Err(InvariantViolation::UnclassifiedAdmission {
                    subject_id: admission.subject_id(),
                    admission_id: admission.admission_id(),
                });
            }
        }
    }
    Ok(match (before_window, after_window) {
        (true, _) => Outcome::Excluded,
        (false, true) => Outcome::Positive,
        (false, false) => Outcome::Negative,
    })
}

/// Decide every admission, preserving order.
pub fn classify_admissions(
    admissions: Vec<AdmissionTimeline>,
    options: &LabelingOptions,
) -> Result<Vec<(AdmissionTimeline, Outcome)>> {
    admissions
        .into_iter()
        .map(|admission| {
            let outcome = decide_outcome(&admission, options.exclusion_window_hours)?;
            Ok((admission, outcome))
        })
        .collect()
}

/// Keep each subject's latest surviving admission and build its label.
///
/// Excluded admissions are discarded first. Equal admit times keep the admission
/// seen first. Labels are ordered by subject id.
pub fn reduce_to_latest(classified: Vec<(AdmissionTimeline, Outcome)>) -> Vec<Label> {
    let mut latest: BTreeMap<SubjectId, (AdmissionTimeline, bool)> = BTreeMap::new();
    for (admission, outcome) in classified {
        let Some(label) = outcome.label() else {
            continue;
        };
        match latest.get(&admission.subject_id()) {
            Some((kept, _)) if kept.admission.admit_time >= admission.admission.admit_time => {}
            _ => {
                latest.insert(admission.subject_id(), (admission, label));
            }
        }
    }
    latest
        .into_values()
        .map(|(admission, label)| Label {
            subject_id: admission.subject_id(),
            admission_id: admission.admission_id(),
            stay_id: admission.first_stay(),
            admit_time: admission.admission.admit_time,
            discharge_time: admission.admission.discharge_time,
            index_time: admission.index_time,
            label,
        })
        .collect()
}

/// Label a terminal-flag timeline: one label per retained subject.
pub fn label_admissions(
    timeline: &Timeline,
    admissions: &AdmissionTable,
    flag_column: &str,
    options: &LabelingOptions,
) -> Result<Vec<Label>> {
    let span = info_span!("label_admissions", flag_column);
    let _guard = span.enter();
    let attached = attach_admissions(timeline, admissions, flag_column, options)?;
    let classified = classify_admissions(attached, options)?;
    let labels = reduce_to_latest(classified);
    info!(
        labels = labels.len(),
        positive = labels.iter().filter(|label| label.label).count(),
        "labeled admissions"
    );
    Ok(labels)
}
