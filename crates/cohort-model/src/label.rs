use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::ids::{AdmissionId, StayId, SubjectId};

/// Labeling decision for one admission.
///
/// Every admission reaching the labeler ends in exactly one of these; there is
/// no fourth state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The terminal condition occurred before the exclusion window closed.
    Excluded,
    /// The terminal condition first occurred at or after the window.
    Positive,
    /// The terminal condition never occurred.
    Negative,
}

impl Outcome {
    /// The boolean label, or `None` for excluded admissions.
    pub fn label(self) -> Option<bool> {
        match self {
            Outcome::Excluded => None,
            Outcome::Positive => Some(true),
            Outcome::Negative => Some(false),
        }
    }
}

/// One labeled admission; at most one per subject in a labeled cohort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub subject_id: SubjectId,
    pub admission_id: AdmissionId,
    pub stay_id: Option<StayId>,
    pub admit_time: NaiveDateTime,
    pub discharge_time: NaiveDateTime,
    pub index_time: NaiveDateTime,
    pub label: bool,
}
