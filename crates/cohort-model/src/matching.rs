use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::SubjectId;

/// Exposure group of a scored subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentGroup {
    Treated,
    Untreated,
}

impl TreatmentGroup {
    pub fn from_indicator(treated: bool) -> Self {
        if treated {
            TreatmentGroup::Treated
        } else {
            TreatmentGroup::Untreated
        }
    }
}

impl fmt::Display for TreatmentGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreatmentGroup::Treated => f.write_str("treated"),
            TreatmentGroup::Untreated => f.write_str("untreated"),
        }
    }
}

/// A subject's propensity score, in (0, 1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropensityRecord {
    pub subject_id: SubjectId,
    pub score: f64,
    pub group: TreatmentGroup,
}

impl PropensityRecord {
    pub fn treated(subject_id: impl Into<SubjectId>, score: f64) -> Self {
        Self {
            subject_id: subject_id.into(),
            score,
            group: TreatmentGroup::Treated,
        }
    }

    pub fn untreated(subject_id: impl Into<SubjectId>, score: f64) -> Self {
        Self {
            subject_id: subject_id.into(),
            score,
            group: TreatmentGroup::Untreated,
        }
    }
}

/// A matched (treated, untreated) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Match {
    pub treated_id: SubjectId,
    pub untreated_id: SubjectId,
}
