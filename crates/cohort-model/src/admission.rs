use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::ids::{AdmissionId, SubjectId};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// A hospital admission window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub subject_id: SubjectId,
    pub admission_id: AdmissionId,
    pub admit_time: NaiveDateTime,
    pub discharge_time: NaiveDateTime,
}

impl Admission {
    pub fn key(&self) -> (SubjectId, AdmissionId) {
        (self.subject_id, self.admission_id)
    }

    /// Length of stay in hours.
    pub fn length_hours(&self) -> f64 {
        (self.discharge_time - self.admit_time).num_milliseconds() as f64 / MILLIS_PER_HOUR
    }

    /// Prediction index time: `admit_time + offset_hours`.
    ///
    /// An offset that leaves the representable calendar is an invalid option.
    pub fn index_time(&self, offset_hours: f64) -> Result<NaiveDateTime, ConfigurationError> {
        hours_to_delta(offset_hours)
            .and_then(|delta| self.admit_time.checked_add_signed(delta))
            .ok_or_else(|| ConfigurationError::InvalidOption {
                name: "index_offset_hours".to_string(),
                reason: format!(
                    "{offset_hours} hours after {} is out of range",
                    self.admit_time
                ),
            })
    }
}

fn hours_to_delta(hours: f64) -> Option<TimeDelta> {
    let millis = (hours * MILLIS_PER_HOUR).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    TimeDelta::try_milliseconds(millis as i64)
}
