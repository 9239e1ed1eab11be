//! Configuration options for cohort construction and matching.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Input column names for keys, times and scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub subject_id: String,
    pub admission_id: String,
    pub stay_id: String,
    pub timestamp: String,
    pub admit_time: String,
    pub discharge_time: String,
    pub score: String,
    /// Truthy values mark the treated group.
    pub group: String,
    pub diagnosis_code: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            subject_id: "subject_id".to_string(),
            admission_id: "hadm_id".to_string(),
            stay_id: "icustay_id".to_string(),
            timestamp: "charttime".to_string(),
            admit_time: "admittime".to_string(),
            discharge_time: "dischtime".to_string(),
            score: "propensity_score".to_string(),
            group: "treated".to_string(),
            diagnosis_code: "icd9_code".to_string(),
        }
    }
}

/// Column vocabulary of the three derivation stages.
///
/// Defaults follow the sepsis / severe sepsis / septic shock definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagePlan {
    /// Criteria summed for the primary condition.
    pub criteria: Vec<String>,
    /// How many criteria must be met.
    pub min_criteria: usize,
    /// Any of these confirms the suspected source.
    pub infection_columns: Vec<String>,
    pub primary_column: String,
    /// Dysfunction attribute required for the escalated condition.
    pub dysfunction_column: String,
    pub escalated_column: String,
    /// Attributes required, together with the escalated flag, for the terminal condition.
    pub terminal_attributes: Vec<String>,
    pub terminal_column: String,
}

impl Default for StagePlan {
    fn default() -> Self {
        Self {
            criteria: (1..=4).map(|n| format!("criteria_{n}")).collect(),
            min_criteria: 2,
            infection_columns: vec![
                "has_icd9_infection".to_string(),
                "has_note_infection".to_string(),
            ],
            primary_column: "sepsis_status".to_string(),
            dysfunction_column: "has_organ_dysfunction".to_string(),
            escalated_column: "severe_sepsis_status".to_string(),
            terminal_attributes: vec!["hypotension".to_string(), "adequate_fluid".to_string()],
            terminal_column: "septic_shock".to_string(),
        }
    }
}

/// Timing rules for admission labeling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelingOptions {
    /// A terminal flag strictly before this many hours after admission excludes
    /// the admission; at or after it makes the admission positive.
    pub exclusion_window_hours: f64,
    /// Index time offset from admission.
    pub index_offset_hours: f64,
    /// Admissions shorter than this are filtered before labeling.
    pub min_admission_hours: f64,
}

impl Default for LabelingOptions {
    fn default() -> Self {
        Self {
            exclusion_window_hours: 15.0,
            index_offset_hours: 12.0,
            min_admission_hours: 12.0,
        }
    }
}

impl LabelingOptions {
    /// Largest magnitude accepted for an hour option: one hundred years.
    pub const MAX_HOURS: f64 = 24.0 * 365.0 * 100.0;

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, value) in [
            ("exclusion_window_hours", self.exclusion_window_hours),
            ("index_offset_hours", self.index_offset_hours),
            ("min_admission_hours", self.min_admission_hours),
        ] {
            if !value.is_finite() {
                return Err(invalid(name, format!("{value} is not finite")));
            }
            if value.abs() > Self::MAX_HOURS {
                return Err(invalid(
                    name,
                    format!("{value} exceeds {} hours", Self::MAX_HOURS),
                ));
            }
        }
        Ok(())
    }
}

/// Diagnosis history features of a labeled cohort.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureOptions {
    /// Codes whose information content falls outside `[min_ic, max_ic]` are dropped.
    pub min_ic: f64,
    pub max_ic: f64,
    /// Diagnoses at most this many days before the index time count as recent.
    pub recent_days: f64,
}

impl Default for FeatureOptions {
    fn default() -> Self {
        Self {
            min_ic: 4.0,
            max_ic: 9.0,
            recent_days: 30.44 * 6.0,
        }
    }
}

impl FeatureOptions {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.min_ic.is_finite() || !self.max_ic.is_finite() || self.min_ic > self.max_ic {
            return Err(invalid(
                "features.ic",
                format!("[{}, {}] must be an ordered, finite interval", self.min_ic, self.max_ic),
            ));
        }
        if !self.recent_days.is_finite() || self.recent_days < 0.0 {
            return Err(invalid(
                "features.recent_days",
                format!("{} must be a finite, non-negative number", self.recent_days),
            ));
        }
        Ok(())
    }
}

/// Caliper matching parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingOptions {
    /// Multiple of the logit standard deviation allowed as match distance.
    pub caliper: f64,
    /// Scores are clipped to `[clip_low, clip_high]` before the logit.
    pub clip_low: f64,
    pub clip_high: f64,
}

impl Default for MatchingOptions {
    fn default() -> Self {
        Self {
            caliper: 0.25,
            clip_low: 0.025,
            clip_high: 0.975,
        }
    }
}

impl MatchingOptions {
    #[must_use]
    pub fn with_caliper(mut self, caliper: f64) -> Self {
        self.caliper = caliper;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.caliper.is_finite() || self.caliper < 0.0 {
            return Err(invalid(
                "caliper",
                format!("{} must be a finite, non-negative number", self.caliper),
            ));
        }
        let in_unit = |v: f64| v > 0.0 && v < 1.0;
        if !in_unit(self.clip_low) || !in_unit(self.clip_high) || self.clip_low > self.clip_high {
            return Err(invalid(
                "clip",
                format!(
                    "[{}, {}] must be an ordered interval inside (0, 1)",
                    self.clip_low, self.clip_high
                ),
            ));
        }
        Ok(())
    }
}

/// All options of a cohort run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortOptions {
    pub columns: ColumnMapping,
    pub stages: StagePlan,
    pub labeling: LabelingOptions,
    pub matching: MatchingOptions,
    pub features: FeatureOptions,
}

impl CohortOptions {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.labeling.validate()?;
        self.matching.validate()?;
        self.features.validate()?;
        if self.stages.criteria.is_empty() {
            return Err(invalid("stages.criteria", "at least one criterion is required"));
        }
        if self.stages.infection_columns.is_empty() {
            return Err(invalid(
                "stages.infection_columns",
                "at least one infection column is required",
            ));
        }
        Ok(())
    }
}

fn invalid(name: &str, reason: impl Into<String>) -> ConfigurationError {
    ConfigurationError::InvalidOption {
        name: name.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(CohortOptions::default().validate().is_ok());
    }

    #[test]
    fn negative_caliper_is_rejected() {
        let options = MatchingOptions::default().with_caliper(-0.1);
        assert!(matches!(
            options.validate(),
            Err(ConfigurationError::InvalidOption { .. })
        ));
    }

    #[test]
    fn inverted_clip_is_rejected() {
        let options = MatchingOptions {
            clip_low: 0.9,
            clip_high: 0.1,
            ..MatchingOptions::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn huge_index_offset_is_rejected() {
        let options = CohortOptions {
            labeling: LabelingOptions {
                index_offset_hours: 1e12,
                ..LabelingOptions::default()
            },
            ..CohortOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ConfigurationError::InvalidOption { ref name, .. }) if name == "index_offset_hours"
        ));
    }

    #[test]
    fn century_long_offsets_are_still_accepted() {
        let options = LabelingOptions {
            index_offset_hours: -LabelingOptions::MAX_HOURS,
            min_admission_hours: LabelingOptions::MAX_HOURS,
            ..LabelingOptions::default()
        };
        assert!(options.validate().is_ok());
    }

    #[test]
    fn inverted_ic_bounds_are_rejected() {
        let options = FeatureOptions {
            min_ic: 9.0,
            max_ic: 4.0,
            ..FeatureOptions::default()
        };
        assert!(options.validate().is_err());
        assert!(FeatureOptions::default().validate().is_ok());
    }
}
