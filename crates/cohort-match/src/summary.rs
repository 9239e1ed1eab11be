//! Overlap of treated and untreated score distributions on the logit scale.

use serde::Serialize;

use cohort_model::{MatchingOptions, PropensityRecord, Result, TreatmentGroup};

use crate::logit::{mean, population_std, safe_logit};

/// Distribution of one group's clipped logits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupOverlap {
    pub group: TreatmentGroup,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl GroupOverlap {
    fn from_logits(group: TreatmentGroup, logits: &[f64]) -> Self {
        Self {
            group,
            count: logits.len(),
            mean: mean(logits),
            std: population_std(logits),
            min: logits.iter().copied().reduce(f64::min),
            max: logits.iter().copied().reduce(f64::max),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlapSummary {
    pub treated: GroupOverlap,
    pub untreated: GroupOverlap,
}

impl OverlapSummary {
    /// Shared logit range of the two groups, if they overlap at all.
    pub fn common_support(&self) -> Option<(f64, f64)> {
        let low = self.treated.min?.max(self.untreated.min?);
        let high = self.treated.max?.min(self.untreated.max?);
        (low <= high).then_some((low, high))
    }
}

/// Per-group count, mean, population std, min and max of the clipped logits.
pub fn overlap_summary(
    records: &[PropensityRecord],
    options: &MatchingOptions,
) -> Result<OverlapSummary> {
    options.validate()?;
    let logits_of = |group: TreatmentGroup| -> Vec<f64> {
        records
            .iter()
            .filter(|record| record.group == group)
            .map(|record| safe_logit(record.score, options))
            .collect()
    };
    Ok(OverlapSummary {
        treated: GroupOverlap::from_logits(
            TreatmentGroup::Treated,
            &logits_of(TreatmentGroup::Treated),
        ),
        untreated: GroupOverlap::from_logits(
            TreatmentGroup::Untreated,
            &logits_of(TreatmentGroup::Untreated),
        ),
    })
}
