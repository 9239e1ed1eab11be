//! Greedy caliper matching without replacement.
//!
//! Treated subjects are processed in input order; each takes the nearest
//! still-unmatched untreated subject on the logit scale, provided the distance
//! is within the caliper threshold. Matched controls leave the pool for good.
//! The algorithm is greedy, so a different treated order can give a different
//! match set.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, info_span};

use cohort_model::{
    ConfigurationError, InvariantViolation, Match, MatchingOptions, PropensityRecord, Result,
    SubjectId, TreatmentGroup,
};

use crate::logit::{caliper_threshold, safe_logit};

/// A match and the logit distance it was accepted at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredMatch {
    #[serde(flatten)]
    pub pair: Match,
    pub distance: f64,
}

/// Result of a matching run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchReport {
    pub matches: Vec<ScoredMatch>,
    /// Largest distance a match may have.
    pub threshold: f64,
    pub treated: usize,
    pub untreated: usize,
}

impl MatchReport {
    fn empty() -> Self {
        Self {
            matches: Vec::new(),
            threshold: 0.0,
            treated: 0,
            untreated: 0,
        }
    }

    pub fn pairs(&self) -> Vec<Match> {
        self.matches.iter().map(|scored| scored.pair).collect()
    }

    /// Treated subjects left without a control.
    pub fn unmatched_treated(&self) -> usize {
        self.treated - self.matches.len()
    }
}

/// Greedy nearest-neighbour matching over logits.
///
/// `pool` is consumed: each chosen control is removed before the next treated
/// subject is considered. Among equally distant controls the one earliest in
/// the pool wins.
pub fn greedy_match(
    treated: &[(SubjectId, f64)],
    mut pool: Vec<(SubjectId, f64)>,
    threshold: f64,
) -> Vec<ScoredMatch> {
    let mut matches = Vec::new();
    for &(treated_id, treated_logit) in treated {
        let mut best: Option<(usize, f64)> = None;
        for (idx, &(_, control_logit)) in pool.iter().enumerate() {
            let distance = (treated_logit - control_logit).abs();
            if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                best = Some((idx, distance));
            }
        }
        match best {
            Some((idx, distance)) if distance <= threshold => {
                let (untreated_id, _) = pool.remove(idx);
                matches.push(ScoredMatch {
                    pair: Match {
                        treated_id,
                        untreated_id,
                    },
                    distance,
                });
            }
            _ => debug!(remaining = pool.len(), "treated subject left unmatched"),
        }
    }
    matches
}

/// Match treated to untreated subjects within `caliper` logit standard deviations.
///
/// Scores must be probabilities and subject ids unique. Empty input, or input
/// with only one group, gives no matches.
pub fn caliper_match(records: &[PropensityRecord], options: &MatchingOptions) -> Result<MatchReport> {
    let span = info_span!("caliper_match", caliper = options.caliper);
    let _guard = span.enter();
    options.validate()?;
    validate_records(records)?;
    if records.is_empty() {
        return Ok(MatchReport::empty());
    }

    let logits: Vec<f64> = records
        .iter()
        .map(|record| safe_logit(record.score, options))
        .collect();
    let threshold = caliper_threshold(&logits, options.caliper);

    let mut treated = Vec::new();
    let mut pool = Vec::new();
    for (record, logit) in records.iter().zip(&logits) {
        match record.group {
            TreatmentGroup::Treated => treated.push((record.subject_id, *logit)),
            TreatmentGroup::Untreated => pool.push((record.subject_id, *logit)),
        }
    }
    let (treated_count, untreated_count) = (treated.len(), pool.len());
    let matches = greedy_match(&treated, pool, threshold);
    verify(&matches, threshold)?;

    info!(
        treated = treated_count,
        untreated = untreated_count,
        matched = matches.len(),
        threshold,
        "matching complete"
    );
    Ok(MatchReport {
        matches,
        threshold,
        treated: treated_count,
        untreated: untreated_count,
    })
}

fn validate_records(records: &[PropensityRecord]) -> std::result::Result<(), ConfigurationError> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !record.score.is_finite() || !(0.0..=1.0).contains(&record.score) {
            return Err(ConfigurationError::InvalidScore {
                subject_id: record.subject_id,
                score: record.score,
            });
        }
        if !seen.insert(record.subject_id) {
            return Err(ConfigurationError::DuplicateId {
                table: "propensity scores".to_string(),
                subject_id: record.subject_id,
            });
        }
    }
    Ok(())
}

fn verify(matches: &[ScoredMatch], threshold: f64) -> std::result::Result<(), InvariantViolation> {
    let mut used = HashSet::with_capacity(matches.len());
    for scored in matches {
        if !used.insert(scored.pair.untreated_id) {
            return Err(InvariantViolation::ReusedControl {
                subject_id: scored.pair.untreated_id,
            });
        }
        if scored.distance > threshold {
            return Err(InvariantViolation::DistanceAboveThreshold {
                distance: scored.distance,
                threshold,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(matches: &[ScoredMatch]) -> Vec<(i64, i64)> {
        matches
            .iter()
            .map(|m| (m.pair.treated_id.get(), m.pair.untreated_id.get()))
            .collect()
    }

    #[test]
    fn worked_example_yields_one_match() {
        let treated = [(SubjectId(1), 0.5), (SubjectId(2), 1.2), (SubjectId(3), -0.3)];
        let pool = vec![(SubjectId(10), 0.52), (SubjectId(11), 1.0)];
        let matches = greedy_match(&treated, pool, 0.15);
        assert_eq!(ids(&matches), vec![(1, 10)]);
        assert!((matches[0].distance - 0.02).abs() < 1e-12);
    }

    #[test]
    fn equal_distances_take_the_first_pool_member() {
        let treated = [(SubjectId(1), 0.0)];
        let pool = vec![(SubjectId(10), 0.1), (SubjectId(11), -0.1), (SubjectId(12), 0.1)];
        assert_eq!(ids(&greedy_match(&treated, pool, 1.0)), vec![(1, 10)]);
    }

    #[test]
    fn treated_order_changes_the_result() {
        let pool = vec![(SubjectId(10), 0.0), (SubjectId(11), 0.5)];
        let forward = [(SubjectId(1), 0.1), (SubjectId(2), 0.0)];
        let backward = [(SubjectId(2), 0.0), (SubjectId(1), 0.1)];
        assert_eq!(ids(&greedy_match(&forward, pool.clone(), 0.2)), vec![(1, 10)]);
        assert_eq!(ids(&greedy_match(&backward, pool, 0.2)), vec![(2, 10)]);
    }

    #[test]
    fn distance_at_threshold_is_accepted() {
        let treated = [(SubjectId(1), 0.0)];
        let pool = vec![(SubjectId(10), 0.25)];
        assert_eq!(greedy_match(&treated, pool, 0.25).len(), 1);
    }

    #[test]
    fn empty_input_is_empty_report() {
        let report = caliper_match(&[], &MatchingOptions::default()).unwrap();
        assert!(report.matches.is_empty());
        assert_eq!(report.unmatched_treated(), 0);
    }

    #[test]
    fn single_group_has_no_matches() {
        let records = [PropensityRecord::treated(1, 0.4), PropensityRecord::treated(2, 0.6)];
        let report = caliper_match(&records, &MatchingOptions::default()).unwrap();
        assert!(report.matches.is_empty());
        assert_eq!(report.unmatched_treated(), 2);
    }

    #[test]
    fn duplicate_subject_is_rejected() {
        let records = [PropensityRecord::treated(1, 0.4), PropensityRecord::untreated(1, 0.6)];
        let err = caliper_match(&records, &MatchingOptions::default()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn out_of_range_score_is_rejected() {
        for score in [f64::NAN, -0.1, 1.5] {
            let records = [PropensityRecord::treated(1, score)];
            let err = caliper_match(&records, &MatchingOptions::default()).unwrap_err();
            assert!(err.is_configuration());
        }
    }

    #[test]
    fn reused_control_is_an_invariant_violation() {
        let pair = Match {
            treated_id: SubjectId(1),
            untreated_id: SubjectId(10),
        };
        let matches = [
            ScoredMatch { pair, distance: 0.0 },
            ScoredMatch { pair, distance: 0.0 },
        ];
        assert!(matches!(
            verify(&matches, 1.0),
            Err(InvariantViolation::ReusedControl { .. })
        ));
    }
}
