//! Logit scale and population statistics.

use cohort_model::MatchingOptions;

/// `ln(p / (1 - p))`.
pub fn logit(probability: f64) -> f64 {
    (probability / (1.0 - probability)).ln()
}

/// Logit of the score clipped to `[clip_low, clip_high]`.
///
/// The clip keeps extreme scores finite; it is applied the same way to both
/// groups and to the threshold population.
pub fn safe_logit(score: f64, options: &MatchingOptions) -> f64 {
    logit(score.clamp(options.clip_low, options.clip_high))
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population (not sample) standard deviation; `None` for an empty slice.
pub fn population_std(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance =
        values.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Maximum match distance: `caliper` population standard deviations of all logits.
pub fn caliper_threshold(logits: &[f64], caliper: f64) -> f64 {
    population_std(logits).unwrap_or(0.0) * caliper
}
