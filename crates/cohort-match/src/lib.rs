//! Propensity score matching.
//!
//! - **logit**: clipped logit transform and population statistics
//! - **caliper**: greedy nearest-neighbour matching without replacement
//! - **summary**: per-group overlap of the transformed scores

pub mod caliper;
pub mod logit;
pub mod summary;

pub use caliper::{MatchReport, ScoredMatch, caliper_match, greedy_match};
pub use logit::{caliper_threshold, logit, mean, population_std, safe_logit};
pub use summary::{GroupOverlap, OverlapSummary, overlap_summary};
