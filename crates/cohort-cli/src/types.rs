use std::path::PathBuf;

use cohort_match::{MatchReport, OverlapSummary};
use cohort_model::Label;
use cohort_transform::PipelineSummary;

#[derive(Debug)]
pub struct LabelResult {
    pub output_dir: PathBuf,
    /// `None` on a dry run.
    pub labels_file: Option<PathBuf>,
    /// Written only when a diagnosis table was given and this is not a dry run.
    pub features_file: Option<PathBuf>,
    /// Subjects with diagnosis features, when a diagnosis table was given.
    pub feature_subjects: Option<usize>,
    pub labels: Vec<Label>,
    pub summary: PipelineSummary,
}

#[derive(Debug)]
pub struct MatchResult {
    pub output_dir: PathBuf,
    pub matches_file: Option<PathBuf>,
    pub report: MatchReport,
    pub overlap: OverlapSummary,
}
