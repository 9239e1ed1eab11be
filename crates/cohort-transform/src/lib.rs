//! Cohort derivation: from raw criteria sources to one label per subject.
//!
//! Every table is carried as a Polars frame ([`Timeline`], [`AdmissionTable`]);
//! typed rows only appear at the labeling boundary.
//!
//! - **frame**: canonical criteria and admission frames
//! - **merge**: outer joins of time-indexed sources
//! - **stages**: boolean stage rules (primary, escalated, terminal)
//! - **impute**: per-stay last-observation-carried-forward
//! - **admissions**: admission filtering and attachment of admission windows
//! - **labels**: exclusion / positive / negative decisions and subject reduction
//! - **features**: diagnosis history features of the labeled cohort
//! - **pipeline**: the end-to-end run

pub mod admissions;
mod error;
pub mod features;
pub mod frame;
pub mod impute;
pub mod labels;
pub mod merge;
pub mod pipeline;
pub mod stages;

pub use admissions::{
    AdmissionTimeline, ChartEvent, attach_admissions, development_subjects, filter_admissions,
    retain_subjects,
};
pub use error::{Result, TransformError};
pub use features::{
    build_diagnosis_features, diagnoses_before_index, diagnosis_features,
    filter_information_content, information_content,
};
pub use frame::{AdmissionTable, ColumnKind, Timeline};
pub use impute::impute;
pub use labels::{classify_admissions, decide_outcome, label_admissions, reduce_to_latest};
pub use merge::{join_attributes, merge_sources};
pub use pipeline::{CohortPipeline, CohortRun, CohortSources, PipelineSummary};
pub use stages::{
    Condition, Stage, evaluate_stage, summarize_escalated, summarize_primary, summarize_terminal,
};
