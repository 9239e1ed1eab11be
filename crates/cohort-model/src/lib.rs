//! Data model for retrospective cohort construction.
//!
//! - **ids**: subject / admission / stay identifiers and the composite [`EntityKey`]
//! - **columns**: canonical column names of the criteria and admission frames
//! - **admission**: admission windows and the derived index time
//! - **label**: per-admission outcomes and the persisted [`Label`] row
//! - **matching**: propensity records and matched pairs
//! - **options**: tunable constants and column names
//! - **error**: the configuration / invariant error taxonomy
//!
//! The criteria tables themselves are Polars frames owned by
//! `cohort-transform`; this crate stays free of the dataframe stack.

pub mod admission;
pub mod columns;
pub mod error;
pub mod ids;
pub mod label;
pub mod matching;
pub mod options;

pub use admission::Admission;
pub use error::{CohortError, ConfigurationError, InvariantViolation, Result};
pub use ids::{AdmissionId, EntityKey, KeyPart, StayId, SubjectId};
pub use label::{Label, Outcome};
pub use matching::{Match, PropensityRecord, TreatmentGroup};
pub use options::{
    CohortOptions, ColumnMapping, FeatureOptions, LabelingOptions, MatchingOptions, StagePlan,
};
