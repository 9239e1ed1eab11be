//! End-to-end cohort run: raw sources to one label per subject.

use serde::Serialize;
use tracing::{info, info_span};

use cohort_model::{CohortOptions, Label, SubjectId};

use crate::admissions::{
    attach_admissions, development_subjects, filter_admissions, retain_subjects, subject_in,
};
use crate::error::Result;
use crate::frame::{AdmissionTable, Timeline};
use crate::labels::{classify_admissions, reduce_to_latest};
use crate::merge::join_attributes;
use crate::stages::{summarize_escalated, summarize_primary, summarize_terminal};

/// Raw inputs of a cohort run.
#[derive(Debug, Clone)]
pub struct CohortSources {
    /// Time-indexed criteria (stage A).
    pub criteria: Timeline,
    /// Admission-level infection evidence, outer-joined together before stage A.
    pub infections: Vec<Timeline>,
    /// Admission-level dysfunction attribute (stage B).
    pub dysfunction: Timeline,
    /// Stay-level timed attributes (stage C), e.g. hypotension and fluid.
    pub terminal_attributes: Vec<Timeline>,
    pub admissions: AdmissionTable,
}

/// Record counts of each step of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    pub criteria_records: usize,
    pub primary_records: usize,
    pub primary_flagged: usize,
    pub escalated_records: usize,
    pub escalated_flagged: usize,
    pub terminal_records: usize,
    pub terminal_flagged: usize,
    pub admissions_total: usize,
    pub admissions_kept: usize,
    pub admissions_attached: usize,
    pub excluded: usize,
    pub positive: usize,
    pub negative: usize,
}

impl PipelineSummary {
    pub fn labeled(&self) -> usize {
        self.positive + self.negative
    }
}

/// Labels of a run and how they were reached.
#[derive(Debug, Clone)]
pub struct CohortRun {
    pub labels: Vec<Label>,
    pub summary: PipelineSummary,
}

#[derive(Debug, Clone, Default)]
pub struct CohortPipeline {
    options: CohortOptions,
    subject_limit: Option<usize>,
}

impl CohortPipeline {
    pub fn new(options: CohortOptions) -> Self {
        Self {
            options,
            subject_limit: None,
        }
    }

    /// Restrict the run to the `limit` smallest subject ids of the criteria table.
    #[must_use]
    pub fn with_subject_limit(mut self, limit: Option<usize>) -> Self {
        self.subject_limit = limit;
        self
    }

    pub fn options(&self) -> &CohortOptions {
        &self.options
    }

    pub fn run(&self, sources: CohortSources) -> Result<CohortRun> {
        let span = info_span!("cohort_run");
        let _guard = span.enter();
        self.options.validate()?;
        let plan = &self.options.stages;
        let labeling = &self.options.labeling;

        let sources = match self.subject_limit {
            Some(limit) => restrict(sources, limit)?,
            None => sources,
        };
        let mut summary = PipelineSummary {
            criteria_records: sources.criteria.len(),
            admissions_total: sources.admissions.len(),
            ..PipelineSummary::default()
        };

        let infections = fold_attributes(&sources.infections, "infections")?;
        let primary = summarize_primary(&sources.criteria, &infections, plan)?;
        summary.primary_records = primary.len();
        summary.primary_flagged = primary.count_flagged(&plan.primary_column)?;

        let escalated = summarize_escalated(&primary, &sources.dysfunction, plan)?;
        summary.escalated_records = escalated.len();
        summary.escalated_flagged = escalated.count_flagged(&plan.escalated_column)?;

        let terminal = summarize_terminal(&escalated, &sources.terminal_attributes, plan)?;
        summary.terminal_records = terminal.len();
        summary.terminal_flagged = terminal.count_flagged(&plan.terminal_column)?;

        let admissions = filter_admissions(&sources.admissions, labeling.min_admission_hours)?;
        summary.admissions_kept = admissions.len();
        let attached = attach_admissions(&terminal, &admissions, &plan.terminal_column, labeling)?;
        summary.admissions_attached = attached.len();

        let classified = classify_admissions(attached, labeling)?;
        summary.excluded = classified
            .iter()
            .filter(|(_, outcome)| outcome.label().is_none())
            .count();
        let labels = reduce_to_latest(classified);
        summary.positive = labels.iter().filter(|label| label.label).count();
        summary.negative = labels.len() - summary.positive;

        info!(
            labels = labels.len(),
            positive = summary.positive,
            negative = summary.negative,
            excluded = summary.excluded,
            "cohort labeled"
        );
        Ok(CohortRun { labels, summary })
    }
}

fn fold_attributes(tables: &[Timeline], name: &str) -> Result<Timeline> {
    let mut tables = tables.iter();
    let Some(first) = tables.next() else {
        return Ok(Timeline::empty(name));
    };
    tables.try_fold(first.clone(), |joined, next| join_attributes(&joined, next, name))
}

fn restrict(sources: CohortSources, limit: usize) -> Result<CohortSources> {
    let subjects: Vec<SubjectId> = development_subjects(
        sources
            .criteria
            .entity_keys()?
            .into_iter()
            .map(|key| key.subject_id),
        limit,
    );
    info!(limit, subjects = subjects.len(), "restricted to development subset");
    let keep = |timeline: Timeline| retain_subjects(timeline, &subjects);
    let admissions = sources
        .admissions
        .lazy()
        .filter(subject_in(&subjects))
        .collect()?;
    Ok(CohortSources {
        criteria: keep(sources.criteria)?,
        infections: sources
            .infections
            .into_iter()
            .map(keep)
            .collect::<Result<_>>()?,
        dysfunction: keep(sources.dysfunction)?,
        terminal_attributes: sources
            .terminal_attributes
            .into_iter()
            .map(keep)
            .collect::<Result<_>>()?,
        admissions: AdmissionTable { data: admissions },
    })
}
