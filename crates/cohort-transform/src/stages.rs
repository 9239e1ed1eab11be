//! Boolean stage rules.
//!
//! Each stage reads columns produced by earlier stages or raw sources and
//! writes one flag column. A record missing a referenced value reads it as
//! false / 0; a referenced column absent from the table schema is a
//! configuration error.
//!
//! | Stage     | Rule                                                          |
//! |-----------|---------------------------------------------------------------|
//! | primary   | `sum(criteria) >= min_criteria AND any(infection columns)`    |
//! | escalated | `primary AND dysfunction`                                     |
//! | terminal  | `escalated AND all(terminal attributes)`, after imputation    |

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use cohort_model::{ConfigurationError, KeyPart, StagePlan};

use crate::error::Result;
use crate::frame::Timeline;
use crate::impute::impute;
use crate::merge::merge_sources;

/// Boolean composition over a record's criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// The column's boolean reading.
    Flag(String),
    /// Sum of the columns' numeric readings is at least `min`.
    AtLeast { columns: Vec<String>, min: f64 },
    All(Vec<Condition>),
    Any(Vec<Condition>),
}

impl Condition {
    pub fn flag(name: impl Into<String>) -> Self {
        Condition::Flag(name.into())
    }

    pub fn any_of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Condition::Any(names.into_iter().map(Condition::flag).collect())
    }

    pub fn all_of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Condition::All(names.into_iter().map(Condition::flag).collect())
    }

    /// Row-wise boolean expression of the condition over `timeline`'s columns.
    ///
    /// An empty `All` holds and an empty `Any` does not.
    pub fn to_expr(&self, timeline: &Timeline) -> std::result::Result<Expr, ConfigurationError> {
        Ok(match self {
            Condition::Flag(name) => timeline.require_column(name)?.truthy(name),
            Condition::AtLeast { columns, min } => {
                let mut sum = lit(0.0);
                for name in columns {
                    sum = sum + timeline.require_column(name)?.numeric(name);
                }
                sum.gt_eq(lit(*min))
            }
            Condition::All(parts) => {
                let mut expr = lit(true);
                for part in parts {
                    expr = expr.and(part.to_expr(timeline)?);
                }
                expr
            }
            Condition::Any(parts) => {
                let mut expr = lit(false);
                for part in parts {
                    expr = expr.or(part.to_expr(timeline)?);
                }
                expr
            }
        })
    }

    /// Every column the condition reads.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::Flag(name) => out.push(name),
            Condition::AtLeast { columns, .. } => out.extend(columns.iter().map(String::as_str)),
            Condition::All(parts) | Condition::Any(parts) => {
                for part in parts {
                    part.collect_columns(out);
                }
            }
        }
    }
}

/// A named rule writing one flag column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub output: String,
    pub condition: Condition,
}

impl Stage {
    pub fn primary(plan: &StagePlan) -> Self {
        Self {
            name: "primary".to_string(),
            output: plan.primary_column.clone(),
            condition: Condition::All(vec![
                Condition::AtLeast {
                    columns: plan.criteria.clone(),
                    min: plan.min_criteria as f64,
                },
                Condition::any_of(plan.infection_columns.iter().cloned()),
            ]),
        }
    }

    pub fn escalated(plan: &StagePlan) -> Self {
        Self {
            name: "escalated".to_string(),
            output: plan.escalated_column.clone(),
            condition: Condition::all_of([
                plan.primary_column.clone(),
                plan.dysfunction_column.clone(),
            ]),
        }
    }

    pub fn terminal(plan: &StagePlan) -> Self {
        let mut required = vec![plan.escalated_column.clone()];
        required.extend(plan.terminal_attributes.iter().cloned());
        Self {
            name: "terminal".to_string(),
            output: plan.terminal_column.clone(),
            condition: Condition::all_of(required),
        }
    }
}

/// Evaluate `stage` on every record, appending its output flag column.
pub fn evaluate_stage(timeline: Timeline, stage: &Stage) -> Result<Timeline> {
    if timeline.has_column(&stage.output) {
        return Err(ConfigurationError::DuplicateColumn {
            column: stage.output.clone(),
            left: timeline.name.clone(),
            right: stage.name.clone(),
        }
        .into());
    }
    let expr = stage.condition.to_expr(&timeline)?;
    let data = timeline
        .lazy()
        .with_column(expr.alias(stage.output.as_str()))
        .collect()?;
    let out = Timeline::from_frame(timeline.name, data);
    info!(
        stage = %stage.name,
        records = out.len(),
        flagged = out.count_flagged(&stage.output)?,
        "stage evaluated"
    );
    Ok(out)
}

/// Primary condition: criteria merged with admission-level infection evidence.
///
/// Untimed rows are dropped by the merge before the flag is evaluated.
pub fn summarize_primary(
    criteria: &Timeline,
    infections: &Timeline,
    plan: &StagePlan,
) -> Result<Timeline> {
    let span = info_span!("primary_stage");
    let _guard = span.enter();
    let merged = merge_sources(criteria, infections, KeyPart::ADMISSION, &plan.primary_column)?;
    evaluate_stage(merged, &Stage::primary(plan))
}

/// Escalated condition: primary flags merged with the dysfunction attribute.
pub fn summarize_escalated(
    primary: &Timeline,
    dysfunction: &Timeline,
    plan: &StagePlan,
) -> Result<Timeline> {
    let span = info_span!("escalated_stage");
    let _guard = span.enter();
    let merged = merge_sources(primary, dysfunction, KeyPart::ADMISSION, &plan.escalated_column)?;
    evaluate_stage(merged, &Stage::escalated(plan))
}

/// Terminal condition: escalated flags and each attribute source outer-joined
/// on subject, admission, stay and timestamp, forward-filled per stay, then
/// combined.
pub fn summarize_terminal(
    escalated: &Timeline,
    attributes: &[Timeline],
    plan: &StagePlan,
) -> Result<Timeline> {
    let span = info_span!("terminal_stage");
    let _guard = span.enter();
    let mut merged = escalated.clone();
    for source in attributes {
        merged = merge_sources(&merged, source, KeyPart::CHART, &plan.terminal_column)?;
    }
    let imputed = impute(merged)?;
    evaluate_stage(imputed, &Stage::terminal(plan))
}
