//! Per-stay last-observation-carried-forward.

use polars::prelude::*;
use tracing::debug;

use cohort_model::KeyPart;

use crate::error::Result;
use crate::frame::Timeline;

/// Forward-fill every criterion within each subject / admission / stay group.
///
/// Records are first stable-sorted by timestamp across the whole table (ties
/// keep input order, untimed records sort last). Within a group each missing
/// value takes the most recent earlier observation of that group; a value with
/// no earlier observation becomes false / 0. Filling never crosses groups and
/// never reaches backwards in time. Records without a stay form one group per
/// admission.
///
/// Applying this to an already imputed table returns it unchanged.
pub fn impute(timeline: Timeline) -> Result<Timeline> {
    timeline.require_keys(&[KeyPart::Stay, KeyPart::Timestamp])?;

    let groups: Vec<Expr> = KeyPart::STAY.iter().map(|part| col(part.as_str())).collect();
    let criteria = timeline.criteria();
    let missing: usize = criteria
        .iter()
        .map(|(name, _)| timeline.data.column(name).map_or(0, Column::null_count))
        .sum();
    let fills: Vec<Expr> = criteria
        .into_iter()
        .map(|(name, kind)| {
            col(name.clone())
                .fill_null_with_strategy(FillNullStrategy::Forward(None))
                .over(&groups)
                .fill_null(kind.fill_value())
                .alias(name)
        })
        .collect();

    let data = timeline
        .data
        .lazy()
        .sort(
            [KeyPart::Timestamp.as_str()],
            SortMultipleOptions::default()
                .with_maintain_order(true)
                .with_nulls_last(true),
        )
        .with_columns(fills)
        .collect()?;
    debug!(
        table = %timeline.name,
        records = data.height(),
        missing,
        "imputed missing values"
    );
    Ok(Timeline::from_frame(timeline.name, data))
}
