//! Outer joins of criteria sources.
//!
//! Sources are joined on a subset of the entity key (subject and admission are
//! always part of it). Every row of either side survives: rows with partners on
//! the other side are combined once per partner, rows without partners are kept
//! with the other side's columns missing. Null keys match each other. The joined
//! rows are ordered by join key; rows sharing a key keep left-then-right input
//! order.

use std::collections::BTreeSet;

use polars::prelude::*;
use tracing::debug;

use cohort_model::{ConfigurationError, KeyPart};

use crate::error::Result;
use crate::frame::Timeline;

const RIGHT_SUFFIX: &str = "_right";

fn join_parts(on: &[KeyPart]) -> Vec<KeyPart> {
    let mut parts: BTreeSet<KeyPart> = on.iter().copied().collect();
    parts.insert(KeyPart::Subject);
    parts.insert(KeyPart::Admission);
    parts.into_iter().collect()
}

fn reject_shared_criteria(
    left: &Timeline,
    right: &Timeline,
) -> std::result::Result<(), ConfigurationError> {
    match right
        .criteria()
        .into_iter()
        .find(|(name, _)| left.has_column(name))
    {
        Some((name, _)) => Err(ConfigurationError::DuplicateColumn {
            column: name.to_string(),
            left: left.name.clone(),
            right: right.name.clone(),
        }),
        None => Ok(()),
    }
}

fn outer_join(left: &Timeline, right: &Timeline, on: &[KeyPart]) -> Result<LazyFrame> {
    let parts = join_parts(on);
    left.require_keys(&parts)?;
    right.require_keys(&parts)?;
    reject_shared_criteria(left, right)?;

    let keys: Vec<Expr> = parts.iter().map(|part| col(part.as_str())).collect();
    let mut args = JoinArgs::new(JoinType::Full)
        .with_coalesce(JoinCoalesce::CoalesceColumns)
        .with_suffix(Some(RIGHT_SUFFIX.into()));
    args.nulls_equal = true;
    args.maintain_order = MaintainOrderJoin::LeftRight;
    let mut joined = left.lazy().join(right.lazy(), &keys, &keys, args);

    // Key columns on both sides but outside the join: the left reading wins.
    let shared: Vec<&str> = KeyPart::ALL
        .iter()
        .filter(|part| !parts.contains(part) && left.has_key(**part) && right.has_key(**part))
        .map(|part| part.as_str())
        .collect();
    if !shared.is_empty() {
        let suffixed: Vec<String> = shared
            .iter()
            .map(|name| format!("{name}{RIGHT_SUFFIX}"))
            .collect();
        let coalesced: Vec<Expr> = shared
            .iter()
            .zip(&suffixed)
            .map(|(name, right_name)| col(*name).fill_null(col(right_name.as_str())))
            .collect();
        joined = joined.with_columns(coalesced).drop(cols(suffixed));
    }

    let order: Vec<PlSmallStr> = parts.iter().map(|part| part.as_str().into()).collect();
    Ok(joined.sort(order, SortMultipleOptions::default().with_maintain_order(true)))
}

/// Full outer join of two sources, dropping every joined row without a timestamp.
///
/// An untimed row can only arise from a side whose key found no timed partner;
/// it carries no usable signal. At least one side must be keyed on time.
pub fn merge_sources(
    left: &Timeline,
    right: &Timeline,
    on: &[KeyPart],
    name: &str,
) -> Result<Timeline> {
    if !left.has_key(KeyPart::Timestamp) && !right.has_key(KeyPart::Timestamp) {
        return Err(ConfigurationError::MissingKey {
            table: name.to_string(),
            key: KeyPart::Timestamp,
        }
        .into());
    }
    let joined = outer_join(left, right, on)?.collect()?;
    let rows = joined.height();
    let merged = joined
        .lazy()
        .filter(col(KeyPart::Timestamp.as_str()).is_not_null())
        .collect()?;
    debug!(
        table = name,
        left = left.len(),
        right = right.len(),
        joined = rows,
        dropped_untimed = rows - merged.height(),
        "merged sources"
    );
    Ok(Timeline::from_frame(name, merged))
}

/// Outer join of two admission-level attribute tables.
///
/// One row per subject + admission present in either table; every value still
/// missing after the join is filled with false / 0.
pub fn join_attributes(left: &Timeline, right: &Timeline, name: &str) -> Result<Timeline> {
    let joined = outer_join(left, right, KeyPart::ADMISSION)?;
    let fills: Vec<Expr> = left
        .criteria()
        .into_iter()
        .chain(right.criteria())
        .map(|(column, kind)| col(column.clone()).fill_null(kind.fill_value()).alias(column))
        .collect();
    let data = joined.with_columns(fills).collect()?;
    debug!(table = name, rows = data.height(), "joined attributes");
    Ok(Timeline::from_frame(name, data))
}
