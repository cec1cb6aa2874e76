//! FILENAME: crosstab-engine/src/sort.rs
//! Sort Engine - reorders the outermost row dimension by column values.
//!
//! Sorting only changes the order of row ids. The caller rebuilds the row
//! axis and reassembles the table afterwards; values are not fetched again.

use std::cmp::Ordering;

use crate::axis::Axis;
use crate::definition::{SortConfig, SortDirection, SortTarget};
use crate::error::{CrosstabError, CrosstabResult};
use crate::sync::{SyncedLayout, ValueIndex};
use crate::table::row_total;
use crate::view::TOTAL_SORT_KEY;

/// A sort target resolved against the column axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    /// The row total column.
    Total,
    /// A column, by composite id.
    Column(String),
}

/// Resolves a 1-based column index, "total" (or index 0) or a column
/// composite id. Indexes and ids must name an existing column.
pub fn resolve_target(target: &SortTarget, col_axis: Option<&Axis>) -> CrosstabResult<ResolvedTarget> {
    let ids = col_axis.map(Axis::composite_ids).unwrap_or(&[]);
    match target {
        SortTarget::Index(0) => Ok(ResolvedTarget::Total),
        SortTarget::Index(n) => {
            ids.get(*n as usize - 1)
                .map(|id| ResolvedTarget::Column(id.clone()))
                .ok_or_else(|| {
                    CrosstabError::unsupported_sort(
                        n.to_string(),
                        format!("column index out of range (1..={})", ids.len()),
                    )
                })
        }
        SortTarget::Id(id) if id.eq_ignore_ascii_case(TOTAL_SORT_KEY) => Ok(ResolvedTarget::Total),
        SortTarget::Id(id) if ids.contains(id) => Ok(ResolvedTarget::Column(id.clone())),
        SortTarget::Id(id) => Err(CrosstabError::unsupported_sort(id.clone(), "no column with this id")),
    }
}

/// Reorders the ids of the outermost row dimension of `layout`.
///
/// Only a single-floor row axis can be sorted: with nested row
/// dimensions no value is keyed by an outer id alone.
///
/// Rows without a value for the target sort last in either direction.
/// Ties keep their previous order. On error the layout is unchanged.
pub fn sort_rows(
    layout: &mut SyncedLayout,
    values: &ValueIndex,
    col_axis: Option<&Axis>,
    sorting: &SortConfig,
) -> CrosstabResult<()> {
    let target_text = sorting.id.to_string();

    let outer = match layout.rows.first() {
        Some(dim) => dim,
        None => {
            return Err(CrosstabError::unsupported_sort(
                target_text,
                "layout has no row dimension",
            ))
        }
    };
    if let Some(requested) = &sorting.dimension {
        if *requested != outer.name {
            return Err(CrosstabError::unsupported_sort(
                target_text,
                format!(
                    "only the outermost row dimension '{}' can be sorted, not '{}'",
                    outer.name, requested
                ),
            ));
        }
    }

    if layout.rows.len() > 1 {
        return Err(CrosstabError::unsupported_sort(
            target_text,
            format!(
                "rows are nested over {} dimensions, only a single row dimension can be sorted",
                layout.rows.len()
            ),
        ));
    }

    let target = resolve_target(&sorting.id, col_axis)?;
    let col_ids = col_axis.map(Axis::composite_ids).unwrap_or(&[]);
    let missing = match sorting.direction {
        SortDirection::Asc => f64::INFINITY,
        SortDirection::Desc => f64::NEG_INFINITY,
    };

    let mut keyed: Vec<(f64, String)> = outer
        .ids
        .iter()
        .map(|id| {
            let value = match &target {
                ResolvedTarget::Total => row_total(values, col_ids, id),
                ResolvedTarget::Column(col) => values
                    .get(&format!("{}{}", col, id))
                    .and_then(|v| v.numeric()),
            };
            (value.unwrap_or(missing), id.clone())
        })
        .collect();

    keyed.sort_by(|a, b| compare(a.0, b.0, sorting.direction));

    log::debug!(
        "sorted {} rows of '{}' by {:?} {:?}",
        keyed.len(),
        outer.name,
        target,
        sorting.direction
    );

    if let Some(dim) = layout.outer_row_mut() {
        dim.ids = keyed.into_iter().map(|(_, id)| id).collect();
    }
    Ok(())
}

fn compare(a: f64, b: f64, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => a.total_cmp(&b),
        SortDirection::Desc => b.total_cmp(&a),
    }
}
