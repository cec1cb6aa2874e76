//! FILENAME: crosstab-engine/src/axis.rs
//! Axis Builder - turns the dimensions on one axis into a header layout.
//!
//! An axis is the cartesian product of its floors. Floor 0 is the
//! outermost dimension. Every floor is expanded to the full axis width,
//! so column `j` of every floor holds the id that column `j` of the body
//! belongs to.
//!
//! Nodes are stored in a flat arena per floor and reference each other by
//! column index:
//! - `parent` is the node at the same column index one floor up
//! - `oldest_sibling` is the first column of the node's span run
//!
//! Only the oldest sibling of a run carries a span and is rendered; the
//! other nodes of the run are covered by it.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{CrosstabError, CrosstabResult};

// ============================================================================
// HANDLES
// ============================================================================

/// Opaque identity of a rendered header or value cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellHandle(pub u32);

/// Hands out fresh cell handles for one render pass.
#[derive(Debug, Default)]
pub struct HandleSeq {
    next: u32,
}

impl HandleSeq {
    pub fn new() -> Self {
        HandleSeq::default()
    }

    pub fn next_handle(&mut self) -> CellHandle {
        let handle = CellHandle(self.next);
        self.next += 1;
        handle
    }

    /// Number of handles issued so far.
    pub fn issued(&self) -> u32 {
        self.next
    }
}

// ============================================================================
// AXIS STRUCTURES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisKind {
    Column,
    Row,
}

/// One synchronized dimension as the axis builder consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisDimension {
    /// Dimension (header) name, e.g. "dx" or "pe".
    pub name: String,
    /// Unique item ids in display order.
    pub ids: Vec<String>,
}

impl AxisDimension {
    pub fn new(name: impl Into<String>, ids: Vec<String>) -> Self {
        AxisDimension {
            name: name.into(),
            ids,
        }
    }
}

/// One dimension positioned at a depth of the axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisFloor {
    pub dimension: String,
    pub unique_ids: Vec<String>,
    /// Consecutive axis cells one id covers.
    pub span: usize,
    /// Span-expanded ids, one per axis cell.
    pub all_ids: Vec<String>,
}

/// One concrete header cell at (floor, column index).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisNode {
    /// Index into the floor's `unique_ids`.
    pub item: usize,
    pub handle: CellHandle,
    pub floor: usize,
    /// Set on the oldest sibling of each run only.
    pub span: Option<usize>,
    pub is_leaf: bool,
    pub is_root: bool,
    /// Column index of the node one floor up (same index).
    pub parent: Option<usize>,
    /// Column index of the first node of this node's run.
    pub oldest_sibling: usize,
    /// Distinct child ids below this node. Only decremented on oldest
    /// siblings, never below zero.
    pub child_count: usize,
    /// Handles of the oldest siblings of every ancestor, nearest first.
    /// Empty for non-leaf nodes.
    pub ancestor_keys: SmallVec<[CellHandle; 4]>,
    pub collapsed: bool,
}

impl AxisNode {
    pub fn is_oldest_sibling(&self, index: usize) -> bool {
        self.oldest_sibling == index
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Axis {
    kind: AxisKind,
    floors: Vec<AxisFloor>,
    width: usize,
    nodes: Vec<Vec<AxisNode>>,
    composite_ids: Vec<String>,
    peer_span: usize,
}

// ============================================================================
// CONSTRUCTION
// ============================================================================

impl Axis {
    /// Builds the axis for `dimensions`, outermost first.
    ///
    /// Returns `Ok(None)` when there are no dimensions: a layout without
    /// a column or row axis is valid.
    pub fn build(
        kind: AxisKind,
        dimensions: &[AxisDimension],
        hide_empty_rows: bool,
        handles: &mut HandleSeq,
    ) -> CrosstabResult<Option<Axis>> {
        if dimensions.is_empty() {
            return Ok(None);
        }

        if let Some(empty) = dimensions.iter().find(|d| d.ids.is_empty()) {
            return Err(CrosstabError::EmptyDimension {
                dimension: empty.name.clone(),
            });
        }

        let depth = dimensions.len();

        // Widths: per floor, total, accumulated
        let mut width = 1usize;
        let mut acc_widths = Vec::with_capacity(depth);
        for dim in dimensions {
            width *= dim.ids.len();
            acc_widths.push(width);
        }

        let spans = floor_spans(kind, dimensions, &acc_widths, width, hide_empty_rows);

        let floors: Vec<AxisFloor> = dimensions
            .iter()
            .zip(spans.iter())
            .map(|(dim, &span)| AxisFloor {
                dimension: dim.name.clone(),
                unique_ids: dim.ids.clone(),
                span,
                all_ids: expand_ids(&dim.ids, span, width),
            })
            .collect();

        let composite_ids = (0..width)
            .map(|j| floors.iter().map(|f| f.all_ids[j].as_str()).collect::<String>())
            .collect();

        let nodes = build_nodes(&floors, width, handles);

        // Second smallest span groups leaves into peer blocks
        let peer_span = if depth > 1 {
            let mut sorted = spans.clone();
            sorted.sort_unstable();
            sorted[1]
        } else {
            width
        };

        log::debug!(
            "{:?} axis: {} floors, width {}, spans {:?}",
            kind,
            depth,
            width,
            spans
        );

        Ok(Some(Axis {
            kind,
            floors,
            width,
            nodes,
            composite_ids,
            peer_span,
        }))
    }
}

/// Span of every floor.
///
/// A multi-item floor spans `width / acc_i`. A single-item floor spans the
/// full width on top, and the top floor's span below it, except on a row
/// axis that hides empty rows where it is treated like a multi-item floor.
fn floor_spans(
    kind: AxisKind,
    dimensions: &[AxisDimension],
    acc_widths: &[usize],
    width: usize,
    hide_empty_rows: bool,
) -> Vec<usize> {
    let mut spans: Vec<usize> = Vec::with_capacity(dimensions.len());

    for (i, dim) in dimensions.iter().enumerate() {
        let span = if dim.ids.len() > 1 {
            width / acc_widths[i]
        } else if i == 0 {
            width
        } else if hide_empty_rows && kind == AxisKind::Row {
            width / acc_widths[i]
        } else {
            spans[0]
        };
        spans.push(span);
    }

    spans
}

/// Repeats each id `span` times, then repeats that block until the
/// floor is `width` long.
fn expand_ids(ids: &[String], span: usize, width: usize) -> Vec<String> {
    let factor = width / (span * ids.len());
    let mut all = Vec::with_capacity(width);

    for _ in 0..factor {
        for id in ids {
            for _ in 0..span {
                all.push(id.clone());
            }
        }
    }

    all
}

fn build_nodes(floors: &[AxisFloor], width: usize, handles: &mut HandleSeq) -> Vec<Vec<AxisNode>> {
    let depth = floors.len();
    let mut nodes: Vec<Vec<AxisNode>> = Vec::with_capacity(depth);

    for (i, floor) in floors.iter().enumerate() {
        let is_leaf = i == depth - 1;
        // Every node counts the distinct ids of the floor below
        let child_count = if is_leaf {
            0
        } else {
            floors[i + 1].unique_ids.len()
        };

        let mut floor_nodes = Vec::with_capacity(width);
        let mut oldest = 0;

        for j in 0..width {
            let run_start = j % floor.span == 0;
            if run_start {
                oldest = j;
            }

            let item = (j / floor.span) % floor.unique_ids.len();

            floor_nodes.push(AxisNode {
                item,
                handle: handles.next_handle(),
                floor: i,
                span: run_start.then_some(floor.span),
                is_leaf,
                is_root: i == 0 && run_start,
                parent: if i > 0 { Some(j) } else { None },
                oldest_sibling: oldest,
                child_count,
                ancestor_keys: SmallVec::new(),
                collapsed: false,
            });
        }

        nodes.push(floor_nodes);
    }

    // Leaves remember the oldest sibling of every ancestor
    if depth > 1 {
        let leaf_floor = depth - 1;
        for j in 0..width {
            let keys: SmallVec<[CellHandle; 4]> = (0..leaf_floor)
                .rev()
                .map(|f| {
                    let oldest = nodes[f][j].oldest_sibling;
                    nodes[f][oldest].handle
                })
                .collect();
            nodes[leaf_floor][j].ancestor_keys = keys;
        }
    }

    nodes
}

// ============================================================================
// QUERIES
// ============================================================================

impl Axis {
    pub fn kind(&self) -> AxisKind {
        self.kind
    }

    /// Number of floors.
    pub fn depth(&self) -> usize {
        self.floors.len()
    }

    /// Number of leaf cells (product of the floor sizes).
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn floors(&self) -> &[AxisFloor] {
        &self.floors
    }

    pub fn floor(&self, floor: usize) -> &AxisFloor {
        &self.floors[floor]
    }

    pub fn spans(&self) -> Vec<usize> {
        self.floors.iter().map(|f| f.span).collect()
    }

    pub fn composite_ids(&self) -> &[String] {
        &self.composite_ids
    }

    pub fn composite_id(&self, index: usize) -> &str {
        &self.composite_ids[index]
    }

    pub fn nodes(&self, floor: usize) -> &[AxisNode] {
        &self.nodes[floor]
    }

    pub fn node(&self, floor: usize, index: usize) -> &AxisNode {
        &self.nodes[floor][index]
    }

    pub fn leaf(&self, index: usize) -> &AxisNode {
        &self.nodes[self.depth() - 1][index]
    }

    /// Item id shown by the node at (floor, index).
    pub fn node_id(&self, floor: usize, index: usize) -> &str {
        &self.floors[floor].all_ids[index]
    }

    /// Period of subtotal groups along this axis: the width covered by one
    /// outermost item, or 1 for a single-floor axis.
    pub fn unique_factor(&self) -> usize {
        if self.depth() < 2 {
            1
        } else {
            self.width / self.floors[0].unique_ids.len()
        }
    }

    /// Range of the leaves grouped with leaf `index`. Groups are blocks of
    /// the second smallest floor span (the whole axis for a single floor).
    pub fn peer_range(&self, index: usize) -> Range<usize> {
        let start = (index / self.peer_span) * self.peer_span;
        start..(start + self.peer_span).min(self.width)
    }

    pub fn peer_handles(&self, index: usize) -> Vec<CellHandle> {
        let leaves = &self.nodes[self.depth() - 1];
        self.peer_range(index).map(|j| leaves[j].handle).collect()
    }

    pub fn is_leaf_collapsed(&self, index: usize) -> bool {
        self.leaf(index).collapsed
    }

    /// Visible span of the header run containing (floor, index).
    ///
    /// Returns the number of non-collapsed leaves of the run when `index`
    /// is the first of them, `None` when the cell is covered by another
    /// one or the whole run is collapsed.
    pub fn visible_span(&self, floor: usize, index: usize) -> Option<usize> {
        let start = self.nodes[floor][index].oldest_sibling;
        let end = (start + self.floors[floor].span).min(self.width);
        let leaves = &self.nodes[self.depth() - 1];

        let mut visible = (start..end).filter(|&j| !leaves[j].collapsed);
        let first = visible.next()?;
        if first != index {
            return None;
        }
        Some(1 + visible.count())
    }
}

// ============================================================================
// COLLAPSING
// ============================================================================

impl Axis {
    /// Marks leaf `index` collapsed and shrinks its ancestors.
    pub fn collapse_leaf(&mut self, index: usize) {
        let leaf_floor = self.depth() - 1;
        self.reduce(leaf_floor, index);
    }

    /// A node without remaining children is collapsed and takes one child
    /// away from its parent's run; the walk continues at that run.
    fn reduce(&mut self, floor: usize, index: usize) {
        let parent = self.nodes[floor][index].parent;
        let parent_run = parent.map(|p| self.nodes[floor - 1][p].oldest_sibling);

        let node = &mut self.nodes[floor][index];
        if node.child_count == 0 && !node.collapsed {
            node.collapsed = true;

            if let Some(run) = parent_run {
                let above = &mut self.nodes[floor - 1][run];
                above.child_count = above.child_count.saturating_sub(1);
            }
        }

        if let Some(run) = parent_run {
            self.reduce(floor - 1, run);
        }
    }
}
