//! FILENAME: crosstab-engine/src/view.rs
//! Crosstab View - the abstract cell matrix handed to presentation.
//!
//! The matrix is rectangular: every row has `col_count` cells. A cell
//! covered by another cell's span is kept as a `hidden` placeholder so
//! that grid positions stay stable. Besides the cells the view carries:
//! - row descriptors (header, body, subtotal, total; collapsed or not)
//! - a correlation map from value cells to the header cells they belong to
//! - the column headers that can trigger a re-sort
//! - a summary of the filter dimensions

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::axis::CellHandle;
use crate::definition::{DisplayDensity, FontSize};
use crate::format::round_display;
use crate::sync::SyncWarning;

/// Text of the total header and total row label.
pub const TOTAL_LABEL: &str = "Total";

/// Sort key carried by the total column header.
pub const TOTAL_SORT_KEY: &str = "total";

// ============================================================================
// CELL TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    /// Corner cell above the row headers.
    Empty,
    /// Name of a dimension, shown in the corner area.
    DimensionLabel,
    /// Item header.
    Dimension,
    /// Header of a subtotal column or row.
    DimensionSubtotal,
    /// Header of the total column or row.
    DimensionTotal,
    Value,
    /// Subtotal of values.
    ValueSubtotal,
    /// Subtotal row crossing a subtotal column.
    ValueSubtotalTotal,
    /// Row or column total.
    ValueTotal,
    /// Total column in a subtotal row, or subtotal column in the total row.
    ValueTotalSubgrandtotal,
    GrandTotal,
}

impl CellKind {
    /// True for every kind that shows a number.
    pub fn is_value(&self) -> bool {
        matches!(
            self,
            CellKind::Value
                | CellKind::ValueSubtotal
                | CellKind::ValueSubtotalTotal
                | CellKind::ValueTotal
                | CellKind::ValueTotalSubgrandtotal
                | CellKind::GrandTotal
        )
    }

    pub fn is_header(&self) -> bool {
        !self.is_value()
    }
}

// ============================================================================
// CELL
// ============================================================================

/// A single cell of the crosstab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub kind: CellKind,

    /// Identity used by the correlation map and sort triggers.
    pub handle: Option<CellHandle>,

    pub col_span: usize,

    pub row_span: usize,

    /// Numeric contribution (0 for empty cells).
    pub value: f64,

    /// Pre-formatted display string. Empty cells have no text.
    pub display_text: String,

    /// No underlying value (distinct from a value of zero).
    pub empty: bool,

    /// Hidden because the row was collapsed.
    pub collapsed: bool,

    /// Covered by another cell's span.
    pub hidden: bool,

    /// Sort target when this header can re-sort the rows.
    pub sort_key: Option<String>,

    /// Legend colour for value cells.
    pub legend_color: Option<String>,
}

impl Cell {
    fn with_kind(kind: CellKind, text: String) -> Self {
        Cell {
            kind,
            handle: None,
            col_span: 1,
            row_span: 1,
            value: 0.0,
            display_text: text,
            empty: false,
            collapsed: false,
            hidden: false,
            sort_key: None,
            legend_color: None,
        }
    }

    /// Creates the corner cell.
    pub fn corner(col_span: usize, row_span: usize) -> Self {
        Cell::with_kind(CellKind::Empty, String::new()).with_span(col_span, row_span)
    }

    pub fn label(text: impl Into<String>) -> Self {
        Cell::with_kind(CellKind::DimensionLabel, text.into())
    }

    /// Creates an item header cell.
    pub fn dimension(text: impl Into<String>, handle: CellHandle) -> Self {
        let mut cell = Cell::with_kind(CellKind::Dimension, text.into());
        cell.handle = Some(handle);
        cell
    }

    pub fn header(kind: CellKind, text: impl Into<String>) -> Self {
        Cell::with_kind(kind, text.into())
    }

    /// Creates a placeholder covered by a neighbouring span.
    pub fn hidden(kind: CellKind) -> Self {
        let mut cell = Cell::with_kind(kind, String::new());
        cell.hidden = true;
        cell
    }

    /// Creates a value cell. `None` is an empty cell.
    pub fn value(value: Option<(f64, String)>, handle: CellHandle) -> Self {
        let mut cell = Cell::with_kind(CellKind::Value, String::new());
        cell.handle = Some(handle);
        match value {
            Some((number, text)) => {
                cell.value = number;
                cell.display_text = text;
            }
            None => cell.empty = true,
        }
        cell
    }

    /// Creates a total or subtotal cell. Aggregates are rounded for display.
    pub fn aggregate(kind: CellKind, sum: f64, empty: bool) -> Self {
        let text = if empty { String::new() } else { round_display(sum) };
        let mut cell = Cell::with_kind(kind, text);
        cell.value = sum;
        cell.empty = empty;
        cell
    }

    pub fn with_span(mut self, col_span: usize, row_span: usize) -> Self {
        self.col_span = col_span;
        self.row_span = row_span;
        self
    }

    pub fn with_handle(mut self, handle: CellHandle) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn with_sort_key(mut self, key: impl Into<String>) -> Self {
        self.sort_key = Some(key.into());
        self
    }

    pub fn with_collapsed(mut self, collapsed: bool) -> Self {
        self.collapsed = collapsed;
        self
    }

    /// Whether presentation should emit this cell.
    pub fn is_rendered(&self) -> bool {
        !self.hidden && !self.collapsed
    }
}

// ============================================================================
// ROW DESCRIPTORS AND AUXILIARY MAPS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowType {
    /// Column header row.
    Header,
    Body,
    Subtotal,
    Total,
}

/// Describes a row in the crosstab view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowDescriptor {
    pub view_row: usize,

    pub row_type: RowType,

    /// False when hidden by empty-row collapsing.
    pub visible: bool,

    /// Row axis leaf index of a body row.
    pub axis_index: Option<usize>,
}

/// A column header that can re-sort the rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortTrigger {
    pub target: String,
    pub handle: CellHandle,
}

/// One filter dimension as shown above the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSummary {
    pub dimension: String,
    pub label: String,
    pub items: Vec<String>,
}

pub type Correlations = FxHashMap<CellHandle, SmallVec<[CellHandle; 8]>>;

// ============================================================================
// MAIN VIEW STRUCT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrosstabView {
    pub title: Option<String>,

    /// Indexed as cells[row][col].
    pub cells: Vec<Vec<Cell>>,

    pub rows: Vec<RowDescriptor>,

    pub row_count: usize,

    pub col_count: usize,

    /// Row header columns on the left.
    pub label_col_count: usize,

    /// Column header rows on top.
    pub header_row_count: usize,

    /// Value cell handle to the handles of its column and row headers.
    pub correlations: Correlations,

    pub sort_triggers: Vec<SortTrigger>,

    pub filters: Vec<FilterSummary>,

    pub display_density: DisplayDensity,

    pub font_size: FontSize,

    pub warnings: Vec<SyncWarning>,
}

impl CrosstabView {
    pub fn new(label_col_count: usize) -> Self {
        CrosstabView {
            title: None,
            cells: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            col_count: 0,
            label_col_count,
            header_row_count: 0,
            correlations: FxHashMap::default(),
            sort_triggers: Vec::new(),
            filters: Vec::new(),
            display_density: DisplayDensity::default(),
            font_size: FontSize::default(),
            warnings: Vec::new(),
        }
    }

    pub fn get_cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(row).and_then(|r| r.get(col))
    }

    pub fn get_cell_mut(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        self.cells.get_mut(row).and_then(|r| r.get_mut(col))
    }

    /// Appends a row; the descriptor's `view_row` is set here.
    pub fn add_row(&mut self, cells: Vec<Cell>, row_type: RowType, visible: bool, axis_index: Option<usize>) {
        if row_type == RowType::Header {
            self.header_row_count += 1;
        }
        self.col_count = self.col_count.max(cells.len());
        self.rows.push(RowDescriptor {
            view_row: self.cells.len(),
            row_type,
            visible,
            axis_index,
        });
        self.cells.push(cells);
        self.row_count = self.cells.len();
    }

    /// Returns visible row indices (for rendering).
    pub fn visible_rows(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.visible)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn visible_row_count(&self) -> usize {
        self.rows.iter().filter(|r| r.visible).count()
    }

    /// Visible rows of one type.
    pub fn rows_of_type(&self, row_type: RowType) -> impl Iterator<Item = usize> + '_ {
        self.rows
            .iter()
            .filter(move |r| r.row_type == row_type && r.visible)
            .map(|r| r.view_row)
    }

    /// Header handles a value cell belongs to.
    pub fn correlated(&self, handle: CellHandle) -> &[CellHandle] {
        self.correlations
            .get(&handle)
            .map(|h| h.as_slice())
            .unwrap_or(&[])
    }

    /// Finds the first cell of `kind`, scanning row by row.
    pub fn find_cell(&self, kind: CellKind) -> Option<&Cell> {
        self.cells.iter().flatten().find(|c| c.kind == kind && !c.hidden)
    }
}
