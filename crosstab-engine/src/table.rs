//! FILENAME: crosstab-engine/src/table.rs
//! Table Assembler - merges the axes and the value index into a view.
//!
//! Algorithm:
//! 1. Look up one value cell per (row leaf, column leaf)
//! 2. Total every body row (total column)
//! 3. Collapse all-empty rows and shrink their ancestor headers
//! 4. Total every column (total row) and the grand total
//! 5. Insert subtotal columns after every outermost column group
//! 6. Emit header rows, body rows with subtotal rows, and the total row
//!
//! Any of the two axes may be missing. Without a column axis there is a
//! single value column, without a row axis a single body row.

use smallvec::SmallVec;

use crate::axis::{Axis, CellHandle, HandleSeq};
use crate::format::group_digits;
use crate::sync::{SyncedLayout, ValueIndex};
use crate::view::{
    Cell, CellKind, Correlations, CrosstabView, FilterSummary, RowType, SortTrigger,
    TOTAL_LABEL, TOTAL_SORT_KEY,
};

// ============================================================================
// TABLE ASSEMBLER
// ============================================================================

pub struct TableAssembler<'a> {
    layout: &'a SyncedLayout,
    values: &'a ValueIndex,
    col_axis: Option<Axis>,
    row_axis: Option<Axis>,
    handles: HandleSeq,
    correlations: Correlations,
    sort_triggers: Vec<SortTrigger>,
}

impl<'a> TableAssembler<'a> {
    /// `handles` must be the sequence the axes were built with.
    pub fn new(
        layout: &'a SyncedLayout,
        values: &'a ValueIndex,
        col_axis: Option<Axis>,
        row_axis: Option<Axis>,
        handles: HandleSeq,
    ) -> Self {
        TableAssembler {
            layout,
            values,
            col_axis,
            row_axis,
            handles,
            correlations: Correlations::default(),
            sort_triggers: Vec::new(),
        }
    }

    pub fn assemble(mut self) -> CrosstabView {
        let label_cols = self.label_col_count();

        let mut value_rows = self.value_matrix();
        let mut row_totals = self.row_total_cells(&value_rows);
        self.collapse_empty_rows(&mut value_rows, row_totals.as_mut());
        let column_totals = self.column_total_cells(&value_rows);
        let value_rows: Vec<Vec<Cell>> = value_rows
            .into_iter()
            .map(|row| self.with_subtotal_columns(row, CellKind::ValueSubtotal))
            .collect();

        let mut view = CrosstabView::new(label_cols);
        view.title = self.layout.name.clone();
        view.display_density = self.layout.options.display_density;
        view.font_size = self.layout.options.font_size;

        for header in self.header_rows(label_cols) {
            view.add_row(header, RowType::Header, true, None);
        }
        self.add_body_rows(&mut view, label_cols, value_rows, row_totals);
        if let Some(totals) = column_totals {
            let row = self.total_row(label_cols, totals);
            view.add_row(row, RowType::Total, true, None);
        }

        view.filters = self.filter_summaries();
        self.apply_digit_grouping(&mut view);
        self.apply_legend_colors(&mut view);

        view.correlations = self.correlations;
        view.sort_triggers = self.sort_triggers;

        log::debug!(
            "assembled crosstab: {} rows ({} visible) x {} columns",
            view.row_count,
            view.visible_row_count(),
            view.col_count
        );
        view
    }

    // ------------------------------------------------------------------------
    // Shape
    // ------------------------------------------------------------------------

    fn label_col_count(&self) -> usize {
        self.row_axis.as_ref().map_or(0, Axis::depth)
    }

    fn body_width(&self) -> usize {
        self.col_axis.as_ref().map_or(1, Axis::width)
    }

    fn body_height(&self) -> usize {
        self.row_axis.as_ref().map_or(1, Axis::width)
    }

    /// Total column at the end of every row.
    fn has_total_column(&self) -> bool {
        self.col_axis.is_some() && self.layout.options.show_row_totals
    }

    /// Total row below the body.
    fn has_total_row(&self) -> bool {
        self.row_axis.is_some() && self.layout.options.show_col_totals
    }

    fn has_grand_total(&self) -> bool {
        self.has_total_column() && self.has_total_row()
    }

    fn has_subtotal_columns(&self) -> bool {
        self.layout.options.show_row_sub_totals
            && self.col_axis.as_ref().map_or(false, |axis| axis.depth() > 1)
    }

    fn has_subtotal_rows(&self) -> bool {
        self.layout.options.show_col_sub_totals
            && self.row_axis.as_ref().map_or(false, |axis| axis.depth() > 1)
    }

    /// Column headers can re-sort only a single-floor row axis.
    fn has_sortable_headers(&self) -> bool {
        self.row_axis.as_ref().map_or(false, |axis| axis.depth() == 1)
    }

    fn subtotal_period(&self) -> usize {
        self.col_axis.as_ref().map_or(1, Axis::unique_factor)
    }

    // ------------------------------------------------------------------------
    // Values and totals
    // ------------------------------------------------------------------------

    fn value_matrix(&mut self) -> Vec<Vec<Cell>> {
        let height = self.body_height();
        let width = self.body_width();
        let mut rows = Vec::with_capacity(height);

        for i in 0..height {
            let mut row = Vec::with_capacity(width);
            for j in 0..width {
                let col_id = self.col_axis.as_ref().map_or("", |a| a.composite_id(j));
                let row_id = self.row_axis.as_ref().map_or("", |a| a.composite_id(i));
                let key = format!("{}{}", col_id, row_id);

                let value = self
                    .values
                    .get(&key)
                    .map(|v| (v.contribution(), v.display_text()));
                let handle = self.handles.next_handle();
                self.correlate(handle, i, j);
                row.push(Cell::value(value, handle));
            }
            rows.push(row);
        }

        rows
    }

    /// Records the column leaf and row leaf headers of a value cell along
    /// with their ancestors.
    fn correlate(&mut self, handle: CellHandle, row: usize, col: usize) {
        let mut related: SmallVec<[CellHandle; 8]> = SmallVec::new();
        if let Some(axis) = &self.col_axis {
            let leaf = axis.leaf(col);
            related.extend(leaf.ancestor_keys.iter().copied());
            related.push(leaf.handle);
        }
        if let Some(axis) = &self.row_axis {
            let leaf = axis.leaf(row);
            related.extend(leaf.ancestor_keys.iter().copied());
            related.push(leaf.handle);
        }
        self.correlations.insert(handle, related);
    }

    fn row_total_cells(&self, value_rows: &[Vec<Cell>]) -> Option<Vec<Cell>> {
        if !self.has_total_column() {
            return None;
        }
        Some(
            value_rows
                .iter()
                .map(|row| aggregate(CellKind::ValueTotal, row.iter()))
                .collect(),
        )
    }

    fn collapse_empty_rows(&mut self, value_rows: &mut [Vec<Cell>], mut row_totals: Option<&mut Vec<Cell>>) {
        if !self.layout.options.hide_empty_rows || self.col_axis.is_none() {
            return;
        }
        let axis = match self.row_axis.as_mut() {
            Some(axis) => axis,
            None => return,
        };

        let mut collapsed = 0;
        for (i, row) in value_rows.iter_mut().enumerate() {
            if row.iter().any(|cell| !cell.empty) {
                continue;
            }
            for cell in row.iter_mut() {
                cell.collapsed = true;
            }
            if let Some(totals) = row_totals.as_deref_mut() {
                totals[i].collapsed = true;
            }
            axis.collapse_leaf(i);
            collapsed += 1;
        }

        log::debug!("collapsed {} empty rows", collapsed);
    }

    /// One total per value column, with subtotal columns inserted.
    fn column_total_cells(&self, value_rows: &[Vec<Cell>]) -> Option<Vec<Cell>> {
        if !self.has_total_row() {
            return None;
        }
        let totals = (0..self.body_width())
            .map(|j| aggregate(CellKind::ValueTotal, value_rows.iter().map(|row| &row[j])))
            .collect();
        Some(totals)
    }

    /// Inserts a subtotal after every group of `subtotal_period` cells.
    fn with_subtotal_columns(&self, row: Vec<Cell>, kind: CellKind) -> Vec<Cell> {
        if !self.has_subtotal_columns() {
            return row;
        }
        let period = self.subtotal_period();
        let mut expanded = Vec::with_capacity(row.len() + row.len() / period);

        for group in row.chunks(period) {
            expanded.extend(group.iter().cloned());
            expanded.push(aggregate(kind, group.iter()));
        }

        expanded
    }

    // ------------------------------------------------------------------------
    // Header rows
    // ------------------------------------------------------------------------

    fn header_rows(&mut self, label_cols: usize) -> Vec<Vec<Cell>> {
        let sortable = self.has_sortable_headers();
        let subtotals = self.has_subtotal_columns();
        let period = self.subtotal_period();
        let total_column = self.has_total_column();
        let show_labels = self.layout.options.show_dimension_labels && self.row_axis.is_some();

        let col_axis = match self.col_axis.as_ref() {
            Some(axis) => axis,
            None => return self.row_label_header(label_cols).into_iter().collect(),
        };

        let depth = col_axis.depth();
        let mut rows = Vec::with_capacity(depth);

        for f in 0..depth {
            let mut row = self.corner_cells(f, depth, label_cols, show_labels);

            for j in 0..col_axis.width() {
                let node = col_axis.node(f, j);
                match node.span {
                    Some(span) => {
                        let label = self.layout.item_label(col_axis.node_id(f, j));
                        let mut cell = Cell::dimension(label, node.handle).with_span(span, 1);
                        if sortable && f == depth - 1 {
                            let target = col_axis.composite_id(j).to_string();
                            self.sort_triggers.push(SortTrigger {
                                target: target.clone(),
                                handle: node.handle,
                            });
                            cell = cell.with_sort_key(target);
                        }
                        row.push(cell);
                    }
                    None => row.push(Cell::hidden(CellKind::Dimension)),
                }

                if subtotals && (j + 1) % period == 0 {
                    row.push(if f == 0 {
                        Cell::header(CellKind::DimensionSubtotal, "").with_span(1, depth)
                    } else {
                        Cell::hidden(CellKind::DimensionSubtotal)
                    });
                }
            }

            if total_column {
                row.push(if f == 0 {
                    let handle = self.handles.next_handle();
                    let mut cell = Cell::header(CellKind::DimensionTotal, TOTAL_LABEL)
                        .with_span(1, depth)
                        .with_handle(handle);
                    if sortable {
                        self.sort_triggers.push(SortTrigger {
                            target: TOTAL_SORT_KEY.to_string(),
                            handle,
                        });
                        cell = cell.with_sort_key(TOTAL_SORT_KEY);
                    }
                    cell
                } else {
                    Cell::hidden(CellKind::DimensionTotal)
                });
            }

            rows.push(row);
        }

        rows
    }

    /// Cells above the row headers on column header floor `floor`.
    fn corner_cells(&self, floor: usize, depth: usize, label_cols: usize, show_labels: bool) -> Vec<Cell> {
        if label_cols == 0 {
            return Vec::new();
        }

        if !show_labels {
            let mut cells = Vec::with_capacity(label_cols);
            if floor == 0 {
                cells.push(Cell::corner(label_cols, depth));
            } else {
                cells.push(Cell::hidden(CellKind::Empty));
            }
            cells.extend((1..label_cols).map(|_| Cell::hidden(CellKind::Empty)));
            return cells;
        }

        let col_label = &self.layout.columns[floor].label;
        if floor < depth - 1 {
            let mut cells: Vec<Cell> = (1..label_cols).map(|_| Cell::label("")).collect();
            cells.push(Cell::label(col_label.clone()));
            return cells;
        }

        let rows = &self.layout.rows;
        let mut cells: Vec<Cell> = rows[..label_cols - 1]
            .iter()
            .map(|d| Cell::label(d.label.clone()))
            .collect();
        cells.push(Cell::label(format!("{} / {}", rows[label_cols - 1].label, col_label)));
        cells
    }

    /// Single header row of row dimension labels when there is no column
    /// axis.
    fn row_label_header(&self, label_cols: usize) -> Option<Vec<Cell>> {
        if label_cols == 0 || !self.layout.options.show_dimension_labels {
            return None;
        }
        let mut row: Vec<Cell> = self.layout.rows.iter().map(|d| Cell::label(d.label.clone())).collect();
        row.push(Cell::corner(1, 1));
        Some(row)
    }

    // ------------------------------------------------------------------------
    // Body rows
    // ------------------------------------------------------------------------

    fn add_body_rows(
        &self,
        view: &mut CrosstabView,
        label_cols: usize,
        value_rows: Vec<Vec<Cell>>,
        row_totals: Option<Vec<Cell>>,
    ) {
        let group = match (&self.row_axis, self.has_subtotal_rows()) {
            (Some(axis), true) => axis.floor(0).span,
            _ => usize::MAX,
        };

        let mut group_rows: Vec<(Vec<Cell>, Option<Cell>)> = Vec::new();
        let mut group_start = 0;

        for (i, values) in value_rows.into_iter().enumerate() {
            let collapsed = self.row_axis.as_ref().map_or(false, |a| a.is_leaf_collapsed(i));
            let total = row_totals.as_ref().map(|t| t[i].clone());

            let mut cells = self.row_header_cells(i);
            cells.extend(values.iter().cloned());
            cells.extend(total.clone());
            view.add_row(cells, RowType::Body, !collapsed, Some(i));

            group_rows.push((values, total));
            if group != usize::MAX && group_rows.len() == group {
                let row = self.subtotal_row(label_cols, group_start, &group_rows);
                let visible = !row.first().map_or(false, |c| c.collapsed);
                view.add_row(row, RowType::Subtotal, visible, None);
                group_rows.clear();
                group_start = i + 1;
            }
        }
    }

    fn row_header_cells(&self, index: usize) -> Vec<Cell> {
        let axis = match &self.row_axis {
            Some(axis) => axis,
            None => return Vec::new(),
        };

        (0..axis.depth())
            .map(|f| match axis.visible_span(f, index) {
                Some(span) => {
                    let node = axis.node(f, index);
                    Cell::dimension(self.layout.item_label(axis.node_id(f, index)), node.handle)
                        .with_span(1, span)
                }
                None => {
                    let run = axis.node(f, index).oldest_sibling;
                    Cell::hidden(CellKind::Dimension).with_collapsed(axis.node(f, run).collapsed)
                }
            })
            .collect()
    }

    fn subtotal_row(&self, label_cols: usize, group_start: usize, group: &[(Vec<Cell>, Option<Cell>)]) -> Vec<Cell> {
        let collapsed = self
            .row_axis
            .as_ref()
            .map_or(false, |axis| axis.node(0, group_start).collapsed);

        let mut row = Vec::new();
        row.push(Cell::header(CellKind::DimensionSubtotal, "").with_span(label_cols, 1));
        row.extend((1..label_cols).map(|_| Cell::hidden(CellKind::DimensionSubtotal)));

        let width = group.first().map_or(0, |(values, _)| values.len());
        for c in 0..width {
            let kind = match group[0].0[c].kind {
                CellKind::Value => CellKind::ValueSubtotal,
                _ => CellKind::ValueSubtotalTotal,
            };
            row.push(aggregate(kind, group.iter().map(|(values, _)| &values[c])));
        }

        if self.has_total_column() {
            row.push(aggregate(
                CellKind::ValueTotalSubgrandtotal,
                group.iter().filter_map(|(_, total)| total.as_ref()),
            ));
        }

        row.into_iter().map(|cell| cell.with_collapsed(collapsed)).collect()
    }

    // ------------------------------------------------------------------------
    // Total row
    // ------------------------------------------------------------------------

    fn total_row(&self, label_cols: usize, column_totals: Vec<Cell>) -> Vec<Cell> {
        let mut row = Vec::new();
        row.push(Cell::header(CellKind::DimensionTotal, TOTAL_LABEL).with_span(label_cols, 1));
        row.extend((1..label_cols).map(|_| Cell::hidden(CellKind::DimensionTotal)));

        let grand_total = if self.has_grand_total() {
            Some(aggregate(CellKind::GrandTotal, column_totals.iter()))
        } else {
            None
        };

        row.extend(self.with_subtotal_columns(column_totals, CellKind::ValueTotalSubgrandtotal));
        row.extend(grand_total);
        row
    }

    // ------------------------------------------------------------------------
    // Finishing passes
    // ------------------------------------------------------------------------

    fn filter_summaries(&self) -> Vec<FilterSummary> {
        self.layout
            .filters
            .iter()
            .map(|dim| FilterSummary {
                dimension: dim.name.clone(),
                label: dim.label.clone(),
                items: dim
                    .ids
                    .iter()
                    .map(|id| self.layout.item_label(id).to_string())
                    .collect(),
            })
            .collect()
    }

    fn apply_digit_grouping(&self, view: &mut CrosstabView) {
        let separator = self.layout.options.digit_group_separator;
        for cell in view.cells.iter_mut().flatten() {
            if cell.kind.is_value() && !cell.empty {
                cell.display_text = group_digits(&cell.display_text, separator);
            }
        }
    }

    fn apply_legend_colors(&self, view: &mut CrosstabView) {
        let legend_set = match &self.layout.legend_set {
            Some(set) => set,
            None => return,
        };
        for cell in view.cells.iter_mut().flatten() {
            if cell.kind == CellKind::Value && !cell.empty {
                cell.legend_color = legend_set.color_for(cell.value).map(str::to_string);
            }
        }
    }
}

/// Sums cells into an aggregate of `kind`. The aggregate is empty when
/// every input is empty and collapsed when every input is collapsed.
fn aggregate<'c>(kind: CellKind, cells: impl Iterator<Item = &'c Cell>) -> Cell {
    let mut sum = 0.0;
    let mut any_value = false;
    let mut all_collapsed = true;
    let mut count = 0;

    for cell in cells {
        sum += cell.value;
        any_value |= !cell.empty;
        all_collapsed &= cell.collapsed;
        count += 1;
    }

    Cell::aggregate(kind, sum, !any_value).with_collapsed(count > 0 && all_collapsed)
}

// ============================================================================
// ROW TOTALS
// ============================================================================

/// Total of the values stored under `row_key` across `col_ids`. `None`
/// when no column holds a value for the row.
pub fn row_total(values: &ValueIndex, col_ids: &[String], row_key: &str) -> Option<f64> {
    if col_ids.is_empty() {
        return values.get(row_key).map(|v| v.contribution());
    }

    let mut sum = 0.0;
    let mut found = false;
    for col in col_ids {
        if let Some(value) = values.get(&format!("{}{}", col, row_key)) {
            sum += value.contribution();
            found = true;
        }
    }
    found.then_some(sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::IndexedValue;

    fn number(value: f64) -> IndexedValue {
        IndexedValue::Number {
            value,
            text: value.to_string(),
        }
    }

    #[test]
    fn test_row_total_distinguishes_empty_from_zero() {
        let mut values = ValueIndex::new();
        values.insert("c1r1", number(0.0));
        values.insert("c2r1", number(0.0));
        values.insert("c1r2", number(4.0));
        values.insert("c2r2", number(6.0));
        let cols = vec!["c1".to_string(), "c2".to_string()];

        assert_eq!(row_total(&values, &cols, "r1"), Some(0.0));
        assert_eq!(row_total(&values, &cols, "r2"), Some(10.0));
        assert_eq!(row_total(&values, &cols, "r3"), None);
    }

    #[test]
    fn test_aggregate_empty_and_collapsed() {
        let cells = vec![
            Cell::value(None, CellHandle(0)).with_collapsed(true),
            Cell::value(None, CellHandle(1)).with_collapsed(true),
        ];
        let total = aggregate(CellKind::ValueTotal, cells.iter());
        assert!(total.empty);
        assert!(total.collapsed);

        let cells = vec![
            Cell::value(Some((2.0, "2".to_string())), CellHandle(0)),
            Cell::value(None, CellHandle(1)),
        ];
        let total = aggregate(CellKind::ValueTotal, cells.iter());
        assert!(!total.empty);
        assert!(!total.collapsed);
        assert_eq!(total.value, 2.0);
    }
}
