//! FILENAME: crosstab-engine/src/engine.rs
//! Crosstab Engine - one render pass from configuration to view.
//!
//! This module takes a LayoutConfig (configuration) and a ResultSet (data)
//! and produces a CrosstabView (2D grid ready for rendering).
//!
//! Algorithm:
//! 1. Validate the configuration into a Layout
//! 2. Synchronize the layout with the result set and index the values
//! 3. Build the column axis
//! 4. Apply the requested sorting to the outermost row dimension
//! 5. Build the row axis and assemble the table
//!
//! A pass is atomic: axes are built and consumed inside it and nothing is
//! exposed before the view is complete.

use crate::axis::{Axis, AxisKind, HandleSeq};
use crate::definition::{LayoutConfig, SortDirection, SortTarget};
use crate::dimension::Layout;
use crate::error::CrosstabResult;
use crate::legend::RenderContext;
use crate::result::ResultSet;
use crate::sort::sort_rows;
use crate::sync::synchronize;
use crate::table::TableAssembler;
use crate::view::CrosstabView;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Renders a crosstab view from configuration and result set.
/// This is the main entry point for the engine.
pub fn render_crosstab(
    config: &LayoutConfig,
    result: &ResultSet,
    ctx: &RenderContext,
) -> CrosstabResult<CrosstabView> {
    let layout = Layout::from_config(config)?;
    let synced = synchronize(&layout, result, ctx)?;
    let mut synced_layout = synced.layout;
    let hide_empty_rows = synced_layout.options.hide_empty_rows;

    let mut handles = HandleSeq::new();
    let col_axis = Axis::build(
        AxisKind::Column,
        &synced_layout.column_dimensions(),
        hide_empty_rows,
        &mut handles,
    )?;

    if let Some(sorting) = synced_layout.sorting.clone() {
        sort_rows(&mut synced_layout, &synced.values, col_axis.as_ref(), &sorting)?;
    }

    let row_axis = Axis::build(
        AxisKind::Row,
        &synced_layout.row_dimensions(),
        hide_empty_rows,
        &mut handles,
    )?;

    let mut view = TableAssembler::new(&synced_layout, &synced.values, col_axis, row_axis, handles).assemble();
    view.warnings = synced.warnings;
    Ok(view)
}

/// Renders a crosstab from JSON configuration and result set.
pub fn render_crosstab_json(config: &str, result: &str, ctx: &RenderContext) -> CrosstabResult<CrosstabView> {
    let config = LayoutConfig::from_json(config)?;
    let result = ResultSet::from_json(result)?;
    render_crosstab(&config, &result, ctx)
}

// ============================================================================
// RENDERER
// ============================================================================

/// Keeps the configuration between render passes so that re-sorting can
/// be triggered from a rendered view.
#[derive(Debug, Clone)]
pub struct CrosstabRenderer {
    config: LayoutConfig,
    ctx: RenderContext,
}

impl CrosstabRenderer {
    pub fn new(config: LayoutConfig, ctx: RenderContext) -> Self {
        CrosstabRenderer { config, ctx }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn render(&self, result: &ResultSet) -> CrosstabResult<CrosstabView> {
        render_crosstab(&self.config, result, &self.ctx)
    }

    /// Re-sorts by `target`. The new sorting is kept only when the render
    /// succeeds; on error the previous configuration stays in place.
    pub fn resort(
        &mut self,
        result: &ResultSet,
        target: SortTarget,
        direction: SortDirection,
    ) -> CrosstabResult<CrosstabView> {
        let config = self.config.with_sorting(target, direction);
        let view = render_crosstab(&config, result, &self.ctx)?;
        self.config = config;
        Ok(view)
    }

    /// Sorts by `target`, flipping the direction when it is already the
    /// active target (a click on a sortable header).
    pub fn toggle_sort(&mut self, result: &ResultSet, target: &str) -> CrosstabResult<CrosstabView> {
        let direction = match &self.config.sorting {
            Some(current) if current.id.to_string() == target => current.direction.toggled(),
            _ => SortDirection::default(),
        };
        self.resort(result, SortTarget::Id(target.to_string()), direction)
    }
}
