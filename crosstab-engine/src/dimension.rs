//! FILENAME: crosstab-engine/src/dimension.rs
//! Dimension Model - validated dimensions and layouts.
//!
//! Raw configuration is checked exactly once here. Everything downstream
//! (synchronizer, axis builder, table assembler) takes these typed records
//! and assumes they are valid:
//! - every dimension has an object name
//! - item ids are unique and in configured order
//! - forbidden dimension combinations were rejected up front

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::definition::{
    DigitGroupSeparator, DisplayDensity, FontSize, LayoutConfig, RawDimension, SortConfig,
};
use crate::error::{CrosstabError, CrosstabResult};

/// Header name of the data dimension (indicators, data elements, ...).
pub const DATA_DIMENSION: &str = "dx";

/// Header name of the reserved category dimension.
pub const CATEGORY_DIMENSION: &str = "co";

pub const PERIOD_DIMENSION: &str = "pe";

pub const ORG_UNIT_DIMENSION: &str = "ou";

// ============================================================================
// ITEMS AND KINDS
// ============================================================================

/// One dimension item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
}

impl Item {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Item {
            id: id.into(),
            name: name.into(),
        }
    }

    /// An item whose display name is not known yet.
    pub fn unnamed(id: impl Into<String>) -> Self {
        Item {
            id: id.into(),
            name: String::new(),
        }
    }
}

/// What a dimension object name stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DimensionKind {
    Indicator,
    DataElement,
    /// Detailed data elements (data element + category option combo).
    Operand,
    DataSet,
    Category,
    Period,
    OrganisationUnit,
    /// Group sets, dynamic dimensions and anything else.
    Other,
}

impl DimensionKind {
    pub fn from_object_name(name: &str) -> Self {
        match name {
            "in" => DimensionKind::Indicator,
            "de" => DimensionKind::DataElement,
            "dc" => DimensionKind::Operand,
            "ds" => DimensionKind::DataSet,
            CATEGORY_DIMENSION => DimensionKind::Category,
            PERIOD_DIMENSION => DimensionKind::Period,
            ORG_UNIT_DIMENSION => DimensionKind::OrganisationUnit,
            _ => DimensionKind::Other,
        }
    }

    /// Whether this kind is part of the merged data dimension.
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            DimensionKind::Indicator
                | DimensionKind::DataElement
                | DimensionKind::Operand
                | DimensionKind::DataSet
        )
    }

    /// Only the category dimension may be configured without items;
    /// the server fills them in.
    pub fn requires_items(&self) -> bool {
        !matches!(self, DimensionKind::Category)
    }

    fn allowed_as_filter(&self) -> bool {
        !matches!(
            self,
            DimensionKind::Indicator | DimensionKind::Category | DimensionKind::DataSet
        )
    }
}

/// How the final item order of a dimension is decided once the result
/// set arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemOrdering {
    /// Server metadata order if present, otherwise configured order.
    Configured,
    /// Explicit "IN" filter: this order, restricted to confirmed ids.
    Explicit(Vec<String>),
    /// Legend set order (ascending start value).
    Legend(String),
}

// ============================================================================
// DIMENSION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    /// Object name as configured ("in", "pe", ...).
    pub object_name: String,
    pub kind: DimensionKind,
    pub items: Vec<Item>,
    pub ordering: ItemOrdering,
    pub legend_ref: Option<String>,
}

impl Dimension {
    /// Validates a raw dimension record.
    ///
    /// Duplicate item ids are dropped silently (first occurrence wins).
    pub fn from_raw(raw: &RawDimension) -> CrosstabResult<Dimension> {
        let object_name = match raw.dimension.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                return Err(CrosstabError::invalid_dimension(
                    "<missing>",
                    "dimension identifier is missing",
                ))
            }
        };
        let kind = DimensionKind::from_object_name(&object_name);

        let raw_items = raw.items.as_deref().unwrap_or(&[]);
        if raw_items.is_empty() && kind.requires_items() {
            return Err(CrosstabError::invalid_dimension(object_name, "no items"));
        }

        let mut seen = FxHashSet::default();
        let mut items = Vec::with_capacity(raw_items.len());
        for raw_item in raw_items {
            let id = match raw_item.id.as_deref() {
                Some(id) if !id.is_empty() => id,
                _ => {
                    return Err(CrosstabError::invalid_dimension(
                        object_name,
                        "item without id",
                    ))
                }
            };
            if !seen.insert(id.to_string()) {
                log::debug!("dimension '{}': dropping duplicate item '{}'", object_name, id);
                continue;
            }
            items.push(Item::new(id, raw_item.name.clone().unwrap_or_default()));
        }

        let legend_ref = raw.legend_set.as_ref().map(|l| l.id.clone());
        let ordering = match raw.filter.as_deref().and_then(parse_in_filter) {
            Some(ids) => ItemOrdering::Explicit(ids),
            None => match &legend_ref {
                Some(id) => ItemOrdering::Legend(id.clone()),
                None => ItemOrdering::Configured,
            },
        };

        Ok(Dimension {
            object_name,
            kind,
            items,
            ordering,
            legend_ref,
        })
    }

    /// Header name this dimension appears under in a result set.
    pub fn dimension_name(&self) -> &str {
        if self.kind.is_data() {
            DATA_DIMENSION
        } else {
            &self.object_name
        }
    }

    pub fn item_ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.id.as_str())
    }
}

/// Parses an "IN:a;b;c" item filter into its ids. Other operators do
/// not define an order and yield `None`.
fn parse_in_filter(filter: &str) -> Option<Vec<String>> {
    let (operator, operand) = filter.split_once(':')?;
    if !operator.trim().eq_ignore_ascii_case("IN") {
        return None;
    }

    let mut seen = FxHashSet::default();
    let ids: Vec<String> = operand
        .split(';')
        .map(str::trim)
        .filter(|id| !id.is_empty() && seen.insert(*id))
        .map(str::to_string)
        .collect();

    if ids.is_empty() {
        None
    } else {
        Some(ids)
    }
}

// ============================================================================
// LAYOUT
// ============================================================================

/// Display and totals switches of a validated layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutOptions {
    pub show_row_totals: bool,
    pub show_col_totals: bool,
    pub show_row_sub_totals: bool,
    pub show_col_sub_totals: bool,
    pub show_dimension_labels: bool,
    pub hide_empty_rows: bool,
    pub show_hierarchy: bool,
    pub digit_group_separator: DigitGroupSeparator,
    pub display_density: DisplayDensity,
    pub font_size: FontSize,
}

impl From<&LayoutConfig> for LayoutOptions {
    fn from(config: &LayoutConfig) -> Self {
        LayoutOptions {
            show_row_totals: config.show_row_totals,
            show_col_totals: config.show_col_totals,
            show_row_sub_totals: config.show_row_sub_totals,
            show_col_sub_totals: config.show_col_sub_totals,
            show_dimension_labels: config.show_dimension_labels,
            hide_empty_rows: config.hide_empty_rows,
            show_hierarchy: config.show_hierarchy,
            digit_group_separator: config.digit_group_separator,
            display_density: config.display_density,
            font_size: config.font_size,
        }
    }
}

impl Default for LayoutOptions {
    fn default() -> Self {
        LayoutOptions::from(&LayoutConfig::default())
    }
}

/// A layout whose dimensions passed validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub name: Option<String>,
    pub columns: Vec<Dimension>,
    pub rows: Vec<Dimension>,
    pub filters: Vec<Dimension>,
    pub options: LayoutOptions,
    pub legend_set: Option<String>,
    pub sorting: Option<SortConfig>,
}

/// Object-name pairs the analytics backend refuses to combine.
const EXCLUSIVE_KINDS: [(DimensionKind, DimensionKind); 4] = [
    (DimensionKind::Operand, DimensionKind::Indicator),
    (DimensionKind::Operand, DimensionKind::DataElement),
    (DimensionKind::Operand, DimensionKind::DataSet),
    (DimensionKind::Operand, DimensionKind::Category),
];

impl Layout {
    pub fn from_config(config: &LayoutConfig) -> CrosstabResult<Layout> {
        let columns = validate_all(&config.columns)?;
        let rows = validate_all(&config.rows)?;
        let filters = validate_all(&config.filters)?;

        let layout = Layout {
            name: config.name.clone(),
            columns,
            rows,
            filters,
            options: LayoutOptions::from(config),
            legend_set: config.legend_set.as_ref().map(|l| l.id.clone()),
            sorting: config.sorting.clone(),
        };
        layout.validate_special_cases()?;

        log::debug!(
            "layout validated: {} column, {} row, {} filter dimensions",
            layout.columns.len(),
            layout.rows.len(),
            layout.filters.len()
        );
        Ok(layout)
    }

    fn validate_special_cases(&self) -> CrosstabResult<()> {
        if let Some(dim) = self.filters.iter().find(|d| !d.kind.allowed_as_filter()) {
            return Err(CrosstabError::ForbiddenFilterDimension {
                dimension: dim.object_name.clone(),
            });
        }

        for (first, second) in EXCLUSIVE_KINDS {
            let a = self.dimensions().find(|d| d.kind == first);
            let b = self.dimensions().find(|d| d.kind == second);
            if let (Some(a), Some(b)) = (a, b) {
                return Err(CrosstabError::MutuallyExclusiveDimensions {
                    first: a.object_name.clone(),
                    second: b.object_name.clone(),
                });
            }
        }

        Ok(())
    }

    /// All dimensions: columns, rows, then filters.
    pub fn dimensions(&self) -> impl Iterator<Item = &Dimension> {
        self.columns
            .iter()
            .chain(self.rows.iter())
            .chain(self.filters.iter())
    }

    pub fn has_dimension(&self, dimension_name: &str) -> bool {
        self.dimensions().any(|d| d.dimension_name() == dimension_name)
    }
}

fn validate_all(raw: &[RawDimension]) -> CrosstabResult<Vec<Dimension>> {
    raw.iter().map(Dimension::from_raw).collect()
}
