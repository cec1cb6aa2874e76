//! FILENAME: crosstab-engine/src/definition.rs
//! Crosstab Definition - The serializable layout configuration.
//!
//! This module contains the types that DESCRIBE a crosstab before any
//! validation happens. They mirror the JSON the analytics client sends:
//! - camelCase on the wire
//! - every flag optional, with the client's defaults
//! - dimensions still raw (unchecked ids, possibly duplicated items)
//!
//! `dimension::Layout` turns a `LayoutConfig` into validated records.

use serde::{Deserialize, Serialize};

// ============================================================================
// RAW DIMENSIONS
// ============================================================================

/// An item reference as configured by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,
}

impl RawItem {
    pub fn new(id: impl Into<String>) -> Self {
        RawItem {
            id: Some(id.into()),
            name: None,
        }
    }

    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        RawItem {
            id: Some(id.into()),
            name: Some(name.into()),
        }
    }
}

/// Reference to a legend set by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendSetRef {
    pub id: String,
}

/// A dimension exactly as it arrives from the layout configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDimension {
    /// Object name of the dimension ("in", "pe", "ou", a group set id, ...).
    #[serde(default)]
    pub dimension: Option<String>,

    #[serde(default)]
    pub items: Option<Vec<RawItem>>,

    /// Explicit item filter, e.g. "IN:a;b;c".
    #[serde(default)]
    pub filter: Option<String>,

    /// Orders the items by the legends of this set.
    #[serde(default)]
    pub legend_set: Option<LegendSetRef>,
}

impl RawDimension {
    pub fn new(dimension: impl Into<String>, item_ids: &[&str]) -> Self {
        RawDimension {
            dimension: Some(dimension.into()),
            items: Some(item_ids.iter().map(|id| RawItem::new(*id)).collect()),
            filter: None,
            legend_set: None,
        }
    }
}

// ============================================================================
// DISPLAY OPTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DigitGroupSeparator {
    #[default]
    Space,
    Comma,
    None,
}

impl DigitGroupSeparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            DigitGroupSeparator::Space => " ",
            DigitGroupSeparator::Comma => ",",
            DigitGroupSeparator::None => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisplayDensity {
    Compact,
    #[default]
    Normal,
    Comfortable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FontSize {
    Small,
    #[default]
    Normal,
    Large,
}

// ============================================================================
// SORTING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// What to sort the rows by, as the client sends it.
/// A number is a 1-based column index (0 means the row total column),
/// a string is either a column composite id or "total".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortTarget {
    Index(u32),
    Id(String),
}

impl std::fmt::Display for SortTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortTarget::Index(i) => write!(f, "{}", i),
            SortTarget::Id(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortConfig {
    pub id: SortTarget,

    #[serde(default)]
    pub direction: SortDirection,

    /// Row dimension to reorder. Only the outermost row dimension is
    /// sortable; `None` means "the outermost one".
    #[serde(default)]
    pub dimension: Option<String>,
}

// ============================================================================
// LAYOUT CONFIG
// ============================================================================

fn default_true() -> bool {
    true
}

/// The complete, serializable layout configuration of a crosstab.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    #[serde(default)]
    pub name: Option<String>,

    /// Dimensions on the column axis (outermost first).
    #[serde(default)]
    pub columns: Vec<RawDimension>,

    /// Dimensions on the row axis (outermost first).
    #[serde(default)]
    pub rows: Vec<RawDimension>,

    /// Dimensions that only restrict the query.
    #[serde(default)]
    pub filters: Vec<RawDimension>,

    /// Total column at the end of every row.
    #[serde(default = "default_true", alias = "rowTotals")]
    pub show_row_totals: bool,

    /// Total row below the body.
    #[serde(default = "default_true", alias = "colTotals")]
    pub show_col_totals: bool,

    /// Subtotal columns after every outermost column group.
    #[serde(default = "default_true", alias = "rowSubTotals")]
    pub show_row_sub_totals: bool,

    /// Subtotal rows after every outermost row group.
    #[serde(default = "default_true", alias = "colSubTotals")]
    pub show_col_sub_totals: bool,

    #[serde(default = "default_true")]
    pub show_dimension_labels: bool,

    #[serde(default)]
    pub hide_empty_rows: bool,

    #[serde(default)]
    pub show_hierarchy: bool,

    #[serde(default)]
    pub digit_group_separator: DigitGroupSeparator,

    #[serde(default)]
    pub display_density: DisplayDensity,

    #[serde(default)]
    pub font_size: FontSize,

    /// Legend set used to colour value cells.
    #[serde(default)]
    pub legend_set: Option<LegendSetRef>,

    #[serde(default)]
    pub sorting: Option<SortConfig>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            name: None,
            columns: Vec::new(),
            rows: Vec::new(),
            filters: Vec::new(),
            show_row_totals: true,
            show_col_totals: true,
            show_row_sub_totals: true,
            show_col_sub_totals: true,
            show_dimension_labels: true,
            hide_empty_rows: false,
            show_hierarchy: false,
            digit_group_separator: DigitGroupSeparator::Space,
            display_density: DisplayDensity::Normal,
            font_size: FontSize::Normal,
            legend_set: None,
            sorting: None,
        }
    }
}

impl LayoutConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Returns a copy of this configuration sorted by `target`.
    pub fn with_sorting(&self, target: SortTarget, direction: SortDirection) -> Self {
        let mut config = self.clone();
        config.sorting = Some(SortConfig {
            id: target,
            direction,
            dimension: None,
        });
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_client() {
        let config = LayoutConfig::from_json("{}").unwrap();
        assert!(config.show_row_totals);
        assert!(config.show_col_totals);
        assert!(config.show_row_sub_totals);
        assert!(config.show_col_sub_totals);
        assert!(config.show_dimension_labels);
        assert!(!config.hide_empty_rows);
        assert!(!config.show_hierarchy);
        assert_eq!(config.digit_group_separator, DigitGroupSeparator::Space);
    }

    #[test]
    fn test_legacy_total_aliases() {
        let config = LayoutConfig::from_json(r#"{"rowTotals": false, "colSubTotals": false}"#).unwrap();
        assert!(!config.show_row_totals);
        assert!(!config.show_col_sub_totals);
        assert!(config.show_col_totals);
    }

    #[test]
    fn test_sort_target_accepts_number_or_string() {
        let config = LayoutConfig::from_json(
            r#"{"sorting": {"id": 2, "direction": "ASC"}}"#,
        )
        .unwrap();
        let sorting = config.sorting.unwrap();
        assert_eq!(sorting.id, SortTarget::Index(2));
        assert_eq!(sorting.direction, SortDirection::Asc);

        let config = LayoutConfig::from_json(r#"{"sorting": {"id": "total"}}"#).unwrap();
        let sorting = config.sorting.unwrap();
        assert_eq!(sorting.id, SortTarget::Id("total".to_string()));
        assert_eq!(sorting.direction, SortDirection::Desc);
    }

    #[test]
    fn test_raw_dimension_wire_format() {
        let dim: RawDimension = serde_json::from_str(
            r#"{"dimension": "pe", "items": [{"id": "2023"}, {"id": "2024", "name": "Year 2024"}], "legendSet": {"id": "L1"}}"#,
        )
        .unwrap();
        assert_eq!(dim.dimension.as_deref(), Some("pe"));
        assert_eq!(dim.items.as_ref().map(|i| i.len()), Some(2));
        assert_eq!(dim.legend_set, Some(LegendSetRef { id: "L1".to_string() }));
    }
}
