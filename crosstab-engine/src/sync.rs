//! FILENAME: crosstab-engine/src/sync.rs
//! Result Synchronizer - reconciles a validated layout with a result set.
//!
//! The server is authoritative for which items have data. For every
//! dimension this module decides the final item list and order, resolves
//! display names, and indexes the result rows by composite key:
//!
//! 1. Resolve ids per dimension (explicit "IN" order, legend order, server
//!    metadata order, configured order).
//! 2. Merge dimensions sharing a header name ("in" and "de" are both "dx").
//! 3. Drop axis dimensions the result does not carry at all.
//! 4. Build the `ValueIndex` keyed by column ids followed by row ids.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::axis::AxisDimension;
use crate::definition::SortConfig;
use crate::dimension::{
    Dimension, ItemOrdering, Layout, LayoutOptions, CATEGORY_DIMENSION, DATA_DIMENSION,
};
use crate::error::{CrosstabError, CrosstabResult};
use crate::format::{number_text, parse_number};
use crate::legend::{LegendSet, RenderContext};
use crate::result::{MetaData, ResponseCell, ResultSet, VALUE_HEADER};

// ============================================================================
// WARNINGS
// ============================================================================

/// Non-fatal inconsistencies found while synchronizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncWarning {
    /// A result row has a different width than the header list. The row is
    /// still read positionally.
    HeaderRowMismatch {
        row: usize,
        headers: usize,
        cells: usize,
    },
    /// An axis dimension does not appear among the result headers.
    DroppedDimension { dimension: String },
    UnknownLegendSet { id: String },
}

impl fmt::Display for SyncWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncWarning::HeaderRowMismatch { row, headers, cells } => write!(
                f,
                "result row {} has {} cells but there are {} headers",
                row, cells, headers
            ),
            SyncWarning::DroppedDimension { dimension } => {
                write!(f, "dimension '{}' is not part of the result, dropped", dimension)
            }
            SyncWarning::UnknownLegendSet { id } => write!(f, "unknown legend set '{}'", id),
        }
    }
}

// ============================================================================
// VALUE INDEX
// ============================================================================

/// One indexed result value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexedValue {
    Number { value: f64, text: String },
    Boolean(bool),
    Text(String),
}

impl IndexedValue {
    pub fn from_cell(cell: &ResponseCell) -> Option<IndexedValue> {
        match cell {
            ResponseCell::Number(n) => Some(IndexedValue::Number {
                value: *n,
                text: number_text(*n),
            }),
            ResponseCell::Boolean(b) => Some(IndexedValue::Boolean(*b)),
            ResponseCell::Text(s) => Some(match parse_number(s) {
                Some(value) => IndexedValue::Number {
                    value,
                    text: number_text(value),
                },
                None => IndexedValue::Text(s.clone()),
            }),
            ResponseCell::Null => None,
        }
    }

    /// Amount this value adds to totals. Booleans count as one, text as
    /// nothing.
    pub fn contribution(&self) -> f64 {
        match self {
            IndexedValue::Number { value, .. } => *value,
            IndexedValue::Boolean(_) => 1.0,
            IndexedValue::Text(_) => 0.0,
        }
    }

    /// Numeric value used for sorting and legend lookup.
    pub fn numeric(&self) -> Option<f64> {
        match self {
            IndexedValue::Number { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn display_text(&self) -> String {
        match self {
            IndexedValue::Number { text, .. } => text.clone(),
            IndexedValue::Boolean(b) => b.to_string(),
            IndexedValue::Text(s) => s.clone(),
        }
    }
}

/// Dense lookup from composite key to result value. An absent key is an
/// empty cell, not a zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueIndex {
    entries: FxHashMap<String, IndexedValue>,
}

impl ValueIndex {
    pub fn new() -> Self {
        ValueIndex::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: IndexedValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&IndexedValue> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indexes `result` with keys made of the cells under `key_headers`,
    /// concatenated in that order.
    pub fn build(
        result: &ResultSet,
        key_headers: &[String],
        warnings: &mut Vec<SyncWarning>,
    ) -> CrosstabResult<ValueIndex> {
        let mut index = ValueIndex::new();
        if result.rows.is_empty() {
            return Ok(index);
        }

        let value_pos = result
            .header_index(VALUE_HEADER)
            .ok_or(CrosstabError::MissingValueHeader)?;
        let key_pos: Vec<usize> = key_headers
            .iter()
            .filter_map(|name| result.header_index(name))
            .collect();

        for (r, row) in result.rows.iter().enumerate() {
            if row.len() != result.headers.len() {
                let warning = SyncWarning::HeaderRowMismatch {
                    row: r,
                    headers: result.headers.len(),
                    cells: row.len(),
                };
                log::warn!("{}", warning);
                warnings.push(warning);
            }

            let key: String = key_pos
                .iter()
                .map(|&p| row.get(p).map(ResponseCell::key_text).unwrap_or_default())
                .collect();

            if let Some(value) = row.get(value_pos).and_then(IndexedValue::from_cell) {
                index.insert(key, value);
            }
        }

        Ok(index)
    }
}

// ============================================================================
// SYNCHRONIZED LAYOUT
// ============================================================================

/// A dimension after reconciliation: one per header name and axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedDimension {
    /// Header name ("dx", "pe", ...).
    pub name: String,
    /// Display label of the dimension itself.
    pub label: String,
    /// Final item ids, in display order.
    pub ids: Vec<String>,
}

impl SyncedDimension {
    pub fn to_axis_dimension(&self) -> AxisDimension {
        AxisDimension::new(self.name.clone(), self.ids.clone())
    }
}

#[derive(Debug, Clone)]
pub struct SyncedLayout {
    pub name: Option<String>,
    pub columns: Vec<SyncedDimension>,
    pub rows: Vec<SyncedDimension>,
    pub filters: Vec<SyncedDimension>,
    pub options: LayoutOptions,
    pub legend_set: Option<LegendSet>,
    pub sorting: Option<SortConfig>,
    /// Item id to display label (hierarchy prefix applied when enabled).
    pub item_labels: FxHashMap<String, String>,
}

impl SyncedLayout {
    pub fn item_label<'a>(&'a self, id: &'a str) -> &'a str {
        self.item_labels.get(id).map(String::as_str).unwrap_or(id)
    }

    /// Header names used to build value keys: columns then rows.
    pub fn axis_dimension_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .chain(self.rows.iter())
            .map(|d| d.name.clone())
            .collect()
    }

    pub fn column_dimensions(&self) -> Vec<AxisDimension> {
        self.columns.iter().map(SyncedDimension::to_axis_dimension).collect()
    }

    pub fn row_dimensions(&self) -> Vec<AxisDimension> {
        self.rows.iter().map(SyncedDimension::to_axis_dimension).collect()
    }

    /// Mutable access to the outermost row dimension.
    pub fn outer_row_mut(&mut self) -> Option<&mut SyncedDimension> {
        self.rows.first_mut()
    }
}

/// Everything one synchronization pass produces.
#[derive(Debug, Clone)]
pub struct Synchronized {
    pub layout: SyncedLayout,
    pub values: ValueIndex,
    pub warnings: Vec<SyncWarning>,
}

// ============================================================================
// SYNCHRONIZE
// ============================================================================

pub fn synchronize(
    layout: &Layout,
    result: &ResultSet,
    ctx: &RenderContext,
) -> CrosstabResult<Synchronized> {
    let meta = &result.meta_data;
    let mut warnings = Vec::new();

    // Final ids per header name, merged over the whole layout
    let mut ids_by_name: FxHashMap<String, Vec<String>> = FxHashMap::default();
    for dim in layout.dimensions() {
        let ids = resolve_ids(dim, meta, ctx, &mut warnings);
        let merged = ids_by_name.entry(dim.dimension_name().to_string()).or_default();
        for id in ids {
            if !merged.contains(&id) {
                merged.push(id);
            }
        }
    }

    let columns = synced_axis(&layout.columns, &ids_by_name, result, meta, &mut warnings, true);
    let rows = synced_axis(&layout.rows, &ids_by_name, result, meta, &mut warnings, true);
    let filters = synced_axis(&layout.filters, &ids_by_name, result, meta, &mut warnings, false);

    let legend_set = match &layout.legend_set {
        Some(id) => match ctx.legend_set(id) {
            Some(set) => Some(set.clone()),
            None => {
                let warning = SyncWarning::UnknownLegendSet { id: id.clone() };
                log::warn!("{}", warning);
                warnings.push(warning);
                None
            }
        },
        None => None,
    };

    let mut configured_names: FxHashMap<&str, &str> = FxHashMap::default();
    for item in layout.dimensions().flat_map(|d| d.items.iter()) {
        if !item.name.is_empty() {
            configured_names.entry(item.id.as_str()).or_insert(item.name.as_str());
        }
    }

    let mut item_labels = FxHashMap::default();
    for id in ids_by_name.values().flatten() {
        if item_labels.contains_key(id) {
            continue;
        }
        let configured = configured_names.get(id.as_str()).copied();
        let label = item_label(id, configured, meta, layout.options.show_hierarchy);
        item_labels.insert(id.clone(), label);
    }

    let synced = SyncedLayout {
        name: layout.name.clone(),
        columns,
        rows,
        filters,
        options: layout.options,
        legend_set,
        sorting: layout.sorting.clone(),
        item_labels,
    };

    let key_headers = value_key_headers(&synced, result);
    let values = ValueIndex::build(result, &key_headers, &mut warnings)?;

    log::debug!(
        "synchronized {} result rows into {} values ({} warnings)",
        result.rows.len(),
        values.len(),
        warnings.len()
    );

    Ok(Synchronized {
        layout: synced,
        values,
        warnings,
    })
}

/// Final ids of one configured dimension.
fn resolve_ids(
    dim: &Dimension,
    meta: &MetaData,
    ctx: &RenderContext,
    warnings: &mut Vec<SyncWarning>,
) -> Vec<String> {
    let confirmed = meta.dimension_ids(dim.dimension_name());
    let restrict = |ids: Vec<String>| -> Vec<String> {
        if confirmed.is_empty() {
            ids
        } else {
            ids.into_iter().filter(|id| confirmed.contains(id)).collect()
        }
    };

    match &dim.ordering {
        ItemOrdering::Explicit(ids) => return restrict(ids.clone()),
        ItemOrdering::Legend(set_id) => match ctx.legend_set(set_id) {
            Some(set) => {
                let ids = set.ordered_ids().into_iter().map(str::to_string).collect();
                return restrict(ids);
            }
            None => {
                let warning = SyncWarning::UnknownLegendSet { id: set_id.clone() };
                log::warn!("{} (dimension '{}')", warning, dim.object_name);
                warnings.push(warning);
            }
        },
        ItemOrdering::Configured => {}
    }

    if confirmed.is_empty() {
        dim.item_ids().map(str::to_string).collect()
    } else {
        confirmed
    }
}

fn synced_axis(
    dims: &[Dimension],
    ids_by_name: &FxHashMap<String, Vec<String>>,
    result: &ResultSet,
    meta: &MetaData,
    warnings: &mut Vec<SyncWarning>,
    require_header: bool,
) -> Vec<SyncedDimension> {
    let mut synced: Vec<SyncedDimension> = Vec::new();

    for dim in dims {
        let name = dim.dimension_name();
        if synced.iter().any(|d| d.name == name) {
            continue;
        }
        if require_header && !result.has_header(name) {
            let warning = SyncWarning::DroppedDimension {
                dimension: name.to_string(),
            };
            log::warn!("{}", warning);
            warnings.push(warning);
            continue;
        }

        synced.push(SyncedDimension {
            name: name.to_string(),
            label: dimension_label(name, meta),
            ids: ids_by_name.get(name).cloned().unwrap_or_default(),
        });
    }

    synced
}

/// Header names making up a value key. A category header that is not on
/// any axis still goes right after the data dimension.
fn value_key_headers(layout: &SyncedLayout, result: &ResultSet) -> Vec<String> {
    let mut names = layout.axis_dimension_names();

    let category_on_axis = names.iter().any(|n| n == CATEGORY_DIMENSION);
    if !category_on_axis && result.has_header(CATEGORY_DIMENSION) {
        if let Some(dx) = names.iter().position(|n| n == DATA_DIMENSION) {
            names.insert(dx + 1, CATEGORY_DIMENSION.to_string());
        }
    }

    names
}

// ============================================================================
// NAMES
// ============================================================================

pub fn dimension_label(name: &str, meta: &MetaData) -> String {
    meta.names
        .get(name)
        .cloned()
        .unwrap_or_else(|| name.to_string())
}

/// Plain name of an item: metadata, configured name, boolean and option
/// labels, then the id itself.
pub fn item_name(id: &str, configured: Option<&str>, meta: &MetaData) -> String {
    if let Some(name) = meta.names.get(id) {
        return name.clone();
    }
    if let Some(name) = configured {
        return name.to_string();
    }
    meta.boolean_names
        .get(id)
        .or_else(|| meta.option_names.get(id))
        .cloned()
        .unwrap_or_else(|| id.to_string())
}

/// Ancestor names of an org unit, root excluded, each followed by " / ".
pub fn hierarchy_prefix(id: &str, meta: &MetaData) -> String {
    let path = match meta.ou_hierarchy.get(id) {
        Some(path) => path,
        None => return String::new(),
    };

    path.split('/')
        .filter(|segment| !segment.is_empty())
        .skip(1)
        .map(|segment| {
            let name = meta.names.get(segment).map(String::as_str).unwrap_or(segment);
            format!("{} / ", name)
        })
        .collect()
}

fn item_label(id: &str, configured: Option<&str>, meta: &MetaData, show_hierarchy: bool) -> String {
    let name = item_name(id, configured, meta);
    if show_hierarchy {
        format!("{}{}", hierarchy_prefix(id, meta), name)
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{LayoutConfig, LegendSetRef, RawDimension, RawItem};
    use crate::legend::Legend;
    use crate::result::ResponseHeader;

    fn result_set(headers: &[&str], rows: Vec<Vec<&str>>) -> ResultSet {
        let mut headers: Vec<ResponseHeader> = headers.iter().map(|h| ResponseHeader::dimension(*h)).collect();
        headers.push(ResponseHeader::value());
        ResultSet {
            headers,
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(ResponseCell::from).collect())
                .collect(),
            meta_data: MetaData::default(),
        }
    }

    fn layout(columns: Vec<RawDimension>, rows: Vec<RawDimension>) -> Layout {
        let config = LayoutConfig {
            columns,
            rows,
            ..Default::default()
        };
        Layout::from_config(&config).unwrap()
    }

    #[test]
    fn test_value_key_is_columns_then_rows() {
        let layout = layout(vec![RawDimension::new("pe", &["2024"])], vec![RawDimension::new("dx", &["a"])]);
        let result = result_set(&["dx", "pe"], vec![vec!["a", "2024", "7"]]);
        let synced = synchronize(&layout, &result, &RenderContext::new()).unwrap();
        assert!(synced.values.contains("2024a"));
        assert!(!synced.values.contains("a2024"));
        assert_eq!(synced.values.get("2024a").and_then(IndexedValue::numeric), Some(7.0));
    }

    #[test]
    fn test_category_inserted_after_data_dimension() {
        let layout = layout(vec![RawDimension::new("dx", &["a"])], vec![RawDimension::new("pe", &["p"])]);
        let result = result_set(&["dx", "co", "pe"], vec![vec!["a", "c", "p", "1"]]);
        let synced = synchronize(&layout, &result, &RenderContext::new()).unwrap();
        assert!(synced.values.contains("acp"));
    }

    #[test]
    fn test_metadata_restricts_and_orders_ids() {
        let layout = layout(vec![RawDimension::new("pe", &["2022", "2023", "2024"])], vec![]);
        let mut result = result_set(&["pe"], vec![]);
        result.meta_data.set_dimension_ids("pe", &["2024", "2022"]);
        let synced = synchronize(&layout, &result, &RenderContext::new()).unwrap();
        assert_eq!(synced.layout.columns[0].ids, vec!["2024", "2022"]);
    }

    #[test]
    fn test_explicit_filter_order_wins() {
        let dim = RawDimension {
            dimension: Some("age".to_string()),
            items: Some(vec![RawItem::new("a"), RawItem::new("b"), RawItem::new("c")]),
            filter: Some("IN:c;a;b".to_string()),
            legend_set: None,
        };
        let layout = layout(vec![dim], vec![]);
        let mut result = result_set(&["age"], vec![]);
        result.meta_data.set_dimension_ids("age", &["a", "c"]);
        let synced = synchronize(&layout, &result, &RenderContext::new()).unwrap();
        assert_eq!(synced.layout.columns[0].ids, vec!["c", "a"]);
    }

    #[test]
    fn test_legend_order_and_unknown_legend() {
        let dim = RawDimension {
            dimension: Some("age".to_string()),
            items: Some(vec![RawItem::new("young"), RawItem::new("old")]),
            filter: None,
            legend_set: Some(LegendSetRef { id: "ages".to_string() }),
        };
        let layout = layout(vec![dim], vec![]);
        let result = result_set(&["age"], vec![]);

        let legend = |id: &str, start: f64| Legend {
            id: id.to_string(),
            name: id.to_string(),
            start_value: start,
            end_value: start + 10.0,
            color: None,
        };
        let ctx = RenderContext::new().with_legend_set(LegendSet::new(
            "ages",
            vec![legend("old", 50.0), legend("young", 0.0)],
        ));
        let synced = synchronize(&layout, &result, &ctx).unwrap();
        assert_eq!(synced.layout.columns[0].ids, vec!["young", "old"]);

        let synced = synchronize(&layout, &result, &RenderContext::new()).unwrap();
        assert_eq!(synced.layout.columns[0].ids, vec!["young", "old"]);
        assert!(synced
            .warnings
            .contains(&SyncWarning::UnknownLegendSet { id: "ages".to_string() }));
    }

    #[test]
    fn test_data_dimensions_merge_into_one_floor() {
        let layout = layout(
            vec![RawDimension::new("in", &["i1"]), RawDimension::new("de", &["d1", "i1"])],
            vec![],
        );
        let result = result_set(&["dx"], vec![]);
        let synced = synchronize(&layout, &result, &RenderContext::new()).unwrap();
        assert_eq!(synced.layout.columns.len(), 1);
        assert_eq!(synced.layout.columns[0].ids, vec!["i1", "d1"]);
    }

    #[test]
    fn test_missing_header_drops_dimension() {
        let layout = layout(vec![RawDimension::new("pe", &["p"])], vec![RawDimension::new("ou", &["o"])]);
        let result = result_set(&["pe"], vec![vec!["p", "1"]]);
        let synced = synchronize(&layout, &result, &RenderContext::new()).unwrap();
        assert!(synced.layout.rows.is_empty());
        assert_eq!(
            synced.warnings,
            vec![SyncWarning::DroppedDimension { dimension: "ou".to_string() }]
        );
    }

    #[test]
    fn test_short_row_is_read_positionally() {
        let layout = layout(vec![RawDimension::new("pe", &["p"])], vec![]);
        let mut result = result_set(&["pe"], vec![vec!["p", "4"]]);
        result.rows.push(vec![ResponseCell::from("q")]);
        let synced = synchronize(&layout, &result, &RenderContext::new()).unwrap();
        assert_eq!(synced.values.len(), 1);
        assert!(matches!(
            synced.warnings[0],
            SyncWarning::HeaderRowMismatch { row: 1, headers: 2, cells: 1 }
        ));
    }

    #[test]
    fn test_missing_value_header_is_an_error() {
        let layout = layout(vec![RawDimension::new("pe", &["p"])], vec![]);
        let result = ResultSet {
            headers: vec![ResponseHeader::dimension("pe")],
            rows: vec![vec![ResponseCell::from("p")]],
            meta_data: MetaData::default(),
        };
        assert!(matches!(
            synchronize(&layout, &result, &RenderContext::new()),
            Err(CrosstabError::MissingValueHeader)
        ));
    }

    #[test]
    fn test_synchronize_is_idempotent() {
        let layout = layout(vec![RawDimension::new("pe", &["p", "q"])], vec![RawDimension::new("dx", &["a"])]);
        let result = result_set(&["dx", "pe"], vec![vec!["a", "p", "1"], vec!["a", "q", "2.5"]]);
        let first = synchronize(&layout, &result, &RenderContext::new()).unwrap();
        let second = synchronize(&layout, &result, &RenderContext::new()).unwrap();
        assert_eq!(first.values, second.values);
    }

    #[test]
    fn test_item_names_and_hierarchy() {
        let config = LayoutConfig {
            rows: vec![RawDimension {
                dimension: Some("ou".to_string()),
                items: Some(vec![RawItem::named("dist", "Configured")]),
                ..Default::default()
            }],
            show_hierarchy: true,
            ..Default::default()
        };
        let layout = Layout::from_config(&config).unwrap();
        let mut result = result_set(&["ou"], vec![]);
        result.meta_data.names.insert("reg".to_string(), "Region".to_string());
        result.meta_data.names.insert("ou".to_string(), "Organisation unit".to_string());
        result
            .meta_data
            .ou_hierarchy
            .insert("dist".to_string(), "/root/reg".to_string());

        let synced = synchronize(&layout, &result, &RenderContext::new()).unwrap();
        assert_eq!(synced.layout.item_label("dist"), "Region / Configured");
        assert_eq!(synced.layout.rows[0].label, "Organisation unit");
        assert_eq!(synced.layout.item_label("unknown"), "unknown");
    }

    #[test]
    fn test_value_kinds() {
        let number = IndexedValue::from_cell(&ResponseCell::from(" 12.50 ")).unwrap();
        assert_eq!(number.display_text(), "12.5");
        assert_eq!(number.contribution(), 12.5);

        let boolean = IndexedValue::from_cell(&ResponseCell::Boolean(true)).unwrap();
        assert_eq!(boolean.contribution(), 1.0);
        assert_eq!(boolean.numeric(), None);

        let text = IndexedValue::from_cell(&ResponseCell::from("n/a")).unwrap();
        assert_eq!(text.contribution(), 0.0);
        assert_eq!(text.display_text(), "n/a");

        assert!(IndexedValue::from_cell(&ResponseCell::Null).is_none());
    }
}
