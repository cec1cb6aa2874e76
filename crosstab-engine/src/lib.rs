//! FILENAME: crosstab-engine/src/lib.rs
//! Cross-tabulated table layout for multi-dimensional analytics results.
//!
//! Dimensions are assigned to columns, rows and filters; the engine lays
//! out spanning headers, totals and subtotals, collapses empty rows and
//! re-sorts rows by a column's values. Markup is left to the presentation
//! crate.
//!
//! Layers:
//! - `definition`: Serializable configuration (what the crosstab IS)
//! - `dimension`: Validated dimensions and layouts
//! - `result`: The analytics result set (input data)
//! - `sync`: Reconciles layout and result, indexes the values
//! - `axis`: Header layout of one axis
//! - `table`: Assembles the cell matrix
//! - `sort`: Reorders the outermost row dimension
//! - `view`: Renderable output (WHAT we display)
//! - `engine`: One render pass, end to end

pub mod definition;
pub mod dimension;
pub mod error;
pub mod format;
pub mod legend;
pub mod result;
pub mod sync;
pub mod axis;
pub mod table;
pub mod sort;
pub mod view;
pub mod engine;

pub use definition::*;
pub use dimension::{Dimension, DimensionKind, Item, ItemOrdering, Layout, LayoutOptions};
pub use error::{CrosstabError, CrosstabResult};
pub use legend::{Legend, LegendSet, RenderContext};
pub use result::{MetaData, ResponseCell, ResponseHeader, ResultSet};
pub use sync::{synchronize, IndexedValue, SyncWarning, SyncedLayout, Synchronized, ValueIndex};
pub use axis::{Axis, AxisDimension, AxisKind, AxisNode, CellHandle, HandleSeq};
pub use table::TableAssembler;
pub use sort::{resolve_target, sort_rows, ResolvedTarget};
pub use view::*;
pub use engine::{render_crosstab, render_crosstab_json, CrosstabRenderer};
