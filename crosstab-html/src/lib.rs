//! FILENAME: crosstab-html/src/lib.rs
//! HTML table rendering for crosstab views.
//!
//! Walks the abstract cell matrix of a `CrosstabView` and emits one `<tr>`
//! per visible row. Cells covered by a neighbouring span and cells of
//! collapsed rows emit nothing. Styling is left to CSS: every cell carries
//! a class derived from its kind.

use std::borrow::Cow;
use std::fmt::Write;

use crosstab_engine::{Cell, CellKind, CrosstabView, DisplayDensity, FontSize};

// ============================================================================
// OPTIONS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlOptions {
    /// `id` attribute of the `<table>` element.
    pub table_id: Option<String>,

    /// Emit `id="cell-N"` on cells that carry a handle, so the correlation
    /// map and sort triggers can be wired to the DOM.
    pub cell_ids: bool,
}

impl HtmlOptions {
    pub fn with_table_id(mut self, id: impl Into<String>) -> Self {
        self.table_id = Some(id.into());
        self
    }

    pub fn with_cell_ids(mut self) -> Self {
        self.cell_ids = true;
        self
    }
}

// ============================================================================
// RENDERING
// ============================================================================

/// Renders `view` as an HTML `<table>`.
pub fn render_html(view: &CrosstabView, options: &HtmlOptions) -> String {
    let mut html = String::with_capacity(view.row_count * view.col_count * 32);

    html.push_str("<table");
    if let Some(id) = &options.table_id {
        let _ = write!(html, " id=\"{}\"", escape_html(id));
    }
    let _ = write!(html, " class=\"{}\">", table_class(view.display_density, view.font_size));

    let mut emitted = 0;
    for row in view.rows.iter().filter(|r| r.visible) {
        html.push_str("<tr>");
        for cell in &view.cells[row.view_row] {
            if cell.is_rendered() {
                write_cell(&mut html, cell, options);
                emitted += 1;
            }
        }
        html.push_str("</tr>");
    }
    html.push_str("</table>");

    log::debug!(
        "rendered html table: {} of {} rows, {} cells",
        view.visible_row_count(),
        view.row_count,
        emitted
    );
    html
}

fn write_cell(html: &mut String, cell: &Cell, options: &HtmlOptions) {
    html.push_str("<td");

    if options.cell_ids {
        if let Some(handle) = cell.handle {
            let _ = write!(html, " id=\"cell-{}\"", handle.0);
        }
    }

    html.push_str(" class=\"");
    html.push_str(cell_class(cell.kind));
    if cell.empty && cell.kind.is_value() {
        html.push_str(" pivot-value-empty");
    }
    if cell.sort_key.is_some() {
        html.push_str(" td-sortable");
    }
    html.push('"');

    if cell.col_span > 1 {
        let _ = write!(html, " colspan=\"{}\"", cell.col_span);
    }
    if cell.row_span > 1 {
        let _ = write!(html, " rowspan=\"{}\"", cell.row_span);
    }
    if let Some(key) = &cell.sort_key {
        let _ = write!(html, " data-sort=\"{}\"", escape_html(key));
    }
    if let Some(color) = &cell.legend_color {
        let _ = write!(html, " style=\"color:{}\"", escape_html(color));
    }

    html.push('>');
    if cell.display_text.is_empty() {
        html.push_str("&nbsp;");
    } else {
        html.push_str(&escape_html(&cell.display_text));
    }
    html.push_str("</td>");
}

// ============================================================================
// CLASSES
// ============================================================================

/// CSS class of a cell kind.
pub fn cell_class(kind: CellKind) -> &'static str {
    match kind {
        CellKind::Empty => "pivot-empty",
        CellKind::DimensionLabel => "pivot-dim-label",
        CellKind::Dimension => "pivot-dim",
        CellKind::DimensionSubtotal => "pivot-dim-subtotal",
        CellKind::DimensionTotal => "pivot-dim-total",
        CellKind::Value => "pivot-value",
        CellKind::ValueSubtotal => "pivot-value-subtotal",
        CellKind::ValueSubtotalTotal => "pivot-value-subtotal-total",
        CellKind::ValueTotal => "pivot-value-total",
        CellKind::ValueTotalSubgrandtotal => "pivot-value-total-subgrandtotal",
        CellKind::GrandTotal => "pivot-value-grandtotal",
    }
}

/// Table class: "pivot" plus density and font size unless they are normal.
pub fn table_class(density: DisplayDensity, font_size: FontSize) -> String {
    let mut class = String::from("pivot");
    match density {
        DisplayDensity::Compact => class.push_str(" displaydensity-compact"),
        DisplayDensity::Comfortable => class.push_str(" displaydensity-comfortable"),
        DisplayDensity::Normal => {}
    }
    match font_size {
        FontSize::Small => class.push_str(" fontsize-small"),
        FontSize::Large => class.push_str(" fontsize-large"),
        FontSize::Normal => {}
    }
    class
}

/// Escapes text for element content and double-quoted attributes.
pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(|c| matches!(c, '&' | '<' | '>' | '"' | '\'')) {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosstab_engine::{CellHandle, RowType};

    #[test]
    fn test_escape() {
        assert_eq!(escape_html("plain"), "plain");
        assert!(matches!(escape_html("plain"), Cow::Borrowed(_)));
        assert_eq!(escape_html("<b>\"A&B\"</b>"), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;");
    }

    #[test]
    fn test_table_class() {
        assert_eq!(table_class(DisplayDensity::Normal, FontSize::Normal), "pivot");
        assert_eq!(
            table_class(DisplayDensity::Compact, FontSize::Large),
            "pivot displaydensity-compact fontsize-large"
        );
    }

    #[test]
    fn test_hidden_and_collapsed_cells_are_skipped() {
        let mut view = CrosstabView::new(1);
        view.add_row(
            vec![Cell::label("ou").with_span(2, 1), Cell::hidden(CellKind::DimensionLabel)],
            RowType::Header,
            true,
            None,
        );
        view.add_row(
            vec![
                Cell::dimension("a", CellHandle(0)),
                Cell::value(Some((1.0, "1".to_string())), CellHandle(1)).with_collapsed(true),
            ],
            RowType::Body,
            true,
            Some(0),
        );
        view.add_row(
            vec![Cell::dimension("b", CellHandle(2)), Cell::value(None, CellHandle(3))],
            RowType::Body,
            false,
            Some(1),
        );

        let html = render_html(&view, &HtmlOptions::default());
        assert_eq!(
            html,
            "<table class=\"pivot\">\
             <tr><td class=\"pivot-dim-label\" colspan=\"2\">ou</td></tr>\
             <tr><td class=\"pivot-dim\">a</td></tr>\
             </table>"
        );
    }

    #[test]
    fn test_cell_attributes() {
        let mut cell = Cell::value(Some((5.0, "5".to_string())), CellHandle(9));
        cell.legend_color = Some("#ff0000".to_string());
        let mut html = String::new();
        write_cell(&mut html, &cell, &HtmlOptions::default().with_cell_ids());
        assert_eq!(html, "<td id=\"cell-9\" class=\"pivot-value\" style=\"color:#ff0000\">5</td>");

        let header = Cell::dimension("p1", CellHandle(2)).with_sort_key("p1").with_span(1, 2);
        let mut html = String::new();
        write_cell(&mut html, &header, &HtmlOptions::default());
        assert_eq!(
            html,
            "<td class=\"pivot-dim td-sortable\" rowspan=\"2\" data-sort=\"p1\">p1</td>"
        );

        let mut html = String::new();
        write_cell(&mut html, &Cell::value(None, CellHandle(3)), &HtmlOptions::default());
        assert_eq!(html, "<td class=\"pivot-value pivot-value-empty\">&nbsp;</td>");
    }
}
