//! HTML output of complete render passes.

use crosstab_engine::{render_crosstab, LayoutConfig, RenderContext, ResultSet};
use crosstab_html::{render_html, HtmlOptions};
use serde_json::json;

fn render(config: serde_json::Value, result: serde_json::Value, options: &HtmlOptions) -> String {
    let config: LayoutConfig = serde_json::from_value(config).unwrap();
    let result: ResultSet = serde_json::from_value(result).unwrap();
    let view = render_crosstab(&config, &result, &RenderContext::new()).unwrap();
    render_html(&view, options)
}

fn simple_config() -> serde_json::Value {
    json!({
        "columns": [{"dimension": "pe", "items": [{"id": "p1"}, {"id": "p2"}]}],
        "rows": [{"dimension": "ou", "items": [{"id": "o1"}, {"id": "o2"}]}]
    })
}

fn simple_result() -> serde_json::Value {
    json!({
        "headers": [{"name": "pe", "meta": true}, {"name": "ou", "meta": true}, {"name": "value"}],
        "rows": [["p1", "o1", "1500"], ["p2", "o1", "2"], ["p1", "o2", "3"]],
        "metaData": {"names": {"o1": "North & South"}}
    })
}

#[test]
fn test_full_table_markup() {
    let html = render(simple_config(), simple_result(), &HtmlOptions::default());

    assert!(html.starts_with("<table class=\"pivot\"><tr>"));
    assert!(html.ends_with("</tr></table>"));
    // header, two body rows, total row
    assert_eq!(html.matches("<tr>").count(), 4);
    assert!(html.contains("<td class=\"pivot-dim-label\">ou / pe</td>"));
    assert!(html.contains("<td class=\"pivot-dim td-sortable\" data-sort=\"p1\">p1</td>"));
    assert!(html.contains("<td class=\"pivot-dim-total td-sortable\" data-sort=\"total\">Total</td>"));
    assert!(html.contains("<td class=\"pivot-dim\">North &amp; South</td>"));
    assert!(html.contains("<td class=\"pivot-value\">1 500</td>"));
    assert!(html.contains("<td class=\"pivot-value pivot-value-empty\">&nbsp;</td>"));
    assert!(html.contains("<td class=\"pivot-value-grandtotal\">1 505</td>"));
}

#[test]
fn test_collapsed_rows_are_not_emitted() {
    let mut config = simple_config();
    config["rows"][0]["items"] = json!([{"id": "o1"}, {"id": "o2"}, {"id": "o3"}]);
    config["hideEmptyRows"] = json!(true);

    let html = render(config, simple_result(), &HtmlOptions::default());
    assert_eq!(html.matches("<tr>").count(), 4);
    assert!(!html.contains(">o3<"));
}

#[test]
fn test_table_id_and_display_classes() {
    let mut config = simple_config();
    config["displayDensity"] = json!("COMFORTABLE");
    config["fontSize"] = json!("SMALL");

    let options = HtmlOptions::default().with_table_id("t\"1").with_cell_ids();
    let html = render(config, simple_result(), &options);
    assert!(html.starts_with(
        "<table id=\"t&quot;1\" class=\"pivot displaydensity-comfortable fontsize-small\">"
    ));
    assert!(html.contains(" id=\"cell-"));
}
