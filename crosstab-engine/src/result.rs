//! FILENAME: crosstab-engine/src/result.rs
//! Analytics result set as returned by the query collaborator.
//!
//! The engine only reads these types. Corrections derived from them
//! (confirmed item lists, display names) live in the synchronized layout.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Header carrying the numeric value of each row.
pub const VALUE_HEADER: &str = "value";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseHeader {
    pub name: String,

    /// Display name of the column.
    #[serde(default)]
    pub column: Option<String>,

    /// True for dimension headers, false for value headers.
    #[serde(default)]
    pub meta: bool,

    #[serde(default, rename = "type")]
    pub value_kind: Option<String>,
}

impl ResponseHeader {
    pub fn dimension(name: impl Into<String>) -> Self {
        ResponseHeader {
            name: name.into(),
            column: None,
            meta: true,
            value_kind: Some("java.lang.String".to_string()),
        }
    }

    pub fn value() -> Self {
        ResponseHeader {
            name: VALUE_HEADER.to_string(),
            column: None,
            meta: false,
            value_kind: Some("java.lang.Double".to_string()),
        }
    }
}

/// One cell of a result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseCell {
    Text(String),
    Number(f64),
    Boolean(bool),
    Null,
}

impl ResponseCell {
    /// Text used when the cell takes part in a composite key.
    pub fn key_text(&self) -> String {
        match self {
            ResponseCell::Text(s) => s.clone(),
            ResponseCell::Number(n) => n.to_string(),
            ResponseCell::Boolean(b) => b.to_string(),
            ResponseCell::Null => String::new(),
        }
    }
}

impl From<&str> for ResponseCell {
    fn from(s: &str) -> Self {
        ResponseCell::Text(s.to_string())
    }
}

impl From<f64> for ResponseCell {
    fn from(n: f64) -> Self {
        ResponseCell::Number(n)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaData {
    /// Item and dimension id to display name.
    #[serde(default)]
    pub names: FxHashMap<String, String>,

    /// Org unit id to its ancestor path ("/root/region/district").
    #[serde(default)]
    pub ou_hierarchy: FxHashMap<String, String>,

    #[serde(default)]
    pub boolean_names: FxHashMap<String, String>,

    #[serde(default)]
    pub option_names: FxHashMap<String, String>,

    /// Confirmed item ids per dimension name, either top-level
    /// (`"pe": [...]`) or nested under `"dimensions"`.
    #[serde(flatten)]
    pub extra: FxHashMap<String, serde_json::Value>,
}

impl MetaData {
    /// Item ids the server confirmed for `dimension_name`, in server order.
    /// Empty when the server said nothing about the dimension.
    pub fn dimension_ids(&self, dimension_name: &str) -> Vec<String> {
        let value = self
            .extra
            .get("dimensions")
            .and_then(|dims| dims.get(dimension_name))
            .or_else(|| self.extra.get(dimension_name));

        match value.and_then(|v| v.as_array()) {
            Some(ids) => ids
                .iter()
                .filter_map(|id| id.as_str().map(str::to_string))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn set_dimension_ids(&mut self, dimension_name: &str, ids: &[&str]) {
        self.extra.insert(
            dimension_name.to_string(),
            serde_json::Value::from(ids.to_vec()),
        );
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub headers: Vec<ResponseHeader>,

    #[serde(default)]
    pub rows: Vec<Vec<ResponseCell>>,

    #[serde(default, rename = "metaData")]
    pub meta_data: MetaData,
}

impl ResultSet {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn header_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.name == name)
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header_index(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
        "headers": [
            {"name": "dx", "column": "Data", "meta": true, "type": "java.lang.String"},
            {"name": "pe", "meta": true},
            {"name": "value", "meta": false, "type": "java.lang.Double"}
        ],
        "rows": [["a", "2024", "12.5"], ["b", "2024", 3], ["c", null, true]],
        "metaData": {
            "names": {"a": "Alpha", "dx": "Data"},
            "pe": ["2024"],
            "dimensions": {"dx": ["a", "b"]}
        }
    }"#;

    #[test]
    fn test_parse_response() {
        let result = ResultSet::from_json(RESPONSE).unwrap();
        assert_eq!(result.headers.len(), 3);
        assert_eq!(result.header_index("value"), Some(2));
        assert!(result.headers[0].meta);
        assert_eq!(result.rows[0][2], ResponseCell::Text("12.5".to_string()));
        assert_eq!(result.rows[1][2], ResponseCell::Number(3.0));
        assert_eq!(result.rows[2][1], ResponseCell::Null);
        assert_eq!(result.rows[2][2], ResponseCell::Boolean(true));
    }

    #[test]
    fn test_dimension_ids_from_either_location() {
        let result = ResultSet::from_json(RESPONSE).unwrap();
        assert_eq!(result.meta_data.dimension_ids("pe"), vec!["2024".to_string()]);
        assert_eq!(result.meta_data.dimension_ids("dx"), vec!["a".to_string(), "b".to_string()]);
        assert!(result.meta_data.dimension_ids("ou").is_empty());
        assert_eq!(result.meta_data.names.get("a").map(String::as_str), Some("Alpha"));
    }

    #[test]
    fn test_key_text() {
        assert_eq!(ResponseCell::from("x").key_text(), "x");
        assert_eq!(ResponseCell::from(2.0).key_text(), "2");
        assert_eq!(ResponseCell::Null.key_text(), "");
    }
}
