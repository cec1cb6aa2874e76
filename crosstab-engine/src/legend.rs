//! FILENAME: crosstab-engine/src/legend.rs
//! Legend sets and the read-only render context that carries them.
//!
//! Legends colour value cells by bracket (`start <= v <= end`) and can
//! define the item order of a dimension. They never change a value.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Legend {
    pub id: String,

    #[serde(default)]
    pub name: String,

    pub start_value: f64,

    pub end_value: f64,

    #[serde(default)]
    pub color: Option<String>,
}

impl Legend {
    pub fn contains(&self, value: f64) -> bool {
        self.start_value <= value && value <= self.end_value
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendSet {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub legends: Vec<Legend>,
}

impl LegendSet {
    pub fn new(id: impl Into<String>, legends: Vec<Legend>) -> Self {
        let mut set = LegendSet {
            id: id.into(),
            name: String::new(),
            legends,
        };
        set.sort_legends();
        set
    }

    /// Orders legends ascending by start value.
    pub fn sort_legends(&mut self) {
        self.legends
            .sort_by(|a, b| a.start_value.total_cmp(&b.start_value));
    }

    /// Colour of the last legend whose bracket contains `value`.
    pub fn color_for(&self, value: f64) -> Option<&str> {
        self.legends
            .iter()
            .filter(|legend| legend.contains(value))
            .last()
            .and_then(|legend| legend.color.as_deref())
    }

    /// Legend ids in start-value order.
    pub fn ordered_ids(&self) -> Vec<&str> {
        self.legends.iter().map(|l| l.id.as_str()).collect()
    }
}

/// Read-only lookup tables a render pass needs besides the layout and
/// the result set.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    legend_sets: FxHashMap<String, LegendSet>,
}

impl RenderContext {
    pub fn new() -> Self {
        RenderContext::default()
    }

    pub fn with_legend_set(mut self, mut set: LegendSet) -> Self {
        set.sort_legends();
        self.legend_sets.insert(set.id.clone(), set);
        self
    }

    pub fn legend_set(&self, id: &str) -> Option<&LegendSet> {
        self.legend_sets.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legend(id: &str, start: f64, end: f64, color: &str) -> Legend {
        Legend {
            id: id.to_string(),
            name: id.to_uppercase(),
            start_value: start,
            end_value: end,
            color: Some(color.to_string()),
        }
    }

    #[test]
    fn test_legends_sorted_by_start_value() {
        let set = LegendSet::new(
            "set",
            vec![legend("high", 50.0, 100.0, "#0f0"), legend("low", 0.0, 50.0, "#f00")],
        );
        assert_eq!(set.ordered_ids(), vec!["low", "high"]);
    }

    #[test]
    fn test_color_uses_last_matching_bracket() {
        let set = LegendSet::new(
            "set",
            vec![legend("low", 0.0, 50.0, "#f00"), legend("high", 50.0, 100.0, "#0f0")],
        );
        assert_eq!(set.color_for(10.0), Some("#f00"));
        assert_eq!(set.color_for(50.0), Some("#0f0"));
        assert_eq!(set.color_for(150.0), None);
    }

    #[test]
    fn test_context_lookup() {
        let ctx = RenderContext::new()
            .with_legend_set(LegendSet::new("a", vec![legend("x", 0.0, 1.0, "#000")]));
        assert!(ctx.legend_set("a").is_some());
        assert!(ctx.legend_set("b").is_none());
    }
}
