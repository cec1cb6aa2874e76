//! Structural properties of axes and sorting over generated layouts.

use crosstab_engine::*;
use proptest::prelude::*;
use serde_json::json;

fn dimensions(sizes: &[usize]) -> Vec<AxisDimension> {
    sizes
        .iter()
        .enumerate()
        .map(|(f, &n)| {
            let ids = (0..n).map(|k| format!("f{}i{}", f, k)).collect();
            AxisDimension::new(format!("d{}", f), ids)
        })
        .collect()
}

fn build(kind: AxisKind, sizes: &[usize], hide_empty_rows: bool) -> Axis {
    Axis::build(kind, &dimensions(sizes), hide_empty_rows, &mut HandleSeq::new())
        .unwrap()
        .unwrap()
}

fn sizes_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..=4, 1..=3)
}

fn kind_strategy() -> impl Strategy<Value = AxisKind> {
    prop_oneof![Just(AxisKind::Column), Just(AxisKind::Row)]
}

proptest! {
    #[test]
    fn width_is_product_of_floor_sizes(sizes in sizes_strategy(), kind in kind_strategy(), hide in any::<bool>()) {
        let axis = build(kind, &sizes, hide);
        prop_assert_eq!(axis.width(), sizes.iter().product::<usize>());
        prop_assert_eq!(axis.depth(), sizes.len());
        prop_assert_eq!(axis.composite_ids().len(), axis.width());
    }

    #[test]
    fn floors_tile_the_axis(sizes in sizes_strategy(), kind in kind_strategy(), hide in any::<bool>()) {
        let axis = build(kind, &sizes, hide);
        for floor in axis.floors() {
            prop_assert_eq!(floor.all_ids.len(), axis.width());
            let block = floor.span * floor.unique_ids.len();
            prop_assert_eq!(axis.width() % block, 0);
        }
    }

    #[test]
    fn composite_id_is_concatenation_of_floor_ids(sizes in sizes_strategy(), kind in kind_strategy()) {
        let axis = build(kind, &sizes, false);
        for j in 0..axis.width() {
            let joined: String = (0..axis.depth()).map(|f| axis.node_id(f, j)).collect();
            prop_assert_eq!(axis.composite_id(j), joined.as_str());
        }
    }

    #[test]
    fn every_handle_is_unique(sizes in sizes_strategy()) {
        let axis = build(AxisKind::Column, &sizes, false);
        let mut handles: Vec<CellHandle> = (0..axis.depth())
            .flat_map(|f| axis.nodes(f).iter().map(|n| n.handle))
            .collect();
        let count = handles.len();
        handles.sort_by_key(|h| h.0);
        handles.dedup();
        prop_assert_eq!(handles.len(), count);
    }

    #[test]
    fn collapsed_runs_have_no_visible_leaves(
        sizes in sizes_strategy(),
        picks in prop::collection::vec(any::<bool>(), 64),
    ) {
        let mut axis = build(AxisKind::Row, &sizes, true);
        let width = axis.width();
        for j in 0..width {
            if picks[j % picks.len()] {
                axis.collapse_leaf(j);
            }
        }
        let visible_leaves = (0..width).filter(|&j| !axis.is_leaf_collapsed(j)).count();

        for f in 0..axis.depth() {
            let span = axis.floor(f).span;
            let mut covered = 0;
            for start in (0..width).step_by(span) {
                let all_collapsed = (start..start + span).all(|j| axis.is_leaf_collapsed(j));
                prop_assert_eq!(axis.node(f, start).collapsed, all_collapsed);

                let shown: Vec<usize> = (start..start + span)
                    .filter_map(|j| axis.visible_span(f, j))
                    .collect();
                prop_assert!(shown.len() <= 1);
                covered += shown.iter().sum::<usize>();
            }
            prop_assert_eq!(covered, visible_leaves);
        }
    }

    #[test]
    fn total_sort_is_a_stable_permutation(
        values in prop::collection::vec(prop::option::of(-1000i32..1000), 1..8),
        ascending in any::<bool>(),
    ) {
        let ids: Vec<String> = (0..values.len()).map(|i| format!("r{}", i)).collect();
        let items: Vec<serde_json::Value> = ids.iter().map(|id| json!({"id": id})).collect();
        let rows: Vec<serde_json::Value> = ids
            .iter()
            .zip(values.iter())
            .filter_map(|(id, v)| v.map(|v| json!(["c", id, v])))
            .collect();

        let direction = if ascending { SortDirection::Asc } else { SortDirection::Desc };
        let config: LayoutConfig = serde_json::from_value(json!({
            "columns": [{"dimension": "pe", "items": [{"id": "c"}]}],
            "rows": [{"dimension": "ou", "items": items}]
        }))
        .unwrap();
        let config = config.with_sorting(SortTarget::Index(0), direction);
        let result: ResultSet = serde_json::from_value(json!({
            "headers": [{"name": "pe"}, {"name": "ou"}, {"name": "value"}],
            "rows": rows
        }))
        .unwrap();

        let view = render_crosstab(&config, &result, &RenderContext::new()).unwrap();
        let order: Vec<usize> = view
            .rows_of_type(RowType::Body)
            .map(|r| view.cells[r][0].display_text[1..].parse().unwrap())
            .collect();

        let mut sorted = order.clone();
        sorted.sort_unstable();
        prop_assert_eq!(sorted, (0..values.len()).collect::<Vec<_>>());

        // Present values first, ordered; missing values keep input order
        let present: Vec<i32> = order.iter().filter_map(|&i| values[i]).collect();
        let first_missing = order.iter().position(|&i| values[i].is_none()).unwrap_or(order.len());
        prop_assert_eq!(present.len(), first_missing);
        for pair in present.windows(2) {
            if ascending {
                prop_assert!(pair[0] <= pair[1]);
            } else {
                prop_assert!(pair[0] >= pair[1]);
            }
        }
        let missing: Vec<usize> = order[first_missing..].to_vec();
        prop_assert!(missing.windows(2).all(|w| w[0] < w[1]));
    }
}
