mod support;

use std::collections::BTreeMap;

use tierkreis_controller::{run_graph, InMemoryExecutor, RunOptions};
use tierkreis_core::value::{decode, encode};
use tierkreis_storage::InMemoryStorage;

#[tokio::test]
async fn doubles_every_element_of_a_splayed_range() {
    let storage = InMemoryStorage::new();
    let mut executor = InMemoryExecutor::new();
    executor.register("double", ["x"], |inputs| {
        let x: i64 = decode(&inputs["x"]).map_err(|e| e.to_string())?;
        let mut out = BTreeMap::new();
        out.insert("value".to_string(), encode(&(x * 2)));
        Ok(out)
    });

    let elements: Vec<i64> = vec![0, 1, 2, 3, 4];
    let (graph, _map_idx) = support::map_double_graph(&elements);
    let result = run_graph(&storage, &executor, graph, BTreeMap::new(), RunOptions::default())
        .await
        .unwrap();

    for (i, element) in elements.iter().enumerate() {
        let doubled: i64 = decode(&result[&format!("out{i}")]).unwrap();
        assert_eq!(doubled, element * 2);
    }
}

/// Same shape as [`doubles_every_element_of_a_splayed_range`], but the
/// splay domain is discovered from a sibling producer's output port names
/// (`items-0`, `items-1`, ...) rather than decoded out of a literal constant
/// array — exercising output-port-name domain discovery directly.
#[tokio::test]
async fn doubles_every_element_of_a_range_produced_by_a_sibling_node() {
    let storage = InMemoryStorage::new();
    let mut executor = InMemoryExecutor::new();
    executor.register("range", Vec::<String>::new(), |_inputs| {
        let mut out = BTreeMap::new();
        for i in 0..5 {
            out.insert(format!("items-{i}"), encode(&(i as i64)));
        }
        Ok(out)
    });
    executor.register("double", ["x"], |inputs| {
        let x: i64 = decode(&inputs["x"]).map_err(|e| e.to_string())?;
        let mut out = BTreeMap::new();
        out.insert("value".to_string(), encode(&(x * 2)));
        Ok(out)
    });

    let graph = support::map_over_range_producer_graph(5);
    let result = run_graph(&storage, &executor, graph, BTreeMap::new(), RunOptions::default())
        .await
        .unwrap();

    for i in 0..5i64 {
        let doubled: i64 = decode(&result[&format!("out{i}")]).unwrap();
        assert_eq!(doubled, i * 2);
    }
}

/// The literal scenario: `range(21)` through a `y = 2x + 6` body
/// yields `[6, 8, 10, ..., 46]`.
#[tokio::test]
async fn matches_the_literal_scenario_from_the_spec() {
    let storage = InMemoryStorage::new();
    let mut executor = InMemoryExecutor::new();
    executor.register("double", ["x"], |inputs| {
        let x: i64 = decode(&inputs["x"]).map_err(|e| e.to_string())?;
        let mut out = BTreeMap::new();
        out.insert("value".to_string(), encode(&(2 * x + 6)));
        Ok(out)
    });

    let elements: Vec<i64> = (0..21).collect();
    let (graph, _map_idx) = support::map_double_graph(&elements);
    let result = run_graph(&storage, &executor, graph, BTreeMap::new(), RunOptions::default())
        .await
        .unwrap();

    let expected: Vec<i64> = (0..21).map(|x| 2 * x + 6).collect();
    for (i, expected_value) in expected.iter().enumerate() {
        let actual: i64 = decode(&result[&format!("out{i}")]).unwrap();
        assert_eq!(actual, *expected_value);
    }
}
