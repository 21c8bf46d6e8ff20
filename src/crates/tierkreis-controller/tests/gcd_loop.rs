mod support;

use std::collections::BTreeMap;

use tierkreis_controller::{run_graph, InMemoryExecutor, RunOptions};
use tierkreis_core::value::{decode, encode};
use tierkreis_storage::InMemoryStorage;

fn register_gcd_step(executor: &mut InMemoryExecutor) {
    executor.register("gcd_step", ["a", "b"], |inputs| {
        let a: i64 = decode(&inputs["a"]).map_err(|e| e.to_string())?;
        let b: i64 = decode(&inputs["b"]).map_err(|e| e.to_string())?;
        let mut out = BTreeMap::new();
        if b == 0 {
            out.insert("a".to_string(), encode(&a));
            out.insert("b".to_string(), encode(&b));
            out.insert("continue".to_string(), encode(&false));
        } else {
            out.insert("a".to_string(), encode(&b));
            out.insert("b".to_string(), encode(&(a % b)));
            out.insert("continue".to_string(), encode(&true));
        }
        Ok(out)
    });
}

#[tokio::test]
async fn computes_gcd_by_repeated_euclidean_steps() {
    let storage = InMemoryStorage::new();
    let mut executor = InMemoryExecutor::new();
    register_gcd_step(&mut executor);

    let graph = support::gcd_loop_graph(48, 18);
    let result = run_graph(&storage, &executor, graph, BTreeMap::new(), RunOptions::default())
        .await
        .unwrap();

    let a: i64 = decode(&result["a"]).unwrap();
    let b: i64 = decode(&result["b"]).unwrap();
    assert_eq!(a, 6);
    assert_eq!(b, 0);
}

#[tokio::test]
async fn handles_a_pair_that_is_already_coprime() {
    let storage = InMemoryStorage::new();
    let mut executor = InMemoryExecutor::new();
    register_gcd_step(&mut executor);

    let graph = support::gcd_loop_graph(17, 5);
    let result = run_graph(&storage, &executor, graph, BTreeMap::new(), RunOptions::default())
        .await
        .unwrap();

    let a: i64 = decode(&result["a"]).unwrap();
    assert_eq!(a, 1);
}

/// The literal scenario list: `{a, b} -> gcd`, including the
/// `b == 0` edge case (zero iterations; the loop's first check already
/// reports `continue = false`).
#[tokio::test]
async fn matches_the_literal_scenarios_from_the_spec() {
    for (init_a, init_b, expected) in [(1071, 462, 21), (12, 26, 2), (48, 360, 24), (3, 0, 3)] {
        let storage = InMemoryStorage::new();
        let mut executor = InMemoryExecutor::new();
        register_gcd_step(&mut executor);

        let graph = support::gcd_loop_graph(init_a, init_b);
        let result = run_graph(&storage, &executor, graph, BTreeMap::new(), RunOptions::default())
            .await
            .unwrap();

        let a: i64 = decode(&result["a"]).unwrap();
        assert_eq!(a, expected, "gcd({init_a}, {init_b}) should be {expected}");
    }
}
