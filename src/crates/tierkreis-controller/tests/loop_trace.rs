mod support;

use std::collections::BTreeMap;

use tierkreis_controller::{run_graph, InMemoryExecutor, RunOptions};
use tierkreis_core::value::{decode, encode};
use tierkreis_core::Loc;
use tierkreis_storage::{ControllerStorage, InMemoryStorage};

#[tokio::test]
async fn read_loop_trace_replays_every_iterations_computed_value() {
    let storage = InMemoryStorage::new();
    let mut executor = InMemoryExecutor::new();
    executor.register("increment", ["i"], |inputs| {
        let i: i64 = decode(&inputs["i"]).map_err(|e| e.to_string())?;
        let mut out = BTreeMap::new();
        out.insert("i".to_string(), encode(&(i + 1)));
        out.insert("continue".to_string(), encode(&(i + 1 < 3)));
        Ok(out)
    });

    let graph = support::counter_loop_graph(0);
    let result = run_graph(&storage, &executor, graph, BTreeMap::new(), RunOptions::default())
        .await
        .unwrap();

    let final_i: i64 = decode(&result["i"]).unwrap();
    assert_eq!(final_i, 3);

    let loop_loc = Loc::root().push_node(0);
    let trace = storage
        .read_loop_trace(&loop_loc, &"i".to_string())
        .await
        .unwrap();
    let values: Vec<i64> = trace.iter().map(|bytes| decode(bytes).unwrap()).collect();
    assert_eq!(values, vec![1, 2, 3]);
}

/// The literal scenario from the accumulator example: three accumulators starting at 0 with
/// increments 1/2/3, stopping once `acc1 > 5`. Six iterations run, each
/// producing `{acc1: k, acc2: 2k, acc3: 3k}` for `k` in `1..=6`, and
/// `read_loop_trace` returns exactly those six per-iteration records.
#[tokio::test]
async fn read_loop_trace_returns_the_multi_accumulator_scenario_from_the_spec() {
    let storage = InMemoryStorage::new();
    let mut executor = InMemoryExecutor::new();
    executor.register("bump_accumulators", ["acc1", "acc2", "acc3"], |inputs| {
        let acc1: i64 = decode(&inputs["acc1"]).map_err(|e| e.to_string())?;
        let acc2: i64 = decode(&inputs["acc2"]).map_err(|e| e.to_string())?;
        let acc3: i64 = decode(&inputs["acc3"]).map_err(|e| e.to_string())?;
        let mut out = BTreeMap::new();
        out.insert("acc1".to_string(), encode(&(acc1 + 1)));
        out.insert("acc2".to_string(), encode(&(acc2 + 2)));
        out.insert("acc3".to_string(), encode(&(acc3 + 3)));
        out.insert("continue".to_string(), encode(&(acc1 + 1 <= 5)));
        Ok(out)
    });

    let graph = support::multi_accumulator_loop_graph();
    let result = run_graph(&storage, &executor, graph, BTreeMap::new(), RunOptions::default())
        .await
        .unwrap();

    let acc1: i64 = decode(&result["acc1"]).unwrap();
    let acc2: i64 = decode(&result["acc2"]).unwrap();
    let acc3: i64 = decode(&result["acc3"]).unwrap();
    assert_eq!((acc1, acc2, acc3), (6, 12, 18));

    let loop_loc = Loc::root().push_node(0);
    for (port, step) in [("acc1", 1i64), ("acc2", 2), ("acc3", 3)] {
        let trace = storage
            .read_loop_trace(&loop_loc, &port.to_string())
            .await
            .unwrap();
        let values: Vec<i64> = trace.iter().map(|bytes| decode(bytes).unwrap()).collect();
        assert_eq!(values, (1..=6).map(|k| k * step).collect::<Vec<_>>());
    }
}
