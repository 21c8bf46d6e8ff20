//! Runs a `Loop` graph computing `gcd(48, 18)` by repeated Euclidean steps,
//! then prints the recorded trace of the loop's `a` port across every
//! iteration.

use std::collections::BTreeMap;

use tierkreis_core::graph::BODY_PORT;
use tierkreis_core::value::{decode, encode};
use tierkreis_core::{Edge, GraphData, Loc, NodeDef, ValueRef};
use tierkreis_controller::{run_graph, InMemoryExecutor, RunOptions};
use tierkreis_storage::{ControllerStorage, InMemoryStorage};

fn value_edge(node: usize, port: &str) -> Edge {
    Edge::Value(ValueRef {
        node,
        port: port.to_string(),
    })
}

fn gcd_step_body() -> GraphData {
    let mut g = GraphData::new();
    let a = g.add_node(NodeDef::Input("a".into()), BTreeMap::new());
    let b = g.add_node(NodeDef::Input("b".into()), BTreeMap::new());
    let mut args = BTreeMap::new();
    args.insert("a".to_string(), value_edge(a, "value"));
    args.insert("b".to_string(), value_edge(b, "value"));
    let step = g.add_node(NodeDef::Func { name: "gcd_step".into() }, args);
    let mut out = BTreeMap::new();
    out.insert("a".to_string(), value_edge(step, "a"));
    out.insert("b".to_string(), value_edge(step, "b"));
    out.insert("continue".to_string(), value_edge(step, "continue"));
    g.output(out).unwrap();
    g
}

fn top_level_graph(init_a: i64, init_b: i64) -> GraphData {
    let body = bincode::serialize(&gcd_step_body()).expect("graph is bincode-serializable");
    let mut g = GraphData::new();
    let mut loop_edges = BTreeMap::new();
    loop_edges.insert(BODY_PORT.to_string(), Edge::Const(body));
    loop_edges.insert("a".to_string(), Edge::Const(encode(&init_a)));
    loop_edges.insert("b".to_string(), Edge::Const(encode(&init_b)));
    let loop_idx = g.add_node(
        NodeDef::Loop {
            continue_port: "continue".into(),
            name: "gcd".into(),
        },
        loop_edges,
    );
    let mut out = BTreeMap::new();
    out.insert("a".to_string(), value_edge(loop_idx, "a"));
    out.insert("b".to_string(), value_edge(loop_idx, "b"));
    g.output(out).unwrap();
    g
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let storage = InMemoryStorage::new();
    let mut executor = InMemoryExecutor::new();
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

    let result = run_graph(
        &storage,
        &executor,
        top_level_graph(48, 18),
        BTreeMap::new(),
        RunOptions::default(),
    )
    .await
    .expect("run failed");

    let gcd: i64 = decode(&result["a"]).unwrap();
    println!("gcd(48, 18) = {gcd}");

    let loop_loc = Loc::root().push_node(0);
    let trace = storage
        .read_loop_trace(&loop_loc, &"a".to_string())
        .await
        .expect("trace read failed");
    let values: Vec<i64> = trace.iter().map(|bytes| decode(bytes).unwrap()).collect();
    println!("a across every iteration: {values:?}");
}
