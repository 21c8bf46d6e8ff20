//! Runs a tiny `Eval` graph — `3 + 4` — against an [`InMemoryExecutor`] and
//! [`InMemoryStorage`], printing the result.

use std::collections::BTreeMap;

use tierkreis_core::graph::BODY_PORT;
use tierkreis_core::value::{decode, encode};
use tierkreis_core::{Edge, GraphData, NodeDef, ValueRef};
use tierkreis_controller::{run_graph, InMemoryExecutor, RunOptions};
use tierkreis_storage::InMemoryStorage;

fn value_edge(node: usize, port: &str) -> Edge {
    Edge::Value(ValueRef {
        node,
        port: port.to_string(),
    })
}

fn add_body() -> GraphData {
    let mut g = GraphData::new();
    let lhs = g.add_node(NodeDef::Input("lhs".into()), BTreeMap::new());
    let rhs = g.add_node(NodeDef::Input("rhs".into()), BTreeMap::new());
    let mut args = BTreeMap::new();
    args.insert("lhs".to_string(), value_edge(lhs, "value"));
    args.insert("rhs".to_string(), value_edge(rhs, "value"));
    let add = g.add_node(NodeDef::Func { name: "add".into() }, args);
    let mut out = BTreeMap::new();
    out.insert("result".to_string(), value_edge(add, "value"));
    g.output(out).unwrap();
    g
}

fn top_level_graph() -> GraphData {
    let body = bincode::serialize(&add_body()).expect("graph is bincode-serializable");
    let mut g = GraphData::new();
    let three = g.add_node(NodeDef::Const(encode(&3i64)), BTreeMap::new());
    let four = g.add_node(NodeDef::Const(encode(&4i64)), BTreeMap::new());
    let mut eval_edges = BTreeMap::new();
    eval_edges.insert(BODY_PORT.to_string(), Edge::Const(body));
    eval_edges.insert("lhs".to_string(), value_edge(three, "value"));
    eval_edges.insert("rhs".to_string(), value_edge(four, "value"));
    let eval = g.add_node(NodeDef::Eval, eval_edges);
    let mut out = BTreeMap::new();
    out.insert("result".to_string(), value_edge(eval, "result"));
    g.output(out).unwrap();
    g
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let storage = InMemoryStorage::new();
    let mut executor = InMemoryExecutor::new();
    executor.register("add", ["lhs", "rhs"], |inputs| {
        let lhs: i64 = decode(&inputs["lhs"]).map_err(|e| e.to_string())?;
        let rhs: i64 = decode(&inputs["rhs"]).map_err(|e| e.to_string())?;
        let mut out = BTreeMap::new();
        out.insert("value".to_string(), encode(&(lhs + rhs)));
        Ok(out)
    });

    let result = run_graph(
        &storage,
        &executor,
        top_level_graph(),
        BTreeMap::new(),
        RunOptions::default(),
    )
    .await
    .expect("run failed");

    let sum: i64 = decode(&result["result"]).unwrap();
    println!("3 + 4 = {sum}");
}
