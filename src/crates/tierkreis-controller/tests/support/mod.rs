//! Graph-building helpers shared across the scenario tests. Not a test
//! binary itself — pulled in via `mod support;`.

use std::collections::BTreeMap;

use tierkreis_core::graph::{BODY_PORT, PRED_PORT, SPLAY_PORT};
use tierkreis_core::{Edge, GraphData, NodeDef, NodeIndex, ValueRef};

#[allow(dead_code)]
pub fn value_edge(node: NodeIndex, port: &str) -> Edge {
    Edge::Value(ValueRef {
        node,
        port: port.to_string(),
    })
}

#[allow(dead_code)]
pub fn const_edge<T: serde::Serialize>(value: &T) -> Edge {
    Edge::Const(tierkreis_core::value::encode(value))
}

#[allow(dead_code)]
pub fn body_bytes(graph: &GraphData) -> Vec<u8> {
    bincode::serialize(graph).expect("graph is bincode-serializable")
}

/// `lhs + rhs -> value`, used as the body of an `Eval` node.
#[allow(dead_code)]
pub fn add_body() -> GraphData {
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

/// A top-level graph: `Eval(add_body)(lhs=3, rhs=4) -> result`.
#[allow(dead_code)]
pub fn arithmetic_eval_graph() -> GraphData {
    let body = body_bytes(&add_body());
    let mut g = GraphData::new();
    let three = g.add_node(NodeDef::Const(tierkreis_core::value::encode(&3i64)), BTreeMap::new());
    let four = g.add_node(NodeDef::Const(tierkreis_core::value::encode(&4i64)), BTreeMap::new());
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

/// A `Loop` body computing one step of the Euclidean algorithm: given `a`
/// and `b`, either stops (`b == 0`) or continues with `(b, a % b)`.
#[allow(dead_code)]
pub fn gcd_step_body() -> GraphData {
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

/// A top-level graph: `Loop(gcd_step_body)(a=init_a, b=init_b) -> a, b`.
#[allow(dead_code)]
pub fn gcd_loop_graph(init_a: i64, init_b: i64) -> GraphData {
    let body = body_bytes(&gcd_step_body());
    let mut g = GraphData::new();
    let mut loop_edges = BTreeMap::new();
    loop_edges.insert(BODY_PORT.to_string(), Edge::Const(body));
    loop_edges.insert("a".to_string(), const_edge(&init_a));
    loop_edges.insert("b".to_string(), const_edge(&init_b));
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

/// A `Loop` body counting `i` up from its starting value, stopping once
/// `i == limit`.
#[allow(dead_code)]
pub fn counter_step_body() -> GraphData {
    let mut g = GraphData::new();
    let i = g.add_node(NodeDef::Input("i".into()), BTreeMap::new());
    let mut args = BTreeMap::new();
    args.insert("i".to_string(), value_edge(i, "value"));
    let step = g.add_node(NodeDef::Func { name: "increment".into() }, args);
    let mut out = BTreeMap::new();
    out.insert("i".to_string(), value_edge(step, "i"));
    out.insert("continue".to_string(), value_edge(step, "continue"));
    g.output(out).unwrap();
    g
}

#[allow(dead_code)]
pub fn counter_loop_graph(start: i64) -> GraphData {
    let body = body_bytes(&counter_step_body());
    let mut g = GraphData::new();
    let mut loop_edges = BTreeMap::new();
    loop_edges.insert(BODY_PORT.to_string(), Edge::Const(body));
    loop_edges.insert("i".to_string(), const_edge(&start));
    let loop_idx = g.add_node(
        NodeDef::Loop {
            continue_port: "continue".into(),
            name: "counter".into(),
        },
        loop_edges,
    );
    let mut out = BTreeMap::new();
    out.insert("i".to_string(), value_edge(loop_idx, "i"));
    g.output(out).unwrap();
    g
}

#[allow(dead_code)]
pub fn counter_loop_loc() -> tierkreis_core::Loc {
    tierkreis_core::Loc::root().push_node(0)
}

/// A `Loop` body bumping three accumulators per iteration via a single
/// `bump_accumulators` call.
#[allow(dead_code)]
pub fn accumulators_step_body() -> GraphData {
    let mut g = GraphData::new();
    let acc1 = g.add_node(NodeDef::Input("acc1".into()), BTreeMap::new());
    let acc2 = g.add_node(NodeDef::Input("acc2".into()), BTreeMap::new());
    let acc3 = g.add_node(NodeDef::Input("acc3".into()), BTreeMap::new());
    let mut args = BTreeMap::new();
    args.insert("acc1".to_string(), value_edge(acc1, "value"));
    args.insert("acc2".to_string(), value_edge(acc2, "value"));
    args.insert("acc3".to_string(), value_edge(acc3, "value"));
    let step = g.add_node(
        NodeDef::Func { name: "bump_accumulators".into() },
        args,
    );
    let mut out = BTreeMap::new();
    out.insert("acc1".to_string(), value_edge(step, "acc1"));
    out.insert("acc2".to_string(), value_edge(step, "acc2"));
    out.insert("acc3".to_string(), value_edge(step, "acc3"));
    out.insert("continue".to_string(), value_edge(step, "continue"));
    g.output(out).unwrap();
    g
}

/// A top-level graph: `Loop(accumulators_step_body)(acc1=acc2=acc3=0) ->
/// acc1, acc2, acc3`, the literal three-accumulator scenario.
#[allow(dead_code)]
pub fn multi_accumulator_loop_graph() -> GraphData {
    let body = body_bytes(&accumulators_step_body());
    let mut g = GraphData::new();
    let mut loop_edges = BTreeMap::new();
    loop_edges.insert(BODY_PORT.to_string(), Edge::Const(body));
    loop_edges.insert("acc1".to_string(), const_edge(&0i64));
    loop_edges.insert("acc2".to_string(), const_edge(&0i64));
    loop_edges.insert("acc3".to_string(), const_edge(&0i64));
    let loop_idx = g.add_node(
        NodeDef::Loop {
            continue_port: "continue".into(),
            name: "accumulators".into(),
        },
        loop_edges,
    );
    let mut out = BTreeMap::new();
    out.insert("acc1".to_string(), value_edge(loop_idx, "acc1"));
    out.insert("acc2".to_string(), value_edge(loop_idx, "acc2"));
    out.insert("acc3".to_string(), value_edge(loop_idx, "acc3"));
    g.output(out).unwrap();
    g
}

/// A `Map` body doubling its spliced-in element.
#[allow(dead_code)]
pub fn double_body() -> GraphData {
    let mut g = GraphData::new();
    let input = g.add_node(NodeDef::Input(SPLAY_PORT.into()), BTreeMap::new());
    let mut args = BTreeMap::new();
    args.insert("x".to_string(), value_edge(input, "value"));
    let dbl = g.add_node(NodeDef::Func { name: "double".into() }, args);
    let mut out = BTreeMap::new();
    out.insert("value".to_string(), value_edge(dbl, "value"));
    g.output(out).unwrap();
    g
}

/// A top-level graph: `Map(double_body)` over `elements`, with the Output
/// node collecting each element's `value-<i>` port under `out<i>`.
#[allow(dead_code)]
pub fn map_double_graph(elements: &[i64]) -> (GraphData, usize) {
    let body = body_bytes(&double_body());
    let mut g = GraphData::new();
    let mut map_edges = BTreeMap::new();
    map_edges.insert(BODY_PORT.to_string(), Edge::Const(body));
    map_edges.insert(SPLAY_PORT.to_string(), const_edge(&elements.to_vec()));
    let map_idx = g.add_node(NodeDef::Map, map_edges);
    let mut out = BTreeMap::new();
    for i in 0..elements.len() {
        out.insert(
            format!("out{i}"),
            value_edge(map_idx, &tierkreis_core::value::map_element_port("value", i)),
        );
    }
    g.output(out).unwrap();
    (g, map_idx)
}

/// A top-level graph: a `Func` node (`"range"`) producing one output port
/// per element of `0..n` named `"items-<i>"`, splayed into a `Map(double_body)`
/// via an ordinary sibling [`ValueRef`] on `"items"` rather than a literal
/// [`Edge::Const`] array — exercises the producer-output-port-name domain
/// discovery by producer output port name (the set of `j` comes from the range node's own
/// finished output ports, not from decoding any value bytes).
#[allow(dead_code)]
pub fn map_over_range_producer_graph(n: usize) -> GraphData {
    let body = body_bytes(&double_body());
    let mut g = GraphData::new();
    let range = g.add_node(NodeDef::Func { name: "range".into() }, BTreeMap::new());
    let mut map_edges = BTreeMap::new();
    map_edges.insert(BODY_PORT.to_string(), Edge::Const(body));
    map_edges.insert(SPLAY_PORT.to_string(), value_edge(range, "items"));
    let map_idx = g.add_node(NodeDef::Map, map_edges);
    let mut out = BTreeMap::new();
    for i in 0..n {
        out.insert(
            format!("out{i}"),
            value_edge(map_idx, &tierkreis_core::value::map_element_port("value", i)),
        );
    }
    g.output(out).unwrap();
    g
}

/// A top-level graph: `IfElse(pred)` choosing between a sibling `Func` node
/// (`if_true`) and a `Const` (`if_false`). Returns the graph plus the
/// untaken branch's node index so a test can assert it never started.
#[allow(dead_code)]
pub fn ifelse_graph(pred: bool) -> (GraphData, NodeIndex) {
    let mut g = GraphData::new();
    let mut pred_edges = BTreeMap::new();
    pred_edges.insert(PRED_PORT.to_string(), const_edge(&pred));

    let mut true_args = BTreeMap::new();
    true_args.insert("x".to_string(), const_edge(&1i64));
    let true_branch = g.add_node(NodeDef::Func { name: "only_if_true".into() }, true_args);

    let ifelse = g.add_node(
        NodeDef::IfElse {
            if_true: value_edge(true_branch, "value"),
            if_false: const_edge(&42i64),
        },
        pred_edges,
    );
    let mut out = BTreeMap::new();
    out.insert("chosen".to_string(), value_edge(ifelse, "value"));
    g.output(out).unwrap();
    (g, true_branch)
}
