//! The graph data model: nodes, edges and the operations the walker and the
//! `start` dispatcher need to make progress over a [`GraphData`].
//!
//! ```
//! use std::collections::BTreeMap;
//! use tierkreis_core::graph::{Edge, GraphData, NodeDef, ValueRef};
//!
//! let mut graph = GraphData::new();
//! let a = graph.add_node(NodeDef::Const(b"1".to_vec()), BTreeMap::new());
//! let b = graph.add_node(NodeDef::Const(b"2".to_vec()), BTreeMap::new());
//! let mut add_inputs = BTreeMap::new();
//! add_inputs.insert("lhs".to_string(), Edge::Value(ValueRef { node: a, port: "value".into() }));
//! add_inputs.insert("rhs".to_string(), Edge::Value(ValueRef { node: b, port: "value".into() }));
//! let add = graph.add_node(NodeDef::Func { name: "add".into() }, add_inputs);
//! let mut out = BTreeMap::new();
//! out.insert("result".to_string(), Edge::Value(ValueRef { node: add, port: "value".into() }));
//! graph.output(out).unwrap();
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::location::{Loc, Step};

/// The index of a node within a single [`GraphData`]'s node list.
pub type NodeIndex = usize;

/// The name of a port on a node (an input argument name or an output name).
pub type PortID = String;

/// The reserved `in_edges` key under which `Eval`, `Loop` and `Map` nodes
/// store the edge that supplies their body (a graph, either embedded as a
/// [`Edge::Const`] or threaded in from the enclosing scope as an
/// [`Edge::Exterior`]).
pub const BODY_PORT: &str = "body";

/// The reserved `in_edges` key for an `IfElse`/`EagerIfElse` node's predicate.
pub const PRED_PORT: &str = "pred";

/// The reserved input port name on a `Map` node marking the collection to
/// splay across per-element invocations.
pub const SPLAY_PORT: &str = "*";

/// A reference to another node's output port within the same graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValueRef {
    pub node: NodeIndex,
    pub port: PortID,
}

/// An edge feeding a node's input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Edge {
    /// A sibling node's output.
    Value(ValueRef),
    /// A literal byte constant, embedded directly in the graph. When the
    /// edge supplies a `body` port, the bytes are a `bincode`-encoded
    /// [`GraphData`].
    Const(Vec<u8>),
    /// A named port on the current scope's exterior boundary, threaded in
    /// from whatever invoked this graph (an enclosing `Eval`/`Loop`/`Map`).
    Exterior(PortID),
}

/// The definition of a single node. Every variant shares the same
/// `in_edges` map on [`Node`] for its ordinary dependencies; see the
/// module docs on [`Node`] for which ports live where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeDef {
    /// A literal byte constant.
    Const(Vec<u8>),
    /// One of the graph's declared exterior inputs, exposed as this node's
    /// single `value` output.
    Input(PortID),
    /// The graph's declared exterior outputs. `in_edges` on this node *are*
    /// the graph's final outputs. At most one `Output` node may exist per
    /// graph (see [`GraphData::output`]).
    Output,
    /// An opaque call out to an externally-registered function. `in_edges`
    /// are its named arguments.
    Func { name: String },
    /// Evaluate a nested graph once. `in_edges` holds `"body"` plus the
    /// inputs piped into the body's exterior.
    Eval,
    /// Evaluate a nested graph repeatedly while its declared continue port
    /// holds true. `in_edges` holds `"body"` plus the loop's inputs;
    /// `continue_port` names the body output port carrying the boolean
    /// continuation signal, and `name` is the loop's debug name.
    Loop { continue_port: PortID, name: String },
    /// Evaluate a nested graph once per element of a splayed input.
    /// `in_edges` holds `"body"` plus the inputs, one of which is named
    /// [`SPLAY_PORT`].
    Map,
    /// Evaluate exactly one of two branches based on a predicate, without
    /// ever starting the untaken one. `in_edges` holds only `"pred"`;
    /// `if_true`/`if_false` are deliberately *not* in `in_edges` so the
    /// generic dependency walk never forces them.
    IfElse { if_true: Edge, if_false: Edge },
    /// Evaluate both branches as ordinary dependencies and forward whichever
    /// one the predicate selects. `in_edges` holds `"pred"`, `"if_true"`
    /// and `"if_false"` all three: unlike `IfElse`, nothing here is lazy.
    EagerIfElse,
}

/// A node in a [`GraphData`]: its definition plus its ordinary dependency
/// edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub def: NodeDef,
    pub in_edges: BTreeMap<PortID, Edge>,
}

/// The `(def, in_edges)` pair [`GraphData::query_node_description`] resolves
/// a [`Loc`] down to. For a location ending in a loop iteration, map element
/// or exterior step, this is a *synthetic* `Eval` description standing in
/// for that virtual scope, not a real node in any node list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescription {
    pub def: NodeDef,
    pub in_edges: BTreeMap<PortID, Edge>,
}

impl NodeDescription {
    fn synthetic_eval(in_edges: BTreeMap<PortID, Edge>) -> Self {
        NodeDescription {
            def: NodeDef::Eval,
            in_edges,
        }
    }
}

/// A single dataflow graph: a flat list of nodes plus the designated output
/// node. Graphs nest by embedding another `GraphData` as a `bincode`-encoded
/// [`Edge::Const`] on an `Eval`/`Loop`/`Map` node's `"body"` port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphData {
    nodes: Vec<Node>,
    output: Option<NodeIndex>,
}

impl GraphData {
    pub fn new() -> Self {
        GraphData {
            nodes: Vec::new(),
            output: None,
        }
    }

    /// Append a node, returning its index.
    pub fn add_node(&mut self, def: NodeDef, in_edges: BTreeMap<PortID, Edge>) -> NodeIndex {
        self.nodes.push(Node { def, in_edges });
        self.nodes.len() - 1
    }

    /// Declare the graph's final outputs. May be called at most once per
    /// graph.
    pub fn output(&mut self, in_edges: BTreeMap<PortID, Edge>) -> Result<NodeIndex, GraphError> {
        if self.output.is_some() {
            return Err(GraphError::DuplicateOutput);
        }
        let idx = self.add_node(NodeDef::Output, in_edges);
        self.output = Some(idx);
        Ok(idx)
    }

    pub fn node(&self, idx: NodeIndex) -> Result<&Node, GraphError> {
        self.nodes
            .get(idx)
            .ok_or(GraphError::NodeIndexOutOfRange(idx))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn output_idx(&self) -> Option<NodeIndex> {
        self.output
    }

    /// The graph's final declared outputs: the designated `Output` node's
    /// `in_edges`. Empty if no output node has been declared yet.
    pub fn graph_outputs(&self) -> BTreeMap<PortID, Edge> {
        match self.output {
            Some(idx) => self.nodes[idx].in_edges.clone(),
            None => BTreeMap::new(),
        }
    }

    /// The declared exterior input ports not present in `provided`. Used by
    /// the run loop to warn (not fail) about missing inputs rather than to
    /// reject the run outright.
    pub fn remaining_inputs(&self, provided: &std::collections::BTreeSet<PortID>) -> Vec<PortID> {
        self.nodes
            .iter()
            .filter_map(|n| match &n.def {
                NodeDef::Input(port) if !provided.contains(port) => Some(port.clone()),
                _ => None,
            })
            .collect()
    }

    /// The downstream consumer of each of `idx`'s output ports, keyed by
    /// port name. Visualization/debug bookkeeping only: if two
    /// siblings consume the same port, only the first (by node index) is
    /// recorded.
    pub fn outputs(&self, idx: NodeIndex) -> Result<BTreeMap<PortID, NodeIndex>, GraphError> {
        self.node(idx)?;
        if self.output == Some(idx) {
            return Ok(self.nodes[idx]
                .in_edges
                .keys()
                .map(|p| (p.clone(), idx))
                .collect());
        }
        let mut found = BTreeMap::new();
        for (consumer, node) in self.nodes.iter().enumerate() {
            for edge in node.in_edges.values() {
                record_consumer(edge, idx, consumer, &mut found);
            }
            if let NodeDef::IfElse { if_true, if_false } = &node.def {
                record_consumer(if_true, idx, consumer, &mut found);
                record_consumer(if_false, idx, consumer, &mut found);
            }
        }
        Ok(found)
    }

    /// Resolve a [`Loc`] to the [`NodeDescription`] it addresses, descending
    /// into nested body graphs (decoded from `Const` bytes) as needed.
    pub fn query_node_description(&self, loc: &Loc) -> Result<NodeDescription, GraphError> {
        let Some((Step::Root, rest)) = loc.steps().split_first() else {
            return Err(GraphError::UnresolvedLocation(loc.clone()));
        };
        self.query_steps(rest, loc)
    }

    fn query_steps(&self, steps: &[Step], original: &Loc) -> Result<NodeDescription, GraphError> {
        let Some((head, tail)) = steps.split_first() else {
            return Ok(NodeDescription::synthetic_eval(self.graph_outputs()));
        };
        let Step::Node(i) = head else {
            return Err(GraphError::UnresolvedLocation(original.clone()));
        };
        let node = self.node(*i)?;
        if tail.is_empty() {
            return Ok(NodeDescription {
                def: node.def.clone(),
                in_edges: node.in_edges.clone(),
            });
        }
        match tail[0] {
            Step::Loop(_) | Step::Map(_) | Step::Exterior => {
                if tail.len() == 1 {
                    Ok(NodeDescription::synthetic_eval(body_inputs(node)))
                } else {
                    let body = self.decode_body_graph(node, *i)?;
                    body.query_steps(&tail[1..], original)
                }
            }
            _ => Err(GraphError::UnresolvedLocation(original.clone())),
        }
    }

    fn decode_body_graph(&self, node: &Node, idx: NodeIndex) -> Result<GraphData, GraphError> {
        match node.in_edges.get(BODY_PORT) {
            Some(Edge::Const(bytes)) => bincode::deserialize(bytes).map_err(|_| {
                GraphError::NotAConstGraph {
                    index: idx,
                    port: BODY_PORT.to_string(),
                }
            }),
            _ => Err(GraphError::NotAConstGraph {
                index: idx,
                port: BODY_PORT.to_string(),
            }),
        }
    }
}

fn body_inputs(node: &Node) -> BTreeMap<PortID, Edge> {
    node.in_edges
        .iter()
        .filter(|(port, _)| port.as_str() != BODY_PORT)
        .map(|(p, e)| (p.clone(), e.clone()))
        .collect()
}

fn record_consumer(
    edge: &Edge,
    target: NodeIndex,
    consumer: NodeIndex,
    found: &mut BTreeMap<PortID, NodeIndex>,
) {
    if let Edge::Value(vref) = edge {
        if vref.node == target {
            found.entry(vref.port.clone()).or_insert(consumer);
        }
    }
}
