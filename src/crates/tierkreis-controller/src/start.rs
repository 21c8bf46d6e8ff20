//! The `start` dispatcher: one-time ignition logic per node kind.
//!
//! `start` runs exactly once per location, the moment the walker (`walk`)
//! finds every one of a node's `in_edges` satisfied and the location not yet
//! marked started. For the atomic kinds (`Const`, `Input`, `Output`, `Func`)
//! this single call *is* the node's entire execution. For the compound
//! kinds (`Eval`, `Loop`, `Map`) it only sets up the nested scope(s) the
//! walker will go on to pull through on later passes; `IfElse` and
//! `EagerIfElse` need no ignition work at all — their forwarding logic is
//! re-run, idempotently, on every pass in `walk::progress`.

use std::collections::BTreeMap;

use tierkreis_core::graph::{BODY_PORT, SPLAY_PORT};
use tierkreis_core::{Edge, GraphData, Node, NodeDef, ValueRef};
use tierkreis_storage::{ControllerStorage, WorkerCallArgs};

use crate::error::ControllerError;
use crate::executor::ControllerExecutor;
use tierkreis_core::Loc;

/// The output port a `Const`, `Input`, `IfElse` or `EagerIfElse` node's
/// single forwarded value is written under.
pub const VALUE_PORT: &str = "value";

pub(crate) async fn resolve_edge_bytes(
    storage: &dyn ControllerStorage,
    scope: &Loc,
    edge: &Edge,
) -> Result<Vec<u8>, ControllerError> {
    match edge {
        Edge::Const(bytes) => Ok(bytes.clone()),
        Edge::Value(ValueRef { node, port }) => {
            Ok(storage.read_output(&scope.push_node(*node), port).await?)
        }
        Edge::Exterior(port) => Ok(storage.read_output(&scope.push_exterior(), port).await?),
    }
}

pub(crate) async fn edge_ready(
    storage: &dyn ControllerStorage,
    scope: &Loc,
    edge: &Edge,
) -> Result<bool, ControllerError> {
    match edge {
        Edge::Const(_) => Ok(true),
        Edge::Value(ValueRef { node, .. }) => {
            Ok(storage.is_node_finished(&scope.push_node(*node)).await?)
        }
        Edge::Exterior(port) => {
            let ports = storage.read_output_ports(&scope.push_exterior()).await?;
            // A splayed exterior input never carries the bare port name,
            // only its `<port>-<j>` children; accept either shape.
            Ok(ports.iter().any(|p| {
                p == port
                    || tierkreis_core::value::split_map_element_port(p)
                        .is_some_and(|(prefix, _)| prefix == port)
            }))
        }
    }
}

/// The map domain and each element's bytes for a `Map` node's `"*"` edge.
///
/// The domain is discovered by parsing the trailing `-<j>` suffix off a
/// *producer's* already-finished output port names, not by interpreting the
/// value bytes themselves — except when the edge is a
/// literal [`Edge::Const`] (a graph-construction-time array, not a runtime
/// worker output), where decoding the bytes is the only way to splay it at
/// all. Returned in ascending `j` order; not necessarily contiguous.
pub(crate) async fn map_splay_elements(
    storage: &dyn ControllerStorage,
    scope: &Loc,
    edge: &Edge,
) -> Result<Vec<(usize, Vec<u8>)>, ControllerError> {
    match edge {
        Edge::Const(bytes) => {
            let values: Vec<serde_json::Value> = serde_json::from_slice(bytes)
                .map_err(tierkreis_storage::StorageError::from)?;
            values
                .into_iter()
                .enumerate()
                .map(|(j, v)| {
                    serde_json::to_vec(&v)
                        .map(|bytes| (j, bytes))
                        .map_err(tierkreis_storage::StorageError::from)
                        .map_err(ControllerError::from)
                })
                .collect()
        }
        Edge::Value(ValueRef { node, port }) => {
            collect_splay_ports(storage, &scope.push_node(*node), port).await
        }
        Edge::Exterior(port) => collect_splay_ports(storage, &scope.push_exterior(), port).await,
    }
}

async fn collect_splay_ports(
    storage: &dyn ControllerStorage,
    producer_loc: &Loc,
    prefix: &str,
) -> Result<Vec<(usize, Vec<u8>)>, ControllerError> {
    let mut out = Vec::new();
    for port in storage.read_output_ports(producer_loc).await? {
        if let Some((p, idx)) = tierkreis_core::value::split_map_element_port(&port) {
            if p == prefix {
                out.push((idx, storage.read_output(producer_loc, &port).await?));
            }
        }
    }
    out.sort_by_key(|(idx, _)| *idx);
    Ok(out)
}

async fn decode_body_graph(
    storage: &dyn ControllerStorage,
    scope: &Loc,
    loc: &Loc,
    node: &Node,
) -> Result<GraphData, ControllerError> {
    let edge = node
        .in_edges
        .get(BODY_PORT)
        .ok_or_else(|| ControllerError::DanglingReference(loc.clone(), BODY_PORT.to_string()))?;
    let bytes = resolve_edge_bytes(storage, scope, edge).await?;
    bincode::deserialize(&bytes)
        .map_err(tierkreis_storage::StorageError::from)
        .map_err(ControllerError::from)
}

/// Run the one-time ignition logic for the node at `loc`, whose definition
/// is `node` and which lives in `scope` (the graph instance `loc` is a node
/// of).
pub(crate) async fn start(
    storage: &dyn ControllerStorage,
    executor: &dyn ControllerExecutor,
    scope: &Loc,
    loc: &Loc,
    node: &Node,
) -> Result<(), ControllerError> {
    match &node.def {
        NodeDef::Const(bytes) => {
            storage
                .write_output(loc, &VALUE_PORT.to_string(), bytes)
                .await?;
            storage.mark_node_finished(loc).await?;
        }

        NodeDef::Input(port) => {
            storage
                .link_outputs(loc, &VALUE_PORT.to_string(), &scope.push_exterior(), port)
                .await?;
            storage.mark_node_finished(loc).await?;
        }

        NodeDef::Output => {
            for (port, edge) in &node.in_edges {
                link_or_write(storage, scope, loc, port, edge).await?;
            }
            storage.mark_node_finished(loc).await?;
        }

        NodeDef::Func { name } => {
            let (launcher, function_name) = split_launcher(name);
            let mut inputs = BTreeMap::new();
            let mut call_inputs = BTreeMap::new();
            for (port, edge) in &node.in_edges {
                inputs.insert(port.clone(), resolve_edge_bytes(storage, scope, edge).await?);
                call_inputs.insert(port.clone(), edge.clone());
            }
            let call = WorkerCallArgs {
                function_name,
                inputs: call_inputs,
                outputs: vec![VALUE_PORT.to_string()],
            };
            storage.write_worker_call_args(loc, &call).await?;
            match executor.call(&launcher, &call, &inputs).await {
                Ok(outputs) => {
                    for (port, value) in outputs {
                        storage.write_output(loc, &port, &value).await?;
                    }
                    storage.mark_node_finished(loc).await?;
                }
                Err(e) => {
                    storage.write_node_error(loc, &e.0).await?;
                    return Err(ControllerError::Worker {
                        loc: loc.clone(),
                        message: e.0,
                    });
                }
            }
        }

        NodeDef::Eval => {
            let body_graph = decode_body_graph(storage, scope, loc, node).await?;
            storage.write_metadata(loc, &body_graph).await?;
            pipe_inputs(storage, scope, node, &loc.push_exterior(), &[BODY_PORT]).await?;
        }

        NodeDef::Loop { name, .. } => {
            let body_graph = decode_body_graph(storage, scope, loc, node).await?;
            let first_iter = loc.push_loop(0);
            storage.write_metadata(&first_iter, &body_graph).await?;
            pipe_inputs(storage, scope, node, &first_iter.push_exterior(), &[BODY_PORT]).await?;
            storage.write_debug_data(&format!("{name}-0"), &first_iter).await?;
        }

        NodeDef::Map => {
            let body_graph = decode_body_graph(storage, scope, loc, node).await?;
            let splay_edge = node.in_edges.get(SPLAY_PORT).ok_or_else(|| {
                ControllerError::DanglingReference(loc.clone(), SPLAY_PORT.to_string())
            })?;
            let elements = map_splay_elements(storage, scope, splay_edge).await?;

            for (j, element_bytes) in &elements {
                let elem_loc = loc.push_map(*j);
                storage.write_metadata(&elem_loc, &body_graph).await?;
                pipe_inputs(
                    storage,
                    scope,
                    node,
                    &elem_loc.push_exterior(),
                    &[BODY_PORT, SPLAY_PORT],
                )
                .await?;
                storage
                    .write_output(&elem_loc.push_exterior(), &SPLAY_PORT.to_string(), element_bytes)
                    .await?;
            }

            // An empty domain is an immediate finish with no outputs.
            if elements.is_empty() {
                storage.mark_node_finished(loc).await?;
            }
        }

        NodeDef::IfElse { .. } | NodeDef::EagerIfElse => {
            // No ignition work: both are re-evaluated idempotently by
            // `walk::progress` on every pass.
        }
    }
    Ok(())
}

/// Link (or, for a literal constant, copy) every `in_edges` value except
/// `skip` into `target` under the same port name, resolving sibling/exterior
/// references against `scope`.
async fn pipe_inputs(
    storage: &dyn ControllerStorage,
    scope: &Loc,
    node: &Node,
    target: &Loc,
    skip: &[&str],
) -> Result<(), ControllerError> {
    for (port, edge) in &node.in_edges {
        if skip.contains(&port.as_str()) {
            continue;
        }
        link_or_write(storage, scope, target, port, edge).await?;
    }
    Ok(())
}

/// Redirect `(dst_loc, dst_port)` to whatever sibling or exterior port
/// `edge` names; a literal [`Edge::Const`] has no location to link to, so
/// its bytes are written directly instead.
async fn link_or_write(
    storage: &dyn ControllerStorage,
    scope: &Loc,
    dst_loc: &Loc,
    dst_port: &str,
    edge: &Edge,
) -> Result<(), ControllerError> {
    let dst_port = dst_port.to_string();
    match edge {
        Edge::Value(ValueRef { node, port }) => {
            storage
                .link_outputs(dst_loc, &dst_port, &scope.push_node(*node), port)
                .await?;
        }
        Edge::Exterior(port) => {
            storage
                .link_outputs(dst_loc, &dst_port, &scope.push_exterior(), port)
                .await?;
        }
        Edge::Const(bytes) => {
            storage.write_output(dst_loc, &dst_port, bytes).await?;
        }
    }
    Ok(())
}

/// Split a `Func` node's fully-qualified name into its launcher prefix and
/// bare function name, e.g. `"python.add"` -> `("python", "add")`;
/// `"add"` (no dot) -> `("", "add")`.
fn split_launcher(name: &str) -> (String, String) {
    match name.rsplit_once('.') {
        Some((launcher, func)) => (launcher.to_string(), func.to_string()),
        None => (String::new(), name.to_string()),
    }
}
