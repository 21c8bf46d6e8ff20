//! The walker: a pure, recursive readiness check that pulls exactly the
//! nodes a graph's `Output` demands, dispatching `start` the first time a
//! node's dependencies are all satisfied and re-checking compound nodes'
//! progress on every pass.
//!
//! The walk is demand-driven, not a scan over every node in a graph: to
//! walk a node, first walk whatever its own `in_edges` reference (pulling
//! producers before checking readiness), then — only once all of them are
//! satisfied — start it if it hasn't started yet. Because `IfElse`'s
//! `if_true`/`if_false` branches live *outside* `in_edges`, the pull step
//! never reaches the untaken branch: nothing ever calls [`walk_node`] on
//! it, so it is never started. `EagerIfElse` keeps all three edges
//! inside `in_edges`, so both branches get pulled unconditionally before the
//! predicate is even read.

use futures::future::BoxFuture;
use tierkreis_core::graph::PRED_PORT;
use tierkreis_core::value::{decode_bool, map_element_port};
use tierkreis_core::{Edge, GraphData, Loc, NodeDef, NodeIndex};
use tierkreis_storage::ControllerStorage;

use crate::error::ControllerError;
use crate::executor::ControllerExecutor;
use crate::start::{self, edge_ready, resolve_edge_bytes, VALUE_PORT};

/// Walk the graph instance rooted at `scope`, pulling its `Output` node.
/// Returns whether that node has finished.
///
/// Boxed because it and [`walk_node`] recurse into each other (a compound
/// node's progress walks a nested graph, whose own nodes may themselves be
/// compound) and async fns can't recurse without a known-size indirection.
pub fn walk_graph<'a>(
    storage: &'a dyn ControllerStorage,
    executor: &'a dyn ControllerExecutor,
    scope: &'a Loc,
) -> BoxFuture<'a, Result<bool, ControllerError>> {
    Box::pin(async move {
        let graph = storage.read_metadata(scope).await?;
        let out_idx = graph
            .output_idx()
            .ok_or_else(|| ControllerError::MissingOutputNode(scope.clone()))?;
        walk_node(storage, executor, scope, out_idx, &graph).await?;
        Ok(storage.is_node_finished(&scope.push_node(out_idx)).await?)
    })
}

/// Ensure the node at `scope.push_node(idx)` has every one of its
/// dependencies pulled, start it if it just became ready, and advance any
/// further progress a compound node can make this pass.
pub fn walk_node<'a>(
    storage: &'a dyn ControllerStorage,
    executor: &'a dyn ControllerExecutor,
    scope: &'a Loc,
    idx: NodeIndex,
    graph: &'a GraphData,
) -> BoxFuture<'a, Result<(), ControllerError>> {
    Box::pin(async move {
        let loc = scope.push_node(idx);
        if storage.is_node_finished(&loc).await? {
            return Ok(());
        }
        let node = graph.node(idx)?;

        for edge in node.in_edges.values() {
            if let Edge::Value(vref) = edge {
                walk_node(storage, executor, scope, vref.node, graph).await?;
            }
        }
        for edge in node.in_edges.values() {
            if !edge_ready(storage, scope, edge).await? {
                return Ok(());
            }
        }

        if !storage.is_node_started(&loc).await? {
            storage
                .write_node_description(
                    &loc,
                    &tierkreis_core::NodeDescription {
                        def: node.def.clone(),
                        in_edges: node.in_edges.clone(),
                    },
                )
                .await?;
            storage.mark_node_started(&loc).await?;
            start::start(storage, executor, scope, &loc, node).await?;
        }

        match &node.def {
            NodeDef::Eval => progress_eval(storage, executor, &loc).await,
            NodeDef::Loop { continue_port, name } => {
                progress_loop(storage, executor, &loc, continue_port, name).await
            }
            NodeDef::Map => progress_map(storage, executor, scope, &loc, node).await,
            NodeDef::IfElse { if_true, if_false } => {
                progress_ifelse(storage, executor, scope, &loc, node, if_true, if_false).await
            }
            NodeDef::EagerIfElse => progress_eager_ifelse(storage, scope, &loc, node).await,
            NodeDef::Const(_) | NodeDef::Input(_) | NodeDef::Output | NodeDef::Func { .. } => {
                Ok(())
            }
        }
    })
}

async fn progress_eval(
    storage: &dyn ControllerStorage,
    executor: &dyn ControllerExecutor,
    loc: &Loc,
) -> Result<(), ControllerError> {
    if storage.is_node_finished(loc).await? {
        return Ok(());
    }
    let finished = walk_graph(storage, executor, loc).await?;
    if finished {
        let body = storage.read_metadata(loc).await?;
        let out_idx = body
            .output_idx()
            .ok_or_else(|| ControllerError::MissingOutputNode(loc.clone()))?;
        forward_outputs(storage, &loc.push_node(out_idx), loc).await?;
        storage.mark_node_finished(loc).await?;
    }
    Ok(())
}

async fn progress_loop(
    storage: &dyn ControllerStorage,
    executor: &dyn ControllerExecutor,
    loc: &Loc,
    continue_port: &str,
    name: &str,
) -> Result<(), ControllerError> {
    if storage.is_node_finished(loc).await? {
        return Ok(());
    }
    let latest = storage.latest_loop_iteration(loc).await?.unwrap_or(0);
    let iter_loc = loc.push_loop(latest);
    let body = storage.read_metadata(&iter_loc).await?;
    let out_idx = body
        .output_idx()
        .ok_or_else(|| ControllerError::MissingLoopOutput(loc.clone()))?;
    walk_node(storage, executor, &iter_loc, out_idx, &body).await?;

    let iter_output = iter_loc.push_node(out_idx);
    if !storage.is_node_finished(&iter_output).await? {
        return Ok(());
    }

    let continue_port = continue_port.to_string();
    let cont = decode_bool(&storage.read_output(&iter_output, &continue_port).await?)
        .map_err(tierkreis_storage::StorageError::from)?;

    if cont {
        let next_loc = loc.push_loop(latest + 1);
        storage.write_metadata(&next_loc, &body).await?;
        for port in storage.read_output_ports(&iter_output).await? {
            if port == continue_port {
                continue;
            }
            let value = storage.read_output(&iter_output, &port).await?;
            storage
                .write_output(&next_loc.push_exterior(), &port, &value)
                .await?;
        }
        storage
            .write_debug_data(&format!("{name}-{}", latest + 1), &next_loc)
            .await?;
    } else {
        for port in storage.read_output_ports(&iter_output).await? {
            if port == continue_port {
                continue;
            }
            let value = storage.read_output(&iter_output, &port).await?;
            storage.write_output(loc, &port, &value).await?;
        }
        storage.mark_node_finished(loc).await?;
    }
    Ok(())
}

async fn progress_map(
    storage: &dyn ControllerStorage,
    executor: &dyn ControllerExecutor,
    scope: &Loc,
    loc: &Loc,
    node: &tierkreis_core::Node,
) -> Result<(), ControllerError> {
    if storage.is_node_finished(loc).await? {
        return Ok(());
    }
    let splay_edge = node.in_edges.get(tierkreis_core::graph::SPLAY_PORT).ok_or_else(|| {
        ControllerError::DanglingReference(
            loc.clone(),
            tierkreis_core::graph::SPLAY_PORT.to_string(),
        )
    })?;
    // Recomputed every pass rather than cached: cheap (a port-name scan),
    // and keeps the domain tied to the producer's actual output, not a
    // snapshot taken at `start` time.
    let elements = start::map_splay_elements(storage, scope, splay_edge).await?;
    if elements.is_empty() {
        storage.mark_node_finished(loc).await?;
        return Ok(());
    }

    let mut all_finished = true;
    for (j, _) in &elements {
        let elem_loc = loc.push_map(*j);
        let body = storage.read_metadata(&elem_loc).await?;
        let out_idx = body
            .output_idx()
            .ok_or_else(|| ControllerError::MissingOutputNode(elem_loc.clone()))?;
        walk_node(storage, executor, &elem_loc, out_idx, &body).await?;

        let elem_output = elem_loc.push_node(out_idx);
        if storage.is_node_finished(&elem_output).await? {
            for port in storage.read_output_ports(&elem_output).await? {
                let value = storage.read_output(&elem_output, &port).await?;
                storage
                    .write_output(loc, &map_element_port(&port, *j), &value)
                    .await?;
            }
        } else {
            all_finished = false;
        }
    }
    if all_finished {
        storage.mark_node_finished(loc).await?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn progress_ifelse(
    storage: &dyn ControllerStorage,
    executor: &dyn ControllerExecutor,
    scope: &Loc,
    loc: &Loc,
    node: &tierkreis_core::Node,
    if_true: &Edge,
    if_false: &Edge,
) -> Result<(), ControllerError> {
    if storage.is_node_finished(loc).await? {
        return Ok(());
    }
    let pred_edge = node
        .in_edges
        .get(PRED_PORT)
        .ok_or_else(|| ControllerError::DanglingReference(loc.clone(), PRED_PORT.to_string()))?;
    let pred = decode_bool(&resolve_edge_bytes(storage, scope, pred_edge).await?)
        .map_err(tierkreis_storage::StorageError::from)?;
    let chosen = if pred { if_true } else { if_false };

    match chosen {
        Edge::Value(vref) => {
            let graph = storage.read_metadata(scope).await?;
            walk_node(storage, executor, scope, vref.node, &graph).await?;
            let branch_loc = scope.push_node(vref.node);
            if !storage.is_node_finished(&branch_loc).await? {
                return Ok(());
            }
            storage
                .link_outputs(loc, &vref.port, &branch_loc, &vref.port)
                .await?;
        }
        Edge::Exterior(port) => {
            storage
                .link_outputs(loc, &VALUE_PORT.to_string(), &scope.push_exterior(), port)
                .await?;
        }
        Edge::Const(bytes) => {
            storage
                .write_output(loc, &VALUE_PORT.to_string(), bytes)
                .await?;
        }
    }
    storage.mark_node_finished(loc).await?;
    Ok(())
}

async fn progress_eager_ifelse(
    storage: &dyn ControllerStorage,
    scope: &Loc,
    loc: &Loc,
    node: &tierkreis_core::Node,
) -> Result<(), ControllerError> {
    if storage.is_node_finished(loc).await? {
        return Ok(());
    }
    let pred_edge = node
        .in_edges
        .get(PRED_PORT)
        .ok_or_else(|| ControllerError::DanglingReference(loc.clone(), PRED_PORT.to_string()))?;
    let pred = decode_bool(&resolve_edge_bytes(storage, scope, pred_edge).await?)
        .map_err(tierkreis_storage::StorageError::from)?;
    let chosen_port = if pred { "if_true" } else { "if_false" };
    let chosen_edge = node.in_edges.get(chosen_port).ok_or_else(|| {
        ControllerError::DanglingReference(loc.clone(), chosen_port.to_string())
    })?;

    match chosen_edge {
        Edge::Value(vref) => {
            storage
                .link_outputs(loc, &vref.port, &scope.push_node(vref.node), &vref.port)
                .await?;
        }
        Edge::Exterior(port) => {
            storage
                .link_outputs(loc, &VALUE_PORT.to_string(), &scope.push_exterior(), port)
                .await?;
        }
        Edge::Const(bytes) => {
            storage
                .write_output(loc, &VALUE_PORT.to_string(), bytes)
                .await?;
        }
    }
    storage.mark_node_finished(loc).await?;
    Ok(())
}

/// Copy every output port recorded at `from` into `to` under the same name.
async fn forward_outputs(
    storage: &dyn ControllerStorage,
    from: &Loc,
    to: &Loc,
) -> Result<(), ControllerError> {
    for port in storage.read_output_ports(from).await? {
        let value = storage.read_output(from, &port).await?;
        storage.write_output(to, &port, &value).await?;
    }
    Ok(())
}
