//! The run loop: drive a graph to completion (or failure) by repeatedly
//! walking it until its `Output` node finishes, backing off between polls.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use tierkreis_core::{GraphData, Loc, PortID};
use tierkreis_storage::ControllerStorage;
use tracing::{error, info, warn};

use crate::error::ControllerError;
use crate::executor::ControllerExecutor;
use crate::walk::walk_graph;

/// Tunables for [`resume_graph`]. Plain constructor arguments rather than a
/// config file: the controller keeps no global state.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// How long to sleep between polls when the graph hasn't finished.
    pub poll_interval: Duration,
    /// The maximum number of ticks to run before giving up with
    /// [`ControllerError::TickBudgetExhausted`]. `None` runs unboundedly.
    pub max_ticks: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            poll_interval: Duration::from_millis(10),
            max_ticks: None,
        }
    }
}

/// Launch a fresh run of `graph` with the given exterior `inputs`, polling
/// until it finishes or a node fails.
///
/// Inputs the graph declares but that aren't provided are logged as a
/// warning, not treated as fatal — a caller may be relying on a default
/// supplied further down the graph.
pub async fn run_graph(
    storage: &dyn ControllerStorage,
    executor: &dyn ControllerExecutor,
    graph: GraphData,
    inputs: BTreeMap<PortID, Vec<u8>>,
    opts: RunOptions,
) -> Result<BTreeMap<PortID, Vec<u8>>, ControllerError> {
    let root = Loc::root();
    let provided: BTreeSet<PortID> = inputs.keys().cloned().collect();
    for missing in graph.remaining_inputs(&provided) {
        warn!(port = %missing, "exterior input not provided; run will rely on a downstream default");
    }

    storage.write_metadata(&root, &graph).await?;
    for (port, value) in &inputs {
        storage.write_output(&root.push_exterior(), port, value).await?;
    }
    info!(nodes = graph.node_count(), "starting run");

    resume_graph(storage, executor, opts).await
}

/// Resume an existing run (fresh or after a crash) by polling the root
/// graph already recorded in `storage` until it finishes or a node fails.
pub async fn resume_graph(
    storage: &dyn ControllerStorage,
    executor: &dyn ControllerExecutor,
    opts: RunOptions,
) -> Result<BTreeMap<PortID, Vec<u8>>, ControllerError> {
    let root = Loc::root();
    let mut tick = 0usize;
    loop {
        if let Some(max) = opts.max_ticks {
            if tick >= max {
                return Err(ControllerError::TickBudgetExhausted(max));
            }
        }
        tick += 1;

        let finished = walk_graph(storage, executor, &root).await?;

        let errors = storage.read_errors(&root).await?;
        if let Some((loc, message)) = errors.into_iter().next() {
            error!(%loc, %message, "node failed; aborting run");
            return Err(ControllerError::Worker { loc, message });
        }

        if finished {
            let graph = storage.read_metadata(&root).await?;
            let out_idx = graph
                .output_idx()
                .ok_or_else(|| ControllerError::MissingOutputNode(root.clone()))?;
            let out_loc = root.push_node(out_idx);
            let mut result = BTreeMap::new();
            for port in storage.read_output_ports(&out_loc).await? {
                result.insert(port.clone(), storage.read_output(&out_loc, &port).await?);
            }
            info!("run finished");
            return Ok(result);
        }

        tokio::time::sleep(opts.poll_interval).await;
    }
}
