//! An in-memory [`ControllerStorage`] backend.
//!
//! Keeps every fact behind an `Arc<RwLock<...>>` map, trading durability
//! across process restarts for zero setup cost. This is the backend the
//! test suite and the `examples/` binaries use; [`crate::file::FileStorage`]
//! is the persistence-grade counterpart.
//!
//! # When to Use
//!
//! - Unit and integration tests that exercise the walker/dispatcher without
//!   touching a filesystem.
//! - Short-lived runs (a CLI invocation, an example) where resuming across
//!   a process restart is not a requirement.
//!
//! # Avoid For
//!
//! - Anything that must survive the controller process exiting: use
//!   [`crate::file::FileStorage`] instead.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use tierkreis_core::{GraphData, Loc, NodeDescription, PortID, Step};

use crate::call_args::WorkerCallArgs;
use crate::error::StorageError;
use crate::traits::ControllerStorage;

#[derive(Default)]
struct State {
    graphs: HashMap<String, GraphData>,
    descriptions: HashMap<String, NodeDescription>,
    outputs: HashMap<(String, PortID), Vec<u8>>,
    links: HashMap<(String, PortID), (String, PortID)>,
    started: HashSet<String>,
    finished: HashSet<String>,
    errors: HashMap<String, String>,
    error_order: Vec<(Loc, String)>,
    call_args: HashMap<String, WorkerCallArgs>,
    debug_names: HashMap<String, String>,
    loop_latest: HashMap<String, usize>,
}

/// An in-memory, process-local implementation of [`ControllerStorage`].
pub struct InMemoryStorage {
    state: Arc<RwLock<State>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        InMemoryStorage {
            state: Arc::new(RwLock::new(State::default())),
        }
    }

    /// Follow `links` transitively until reaching a `(loc, port)` nothing
    /// redirects further.
    fn resolve(state: &State, loc: &Loc, port: &PortID) -> (String, PortID) {
        let mut current = (loc.to_string(), port.clone());
        let mut seen = HashSet::new();
        while let Some(target) = state.links.get(&current) {
            if !seen.insert(current.clone()) {
                break;
            }
            current = target.clone();
        }
        current
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ControllerStorage for InMemoryStorage {
    async fn write_metadata(&self, root: &Loc, graph: &GraphData) -> Result<(), StorageError> {
        self.state
            .write()
            .await
            .graphs
            .insert(root.to_string(), graph.clone());
        Ok(())
    }

    async fn read_metadata(&self, root: &Loc) -> Result<GraphData, StorageError> {
        self.state
            .read()
            .await
            .graphs
            .get(&root.to_string())
            .cloned()
            .ok_or_else(|| StorageError::MissingDescription(root.clone()))
    }

    async fn write_node_description(
        &self,
        loc: &Loc,
        description: &NodeDescription,
    ) -> Result<(), StorageError> {
        self.state
            .write()
            .await
            .descriptions
            .insert(loc.to_string(), description.clone());
        Ok(())
    }

    async fn read_node_description(&self, loc: &Loc) -> Result<NodeDescription, StorageError> {
        self.state
            .read()
            .await
            .descriptions
            .get(&loc.to_string())
            .cloned()
            .ok_or_else(|| StorageError::MissingDescription(loc.clone()))
    }

    async fn write_output(&self, loc: &Loc, port: &PortID, value: &[u8]) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let key = (loc.to_string(), port.clone());
        state.outputs.entry(key).or_insert_with(|| value.to_vec());
        Ok(())
    }

    async fn read_output(&self, loc: &Loc, port: &PortID) -> Result<Vec<u8>, StorageError> {
        let state = self.state.read().await;
        let resolved = Self::resolve(&state, loc, port);
        state
            .outputs
            .get(&resolved)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                loc: loc.clone(),
                port: port.clone(),
            })
    }

    async fn read_output_ports(&self, loc: &Loc) -> Result<Vec<PortID>, StorageError> {
        let state = self.state.read().await;
        let loc_str = loc.to_string();
        let mut ports: HashSet<PortID> = state
            .outputs
            .keys()
            .filter(|(l, _)| *l == loc_str)
            .map(|(_, p)| p.clone())
            .collect();
        ports.extend(
            state
                .links
                .keys()
                .filter(|(l, _)| *l == loc_str)
                .map(|(_, p)| p.clone()),
        );
        Ok(ports.into_iter().collect())
    }

    async fn link_outputs(
        &self,
        dst_loc: &Loc,
        dst_port: &PortID,
        src_loc: &Loc,
        src_port: &PortID,
    ) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let resolved_src = Self::resolve(&state, src_loc, src_port);
        state
            .links
            .insert((dst_loc.to_string(), dst_port.clone()), resolved_src);
        Ok(())
    }

    async fn mark_node_started(&self, loc: &Loc) -> Result<(), StorageError> {
        self.state.write().await.started.insert(loc.to_string());
        Ok(())
    }

    async fn is_node_started(&self, loc: &Loc) -> Result<bool, StorageError> {
        Ok(self.state.read().await.started.contains(&loc.to_string()))
    }

    async fn mark_node_finished(&self, loc: &Loc) -> Result<(), StorageError> {
        self.state.write().await.finished.insert(loc.to_string());
        Ok(())
    }

    async fn is_node_finished(&self, loc: &Loc) -> Result<bool, StorageError> {
        Ok(self.state.read().await.finished.contains(&loc.to_string()))
    }

    async fn write_node_error(&self, loc: &Loc, message: &str) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        if !state.errors.contains_key(&loc.to_string()) {
            state
                .errors
                .insert(loc.to_string(), message.to_string());
            state.error_order.push((loc.clone(), message.to_string()));
        }
        Ok(())
    }

    async fn node_has_error(&self, loc: &Loc) -> Result<bool, StorageError> {
        Ok(self.state.read().await.errors.contains_key(&loc.to_string()))
    }

    async fn read_errors(&self, loc: &Loc) -> Result<Vec<(Loc, String)>, StorageError> {
        Ok(self
            .state
            .read()
            .await
            .error_order
            .iter()
            .filter(|(l, _)| loc.is_prefix_of(l))
            .cloned()
            .collect())
    }

    async fn write_worker_call_args(
        &self,
        loc: &Loc,
        args: &WorkerCallArgs,
    ) -> Result<(), StorageError> {
        self.state
            .write()
            .await
            .call_args
            .insert(loc.to_string(), args.clone());
        Ok(())
    }

    async fn read_worker_call_args(&self, loc: &Loc) -> Result<WorkerCallArgs, StorageError> {
        self.state
            .read()
            .await
            .call_args
            .get(&loc.to_string())
            .cloned()
            .ok_or_else(|| StorageError::MissingDescription(loc.clone()))
    }

    async fn latest_loop_iteration(&self, loop_loc: &Loc) -> Result<Option<usize>, StorageError> {
        Ok(self
            .state
            .read()
            .await
            .loop_latest
            .get(&loop_loc.to_string())
            .copied())
    }

    async fn write_debug_data(&self, name: &str, loc: &Loc) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        state
            .debug_names
            .insert(name.to_string(), loc.to_string());
        if let Ok((Step::Loop(iter), parent)) = loc.pop_last() {
            state
                .loop_latest
                .entry(parent.to_string())
                .and_modify(|v| *v = (*v).max(iter))
                .or_insert(iter);
        }
        Ok(())
    }

    async fn loc_from_node_name(&self, name: &str) -> Result<Loc, StorageError> {
        let state = self.state.read().await;
        let loc_str = state
            .debug_names
            .get(name)
            .ok_or_else(|| StorageError::MissingDebugName(name.to_string()))?;
        Ok(loc_str.parse()?)
    }
}
