//! The storage protocol: every fact the controller needs to persist to make
//! a run crash-resumable.
//!
//! # Implementation Requirements
//!
//! A `ControllerStorage` backend must make the following facts durable and
//! idempotent:
//!
//! - **Started/finished/error flags** are monotonic: once set for a
//!   location they never unset, and setting them again is a no-op, not an
//!   error. The walker and `start` dispatcher rely on this to be safe to
//!   call repeatedly after a crash.
//! - **Links** (installed by [`ControllerStorage::link_outputs`]) redirect
//!   reads at one `(Loc, PortID)` to another `(Loc, PortID)`. A backend must
//!   resolve links transitively (a link to a linked port follows through to
//!   the final target) and idempotently (installing the same link twice is
//!   a no-op).
//! - **Output writes** are one-shot per `(Loc, PortID)`: a node's output,
//!   once written, is never overwritten by a later call.
//!
//! # Example Implementation (in-memory)
//!
//! [`crate::memory::InMemoryStorage`] keeps every fact in an
//! `Arc<RwLock<...>>` map of maps, trading durability across process
//! restarts for zero setup cost — the right choice for tests and for the
//! `examples/` binaries. [`crate::file::FileStorage`] instead lays every
//! fact out on disk so a crashed run can be resumed by pointing a fresh
//! process at the same directory.

use async_trait::async_trait;
use tierkreis_core::{GraphData, Loc, NodeDescription, PortID};

use crate::call_args::WorkerCallArgs;
use crate::error::StorageError;

/// The durable record of a single controller run.
#[async_trait]
pub trait ControllerStorage: Send + Sync {
    /// Persist the run's top-level graph and any launch metadata (the
    /// initial exterior inputs) under `root`.
    async fn write_metadata(&self, root: &Loc, graph: &GraphData) -> Result<(), StorageError>;

    /// Read back the graph written by [`write_metadata`](Self::write_metadata).
    async fn read_metadata(&self, root: &Loc) -> Result<GraphData, StorageError>;

    /// Record the resolved [`NodeDescription`] for a location — what
    /// `start` actually dispatched, including synthesized descriptions for
    /// loop iterations, map elements and exterior scopes.
    async fn write_node_description(
        &self,
        loc: &Loc,
        description: &NodeDescription,
    ) -> Result<(), StorageError>;

    /// Read back a description written by
    /// [`write_node_description`](Self::write_node_description).
    async fn read_node_description(&self, loc: &Loc) -> Result<NodeDescription, StorageError>;

    /// Record one output port's value for a location. One-shot: a second
    /// write to the same `(loc, port)` must not clobber the first.
    async fn write_output(&self, loc: &Loc, port: &PortID, value: &[u8]) -> Result<(), StorageError>;

    /// Read a previously-written output, following [`link_outputs`](Self::link_outputs)
    /// redirections transitively.
    async fn read_output(&self, loc: &Loc, port: &PortID) -> Result<Vec<u8>, StorageError>;

    /// All output port names recorded for a location (after following
    /// links), in no particular order.
    async fn read_output_ports(&self, loc: &Loc) -> Result<Vec<PortID>, StorageError>;

    /// Redirect future reads of `(dst_loc, dst_port)` to `(src_loc,
    /// src_port)`, without copying any bytes. Used whenever a node's output
    /// is, structurally, just an alias for another location's output under
    /// a possibly different port name (an `Input`'s value is its enclosing
    /// scope's exterior input; an `Output`'s ports are its producers'
    /// outputs; an `IfElse`'s result is whichever branch ran). Must be
    /// transitive and idempotent.
    async fn link_outputs(
        &self,
        dst_loc: &Loc,
        dst_port: &PortID,
        src_loc: &Loc,
        src_port: &PortID,
    ) -> Result<(), StorageError>;

    /// Mark a location as started. Idempotent.
    async fn mark_node_started(&self, loc: &Loc) -> Result<(), StorageError>;

    /// Whether [`mark_node_started`](Self::mark_node_started) has been called for this location.
    async fn is_node_started(&self, loc: &Loc) -> Result<bool, StorageError>;

    /// Mark a location as finished. Idempotent.
    async fn mark_node_finished(&self, loc: &Loc) -> Result<(), StorageError>;

    /// Whether [`mark_node_finished`](Self::mark_node_finished) has been called for this location.
    async fn is_node_finished(&self, loc: &Loc) -> Result<bool, StorageError>;

    /// Record that a node failed, with a human-readable message.
    async fn write_node_error(&self, loc: &Loc, message: &str) -> Result<(), StorageError>;

    /// Whether [`write_node_error`](Self::write_node_error) has been called for this location.
    async fn node_has_error(&self, loc: &Loc) -> Result<bool, StorageError>;

    /// Every recorded error at or beneath `loc`, in the order they were
    /// written.
    async fn read_errors(&self, loc: &Loc) -> Result<Vec<(Loc, String)>, StorageError>;

    /// Persist the call arguments a `Func` dispatch hands to a worker.
    async fn write_worker_call_args(
        &self,
        loc: &Loc,
        args: &WorkerCallArgs,
    ) -> Result<(), StorageError>;

    /// Read back call arguments written by
    /// [`write_worker_call_args`](Self::write_worker_call_args).
    async fn read_worker_call_args(&self, loc: &Loc) -> Result<WorkerCallArgs, StorageError>;

    /// The highest loop iteration index started for `loop_loc`, if any.
    /// Used both to decide which iteration to resume from and to bound
    /// [`read_loop_trace`](Self::read_loop_trace).
    async fn latest_loop_iteration(&self, loop_loc: &Loc) -> Result<Option<usize>, StorageError>;

    /// Record a human-readable debug name for a location (e.g. a loop's
    /// `name` field), so later tooling can find it by name rather than by
    /// its raw `Loc` string.
    async fn write_debug_data(&self, name: &str, loc: &Loc) -> Result<(), StorageError>;

    /// Resolve a name written by [`write_debug_data`](Self::write_debug_data) back to its
    /// location.
    async fn loc_from_node_name(&self, name: &str) -> Result<Loc, StorageError>;

    /// The sequence of values a loop's body *computed* for `port` across
    /// every iteration it has run so far, oldest first — iteration `k`'s
    /// entry is the value its body's `Output` node produced, not the value
    /// it was entered with (its predecessor's output, or the loop's initial
    /// input for iteration 0).
    ///
    /// The default implementation is built entirely on
    /// [`latest_loop_iteration`](Self::latest_loop_iteration),
    /// [`read_metadata`](Self::read_metadata) and
    /// [`read_output`](Self::read_output); a backend only needs to override
    /// it if it can do meaningfully better than replaying one read per
    /// iteration.
    async fn read_loop_trace(
        &self,
        loop_loc: &Loc,
        port: &PortID,
    ) -> Result<Vec<Vec<u8>>, StorageError> {
        let Some(latest) = self.latest_loop_iteration(loop_loc).await? else {
            return Ok(Vec::new());
        };
        let mut trace = Vec::with_capacity(latest + 1);
        for i in 0..=latest {
            let iter_loc = loop_loc.push_loop(i);
            let body = self.read_metadata(&iter_loc).await?;
            let out_idx = body
                .output_idx()
                .ok_or_else(|| StorageError::MissingDescription(iter_loc.clone()))?;
            let value = self
                .read_output(&iter_loc.push_node(out_idx), port)
                .await?;
            trace.push(value);
        }
        Ok(trace)
    }
}
