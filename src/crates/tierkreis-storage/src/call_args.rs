//! The record a dispatcher writes so an out-of-process worker knows what to
//! call and where to read/write its arguments, mirroring the shape of the
//! original `WorkerCallArgs` (function name, named input sources, named
//! output slots) without committing to filesystem paths — a backend is free
//! to resolve an input's edge into a path, an RPC call, or an in-memory
//! slot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tierkreis_core::{Edge, PortID};

/// The arguments a `Func` (or builtin) node is invoked with. `function_name`
/// is already stripped of its launcher prefix (the dispatcher splits
/// `"launcher.func"` before writing this record; the launcher itself is
/// passed to the executor separately, never persisted here).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerCallArgs {
    pub function_name: String,
    /// Each named input argument's source edge — a sibling's output, a
    /// literal constant, or the enclosing scope's exterior.
    pub inputs: BTreeMap<PortID, Edge>,
    /// The output port names this call is expected to produce.
    pub outputs: Vec<PortID>,
}
