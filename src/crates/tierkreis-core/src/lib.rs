//! # tierkreis-core
//!
//! The data model shared by every other tierkreis crate: node addresses
//! ([`location::Loc`]) and dataflow graphs ([`graph::GraphData`]). This
//! crate does no I/O and has no async API — it is the pure, synchronous
//! substrate the storage and controller crates build on.
//!
//! ```text
//! tierkreis-core          (this crate: Loc, GraphData — no I/O)
//!      ▲
//!      │
//! tierkreis-storage        (ControllerStorage trait + backends)
//!      ▲
//!      │
//! tierkreis-controller     (start dispatcher, walker, run loop)
//! ```
//!
//! ## Module organization
//!
//! - [`location`] — the `Loc`/`Step` addressing algebra.
//! - [`graph`] — `GraphData`, `Node`, `NodeDef`, `Edge` and the graph
//!   queries the walker and `start` dispatcher rely on.
//! - [`value`] — byte-encoding helpers for the few places the engine is
//!   allowed to interpret a value's bytes (booleans, map-index suffixes).
//! - [`error`] — `LocError` and `GraphError`.

pub mod error;
pub mod graph;
pub mod location;
pub mod value;

pub use error::{GraphError, LocError};
pub use graph::{Edge, GraphData, Node, NodeDef, NodeDescription, NodeIndex, PortID, ValueRef};
pub use location::{Loc, Step};
