//! Error types for the location algebra and the graph data model.

use thiserror::Error;

use crate::location::Loc;

/// Errors raised while parsing or manipulating a [`Loc`](crate::location::Loc).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocError {
    #[error("location string `{0}` is not well formed")]
    Malformed(String),

    #[error("step `{0}` is not a valid location step")]
    BadStep(String),

    #[error("cannot pop a step off the empty location")]
    PopEmpty,

    #[error("location `{0}` has no last non-exterior step to peek an index from")]
    NoIndexStep(String),
}

/// Errors raised while building or querying a [`GraphData`](crate::graph::GraphData).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("graph already has an output node; a graph may declare `.output()` only once")]
    DuplicateOutput,

    #[error("node index {0} is out of range for this graph")]
    NodeIndexOutOfRange(usize),

    #[error("port `{port}` is not declared on node {index}")]
    UnknownPort { index: usize, port: String },

    #[error("location {0} does not resolve to a node in this graph")]
    UnresolvedLocation(Loc),

    #[error("edge at node {index} port `{port}` does not reference a constant graph value")]
    NotAConstGraph { index: usize, port: String },

    #[error(transparent)]
    Loc(#[from] LocError),
}
