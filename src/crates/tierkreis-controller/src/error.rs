//! The controller's error type.

use thiserror::Error;
use tierkreis_core::{GraphError, Loc, PortID};
use tierkreis_storage::StorageError;

/// Errors raised while starting, walking or running a graph.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("graph at {0} declares no Output node")]
    MissingOutputNode(Loc),

    #[error("loop at {0} has no recorded iterations")]
    MissingLoopOutput(Loc),

    #[error("node at {0} port `{1}` references a node, port or body graph that doesn't exist")]
    DanglingReference(Loc, PortID),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("worker failed at {loc}: {message}")]
    Worker { loc: Loc, message: String },

    #[error("run did not finish within {0} ticks")]
    TickBudgetExhausted(usize),
}
