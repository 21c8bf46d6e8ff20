//! # tierkreis-controller
//!
//! The dispatcher, walker and run loop that execute a
//! [`tierkreis_core::GraphData`] against a [`tierkreis_storage::ControllerStorage`]
//! backend.
//!
//! ```text
//!           run_graph / resume_graph   (controller: the poll loop)
//!                      │
//!                      ▼
//!                 walk_graph          (walk: pulls the Output node)
//!                      │
//!                      ▼
//!                 walk_node           (walk: readiness + recursion)
//!                      │
//!               ┌──────┴──────┐
//!               ▼             ▼
//!             start()     progress_*()  (start: ignition; walk: advance)
//! ```
//!
//! ## Module organization
//!
//! - [`controller`] — [`controller::run_graph`]/[`controller::resume_graph`],
//!   the poll loop.
//! - [`walk`] — the demand-driven readiness walker.
//! - [`start`] — the one-time per-node-kind ignition dispatcher.
//! - [`executor`] — [`executor::ControllerExecutor`] and
//!   [`executor::InMemoryExecutor`], the `Func` node collaborator.
//! - [`error`] — [`error::ControllerError`].

pub mod controller;
pub mod error;
pub mod executor;
pub mod start;
pub mod walk;

pub use controller::{resume_graph, run_graph, RunOptions};
pub use error::ControllerError;
pub use executor::{ControllerExecutor, ExecutorError, InMemoryExecutor};
