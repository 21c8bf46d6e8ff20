//! # tierkreis-storage
//!
//! The storage protocol every controller run is built on top of: the
//! [`ControllerStorage`] trait plus an in-memory and an on-disk
//! implementation. Crash-resumability is entirely a storage-layer property
//! — the controller never keeps state the storage backend doesn't also
//! have, so re-pointing a fresh process at the same store (file-backed) or
//! the same handle (in-memory) picks a run back up exactly where it left
//! off.
//!
//! ## Module organization
//!
//! - [`traits`] — the [`ControllerStorage`] trait.
//! - [`memory`] — [`memory::InMemoryStorage`], for tests and examples.
//! - [`file`] — [`file::FileStorage`], the on-disk layout.
//! - [`call_args`] — [`call_args::WorkerCallArgs`], the record a dispatch
//!   writes for a worker to pick up.
//! - [`error`] — [`error::StorageError`].

pub mod call_args;
pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use call_args::WorkerCallArgs;
pub use error::StorageError;
pub use file::FileStorage;
pub use memory::InMemoryStorage;
pub use traits::ControllerStorage;
