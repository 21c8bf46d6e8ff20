//! Error type for the [`ControllerStorage`](crate::traits::ControllerStorage) trait and its
//! backends.

use thiserror::Error;
use tierkreis_core::Loc;

/// Errors a [`ControllerStorage`](crate::traits::ControllerStorage) backend can raise.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no entry recorded for {loc} port `{port}`")]
    NotFound { loc: Loc, port: String },

    #[error("no node description recorded for {0}")]
    MissingDescription(Loc),

    #[error("no debug entry named `{0}`")]
    MissingDebugName(String),

    #[error("JSON (de)serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("binary (de)serialization failed: {0}")]
    BinarySerialization(#[from] bincode::Error),

    #[error("location parsing failed: {0}")]
    Loc(#[from] tierkreis_core::LocError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}
