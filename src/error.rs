//! Error types surfaced by the library
//!
//! Statistical degeneracy is never an error; only malformed batches and
//! store failures reach the caller.

use std::path::PathBuf;

/// Errors from a run store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize run history: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Run history is corrupt ({path}): {details}")]
    Corrupt { path: PathBuf, details: String },
}

/// Errors from an analysis invocation
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid document batch: {0}")]
    InvalidBatch(String),

    #[error("Run history error: {0}")]
    Store(#[from] StoreError),
}
