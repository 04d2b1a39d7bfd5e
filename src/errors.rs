//! Typed errors for the checkpoint store and the execution loop.
//!
//! `StorageError` never escapes the store: every variant is logged and the
//! store falls back to its backup or in-memory document. `SchedulerError`
//! is what `Scheduler::run_iteration` hands back to the host.

use std::path::PathBuf;
use thiserror::Error;

/// Failures reading or writing the checkpoint document.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read checkpoint file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse checkpoint file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize checkpoint document: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to write checkpoint file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Conditions that end a scheduler iteration early.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The host asked for a full reload. Not a failure: the caller is
    /// expected to tear down and rebuild the scheduler.
    #[error("Restart requested")]
    RestartRequested,

    #[error("Todo source error: {0}")]
    TodoSource(#[source] anyhow::Error),
}

impl SchedulerError {
    pub fn is_restart(&self) -> bool {
        matches!(self, SchedulerError::RestartRequested)
    }
}
