//! Durable task ledger: document types and the store that persists them.

pub mod store;
pub mod types;

pub use store::{CheckpointStore, DEFAULT_CHECKPOINT_FILE};
pub use types::{
    CheckpointDocument, CheckpointStats, Progress, ServerState, Session, TaskRecord, TaskState,
};
