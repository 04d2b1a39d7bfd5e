use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::checkpoint::{CheckpointStore, TaskState};

/// Derive the ledger id of a task from its text.
///
/// SHA-256 of the text, first 16 hex characters, prefixed with `task-`.
/// The same text maps to the same record across iterations and restarts.
pub fn task_id_for(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let result = hasher.finalize();
    format!("task-{}", hex::encode(&result[..8]))
}

/// Fresh id for a scheduler session: `session-<uuid8>-<unix timestamp>`
pub fn generate_session_id() -> String {
    let timestamp = Utc::now().timestamp();
    let uuid_short = uuid::Uuid::new_v4()
        .to_string()
        .split('-')
        .next()
        .unwrap_or("")
        .to_string();
    format!("session-{uuid_short}-{timestamp}")
}

/// Determines whether a task has used up its attempts.
///
/// Only a FAILED record can be exhausted. A record re-queued after a crash
/// is pending and always gets another run.
pub fn is_retry_exhausted(store: &CheckpointStore, task_id: &str, max_attempts: u32) -> bool {
    match store.get_task(task_id) {
        Some(task) => {
            task.state == TaskState::Failed && !store.should_retry_task(task_id, max_attempts)
        }
        None => false,
    }
}
