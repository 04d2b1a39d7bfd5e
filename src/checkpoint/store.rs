//! Durable checkpoint store
//!
//! Owns the one in-memory [`CheckpointDocument`] and mirrors every mutation
//! to disk. Persistence problems never reach the caller: reads fall back to
//! the `*.backup` sibling and then to a fresh document, and failed writes
//! leave the in-memory document authoritative. Task execution must keep
//! going even when the disk does not cooperate.
//!
//! A single writer per checkpoint file is assumed. Nothing here locks the
//! file; an advisory lock would be the place to start if several processes
//! ever need to share one ledger.

use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::types::{CheckpointDocument, CheckpointStats, Progress, TaskRecord, TaskState};
use crate::errors::StorageError;
use crate::fs::atomic::{atomic_write, backup_path, copy_to_backup};

/// Default file name for the checkpoint ledger
pub const DEFAULT_CHECKPOINT_FILE: &str = "tasks.checkpoint.json";

pub struct CheckpointStore {
    path: PathBuf,
    document: CheckpointDocument,
    /// `clean_shutdown` exactly as it was read at load time
    was_clean_shutdown: bool,
    /// Whether the primary file currently holds a parseable document.
    /// Only a valid primary is ever rotated into the backup slot.
    primary_valid: bool,
}

fn read_document(path: &Path) -> Result<CheckpointDocument, StorageError> {
    let content = fs::read_to_string(path).map_err(|source| StorageError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| StorageError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl CheckpointStore {
    /// Open the store at `path`, loading whatever is on disk.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut store = Self {
            path: path.into(),
            document: CheckpointDocument::default(),
            was_clean_shutdown: true,
            primary_valid: false,
        };
        store.load();
        store
    }

    /// Load the primary file, falling back to the backup and then to a
    /// fresh document. Always leaves a valid document in memory.
    pub fn load(&mut self) {
        let (document, primary_valid) = match read_document(&self.path) {
            Ok(doc) => (doc, true),
            Err(primary_err) => {
                let backup = backup_path(&self.path);
                if self.path.exists() {
                    warn!(error = %primary_err, "Checkpoint file unreadable, trying backup");
                }

                match read_document(&backup) {
                    Ok(doc) => {
                        warn!(
                            path = %backup.display(),
                            tasks = doc.tasks.len(),
                            "Recovered checkpoint from backup"
                        );
                        (doc, false)
                    }
                    Err(backup_err) => {
                        if backup.exists() {
                            error!(error = %backup_err, "Checkpoint backup unreadable");
                        }
                        info!(path = %self.path.display(), "Initializing fresh checkpoint");
                        (CheckpointDocument::default(), false)
                    }
                }
            }
        };

        self.was_clean_shutdown = document.session.server_state.clean_shutdown;
        self.primary_valid = primary_valid;
        self.document = document;
    }

    /// Persist the document. Returns `false` if it did not reach disk; the
    /// in-memory document stays authoritative either way.
    pub fn save(&mut self) -> bool {
        match self.try_save() {
            Ok(()) => {
                self.primary_valid = true;
                true
            }
            Err(e) => {
                error!(error = %e, "Checkpoint not persisted, continuing in memory");
                false
            }
        }
    }

    fn try_save(&self) -> Result<(), StorageError> {
        let json =
            serde_json::to_string_pretty(&self.document).map_err(StorageError::Serialize)?;

        if self.primary_valid {
            if let Err(e) = copy_to_backup(&self.path) {
                warn!(error = %e, path = %self.path.display(), "Failed to rotate checkpoint backup");
            }
        }

        atomic_write(&self.path, json.as_bytes()).map_err(|source| StorageError::Write {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        backup_path(&self.path)
    }

    pub fn document(&self) -> &CheckpointDocument {
        &self.document
    }

    /// The `clean_shutdown` flag as read from disk, before this process
    /// touched it. `false` means the previous run crashed.
    pub fn was_clean_shutdown(&self) -> bool {
        self.was_clean_shutdown
    }

    pub fn mark_server_start(&mut self, session_id: &str) {
        let state = &mut self.document.session.server_state;
        state.clean_shutdown = false;
        state.last_start_time = Some(Utc::now());
        self.document.session.session_id = session_id.to_string();
        info!(session_id, "Session started");
        self.save();
    }

    pub fn mark_server_stop(&mut self, clean: bool) {
        let state = &mut self.document.session.server_state;
        state.clean_shutdown = clean;
        state.last_stop_time = Some(Utc::now());
        info!(
            session_id = %self.document.session.session_id,
            clean,
            "Session stopped"
        );
        self.save();
    }

    /// Register a task. Idempotent by id: a repeat call only merges
    /// `metadata` into the existing record. Returns `true` if a new record
    /// was created.
    pub fn add_task(&mut self, task_id: &str, task_text: &str, metadata: Map<String, Value>) -> bool {
        if let Some(task) = self.document.find_task_mut(task_id) {
            if task.task_text != task_text {
                debug!(task_id, "add_task: keeping original text for existing id");
            }
            if metadata.is_empty() {
                return false;
            }
            task.metadata.extend(metadata);
            self.save();
            return false;
        }

        self.document
            .tasks
            .push(TaskRecord::new(task_id, task_text).with_metadata(metadata));
        debug!(task_id, "Task registered");
        self.save();
        true
    }

    pub fn get_task(&self, task_id: &str) -> Option<&TaskRecord> {
        self.document.find_task(task_id)
    }

    /// Move a task to in-progress and count the attempt. Unknown ids are
    /// logged and ignored.
    pub fn mark_task_start(&mut self, task_id: &str) -> bool {
        let Some(idx) = self
            .document
            .tasks
            .iter()
            .position(|t| t.task_id == task_id)
        else {
            warn!(task_id, "mark_task_start: unknown task");
            return false;
        };

        for (i, other) in self.document.tasks.iter_mut().enumerate() {
            if i != idx && other.state == TaskState::InProgress {
                warn!(
                    task_id = %other.task_id,
                    "Returning stale in-progress task to pending"
                );
                other.state = TaskState::Pending;
            }
        }

        let task = &mut self.document.tasks[idx];
        task.state = TaskState::InProgress;
        task.attempts += 1;
        task.start_time = Some(Utc::now());
        task.end_time = None;
        task.result = None;
        task.error_message = None;
        info!(task_id, attempt = task.attempts, "Task started");

        self.save();
        true
    }

    pub fn mark_task_completed(&mut self, task_id: &str, result: Option<Value>) -> bool {
        let Some(task) = self.document.find_task_mut(task_id) else {
            warn!(task_id, "mark_task_completed: unknown task");
            return false;
        };
        task.state = TaskState::Completed;
        task.end_time = Some(Utc::now());
        task.result = result;
        task.error_message = None;
        info!(task_id, attempts = task.attempts, "Task completed");

        self.save();
        true
    }

    pub fn mark_task_failed(&mut self, task_id: &str, error_message: &str) -> bool {
        let Some(task) = self.document.find_task_mut(task_id) else {
            warn!(task_id, "mark_task_failed: unknown task");
            return false;
        };
        task.state = TaskState::Failed;
        task.end_time = Some(Utc::now());
        task.result = None;
        task.error_message = Some(error_message.to_string());
        warn!(task_id, attempts = task.attempts, error = error_message, "Task failed");

        self.save();
        true
    }

    /// The in-progress record, if any. There is at most one.
    pub fn get_current_task(&self) -> Option<&TaskRecord> {
        self.document.tasks_in_state(TaskState::InProgress).next()
    }

    /// True iff some record with exactly this text is completed.
    pub fn is_task_completed(&self, task_text: &str) -> bool {
        self.document
            .tasks_in_state(TaskState::Completed)
            .any(|t| t.task_text == task_text)
    }

    /// Texts of every completed record, in ledger order
    pub fn completed_texts(&self) -> Vec<String> {
        self.document
            .tasks_in_state(TaskState::Completed)
            .map(|t| t.task_text.clone())
            .collect()
    }

    /// `attempts < max_attempts`. An unknown id has never been attempted.
    pub fn should_retry_task(&self, task_id: &str, max_attempts: u32) -> bool {
        match self.document.find_task(task_id) {
            Some(task) => task.attempts < max_attempts,
            None => true,
        }
    }

    /// Put the interrupted in-progress task back to pending. Returns its id.
    pub fn reset_interrupted_task(&mut self) -> Option<String> {
        let task = self
            .document
            .tasks
            .iter_mut()
            .find(|t| t.state == TaskState::InProgress)?;
        task.state = TaskState::Pending;
        task.start_time = None;
        let task_id = task.task_id.clone();
        info!(task_id = %task_id, "Interrupted task re-queued");

        self.save();
        Some(task_id)
    }

    /// Keep the `keep_last_n` most recently finished completed records and
    /// every record that is not completed. Returns how many were pruned.
    pub fn clear_old_tasks(&mut self, keep_last_n: usize) -> usize {
        let mut completed: Vec<_> = self
            .document
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.state == TaskState::Completed)
            .map(|(i, t)| (t.end_time, i))
            .collect();

        if completed.len() <= keep_last_n {
            return 0;
        }

        // Oldest first; records without an end time count as oldest
        completed.sort();
        let prune_count = completed.len() - keep_last_n;
        let pruned: HashSet<usize> = completed[..prune_count].iter().map(|(_, i)| *i).collect();

        let mut idx = 0;
        self.document.tasks.retain(|_| {
            let keep = !pruned.contains(&idx);
            idx += 1;
            keep
        });
        info!(pruned = prune_count, kept = keep_last_n, "Pruned old completed tasks");

        self.save();
        prune_count
    }

    pub fn get_statistics(&self) -> CheckpointStats {
        let mut stats = CheckpointStats {
            total: self.document.tasks.len(),
            iteration_count: self.document.session.iteration_count,
            ..Default::default()
        };
        for task in &self.document.tasks {
            match task.state {
                TaskState::Pending => stats.pending += 1,
                TaskState::InProgress => stats.in_progress += 1,
                TaskState::Completed => stats.completed += 1,
                TaskState::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// Count a new scheduler iteration and return its number.
    pub fn increment_iteration(&mut self) -> u64 {
        self.document.session.iteration_count += 1;
        let iteration = self.document.session.iteration_count;
        self.save();
        iteration
    }

    pub fn update_progress(&mut self, iteration: u64, index: usize, total: usize) {
        self.document.progress = Some(Progress {
            iteration,
            index,
            total,
            updated_at: Utc::now(),
        });
        debug!(iteration, index, total, "Progress checkpointed");
        self.save();
    }

    pub fn progress(&self) -> Option<&Progress> {
        self.document.progress.as_ref()
    }
}
