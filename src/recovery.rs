//! Startup recovery analysis.
//!
//! Derives a [`RecoveryInfo`] report from a loaded checkpoint document. The
//! analysis is pure; resetting the interrupted task is left to the caller.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::checkpoint::{CheckpointDocument, TaskRecord, TaskState};

/// What the previous session left behind
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecoveryInfo {
    pub was_clean_shutdown: bool,
    pub session_id: String,
    /// The in-progress record, i.e. interrupted work after a crash
    pub current_task: Option<TaskRecord>,
    pub incomplete_tasks: Vec<TaskRecord>,
    pub incomplete_tasks_count: usize,
    pub failed_tasks: Vec<TaskRecord>,
    pub failed_tasks_count: usize,
    pub last_start_time: Option<DateTime<Utc>>,
    pub last_stop_time: Option<DateTime<Utc>>,
    pub iteration_count: u64,
}

impl RecoveryInfo {
    /// `was_clean_shutdown` must be the flag as it was read from disk,
    /// before the current process marked its own start.
    pub fn analyze(document: &CheckpointDocument, was_clean_shutdown: bool) -> Self {
        let current_task = document
            .tasks_in_state(TaskState::InProgress)
            .next()
            .cloned();
        let incomplete_tasks: Vec<TaskRecord> = document
            .tasks
            .iter()
            .filter(|t| t.state.is_incomplete())
            .cloned()
            .collect();
        let failed_tasks: Vec<TaskRecord> =
            document.tasks_in_state(TaskState::Failed).cloned().collect();
        let state = &document.session.server_state;

        Self {
            was_clean_shutdown,
            session_id: document.session.session_id.clone(),
            current_task,
            incomplete_tasks_count: incomplete_tasks.len(),
            incomplete_tasks,
            failed_tasks_count: failed_tasks.len(),
            failed_tasks,
            last_start_time: state.last_start_time,
            last_stop_time: state.last_stop_time,
            iteration_count: document.session.iteration_count,
        }
    }

    /// A crash interrupted a task that must be re-queued
    pub fn needs_recovery(&self) -> bool {
        !self.was_clean_shutdown && self.current_task.is_some()
    }

    pub fn summary(&self) -> String {
        let session = if self.session_id.is_empty() {
            "none"
        } else {
            self.session_id.as_str()
        };
        let shutdown = if self.was_clean_shutdown {
            "clean shutdown"
        } else {
            "unclean shutdown"
        };
        let mut summary = format!(
            "previous session {session} ({shutdown}): {} incomplete, {} failed",
            self.incomplete_tasks_count, self.failed_tasks_count
        );
        if let Some(task) = &self.current_task {
            summary.push_str(&format!(", interrupted: {}", task.task_text));
        }
        summary
    }

    /// Bullet lines for the status log entry written after a crash
    pub fn report_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "Previous session: {}",
            if self.session_id.is_empty() {
                "none"
            } else {
                &self.session_id
            }
        )];
        if let Some(start) = self.last_start_time {
            lines.push(format!("Last start: {}", start.to_rfc3339()));
        }
        if let Some(task) = &self.current_task {
            lines.push(format!(
                "Interrupted task: {} (`{}`, attempt {})",
                task.task_text, task.task_id, task.attempts
            ));
        }
        lines.push(format!("Incomplete tasks: {}", self.incomplete_tasks_count));
        lines.push(format!("Failed tasks: {}", self.failed_tasks_count));
        lines.push(format!("Iterations so far: {}", self.iteration_count));
        lines
    }
}
