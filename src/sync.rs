//! Reconciles the checkpoint ledger with the external todo list.
//!
//! The two views of "what is done" drift whenever a crash lands between
//! completing a task in the ledger and saving the todo list. Every
//! reconciliation step here only ever checks items off, so repeated runs
//! converge.

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::checkpoint::CheckpointStore;
use crate::fs::StatusLog;
use crate::recovery::RecoveryInfo;
use crate::todo::{TodoItem, TodoSource};

pub struct Synchronizer<'a> {
    store: &'a mut CheckpointStore,
    todo: &'a mut dyn TodoSource,
    status_log: Option<&'a StatusLog>,
}

impl<'a> Synchronizer<'a> {
    pub fn new(
        store: &'a mut CheckpointStore,
        todo: &'a mut dyn TodoSource,
        status_log: Option<&'a StatusLog>,
    ) -> Self {
        Self {
            store,
            todo,
            status_log,
        }
    }

    /// Check off every todo item whose text is completed in the ledger.
    /// The todo source is saved once, and only if something changed.
    pub fn sync_todos_with_checkpoint(&mut self) -> Result<usize> {
        let mut marked = 0;
        for text in self.store.completed_texts() {
            if self.todo.mark_task_done(&text) {
                debug!(task = %text, "Checked off todo item completed in checkpoint");
                marked += 1;
            }
        }

        if marked > 0 {
            self.todo.save()?;
            info!(marked, "Synced todo list with checkpoint");
        }
        Ok(marked)
    }

    /// Drop tasks the ledger already completed, checking them off in the
    /// todo source on the way.
    pub fn filter_completed_tasks(&mut self, tasks: Vec<TodoItem>) -> Result<Vec<TodoItem>> {
        let mut marked = 0;
        let mut remaining = Vec::with_capacity(tasks.len());

        for task in tasks {
            if self.store.is_task_completed(&task.text) {
                if self.todo.mark_task_done(&task.text) {
                    marked += 1;
                }
                debug!(task = %task.text, "Skipping task already completed in checkpoint");
            } else {
                remaining.push(task);
            }
        }

        if marked > 0 {
            self.todo.save()?;
            info!(marked, "Checked off tasks already completed in checkpoint");
        }
        Ok(remaining)
    }

    /// Inspect what the previous session left behind, re-queue the
    /// interrupted task after a crash, and record the outcome.
    pub fn check_recovery_needed(&mut self) -> RecoveryInfo {
        let info = RecoveryInfo::analyze(self.store.document(), self.store.was_clean_shutdown());

        if info.was_clean_shutdown {
            debug!(
                session_id = %info.session_id,
                incomplete = info.incomplete_tasks_count,
                failed = info.failed_tasks_count,
                "Previous session shut down cleanly"
            );
            return info;
        }

        error!(
            session_id = %info.session_id,
            interrupted_task = info.current_task.as_ref().map(|t| t.task_id.as_str()),
            incomplete = info.incomplete_tasks_count,
            failed = info.failed_tasks_count,
            iteration_count = info.iteration_count,
            "Previous session did not shut down cleanly"
        );

        let title = if info.needs_recovery() {
            if let Some(task_id) = self.store.reset_interrupted_task() {
                warn!(task_id = %task_id, "Re-queued interrupted task");
            }
            "Recovered from unclean shutdown"
        } else {
            "Unclean shutdown detected"
        };

        if let Some(log) = self.status_log {
            if let Err(e) = log.append(title, &info.report_lines()) {
                warn!(error = %e, "Failed to append recovery entry to status log");
            }
        }

        info
    }
}
