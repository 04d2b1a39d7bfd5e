//! Core scheduler driving iterations over the todo list
//!
//! One call to [`Scheduler::run_iteration`] is one pass of
//! fetch, filter, execute, sync and decide. Nothing but the checkpoint
//! ledger carries state from one call to the next, so a crash between
//! calls loses nothing.

use serde_json::{json, Map};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::executor::{RevisionExecutor, TaskExecutor, TodoGenerator};
use super::retry::{generate_session_id, is_retry_exhausted, task_id_for};
use super::signals::ControlSignals;
use crate::checkpoint::CheckpointStore;
use crate::errors::SchedulerError;
use crate::fs::StatusLog;
use crate::recovery::RecoveryInfo;
use crate::sync::Synchronizer;
use crate::todo::{TodoItem, TodoSource};

/// Configuration for the scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Pause between two tasks of one iteration
    pub task_delay: Duration,
    pub max_attempts: u32,
    /// Run the todo generator when the list runs dry
    pub auto_generate: bool,
    /// Completed records kept when pruning at startup
    pub keep_completed: usize,
    /// Granularity of stop/reload polling during the task delay
    pub poll_step: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            task_delay: Duration::from_secs(5),
            max_attempts: 3,
            auto_generate: false,
            keep_completed: 50,
            poll_step: Duration::from_secs(1),
        }
    }
}

/// Outcome of one executed task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub task: String,
    pub success: bool,
}

/// What one iteration did and whether another one is worthwhile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationResult {
    pub has_more_tasks: bool,
    pub results: Vec<TaskOutcome>,
}

impl IterationResult {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }
}

enum DelayOutcome {
    Elapsed,
    Stopped,
}

pub struct Scheduler {
    config: SchedulerConfig,
    store: CheckpointStore,
    todo: Box<dyn TodoSource>,
    executor: Box<dyn TaskExecutor>,
    signals: Box<dyn ControlSignals>,
    revision: Option<Box<dyn RevisionExecutor>>,
    generator: Option<Box<dyn TodoGenerator>>,
    status_log: Option<StatusLog>,
    session_id: Option<String>,
    revision_done: bool,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        store: CheckpointStore,
        todo: Box<dyn TodoSource>,
        executor: Box<dyn TaskExecutor>,
        signals: Box<dyn ControlSignals>,
    ) -> Self {
        Self {
            config,
            store,
            todo,
            executor,
            signals,
            revision: None,
            generator: None,
            status_log: None,
            session_id: None,
            revision_done: false,
        }
    }

    pub fn with_revision(mut self, revision: Box<dyn RevisionExecutor>) -> Self {
        self.revision = Some(revision);
        self
    }

    pub fn with_generator(mut self, generator: Box<dyn TodoGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_status_log(mut self, status_log: StatusLog) -> Self {
        self.status_log = Some(status_log);
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    pub fn todo(&self) -> &dyn TodoSource {
        self.todo.as_ref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    fn synchronizer(&mut self) -> Synchronizer<'_> {
        Synchronizer::new(&mut self.store, self.todo.as_mut(), self.status_log.as_ref())
    }

    /// Recover from the previous session, prune the ledger, and open a new
    /// session.
    pub fn start(&mut self) -> RecoveryInfo {
        let recovery = self.synchronizer().check_recovery_needed();

        let pruned = self.store.clear_old_tasks(self.config.keep_completed);
        if pruned > 0 {
            debug!(pruned, "Pruned ledger at startup");
        }

        let session_id = generate_session_id();
        self.store.mark_server_start(&session_id);
        self.session_id = Some(session_id);
        self.revision_done = false;

        recovery
    }

    /// Record the end of the session. `clean` is false only on abnormal
    /// exits the host still gets to observe.
    pub fn shutdown(&mut self, clean: bool) {
        self.store.mark_server_stop(clean);
    }

    /// Run one pass over the pending todo items.
    pub fn run_iteration(&mut self) -> Result<IterationResult, SchedulerError> {
        let iteration = self.store.increment_iteration();

        let all = self
            .todo
            .get_all_tasks()
            .map_err(SchedulerError::TodoSource)?;
        let pending = self
            .todo
            .get_pending_tasks()
            .map_err(SchedulerError::TodoSource)?;
        let tasks = self
            .synchronizer()
            .filter_completed_tasks(pending)
            .map_err(SchedulerError::TodoSource)?;

        let total = tasks.len();
        info!(
            iteration,
            total,
            listed = all.len(),
            done = all.iter().filter(|t| t.done).count(),
            "Starting iteration"
        );

        let mut results = Vec::new();
        for (i, task) in tasks.iter().enumerate() {
            let index = i + 1;

            if self.signals.should_stop() {
                info!(iteration, executed = results.len(), "Stop requested, ending iteration");
                return Ok(IterationResult {
                    has_more_tasks: false,
                    results,
                });
            }
            if self.signals.should_reload() {
                info!(iteration, "Reload requested");
                return Err(SchedulerError::RestartRequested);
            }

            let Some(outcome) = self.run_task(iteration, index, total, task) else {
                continue;
            };
            results.push(outcome);

            if index < total {
                if let DelayOutcome::Stopped = self.wait_between_tasks()? {
                    info!(iteration, executed = results.len(), "Stop requested during delay");
                    return Ok(IterationResult {
                        has_more_tasks: false,
                        results,
                    });
                }
            }
        }

        self.synchronizer()
            .sync_todos_with_checkpoint()
            .map_err(SchedulerError::TodoSource)?;

        let has_more_tasks = self.decide()?;
        info!(
            iteration,
            executed = results.len(),
            has_more_tasks,
            "Iteration finished"
        );

        Ok(IterationResult {
            has_more_tasks,
            results,
        })
    }

    /// Execute one task through the ledger. `None` when the task was
    /// skipped: its retries are used up, or an earlier item with the same
    /// text already completed it this iteration.
    fn run_task(
        &mut self,
        iteration: u64,
        index: usize,
        total: usize,
        task: &TodoItem,
    ) -> Option<TaskOutcome> {
        let task_id = task_id_for(&task.text);
        let mut metadata = Map::new();
        metadata.insert("index".to_string(), json!(index));
        self.store.add_task(&task_id, &task.text, metadata);

        if self.store.is_task_completed(&task.text) {
            debug!(task_id = %task_id, "Task already completed, checking off duplicate");
            self.check_off(&task.text);
            return None;
        }

        if is_retry_exhausted(&self.store, &task_id, self.config.max_attempts) {
            warn!(
                task_id = %task_id,
                max_attempts = self.config.max_attempts,
                "Skipping task with no retries left"
            );
            return None;
        }

        self.store.update_progress(iteration, index, total);
        self.store.mark_task_start(&task_id);
        info!(task_id = %task_id, index, total, task = %task.text, "Executing task");

        let success = match self.executor.execute(&task.text, index, total) {
            Ok(true) => {
                self.store.mark_task_completed(
                    &task_id,
                    Some(json!({"index": index, "total": total, "iteration": iteration})),
                );
                self.check_off(&task.text);
                true
            }
            Ok(false) => {
                self.store
                    .mark_task_failed(&task_id, "Executor reported failure");
                false
            }
            Err(e) => {
                self.store.mark_task_failed(&task_id, &format!("{e:#}"));
                false
            }
        };

        Some(TaskOutcome {
            task: task.text.clone(),
            success,
        })
    }

    fn check_off(&mut self, text: &str) {
        if self.todo.mark_task_done(text) {
            if let Err(e) = self.todo.save() {
                warn!(error = %e, "Failed to save todo list, will retry at sync");
            }
        }
    }

    fn wait_between_tasks(&self) -> Result<DelayOutcome, SchedulerError> {
        let deadline = Instant::now() + self.config.task_delay;
        loop {
            if self.signals.should_stop() {
                return Ok(DelayOutcome::Stopped);
            }
            if self.signals.should_reload() {
                return Err(SchedulerError::RestartRequested);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(DelayOutcome::Elapsed);
            }
            thread::sleep((deadline - now).min(self.config.poll_step));
        }
    }

    /// Pending items still worth running: not completed in the ledger and
    /// not out of retries.
    fn remaining_tasks(&mut self) -> Result<Vec<TodoItem>, SchedulerError> {
        let pending = self
            .todo
            .get_pending_tasks()
            .map_err(SchedulerError::TodoSource)?;
        let unfinished = self
            .synchronizer()
            .filter_completed_tasks(pending)
            .map_err(SchedulerError::TodoSource)?;

        Ok(unfinished
            .into_iter()
            .filter(|t| {
                !is_retry_exhausted(&self.store, &task_id_for(&t.text), self.config.max_attempts)
            })
            .collect())
    }

    fn decide(&mut self) -> Result<bool, SchedulerError> {
        let mut remaining = self.remaining_tasks()?;
        if !remaining.is_empty() {
            return Ok(true);
        }

        if !self.revision_done {
            if let Some(revision) = self.revision.as_mut() {
                self.revision_done = true;
                info!("Todo list exhausted, running revision");
                match revision.run() {
                    Ok(true) => info!("Revision finished"),
                    Ok(false) => warn!("Revision reported failure"),
                    Err(e) => warn!(error = %e, "Revision failed to run"),
                }
            }
        }

        if self.config.auto_generate {
            if let Some(generator) = self.generator.as_mut() {
                info!("Generating new todo items");
                match generator.run() {
                    Ok(true) => debug!("Generator finished"),
                    Ok(false) => warn!("Generator reported failure"),
                    Err(e) => warn!(error = %e, "Generator failed to run"),
                }
                self.todo.reload().map_err(SchedulerError::TodoSource)?;
                remaining = self.remaining_tasks()?;
                info!(new_tasks = remaining.len(), "Todo list reloaded after generation");
            }
        }

        Ok(!remaining.is_empty())
    }
}
