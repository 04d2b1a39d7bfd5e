//! Restart scenarios after an unclean shutdown.

use serde_json::Map;
use std::cell::RefCell;
use std::fs;
use std::rc::Rc;
use tempfile::TempDir;

use waypoint::checkpoint::{CheckpointStore, TaskState};
use waypoint::fs::StatusLog;
use waypoint::scheduler::retry::task_id_for;

use super::helpers::*;

/// Leave the ledger as a process killed while running `text` would.
fn crash_while_running(dir: &std::path::Path, text: &str) {
    let mut store = CheckpointStore::open(checkpoint_path(dir));
    store.mark_server_start("session-crashed-1");
    let id = task_id_for(text);
    store.add_task(&id, text, Map::new());
    store.update_progress(1, 1, 2);
    store.mark_task_start(&id);
}

#[test]
fn interrupted_task_is_requeued_and_rerun() {
    let dir = TempDir::new().unwrap();
    crash_while_running(dir.path(), "A");

    let todo = MemoryTodo::with(&["A", "B"]);
    let signals = FlagSignals::default();
    let calls = Rc::new(RefCell::new(Vec::new()));
    let status_log = StatusLog::new(dir.path().join("status.md"));

    let mut scheduler = build_scheduler(
        dir.path(),
        test_config(3),
        &todo,
        ScriptedExecutor::new(calls.clone()),
        &signals,
    )
    .with_status_log(status_log);

    let recovery = scheduler.start();
    assert!(!recovery.was_clean_shutdown);
    assert!(recovery.needs_recovery());
    assert_eq!(recovery.session_id, "session-crashed-1");
    assert_eq!(recovery.current_task.as_ref().unwrap().task_text, "A");
    assert_eq!(recovery.incomplete_tasks_count, 1);
    assert_ne!(scheduler.session_id(), Some("session-crashed-1"));

    let record = scheduler.store().get_task(&task_id_for("A")).unwrap();
    assert_eq!(record.state, TaskState::Pending);

    let result = scheduler.run_iteration().unwrap();
    assert!(!result.has_more_tasks);
    assert_eq!(*calls.borrow(), vec!["A", "B"]);
    assert_eq!(
        scheduler.store().get_task(&task_id_for("A")).unwrap().attempts,
        2
    );

    let log = StatusLog::new(dir.path().join("status.md"));
    assert_eq!(log.titles().unwrap(), vec!["Recovered from unclean shutdown"]);
    let content = fs::read_to_string(log.path()).unwrap();
    assert!(content.contains("session-crashed-1"));
    assert!(content.contains("Interrupted task: A"));
}

#[test]
fn completed_but_unsynced_task_is_not_rerun() {
    let dir = TempDir::new().unwrap();
    {
        let mut store = CheckpointStore::open(checkpoint_path(dir.path()));
        store.mark_server_start("session-crashed-2");
        let id = task_id_for("A");
        store.add_task(&id, "A", Map::new());
        store.mark_task_start(&id);
        store.mark_task_completed(&id, None);
        // killed before the todo list was saved
    }

    let todo = MemoryTodo::with(&["A", "B"]);
    let signals = FlagSignals::default();
    let calls = Rc::new(RefCell::new(Vec::new()));
    let mut scheduler = build_scheduler(
        dir.path(),
        test_config(3),
        &todo,
        ScriptedExecutor::new(calls.clone()),
        &signals,
    );

    let recovery = scheduler.start();
    assert!(!recovery.was_clean_shutdown);
    assert!(!recovery.needs_recovery());

    scheduler.run_iteration().unwrap();
    assert_eq!(*calls.borrow(), vec!["B"]);
    assert!(todo.pending_texts().is_empty());
}

#[test]
fn clean_shutdown_is_reported_on_next_start() {
    let dir = TempDir::new().unwrap();
    let todo = MemoryTodo::with(&["A"]);
    let signals = FlagSignals::default();
    let calls = Rc::new(RefCell::new(Vec::new()));

    let mut first = build_scheduler(
        dir.path(),
        test_config(3),
        &todo,
        ScriptedExecutor::new(calls.clone()),
        &signals,
    );
    first.start();
    first.run_iteration().unwrap();
    first.shutdown(true);
    drop(first);

    let mut second = build_scheduler(
        dir.path(),
        test_config(3),
        &todo,
        ScriptedExecutor::new(calls),
        &signals,
    );
    let recovery = second.start();
    assert!(recovery.was_clean_shutdown);
    assert!(recovery.current_task.is_none());
    assert_eq!(recovery.iteration_count, 1);
}

#[test]
fn corrupt_checkpoint_recovers_from_backup_on_start() {
    let dir = TempDir::new().unwrap();
    {
        let mut store = CheckpointStore::open(checkpoint_path(dir.path()));
        let id = task_id_for("A");
        store.add_task(&id, "A", Map::new());
        store.mark_task_start(&id);
        store.mark_task_completed(&id, None);
        store.add_task(&task_id_for("B"), "B", Map::new());
    }
    fs::write(checkpoint_path(dir.path()), "{\"version\": 1, \"tasks\": [").unwrap();

    let todo = MemoryTodo::with(&["A", "B"]);
    let signals = FlagSignals::default();
    let calls = Rc::new(RefCell::new(Vec::new()));
    let mut scheduler = build_scheduler(
        dir.path(),
        test_config(3),
        &todo,
        ScriptedExecutor::new(calls.clone()),
        &signals,
    );
    scheduler.start();

    assert!(scheduler.store().is_task_completed("A"));
    scheduler.run_iteration().unwrap();
    assert_eq!(*calls.borrow(), vec!["B"]);
}

#[test]
fn startup_prunes_old_completed_tasks() {
    let dir = TempDir::new().unwrap();
    {
        let mut store = CheckpointStore::open(checkpoint_path(dir.path()));
        for i in 0..5 {
            let id = format!("old-{i}");
            store.add_task(&id, &format!("Old {i}"), Map::new());
            store.mark_task_start(&id);
            store.mark_task_completed(&id, None);
        }
    }

    let todo = MemoryTodo::default();
    let signals = FlagSignals::default();
    let config = waypoint::scheduler::SchedulerConfig {
        keep_completed: 2,
        ..test_config(3)
    };
    let mut scheduler = build_scheduler(
        dir.path(),
        config,
        &todo,
        ScriptedExecutor::new(Rc::default()),
        &signals,
    );
    scheduler.start();

    let stats = scheduler.store().get_statistics();
    assert_eq!(stats.completed, 2);
    assert!(scheduler.store().get_task("old-4").is_some());
}
