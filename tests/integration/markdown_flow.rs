//! End-to-end runs against a real markdown checklist and config file.

use serial_test::serial;
use std::cell::RefCell;
use std::fs;
use std::rc::Rc;
use tempfile::TempDir;

use waypoint::checkpoint::CheckpointStore;
use waypoint::commands::Workspace;
use waypoint::config::{EXECUTOR_ENV, TASK_DELAY_ENV};
use waypoint::scheduler::Scheduler;
use waypoint::todo::{MarkdownTodoList, TodoSource};

use super::helpers::*;

const TODO: &str = "# Backlog\n\nNotes stay put.\n\n- [ ] Write docs\n- [x] Old work\n- [ ] Fix bug\n";

#[test]
fn scheduler_checks_off_markdown_items() {
    let dir = TempDir::new().unwrap();
    let todo_path = dir.path().join("TODO.md");
    fs::write(&todo_path, TODO).unwrap();

    let calls = Rc::new(RefCell::new(Vec::new()));
    let signals = FlagSignals::default();
    let mut scheduler = Scheduler::new(
        test_config(3),
        CheckpointStore::open(checkpoint_path(dir.path())),
        Box::new(MarkdownTodoList::open(&todo_path).unwrap()),
        Box::new(ScriptedExecutor::new(calls.clone()).outcome("Fix bug", Outcome::Fail)),
        Box::new(signals),
    );
    scheduler.start();
    scheduler.run_iteration().unwrap();
    scheduler.shutdown(true);

    assert_eq!(*calls.borrow(), vec!["Write docs", "Fix bug"]);
    assert_eq!(
        fs::read_to_string(&todo_path).unwrap(),
        "# Backlog\n\nNotes stay put.\n\n- [x] Write docs\n- [x] Old work\n- [ ] Fix bug\n"
    );

    let reopened = MarkdownTodoList::open(&todo_path).unwrap();
    let pending: Vec<_> = reopened
        .get_pending_tasks()
        .unwrap()
        .into_iter()
        .map(|t| t.text)
        .collect();
    assert_eq!(pending, vec!["Fix bug"]);
}

#[test]
#[serial]
fn workspace_applies_environment_overrides() {
    let dir = TempDir::new().unwrap();
    let work_dir = dir.path().join(".waypoint");
    fs::create_dir_all(&work_dir).unwrap();
    fs::write(
        work_dir.join("config.toml"),
        "[scheduler]\ntask_delay_secs = 10\n\n[executor]\ncommand = \"from-file\"\n",
    )
    .unwrap();

    std::env::set_var(EXECUTOR_ENV, "from-env");
    std::env::set_var(TASK_DELAY_ENV, "2");
    let workspace = Workspace::open(dir.path(), None);
    std::env::remove_var(EXECUTOR_ENV);
    std::env::remove_var(TASK_DELAY_ENV);

    let workspace = workspace.unwrap();
    assert_eq!(workspace.config().executor.command, "from-env");
    assert_eq!(workspace.config().scheduler.task_delay_secs, 2);
}

#[test]
#[serial]
fn workspace_without_config_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let workspace = Workspace::open(dir.path(), None).unwrap();
    assert_eq!(workspace.config().executor.command, "claude");
    assert_eq!(workspace.todo_path(), dir.path().join("TODO.md"));
}
