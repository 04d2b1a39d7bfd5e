//! Convergence of the checkpoint ledger and the todo list.

use serde_json::Map;
use tempfile::TempDir;

use waypoint::checkpoint::CheckpointStore;
use waypoint::sync::Synchronizer;
use waypoint::todo::TodoSource;

use super::helpers::*;

fn store_with_completed(dir: &TempDir, texts: &[&str]) -> CheckpointStore {
    let mut store = CheckpointStore::open(checkpoint_path(dir.path()));
    for (i, text) in texts.iter().enumerate() {
        let id = format!("t{i}");
        store.add_task(&id, text, Map::new());
        store.mark_task_start(&id);
        store.mark_task_completed(&id, None);
    }
    store
}

#[test]
fn sync_marks_every_completed_text_with_one_save() {
    let dir = TempDir::new().unwrap();
    let done = ["one", "two", "three", "four", "five"];
    let mut store = store_with_completed(&dir, &done);
    let mut todo = MemoryTodo::with(&["one", "two", "three", "four", "five", "six"]);

    let marked = Synchronizer::new(&mut store, &mut todo, None)
        .sync_todos_with_checkpoint()
        .unwrap();

    assert_eq!(marked, done.len());
    assert_eq!(todo.saves.get(), 1);
    assert_eq!(todo.pending_texts(), vec!["six"]);
}

#[test]
fn repeated_sync_is_a_noop() {
    let dir = TempDir::new().unwrap();
    let mut store = store_with_completed(&dir, &["one", "two"]);
    let mut todo = MemoryTodo::with(&["one", "two"]);

    Synchronizer::new(&mut store, &mut todo, None)
        .sync_todos_with_checkpoint()
        .unwrap();
    let marked = Synchronizer::new(&mut store, &mut todo, None)
        .sync_todos_with_checkpoint()
        .unwrap();

    assert_eq!(marked, 0);
    assert_eq!(todo.saves.get(), 1);
}

#[test]
fn failed_and_pending_records_are_not_synced() {
    let dir = TempDir::new().unwrap();
    let mut store = CheckpointStore::open(checkpoint_path(dir.path()));
    store.add_task("p", "pending", Map::new());
    store.add_task("f", "failed", Map::new());
    store.mark_task_start("f");
    store.mark_task_failed("f", "boom");
    let mut todo = MemoryTodo::with(&["pending", "failed"]);

    let marked = Synchronizer::new(&mut store, &mut todo, None)
        .sync_todos_with_checkpoint()
        .unwrap();
    assert_eq!(marked, 0);
    assert_eq!(todo.saves.get(), 0);
}

#[test]
fn filter_hides_completed_tasks_from_execution() {
    let dir = TempDir::new().unwrap();
    let mut store = store_with_completed(&dir, &["done"]);
    let mut todo = MemoryTodo::with(&["done", "open"]);
    let pending = todo.get_pending_tasks().unwrap();

    let remaining = Synchronizer::new(&mut store, &mut todo, None)
        .filter_completed_tasks(pending)
        .unwrap();

    let texts: Vec<_> = remaining.into_iter().map(|t| t.text).collect();
    assert_eq!(texts, vec!["open"]);
    assert_eq!(todo.pending_texts(), vec!["open"]);
    assert_eq!(todo.saves.get(), 1);
}
