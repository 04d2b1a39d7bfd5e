//! The externally-owned todo list the scheduler works through.

mod markdown;

pub use markdown::MarkdownTodoList;

use anyhow::Result;

/// One entry of a todo list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoItem {
    pub text: String,
    pub done: bool,
}

impl TodoItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            done: false,
        }
    }
}

/// A todo list that can be read, checked off, and persisted.
///
/// Items are matched by exact text. The checkpoint ledger and the list are
/// reconciled by the [`Synchronizer`](crate::sync::Synchronizer).
pub trait TodoSource {
    fn get_all_tasks(&self) -> Result<Vec<TodoItem>>;

    fn get_pending_tasks(&self) -> Result<Vec<TodoItem>>;

    /// Check off the first open item with exactly this text. Returns
    /// `false` when there is no such item.
    fn mark_task_done(&mut self, text: &str) -> bool;

    fn save(&mut self) -> Result<()>;

    /// Re-read the backing store, discarding unsaved changes.
    fn reload(&mut self) -> Result<()>;
}
