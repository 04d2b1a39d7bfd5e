//! Shared in-memory collaborators for scheduler integration tests

use anyhow::{bail, Result};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use waypoint::checkpoint::CheckpointStore;
use waypoint::scheduler::{
    ControlSignals, RevisionExecutor, Scheduler, SchedulerConfig, TaskExecutor, TodoGenerator,
};
use waypoint::todo::{TodoItem, TodoSource};

/// Todo list shared between the scheduler and the test
#[derive(Clone, Default)]
pub struct MemoryTodo {
    pub items: Rc<RefCell<Vec<TodoItem>>>,
    pub saves: Rc<Cell<usize>>,
    pub reloads: Rc<Cell<usize>>,
}

impl MemoryTodo {
    pub fn with(texts: &[&str]) -> Self {
        let todo = Self::default();
        todo.push(texts);
        todo
    }

    pub fn push(&self, texts: &[&str]) {
        self.items
            .borrow_mut()
            .extend(texts.iter().map(|t| TodoItem::new(*t)));
    }

    pub fn pending_texts(&self) -> Vec<String> {
        self.items
            .borrow()
            .iter()
            .filter(|t| !t.done)
            .map(|t| t.text.clone())
            .collect()
    }
}

impl TodoSource for MemoryTodo {
    fn get_all_tasks(&self) -> Result<Vec<TodoItem>> {
        Ok(self.items.borrow().clone())
    }

    fn get_pending_tasks(&self) -> Result<Vec<TodoItem>> {
        Ok(self
            .items
            .borrow()
            .iter()
            .filter(|t| !t.done)
            .cloned()
            .collect())
    }

    fn mark_task_done(&mut self, text: &str) -> bool {
        let mut items = self.items.borrow_mut();
        match items.iter_mut().find(|t| !t.done && t.text == text) {
            Some(item) => {
                item.done = true;
                true
            }
            None => false,
        }
    }

    fn save(&mut self) -> Result<()> {
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }

    fn reload(&mut self) -> Result<()> {
        self.reloads.set(self.reloads.get() + 1);
        Ok(())
    }
}

/// Stop/reload flags the test (or an executor) can flip
#[derive(Clone, Default)]
pub struct FlagSignals {
    pub stop: Rc<Cell<bool>>,
    pub reload: Rc<Cell<bool>>,
}

impl ControlSignals for FlagSignals {
    fn should_stop(&self) -> bool {
        self.stop.get()
    }

    fn should_reload(&self) -> bool {
        self.reload.get()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Succeed,
    Fail,
    Error,
}

type AfterCall = Box<dyn FnMut(&str, usize)>;

/// Executor with per-task scripted outcomes. Unscripted tasks succeed.
pub struct ScriptedExecutor {
    pub calls: Rc<RefCell<Vec<String>>>,
    outcomes: HashMap<String, Outcome>,
    after_call: Option<AfterCall>,
}

impl ScriptedExecutor {
    pub fn new(calls: Rc<RefCell<Vec<String>>>) -> Self {
        Self {
            calls,
            outcomes: HashMap::new(),
            after_call: None,
        }
    }

    pub fn outcome(mut self, task: &str, outcome: Outcome) -> Self {
        self.outcomes.insert(task.to_string(), outcome);
        self
    }

    /// Run `f(task, call_number)` after every execution
    pub fn after_call(mut self, f: impl FnMut(&str, usize) + 'static) -> Self {
        self.after_call = Some(Box::new(f));
        self
    }
}

impl TaskExecutor for ScriptedExecutor {
    fn execute(&mut self, task: &str, _index: usize, _total: usize) -> Result<bool> {
        self.calls.borrow_mut().push(task.to_string());
        let call_number = self.calls.borrow().len();
        if let Some(f) = self.after_call.as_mut() {
            f(task, call_number);
        }

        match self.outcomes.get(task).copied().unwrap_or(Outcome::Succeed) {
            Outcome::Succeed => Ok(true),
            Outcome::Fail => Ok(false),
            Outcome::Error => bail!("executor crashed on '{task}'"),
        }
    }
}

/// Revision step or generator that counts its runs and may add todo items
#[derive(Clone, Default)]
pub struct CountingHook {
    pub runs: Rc<Cell<usize>>,
    adds_to: Option<(MemoryTodo, Vec<String>)>,
}

impl CountingHook {
    pub fn adding(todo: &MemoryTodo, texts: &[&str]) -> Self {
        Self {
            runs: Rc::default(),
            adds_to: Some((todo.clone(), texts.iter().map(|t| t.to_string()).collect())),
        }
    }

    fn fire(&mut self) -> Result<bool> {
        self.runs.set(self.runs.get() + 1);
        if let Some((todo, texts)) = &self.adds_to {
            let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
            todo.push(&texts);
        }
        Ok(true)
    }
}

impl RevisionExecutor for CountingHook {
    fn run(&mut self) -> Result<bool> {
        self.fire()
    }
}

impl TodoGenerator for CountingHook {
    fn run(&mut self) -> Result<bool> {
        self.fire()
    }
}

pub fn checkpoint_path(dir: &Path) -> PathBuf {
    dir.join(".waypoint").join("tasks.checkpoint.json")
}

pub fn test_config(max_attempts: u32) -> SchedulerConfig {
    SchedulerConfig {
        task_delay: Duration::ZERO,
        max_attempts,
        poll_step: Duration::from_millis(10),
        ..Default::default()
    }
}

pub fn build_scheduler(
    dir: &Path,
    config: SchedulerConfig,
    todo: &MemoryTodo,
    executor: ScriptedExecutor,
    signals: &FlagSignals,
) -> Scheduler {
    Scheduler::new(
        config,
        CheckpointStore::open(checkpoint_path(dir)),
        Box::new(todo.clone()),
        Box::new(executor),
        Box::new(signals.clone()),
    )
}
