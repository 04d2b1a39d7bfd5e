//! Checkpoint document types
//!
//! The whole ledger is one JSON document. Session fields are flattened into
//! the top level so the file reads as
//! `{version, session_id, server_state, iteration_count, progress, tasks}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Current on-disk format version
pub const DOCUMENT_VERSION: u32 = 1;

/// Lifecycle state of a tracked task
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TaskState {
    /// Pending and in-progress tasks still have work left
    pub fn is_incomplete(&self) -> bool {
        matches!(self, TaskState::Pending | TaskState::InProgress)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Pending => write!(f, "pending"),
            TaskState::InProgress => write!(f, "in_progress"),
            TaskState::Completed => write!(f, "completed"),
            TaskState::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for TaskState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(TaskState::Pending),
            "in_progress" | "in-progress" | "inprogress" => Ok(TaskState::InProgress),
            "completed" => Ok(TaskState::Completed),
            "failed" => Ok(TaskState::Failed),
            _ => anyhow::bail!(
                "Invalid task state: {s}. Valid values: pending, in_progress, completed, failed"
            ),
        }
    }
}

/// One unit of work tracked through the ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskRecord {
    pub task_id: String,
    pub task_text: String,
    #[serde(default)]
    pub state: TaskState,
    /// Incremented once per `mark_task_start`
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl TaskRecord {
    pub fn new(task_id: impl Into<String>, task_text: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            task_text: task_text.into(),
            state: TaskState::Pending,
            attempts: 0,
            start_time: None,
            end_time: None,
            result: None,
            error_message: None,
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Whether the previous run recorded its own stop
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerState {
    #[serde(default = "default_clean_shutdown")]
    pub clean_shutdown: bool,
    #[serde(default)]
    pub last_start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_stop_time: Option<DateTime<Utc>>,
}

fn default_clean_shutdown() -> bool {
    true
}

impl Default for ServerState {
    fn default() -> Self {
        Self {
            clean_shutdown: default_clean_shutdown(),
            last_start_time: None,
            last_stop_time: None,
        }
    }
}

/// Session fields, flattened into the document root
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Session {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub server_state: ServerState,
    #[serde(default)]
    pub iteration_count: u64,
}

/// Scheduler position, written before each executor call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Progress {
    pub iteration: u64,
    /// 1-based position of the task within the iteration
    pub index: usize,
    pub total: usize,
    pub updated_at: DateTime<Utc>,
}

/// The single persistence unit owned by the checkpoint store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckpointDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(flatten)]
    pub session: Session,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
}

fn default_version() -> u32 {
    DOCUMENT_VERSION
}

impl Default for CheckpointDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            session: Session::default(),
            progress: None,
            tasks: Vec::new(),
        }
    }
}

impl CheckpointDocument {
    pub fn find_task(&self, task_id: &str) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }

    pub fn find_task_mut(&mut self, task_id: &str) -> Option<&mut TaskRecord> {
        self.tasks.iter_mut().find(|t| t.task_id == task_id)
    }

    pub fn tasks_in_state(&self, state: TaskState) -> impl Iterator<Item = &TaskRecord> {
        self.tasks.iter().filter(move |t| t.state == state)
    }
}

/// Ledger counts reported by `get_statistics`
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
pub struct CheckpointStats {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub iteration_count: u64,
}
