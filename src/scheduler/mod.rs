//! Execution loop over the todo list, backed by the checkpoint ledger.

mod core;
pub mod executor;
pub mod retry;
pub mod signals;

pub use self::core::{IterationResult, Scheduler, SchedulerConfig, TaskOutcome};
pub use executor::{CommandExecutor, CommandHook, RevisionExecutor, TaskExecutor, TodoGenerator};
pub use signals::{ControlSignals, MarkerSignals, NoSignals};
