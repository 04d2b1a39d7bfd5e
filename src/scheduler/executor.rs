//! Collaborators the scheduler delegates work to.
//!
//! The scheduler only sees the traits. The command-backed implementations
//! are what the CLI wires up from configuration.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, info, warn};

/// Runs one task. `Ok(true)` is success, `Ok(false)` a reported failure,
/// `Err` a failure to run at all. `index` is 1-based.
pub trait TaskExecutor {
    fn execute(&mut self, task: &str, index: usize, total: usize) -> Result<bool>;
}

/// Reviews finished work once the todo list runs dry
pub trait RevisionExecutor {
    fn run(&mut self) -> Result<bool>;
}

/// Produces new todo items once the list runs dry
pub trait TodoGenerator {
    fn run(&mut self) -> Result<bool>;
}

/// Environment variable carrying the 1-based task index
pub const TASK_INDEX_ENV: &str = "WAYPOINT_TASK_INDEX";
/// Environment variable carrying the number of tasks in the iteration
pub const TASK_TOTAL_ENV: &str = "WAYPOINT_TASK_TOTAL";

/// Runs `program args... <task text>`; success is a zero exit status.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandExecutor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Result<Self> {
        let program = program.into();
        if program.trim().is_empty() {
            bail!("Executor command is empty");
        }
        Ok(Self {
            program,
            args,
            working_dir: None,
        })
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl TaskExecutor for CommandExecutor {
    fn execute(&mut self, task: &str, index: usize, total: usize) -> Result<bool> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(task)
            .env(TASK_INDEX_ENV, index.to_string())
            .env(TASK_TOTAL_ENV, total.to_string());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        debug!(program = %self.program, index, total, "Spawning executor");
        let status = cmd
            .status()
            .with_context(|| format!("Failed to run executor '{}'", self.program))?;

        if !status.success() {
            warn!(program = %self.program, status = %status, "Executor reported failure");
        }
        Ok(status.success())
    }
}

/// Runs a configured command with no task argument. Used for both the
/// revision step and todo generation.
#[derive(Debug, Clone)]
pub struct CommandHook {
    name: String,
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandHook {
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Result<Self> {
        let name = name.into();
        let program = program.into();
        if program.trim().is_empty() {
            bail!("Command for '{name}' is empty");
        }
        Ok(Self {
            name,
            program,
            args,
            working_dir: None,
        })
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn run_command(&mut self) -> Result<bool> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        info!(hook = %self.name, program = %self.program, "Running hook");
        let status = cmd
            .status()
            .with_context(|| format!("Failed to run {} command '{}'", self.name, self.program))?;

        if !status.success() {
            warn!(hook = %self.name, status = %status, "Hook exited unsuccessfully");
        }
        Ok(status.success())
    }
}

impl RevisionExecutor for CommandHook {
    fn run(&mut self) -> Result<bool> {
        self.run_command()
    }
}

impl TodoGenerator for CommandHook {
    fn run(&mut self) -> Result<bool> {
        self.run_command()
    }
}
