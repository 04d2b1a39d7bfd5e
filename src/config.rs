//! Configuration loaded from `.waypoint/config.toml`
//!
//! Layering, lowest to highest precedence: built-in defaults, the TOML
//! file, environment variables, command-line flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::scheduler::SchedulerConfig;

/// Overrides `executor.command`
pub const EXECUTOR_ENV: &str = "WAYPOINT_EXECUTOR";
/// Overrides `scheduler.task_delay_secs`
pub const TASK_DELAY_ENV: &str = "WAYPOINT_TASK_DELAY";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub checkpoint: CheckpointSection,
    pub scheduler: SchedulerSection,
    pub todo: TodoSection,
    pub executor: ExecutorSection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<HookSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<HookSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CheckpointSection {
    pub path: PathBuf,
    pub keep_completed: usize,
}

impl Default for CheckpointSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".waypoint/tasks.checkpoint.json"),
            keep_completed: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerSection {
    pub task_delay_secs: u64,
    pub max_attempts: u32,
    pub auto_generate: bool,
    /// Sleep between iterations in `run --watch` when nothing is pending
    pub idle_poll_secs: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            task_delay_secs: 5,
            max_attempts: 3,
            auto_generate: false,
            idle_poll_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TodoSection {
    pub path: PathBuf,
}

impl Default for TodoSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("TODO.md"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutorSection {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            command: "claude".to_string(),
            args: vec!["--print".to_string()],
        }
    }
}

/// An optional command run by the scheduler (revision or generator)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HookSection {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Config {
    /// Load `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid configuration")
    }

    /// Apply `WAYPOINT_*` environment overrides.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(command) = env::var(EXECUTOR_ENV) {
            if !command.trim().is_empty() {
                self.executor.command = command;
            }
        }

        if let Ok(delay) = env::var(TASK_DELAY_ENV) {
            self.scheduler.task_delay_secs = delay
                .trim()
                .parse()
                .with_context(|| format!("{TASK_DELAY_ENV} must be a number of seconds, got '{delay}'"))?;
        }

        Ok(())
    }

    /// Apply command-line overrides, which win over everything else.
    pub fn apply_cli_overrides(&mut self, task_delay_secs: Option<u64>, max_attempts: Option<u32>) {
        if let Some(delay) = task_delay_secs {
            self.scheduler.task_delay_secs = delay;
        }
        if let Some(max) = max_attempts {
            self.scheduler.max_attempts = max;
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            task_delay: Duration::from_secs(self.scheduler.task_delay_secs),
            max_attempts: self.scheduler.max_attempts,
            auto_generate: self.scheduler.auto_generate,
            keep_completed: self.checkpoint.keep_completed,
            ..Default::default()
        }
    }

    /// Human-readable problems with the configuration. None are fatal.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.scheduler.max_attempts == 0 {
            warnings.push("scheduler.max_attempts is 0: no task will ever be attempted twice, and failed tasks are skipped immediately".to_string());
        }
        if self.executor.command.trim().is_empty() {
            warnings.push("executor.command is empty".to_string());
        }
        if self.scheduler.auto_generate && self.generator.is_none() {
            warnings.push(
                "scheduler.auto_generate is enabled but no [generator] is configured".to_string(),
            );
        }
        if self.checkpoint.keep_completed == 0 {
            warnings.push(
                "checkpoint.keep_completed is 0: completed tasks will be re-run after pruning"
                    .to_string(),
            );
        }

        warnings
    }
}
