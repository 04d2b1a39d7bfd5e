//! Shared setup for every subcommand.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::checkpoint::CheckpointStore;
use crate::config::Config;
use crate::fs::{StatusLog, WorkDir};
use crate::todo::MarkdownTodoList;

/// A project's state directory together with its resolved configuration
pub struct Workspace {
    work_dir: WorkDir,
    config_path: PathBuf,
    config: Config,
}

impl Workspace {
    /// Load configuration for the project rooted at `base`. `config_path`
    /// overrides `.waypoint/config.toml`.
    pub fn open(base: &Path, config_path: Option<PathBuf>) -> Result<Self> {
        let work_dir = WorkDir::new(base);
        let config_path = config_path.unwrap_or_else(|| work_dir.config_path());
        let config = load_config(&config_path)?;

        Ok(Self {
            work_dir,
            config_path,
            config,
        })
    }

    /// Re-read the configuration file and environment.
    pub fn reload_config(&mut self) -> Result<()> {
        self.config = load_config(&self.config_path)?;
        Ok(())
    }

    pub fn work_dir(&self) -> &WorkDir {
        &self.work_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Directory collaborator commands run in
    pub fn project_root(&self) -> PathBuf {
        self.work_dir
            .project_root()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.work_dir.resolve(&self.config.checkpoint.path)
    }

    pub fn todo_path(&self) -> PathBuf {
        self.work_dir.resolve(&self.config.todo.path)
    }

    pub fn open_store(&self) -> CheckpointStore {
        CheckpointStore::open(self.checkpoint_path())
    }

    pub fn open_todo(&self) -> Result<MarkdownTodoList> {
        let path = self.todo_path();
        MarkdownTodoList::open(&path)
            .with_context(|| format!("Failed to open todo list {}", path.display()))
    }

    pub fn status_log(&self) -> StatusLog {
        StatusLog::new(self.work_dir.status_log_path())
    }
}

fn load_config(path: &Path) -> Result<Config> {
    let mut config = Config::load(path)?;
    config.apply_env_overrides()?;
    Ok(config)
}
