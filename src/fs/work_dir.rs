use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the state directory created under the project root
pub const WORK_DIR_NAME: &str = ".waypoint";

/// The `.waypoint/` state directory of a project
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            root: base_path.as_ref().join(WORK_DIR_NAME),
        }
    }

    /// Create the directory (and its README) if it does not exist yet.
    pub fn ensure(&self) -> Result<()> {
        if self.root.exists() {
            return Ok(());
        }

        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create {}", self.root.display()))?;
        self.create_readme()?;

        Ok(())
    }

    fn create_readme(&self) -> Result<()> {
        let readme_content = r#"# waypoint State Directory

This directory is managed by the waypoint CLI and contains:

- `config.toml` - Checkpoint, scheduler and collaborator settings
- `tasks.checkpoint.json` - Durable task ledger (with a `.backup` sibling)
- `status.md` - Human-readable recovery and status log
- `stop` / `reload` - Marker files read by a running `waypoint run`

Do not manually edit the checkpoint files while `waypoint run` is active.
"#;

        let readme_path = self.root.join("README.md");
        fs::write(readme_path, readme_content).context("Failed to create README.md")?;

        Ok(())
    }

    pub fn exists(&self) -> bool {
        self.root.exists()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the project root (parent of .waypoint directory)
    pub fn project_root(&self) -> Option<&Path> {
        self.root.parent()
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn status_log_path(&self) -> PathBuf {
        self.root.join("status.md")
    }

    pub fn stop_marker(&self) -> PathBuf {
        self.root.join("stop")
    }

    pub fn reload_marker(&self) -> PathBuf {
        self.root.join("reload")
    }

    /// Resolve a configured path: absolute paths are kept, relative ones
    /// are taken from the project root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self.project_root() {
            Some(root) => root.join(path),
            None => path.to_path_buf(),
        }
    }
}
