//! Human-readable status log
//!
//! Entries are appended to a markdown file (`.waypoint/status.md`), one
//! `## <timestamp> - <title>` section per event followed by bullet lines.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct StatusLog {
    path: PathBuf,
}

impl StatusLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry stamped with the current time.
    pub fn append(&self, title: &str, lines: &[String]) -> Result<()> {
        self.append_at(Utc::now(), title, lines)
    }

    pub fn append_at(&self, at: DateTime<Utc>, title: &str, lines: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create status log directory: {}", parent.display())
                })?;
            }
        }

        let mut entry = format!("## {} - {title}\n\n", at.format("%Y-%m-%d %H:%M:%S UTC"));
        for line in lines {
            entry.push_str("- ");
            entry.push_str(line);
            entry.push('\n');
        }
        entry.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open status log: {}", self.path.display()))?;

        file.write_all(entry.as_bytes())
            .with_context(|| format!("Failed to write status log: {}", self.path.display()))?;

        Ok(())
    }

    /// Titles of every entry, oldest first
    pub fn titles(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read status log: {}", self.path.display()))?;

        Ok(content
            .lines()
            .filter_map(|line| line.strip_prefix("## "))
            .filter_map(|heading| heading.split_once(" - ").map(|(_, title)| title.to_string()))
            .collect())
    }
}
