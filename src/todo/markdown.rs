//! Markdown checklist todo source
//!
//! Items are GitHub-style checkbox lines (`- [ ] text`, `* [x] text`).
//! Every other line is kept verbatim so headings, notes and blank lines
//! survive a save untouched.

use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{TodoItem, TodoSource};
use crate::fs::atomic::atomic_write;

const CHECKBOX_PATTERN: &str = r"^(\s*[-*+]\s+)\[([ xX])\]\s+(.*?)\s*$";

#[derive(Debug, Clone)]
enum Line {
    Item {
        /// Indentation and bullet, e.g. `"  - "`
        lead: String,
        text: String,
        done: bool,
    },
    Other(String),
}

pub struct MarkdownTodoList {
    path: PathBuf,
    lines: Vec<Line>,
    trailing_newline: bool,
}

impl MarkdownTodoList {
    /// Open the checklist at `path`. A missing file is an empty list.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut list = Self {
            path: path.into(),
            lines: Vec::new(),
            trailing_newline: true,
        };
        list.reload()?;
        Ok(list)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&mut self, content: &str) -> Result<()> {
        let checkbox = Regex::new(CHECKBOX_PATTERN).context("Invalid checkbox pattern")?;

        self.lines = content
            .lines()
            .map(|line| match checkbox.captures(line) {
                Some(caps) if !caps[3].is_empty() => Line::Item {
                    lead: caps[1].to_string(),
                    done: &caps[2] != " ",
                    text: caps[3].to_string(),
                },
                _ => Line::Other(line.to_string()),
            })
            .collect();
        self.trailing_newline = content.is_empty() || content.ends_with('\n');

        Ok(())
    }

    fn render(&self) -> String {
        let mut out = self
            .lines
            .iter()
            .map(|line| match line {
                Line::Item { lead, text, done } => {
                    format!("{lead}[{}] {text}", if *done { "x" } else { " " })
                }
                Line::Other(raw) => raw.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n");
        if self.trailing_newline && !out.is_empty() {
            out.push('\n');
        }
        out
    }

    fn items(&self) -> impl Iterator<Item = TodoItem> + '_ {
        self.lines.iter().filter_map(|line| match line {
            Line::Item { text, done, .. } => Some(TodoItem {
                text: text.clone(),
                done: *done,
            }),
            Line::Other(_) => None,
        })
    }
}

impl TodoSource for MarkdownTodoList {
    fn get_all_tasks(&self) -> Result<Vec<TodoItem>> {
        Ok(self.items().collect())
    }

    fn get_pending_tasks(&self) -> Result<Vec<TodoItem>> {
        Ok(self.items().filter(|item| !item.done).collect())
    }

    fn mark_task_done(&mut self, task_text: &str) -> bool {
        for line in &mut self.lines {
            if let Line::Item { text, done, .. } = line {
                if !*done && text == task_text {
                    *done = true;
                    return true;
                }
            }
        }
        false
    }

    fn save(&mut self) -> Result<()> {
        atomic_write(&self.path, self.render().as_bytes())
            .with_context(|| format!("Failed to write todo list: {}", self.path.display()))
    }

    fn reload(&mut self) -> Result<()> {
        let content = if self.path.exists() {
            fs::read_to_string(&self.path)
                .with_context(|| format!("Failed to read todo list: {}", self.path.display()))?
        } else {
            debug!(path = %self.path.display(), "Todo list not found, treating as empty");
            String::new()
        };
        self.parse(&content)
    }
}
