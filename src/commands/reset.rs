//! `waypoint reset` - re-queue the in-progress task

use anyhow::Result;
use colored::Colorize;

use super::common::Workspace;

/// Only safe while no `waypoint run` is active on the same ledger.
pub fn execute(workspace: &Workspace) -> Result<()> {
    let mut store = workspace.open_store();

    match store.reset_interrupted_task() {
        Some(task_id) => {
            let text = store
                .get_task(&task_id)
                .map(|t| t.task_text.clone())
                .unwrap_or_default();
            println!("{} Re-queued {} {}", "✓".green().bold(), text, format!("({task_id})").dimmed());
        }
        None => println!("{} No task in progress", "─".dimmed()),
    }
    Ok(())
}
