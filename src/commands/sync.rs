//! `waypoint sync` - check off todo items the ledger already completed

use anyhow::Result;
use colored::Colorize;

use super::common::Workspace;
use crate::sync::Synchronizer;

pub fn execute(workspace: &Workspace) -> Result<()> {
    let mut store = workspace.open_store();
    let mut todo = workspace.open_todo()?;

    let marked = Synchronizer::new(&mut store, &mut todo, None).sync_todos_with_checkpoint()?;

    if marked == 0 {
        println!("{} Todo list already in sync", "─".dimmed());
    } else {
        println!(
            "{} Checked off {} item(s) in {}",
            "✓".green().bold(),
            marked,
            workspace.todo_path().display()
        );
    }
    Ok(())
}
