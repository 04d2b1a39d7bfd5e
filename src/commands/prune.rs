//! `waypoint prune` - drop old completed records from the ledger

use anyhow::Result;
use colored::Colorize;

use super::common::Workspace;

pub fn execute(workspace: &Workspace, keep: Option<usize>) -> Result<()> {
    let keep = keep.unwrap_or(workspace.config().checkpoint.keep_completed);
    let mut store = workspace.open_store();

    let pruned = store.clear_old_tasks(keep);
    if pruned == 0 {
        println!("{} Nothing to prune (keeping {keep})", "─".dimmed());
    } else {
        println!(
            "{} Pruned {pruned} completed task(s), kept the {keep} most recent",
            "✓".green().bold()
        );
    }
    Ok(())
}
