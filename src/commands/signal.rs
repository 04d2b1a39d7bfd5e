//! `waypoint stop` / `waypoint reload` - signal a running `waypoint run`

use anyhow::Result;
use colored::Colorize;

use super::common::Workspace;
use crate::scheduler::MarkerSignals;

/// Ask a running scheduler to stop after its current task.
pub fn stop(workspace: &Workspace) -> Result<()> {
    MarkerSignals::new(workspace.work_dir()).request_stop()?;
    println!(
        "{} Stop requested {}",
        "✓".green().bold(),
        "(takes effect after the current task)".dimmed()
    );
    Ok(())
}

/// Ask a running scheduler to rebuild itself from configuration.
pub fn reload(workspace: &Workspace) -> Result<()> {
    MarkerSignals::new(workspace.work_dir()).request_reload()?;
    println!(
        "{} Reload requested {}",
        "✓".green().bold(),
        "(takes effect after the current task)".dimmed()
    );
    Ok(())
}
