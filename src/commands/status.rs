//! `waypoint status` - read-only view of the checkpoint ledger

use anyhow::Result;
use colored::Colorize;

use super::common::Workspace;
use crate::checkpoint::{CheckpointStore, TaskState};
use crate::recovery::RecoveryInfo;

pub fn execute(workspace: &Workspace) -> Result<()> {
    let store = workspace.open_store();
    print_status(&store);
    Ok(())
}

fn print_status(store: &CheckpointStore) {
    let stats = store.get_statistics();
    let recovery = RecoveryInfo::analyze(store.document(), store.was_clean_shutdown());

    println!("{}", "Checkpoint".bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("  {} {}", "File:".dimmed(), store.path().display());
    let session = &store.document().session;
    if !session.session_id.is_empty() {
        println!("  {} {}", "Session:".dimmed(), session.session_id);
    }
    println!("  {} {}", "Iterations:".dimmed(), stats.iteration_count);
    if let Some(progress) = store.progress() {
        println!(
            "  {} task {}/{} of iteration {} ({})",
            "Progress:".dimmed(),
            progress.index,
            progress.total,
            progress.iteration,
            progress.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    println!();
    println!(
        "  {} {}  {} {}  {} {}  {} {}  {} {}",
        "total".dimmed(),
        stats.total,
        "completed".green(),
        stats.completed,
        "in progress".cyan(),
        stats.in_progress,
        "pending".yellow(),
        stats.pending,
        "failed".red(),
        stats.failed
    );

    if let Some(task) = store.get_current_task() {
        let label = if recovery.was_clean_shutdown {
            "Running:".cyan().bold()
        } else {
            "Interrupted:".yellow().bold()
        };
        println!(
            "\n  {} {} {}",
            label,
            task.task_text,
            format!("(attempt {})", task.attempts).dimmed()
        );
    }

    let failed: Vec<_> = store.document().tasks_in_state(TaskState::Failed).collect();
    if !failed.is_empty() {
        println!("\n{} {}", "Failed".red().bold(), format!("({})", failed.len()).dimmed());
        println!("{}", "─".repeat(40).dimmed());
        for task in failed {
            println!(
                "  {} {} {}",
                "✗".red().bold(),
                task.task_text,
                format!(
                    "[{} attempt(s)] {}",
                    task.attempts,
                    task.error_message.as_deref().unwrap_or("")
                )
                .dimmed()
            );
        }
    }

    if !recovery.was_clean_shutdown {
        println!(
            "\n{} {}",
            "!".yellow().bold(),
            "Last session did not record a clean shutdown (still running, or crashed)".yellow()
        );
    }
}
