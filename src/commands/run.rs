//! `waypoint run` - drive the scheduler until the todo list is done

use anyhow::{bail, Result};
use colored::Colorize;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::common::Workspace;
use crate::recovery::RecoveryInfo;
use crate::scheduler::{
    CommandExecutor, CommandHook, ControlSignals, IterationResult, MarkerSignals, Scheduler,
};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Keep polling for new tasks instead of exiting when idle
    pub watch: bool,
    pub task_delay_secs: Option<u64>,
    pub max_attempts: Option<u32>,
}

/// Totals across every iteration of one `run`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub restarts: usize,
    pub stopped: bool,
}

impl RunSummary {
    fn record(&mut self, result: &IterationResult) {
        self.iterations += 1;
        self.succeeded += result.succeeded();
        self.failed += result.failed();
    }
}

enum IdleOutcome {
    Elapsed,
    Stop,
    Reload,
}

/// Execute `waypoint run`, routing Ctrl+C into a graceful stop.
pub fn execute(workspace: &mut Workspace, options: RunOptions) -> Result<()> {
    workspace.work_dir().ensure()?;
    let signals = MarkerSignals::new(workspace.work_dir());
    signals.install_ctrlc_handler()?;

    if options.watch {
        println!(
            "{} Running in watch mode {}",
            "→".cyan().bold(),
            "(continuous execution)".dimmed()
        );
    } else {
        println!("{} Running pending tasks...", "→".cyan().bold());
    }
    println!("  {} Press {} to stop\n", "→".dimmed(), "Ctrl+C".bold());

    let summary = run_loop(workspace, &options, &signals)?;
    print_summary(&summary);

    if summary.failed > 0 && !summary.stopped {
        bail!("{} task run(s) failed", summary.failed);
    }
    Ok(())
}

/// The restartable scheduler loop behind `waypoint run`.
pub fn run_loop(
    workspace: &mut Workspace,
    options: &RunOptions,
    signals: &MarkerSignals,
) -> Result<RunSummary> {
    signals.clear_stop()?;
    signals.clear_reload()?;

    let mut summary = RunSummary::default();
    loop {
        workspace
            .config_mut()
            .apply_cli_overrides(options.task_delay_secs, options.max_attempts);
        for warning in workspace.config().validate() {
            warn!("{warning}");
        }

        let mut scheduler = build_scheduler(workspace, signals)?;
        let recovery = scheduler.start();
        print_recovery(&recovery);

        let restart = drive(&mut scheduler, workspace, options, signals, &mut summary);
        match restart {
            Ok(true) => {
                scheduler.shutdown(true);
                signals.clear_reload()?;
                summary.restarts += 1;
                println!("{} Reloading configuration...", "↻".cyan().bold());
                workspace.reload_config()?;
            }
            Ok(false) => {
                scheduler.shutdown(true);
                return Ok(summary);
            }
            Err(e) => {
                scheduler.shutdown(false);
                return Err(e);
            }
        }
    }
}

/// Run iterations until done or stopped. `Ok(true)` asks for a restart.
fn drive(
    scheduler: &mut Scheduler,
    workspace: &Workspace,
    options: &RunOptions,
    signals: &MarkerSignals,
    summary: &mut RunSummary,
) -> Result<bool> {
    let idle = Duration::from_secs(workspace.config().scheduler.idle_poll_secs);

    loop {
        let result = match scheduler.run_iteration() {
            Ok(result) => result,
            Err(e) if e.is_restart() => return Ok(true),
            Err(e) => return Err(e.into()),
        };
        summary.record(&result);
        print_iteration(summary.iterations, &result);

        if signals.should_stop() {
            summary.stopped = true;
            info!("Stop requested, shutting down");
            return Ok(false);
        }
        if result.has_more_tasks {
            continue;
        }
        if !options.watch {
            return Ok(false);
        }

        match wait_idle(signals, idle) {
            IdleOutcome::Elapsed => {}
            IdleOutcome::Stop => {
                summary.stopped = true;
                return Ok(false);
            }
            IdleOutcome::Reload => return Ok(true),
        }
    }
}

fn wait_idle(signals: &MarkerSignals, idle: Duration) -> IdleOutcome {
    let deadline = Instant::now() + idle;
    loop {
        if signals.should_stop() {
            return IdleOutcome::Stop;
        }
        if signals.should_reload() {
            return IdleOutcome::Reload;
        }
        let now = Instant::now();
        if now >= deadline {
            return IdleOutcome::Elapsed;
        }
        thread::sleep((deadline - now).min(Duration::from_secs(1)));
    }
}

fn build_scheduler(workspace: &Workspace, signals: &MarkerSignals) -> Result<Scheduler> {
    let config = workspace.config();
    let root = workspace.project_root();

    let executor = CommandExecutor::new(&config.executor.command, config.executor.args.clone())?
        .with_working_dir(&root);

    let mut scheduler = Scheduler::new(
        config.scheduler_config(),
        workspace.open_store(),
        Box::new(workspace.open_todo()?),
        Box::new(executor),
        Box::new(signals.clone()),
    )
    .with_status_log(workspace.status_log());

    if let Some(revision) = &config.revision {
        let hook = CommandHook::new("revision", &revision.command, revision.args.clone())?
            .with_working_dir(&root);
        scheduler = scheduler.with_revision(Box::new(hook));
    }
    if let Some(generator) = &config.generator {
        let hook = CommandHook::new("generator", &generator.command, generator.args.clone())?
            .with_working_dir(&root);
        scheduler = scheduler.with_generator(Box::new(hook));
    }

    Ok(scheduler)
}

fn print_recovery(recovery: &RecoveryInfo) {
    if recovery.was_clean_shutdown {
        return;
    }
    println!(
        "{} Previous run did not shut down cleanly",
        "!".yellow().bold()
    );
    println!("  {}", recovery.summary().dimmed());
    if let Some(task) = &recovery.current_task {
        println!("  {} Re-queued: {}", "↻".cyan(), task.task_text);
    }
}

fn print_iteration(iteration: usize, result: &IterationResult) {
    if result.results.is_empty() {
        println!("{} Iteration {iteration}: nothing to run", "─".dimmed());
        return;
    }
    println!("{} Iteration {iteration}", "→".cyan().bold());
    for outcome in &result.results {
        if outcome.success {
            println!("  {} {}", "✓".green().bold(), outcome.task);
        } else {
            println!("  {} {}", "✗".red().bold(), outcome.task);
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!(
        "{} {} iteration(s), {} succeeded, {} failed{}",
        if summary.failed == 0 {
            "✓".green().bold()
        } else {
            "✗".red().bold()
        },
        summary.iterations,
        summary.succeeded,
        summary.failed,
        if summary.restarts > 0 {
            format!(", {} restart(s)", summary.restarts)
        } else {
            String::new()
        }
    );
    if summary.stopped {
        println!("  {} Stopped on request", "─".dimmed());
    }
}
