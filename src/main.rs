use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use waypoint::commands::run::RunOptions;
use waypoint::commands::{prune, reset, run, signal, status, sync, Workspace};

#[derive(Parser)]
#[command(name = "waypoint")]
#[command(about = "Crash-consistent task checkpointing and execution loop", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (default: .waypoint/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project directory containing .waypoint/
    #[arg(long, global = true, default_value = ".")]
    work_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Work through the todo list, resuming after crashes
    Run {
        /// Keep polling for new tasks instead of exiting when idle
        #[arg(short, long)]
        watch: bool,

        /// Seconds to wait between tasks (overrides config)
        #[arg(long)]
        task_delay: Option<u64>,

        /// Attempts per task before it is skipped (overrides config)
        #[arg(long)]
        max_attempts: Option<u32>,
    },

    /// Show checkpoint statistics, progress and recovery state
    Status,

    /// Check off todo items already completed in the checkpoint
    Sync,

    /// Drop old completed tasks from the checkpoint
    Prune {
        /// Number of most recent completed tasks to keep (default: from config)
        #[arg(short, long)]
        keep: Option<usize>,
    },

    /// Return the in-progress task to pending
    Reset,

    /// Ask a running `waypoint run` to stop after the current task
    Stop,

    /// Ask a running `waypoint run` to reload its configuration
    Reload,
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "waypoint=debug"
    } else {
        "waypoint=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut workspace = Workspace::open(&cli.work_dir, cli.config)?;

    match cli.command {
        Commands::Run {
            watch,
            task_delay,
            max_attempts,
        } => run::execute(
            &mut workspace,
            RunOptions {
                watch,
                task_delay_secs: task_delay,
                max_attempts,
            },
        ),
        Commands::Status => status::execute(&workspace),
        Commands::Sync => sync::execute(&workspace),
        Commands::Prune { keep } => prune::execute(&workspace, keep),
        Commands::Reset => reset::execute(&workspace),
        Commands::Stop => signal::stop(&workspace),
        Commands::Reload => signal::reload(&workspace),
    }
}
