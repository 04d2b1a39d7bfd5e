//! Cooperative stop and reload signaling.
//!
//! The scheduler only polls: between tasks and once per second while it
//! waits out the inter-task delay. A running executor call is never
//! interrupted.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::fs::WorkDir;

/// Polled by the scheduler at its suspension points
pub trait ControlSignals {
    fn should_stop(&self) -> bool;
    fn should_reload(&self) -> bool;
}

/// Signals that never fire
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSignals;

impl ControlSignals for NoSignals {
    fn should_stop(&self) -> bool {
        false
    }

    fn should_reload(&self) -> bool {
        false
    }
}

/// Stop/reload driven by marker files in the work directory plus a Ctrl+C
/// flag.
#[derive(Debug, Clone)]
pub struct MarkerSignals {
    stop_marker: PathBuf,
    reload_marker: PathBuf,
    interrupted: Arc<AtomicBool>,
}

impl MarkerSignals {
    pub fn new(work_dir: &WorkDir) -> Self {
        Self {
            stop_marker: work_dir.stop_marker(),
            reload_marker: work_dir.reload_marker(),
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Route Ctrl+C (and SIGTERM) into the stop predicate. Can only be
    /// installed once per process.
    pub fn install_ctrlc_handler(&self) -> Result<()> {
        let interrupted = Arc::clone(&self.interrupted);
        ctrlc::set_handler(move || {
            interrupted.store(true, Ordering::SeqCst);
        })
        .context("Failed to set Ctrl+C handler")?;
        Ok(())
    }

    /// Shared flag flipped by the Ctrl+C handler
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }

    pub fn stop_marker(&self) -> &Path {
        &self.stop_marker
    }

    pub fn reload_marker(&self) -> &Path {
        &self.reload_marker
    }

    pub fn request_stop(&self) -> Result<()> {
        touch(&self.stop_marker)
    }

    pub fn request_reload(&self) -> Result<()> {
        touch(&self.reload_marker)
    }

    /// Remove stale markers left by an earlier run
    pub fn clear_stop(&self) -> Result<()> {
        remove_marker(&self.stop_marker)
    }

    pub fn clear_reload(&self) -> Result<()> {
        remove_marker(&self.reload_marker)
    }
}

impl ControlSignals for MarkerSignals {
    fn should_stop(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst) || self.stop_marker.exists()
    }

    fn should_reload(&self) -> bool {
        self.reload_marker.exists()
    }
}

fn touch(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, b"").with_context(|| format!("Failed to create marker: {}", path.display()))?;
    info!(marker = %path.display(), "Marker created");
    Ok(())
}

fn remove_marker(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove marker: {}", path.display()))?;
        debug!(marker = %path.display(), "Marker removed");
    }
    Ok(())
}
