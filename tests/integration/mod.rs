//! Integration tests for waypoint
//!
//! These tests drive the checkpoint store, synchronizer and scheduler
//! together through crash, retry, stop and reload scenarios.

pub mod crash_recovery;
pub mod helpers;
pub mod markdown_flow;
pub mod sync_convergence;
