//! Crash-consistent task checkpointing and a cooperative execution loop.
//!
//! A [`checkpoint::CheckpointStore`] keeps a durable ledger of task state.
//! The [`scheduler::Scheduler`] walks a [`todo::TodoSource`] through that
//! ledger, and the [`sync::Synchronizer`] keeps the two convergent across
//! crashes.

pub mod checkpoint;
pub mod commands;
pub mod config;
pub mod errors;
pub mod fs;
pub mod recovery;
pub mod scheduler;
pub mod sync;
pub mod todo;
