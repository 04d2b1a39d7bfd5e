pub mod common;
pub mod prune;
pub mod reset;
pub mod run;
pub mod signal;
pub mod status;
pub mod sync;

pub use common::Workspace;
