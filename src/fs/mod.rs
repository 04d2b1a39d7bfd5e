pub mod atomic;
pub mod status_log;
pub mod work_dir;

pub use atomic::{atomic_write, backup_path};
pub use status_log::StatusLog;
pub use work_dir::WorkDir;
