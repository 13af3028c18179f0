pub mod atomic_write;
pub mod backup;

pub use atomic_write::{AtomicWriteOptions, TEMP_PREFIX, atomic_write, is_temp};
pub use backup::{backup, backup_path, is_backup};
