//! Filesystem primitives used while mirroring a remote tree.
//!
//! - [`atomic_write`] stages bytes in a sibling temp file and renames it over
//!   the destination, so a failed write never leaves a truncated file behind.
//! - [`backup`] preserves the current bytes of a file at the first unused
//!   `<path>.<n>.bak` before it is overwritten.

pub use error::{Error, Result};
pub use primitives::{
    AtomicWriteOptions, TEMP_PREFIX, atomic_write, backup, backup_path, is_backup, is_temp,
};

mod error;
mod primitives;
