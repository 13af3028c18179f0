use crate::{Error, Result};
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

const BACKUP_SUFFIX: &str = ".bak";

/// `<path>.<n>.bak`
pub fn backup_path(path: &Path, n: u32) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{n}{BACKUP_SUFFIX}"));
    PathBuf::from(name)
}

/// Whether a file name belongs to a backup. Backups are never pruned.
pub fn is_backup(name: &str) -> bool {
    name.ends_with(BACKUP_SUFFIX)
}

/// Copy the current bytes of `path` to the first unused `<path>.<n>.bak`.
///
/// Returns `Ok(None)` when `path` does not exist. Existing backups are never
/// overwritten: the slot is claimed with `create_new` before copying, so two
/// callers cannot end up sharing one.
pub fn backup(path: impl AsRef<Path>) -> Result<Option<PathBuf>> {
    let path = path.as_ref();
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(Error::Read {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    if metadata.is_dir() {
        return Err(Error::IsDirectory(path.to_path_buf()));
    }

    let mut n = 1u32;
    let (target, mut file) = loop {
        let candidate = backup_path(path, n);
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => break (candidate, file),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
            Err(e) => {
                return Err(Error::Write {
                    path: candidate,
                    source: e,
                });
            }
        }
    };

    let copied = fs::File::open(path)
        .and_then(|mut src| io::copy(&mut src, &mut file))
        .and_then(|_| file.sync_all());
    if let Err(e) = copied {
        let _ = fs::remove_file(&target);
        return Err(Error::Write {
            path: target,
            source: e,
        });
    }

    tracing::debug!(path = %path.display(), backup = %target.display(), "backed up");
    Ok(Some(target))
}
