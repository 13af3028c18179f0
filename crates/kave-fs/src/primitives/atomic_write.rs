use crate::{Error, Result};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// File name prefix of staged writes. The pruner leaves these alone.
pub const TEMP_PREFIX: &str = ".kave-tmp-";

#[derive(Clone, Copy, Debug, Default)]
pub struct AtomicWriteOptions {
    pub sync:           bool,
    pub create_parents: bool,
}

impl AtomicWriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    pub fn create_parents(mut self, create_parents: bool) -> Self {
        self.create_parents = create_parents;
        self
    }
}

/// Write `content` to `path` through a temp file in the same directory.
///
/// Either the whole of `content` lands at `path` or `path` is left as it was.
/// Concurrent readers may still observe the rename.
pub fn atomic_write(path: impl AsRef<Path>, content: &[u8], options: AtomicWriteOptions) -> Result<()> {
    let path = path.as_ref();
    if path.is_dir() {
        return Err(Error::IsDirectory(path.to_path_buf()));
    }

    let dir = path
        .parent()
        .ok_or_else(|| Error::NoParent(path.to_path_buf()))?;
    if options.create_parents && !dir.as_os_str().is_empty() {
        fs::create_dir_all(dir).map_err(|source| Error::Write {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let staged = dir.join(format!("{TEMP_PREFIX}{}", uuid::Uuid::new_v4()));
    let outcome = stage(&staged, content, options.sync)
        .map_err(|source| Error::Write {
            path: staged.clone(),
            source,
        })
        .and_then(|()| {
            fs::rename(&staged, path).map_err(|source| Error::Write {
                path: path.to_path_buf(),
                source,
            })
        });

    if outcome.is_err() {
        let _ = fs::remove_file(&staged);
    }
    outcome
}

fn stage(staged: &Path, content: &[u8], sync: bool) -> io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(staged)?;
    file.write_all(content)?;
    if sync {
        file.sync_all()?;
    }
    Ok(())
}

/// Whether `name` is a staged write left by [`atomic_write`].
pub fn is_temp(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_writes_whole_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("page.html");
        atomic_write(&path, b"<html></html>", AtomicWriteOptions::new()).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"<html></html>");
    }

    #[test]
    fn test_atomic_write_creates_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a/b/c.txt");
        atomic_write(&path, b"nested", AtomicWriteOptions::new().create_parents(true)).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"nested");
    }

    #[test]
    fn test_atomic_write_missing_parent_fails_cleanly() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing/c.txt");
        let result = atomic_write(&path, b"data", AtomicWriteOptions::new());
        assert!(matches!(result, Err(Error::Write { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_atomic_write_refuses_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub");
        fs::create_dir(&path).unwrap();
        let result = atomic_write(&path, b"data", AtomicWriteOptions::new());
        assert!(matches!(result, Err(Error::IsDirectory(_))));
        assert!(path.is_dir());
    }

    #[test]
    fn test_no_temp_left_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("SHA3-512SUMS");
        atomic_write(&path, b"one", AtomicWriteOptions::new().sync(true)).unwrap();
        atomic_write(&path, b"two", AtomicWriteOptions::new()).unwrap();
        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| is_temp(&e.file_name().to_string_lossy()))
            .count();
        assert_eq!(leftovers, 0);
        assert_eq!(fs::read(&path).unwrap(), b"two");
    }
}
