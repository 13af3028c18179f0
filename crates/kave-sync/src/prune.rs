use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::path;

#[derive(Debug, Default)]
pub struct MeltReport {
    pub deleted:      Vec<PathBuf>,
    pub removed_dirs: Vec<PathBuf>,
    pub failures:     Vec<(PathBuf, String)>,
}

/// Delete every file below `root` that is neither valid nor retained, then
/// remove the directories this leaves empty.
///
/// Backups and staged writes are always kept. A directory whose own path is
/// valid (the manifest expects a file there) is not descended into.
/// `root` itself is never removed.
pub fn melt(root: &Path, valid: &BTreeSet<String>, retained: &[String]) -> MeltReport {
    let mut report = MeltReport::default();

    let keep_dir = |entry: &walkdir::DirEntry| {
        !(entry.file_type().is_dir()
            && path::to_relative(root, entry.path()).is_some_and(|rel| valid.contains(&rel)))
    };

    for entry in WalkDir::new(root).min_depth(1).into_iter().filter_entry(keep_dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let at = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                tracing::error!(path = %at.display(), error = %e, "cannot walk");
                report.failures.push((at, e.to_string()));
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }

        let Some(rel) = path::to_relative(root, entry.path()) else {
            continue;
        };
        let name = entry.file_name().to_string_lossy();
        if valid.contains(&rel)
            || retained.contains(&rel)
            || kave_fs::is_backup(&name)
            || kave_fs::is_temp(&name)
        {
            continue;
        }

        match std::fs::remove_file(entry.path()) {
            Ok(()) => {
                tracing::info!(path = %rel, "deleted");
                report.deleted.push(entry.path().to_path_buf());
            }
            Err(e) => {
                tracing::error!(path = %rel, error = %e, "cannot delete");
                report.failures.push((entry.path().to_path_buf(), e.to_string()));
            }
        }
    }

    // Children come first, so emptied parents are seen after their contents.
    for entry in WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_entry(keep_dir)
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
    {
        let empty = std::fs::read_dir(entry.path())
            .map(|mut it| it.next().is_none())
            .unwrap_or(false);
        if !empty {
            continue;
        }
        match std::fs::remove_dir(entry.path()) {
            Ok(()) => {
                tracing::info!(path = %entry.path().display(), "removed empty directory");
                report.removed_dirs.push(entry.path().to_path_buf());
            }
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "cannot remove directory");
                report.failures.push((entry.path().to_path_buf(), e.to_string()));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn set(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_deletes_unlisted_keeps_listed() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();

        let report = melt(dir.path(), &set(&["a.txt"]), &[]);

        assert!(dir.path().join("a.txt").exists());
        assert!(!dir.path().join("b.txt").exists());
        assert_eq!(report.deleted, vec![dir.path().join("b.txt")]);
    }

    #[test]
    fn test_keeps_backups_and_retained() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt.1.bak"), "old").unwrap();
        fs::write(dir.path().join("SHA3-512SUMS"), "sums").unwrap();
        fs::write(dir.path().join("index.html"), "<html>").unwrap();

        let retained = vec!["SHA3-512SUMS".to_string(), "index.html".to_string()];
        let report = melt(dir.path(), &set(&[]), &retained);

        assert!(report.deleted.is_empty());
        assert!(dir.path().join("a.txt.1.bak").exists());
        assert!(dir.path().join("SHA3-512SUMS").exists());
        assert!(dir.path().join("index.html").exists());
    }

    #[test]
    fn test_removes_emptied_directories_bottom_up() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("x/y/z")).unwrap();
        fs::write(dir.path().join("x/y/z/stray.css"), "").unwrap();
        fs::create_dir_all(dir.path().join("keep")).unwrap();
        fs::write(dir.path().join("keep/a.js"), "").unwrap();

        let report = melt(dir.path(), &set(&["keep/a.js"]), &[]);

        assert!(!dir.path().join("x").exists());
        assert_eq!(report.removed_dirs.len(), 3);
        assert!(dir.path().join("keep/a.js").exists());
        assert!(dir.path().exists());
    }

    #[test]
    fn test_directory_conflict_is_untouched() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/inner.txt"), "").unwrap();

        let report = melt(dir.path(), &set(&["docs"]), &[]);

        assert!(report.deleted.is_empty());
        assert!(dir.path().join("docs/inner.txt").exists());
    }
}
