//! Local-first staleness decisions.
//!
//! Planning touches only the local disk: up-to-date entries go straight into
//! the registry, everything else becomes a [`FetchTask`].

use std::fmt;
use std::path::{Path, PathBuf};

use kave_fetch::{FetchTask, VerifiedRegistry};
use kave_verify::{Digest, digest_file};
use url::Url;

use crate::error::Error;
use crate::manifest::{Manifest, ManifestEntry};
use crate::path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncDecision {
    UpToDate { path: PathBuf },
    Missing { path: PathBuf },
    /// Local bytes differ from the manifest; `previous` is what is on disk now.
    Stale { path: PathBuf, previous: Digest },
    /// A directory sits where the manifest expects a file. Left untouched.
    DirectorySkip { path: PathBuf },
}

impl SyncDecision {
    pub fn path(&self) -> &Path {
        match self {
            Self::UpToDate { path }
            | Self::Missing { path }
            | Self::Stale { path, .. }
            | Self::DirectorySkip { path } => path,
        }
    }

    pub fn needs_fetch(&self) -> bool {
        matches!(self, Self::Missing { .. } | Self::Stale { .. })
    }
}

impl fmt::Display for SyncDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpToDate { .. } => write!(f, "up-to-date"),
            Self::Missing { .. } => write!(f, "missing"),
            Self::Stale { .. } => write!(f, "stale"),
            Self::DirectorySkip { .. } => write!(f, "skipped directory"),
        }
    }
}

#[derive(Debug, Default)]
pub struct SyncPlan {
    /// One decision per planned entry, in manifest order.
    pub decisions: Vec<(ManifestEntry, SyncDecision)>,
    /// Fetches for `Missing` and `Stale` entries.
    pub tasks:     Vec<FetchTask>,
    /// Entries that could not be planned at all.
    pub errors:    Vec<Error>,
}

/// Decide what to do with every manifest entry below `root`.
///
/// The root document and sidecars are skipped; they are refreshed
/// unconditionally later in the run.
pub fn plan(manifest: &Manifest, root: &Path, origin: &Url, registry: &VerifiedRegistry) -> SyncPlan {
    let mut plan = SyncPlan::default();

    for entry in manifest.entries() {
        if manifest.is_always_fresh(&entry.path) {
            continue;
        }

        let local = match path::resolve(root, &entry.path) {
            Ok(local) => local,
            Err(e) => {
                tracing::warn!(path = %entry.path, error = %e, "not planning entry");
                plan.errors.push(e);
                continue;
            }
        };

        let decision = match decide(entry, local) {
            Ok(decision) => decision,
            Err(e) => {
                tracing::error!(path = %entry.path, error = %e, "cannot check local copy");
                plan.errors.push(e);
                continue;
            }
        };

        match &decision {
            SyncDecision::UpToDate { path } => {
                tracing::info!(path = %entry.path, "up-to-date");
                registry.record(path.clone(), entry.digest.clone());
            }
            SyncDecision::DirectorySkip { .. } => {
                tracing::warn!(path = %entry.path, "skipped directory");
            }
            SyncDecision::Missing { path } | SyncDecision::Stale { path, .. } => {
                tracing::debug!(path = %entry.path, "{decision}");
                match origin.join(&entry.path) {
                    Ok(url) => plan.tasks.push(FetchTask::new(url, path.clone())),
                    Err(e) => {
                        let e = Error::InvalidUrl {
                            path: entry.path.clone(),
                            reason: e.to_string(),
                        };
                        tracing::error!(error = %e, "not fetching entry");
                        plan.errors.push(e);
                    }
                }
            }
        }

        plan.decisions.push((entry.clone(), decision));
    }

    plan
}

fn decide(entry: &ManifestEntry, local: PathBuf) -> Result<SyncDecision, Error> {
    if !local.exists() {
        return Ok(SyncDecision::Missing { path: local });
    }
    if local.is_dir() {
        return Ok(SyncDecision::DirectorySkip { path: local });
    }

    match digest_file(&local) {
        Ok(Some(actual)) if actual == entry.digest => Ok(SyncDecision::UpToDate { path: local }),
        Ok(Some(previous)) => Ok(SyncDecision::Stale {
            path: local,
            previous,
        }),
        // Vanished between the checks above and hashing.
        Ok(None) => Ok(SyncDecision::Missing { path: local }),
        Err(source) => Err(Error::Hash { path: local, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Layout;
    use tempfile::tempdir;

    fn manifest(lines: &[(&str, &str)]) -> Manifest {
        let raw: String = lines
            .iter()
            .map(|(p, content)| format!("{} {p}\n", Digest::of(content.as_bytes())))
            .collect();
        Manifest::parse(&raw, &Layout::default())
    }

    fn origin() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    #[test]
    fn test_classifies_each_state() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("same.txt"), "same").unwrap();
        std::fs::write(dir.path().join("old.txt"), "old").unwrap();
        std::fs::create_dir(dir.path().join("dir.txt")).unwrap();

        let manifest = manifest(&[
            ("same.txt", "same"),
            ("old.txt", "new"),
            ("gone.txt", "gone"),
            ("dir.txt", "dir"),
        ]);
        let registry = VerifiedRegistry::new();
        let plan = plan(&manifest, dir.path(), &origin(), &registry);

        let kinds: Vec<String> = plan.decisions.iter().map(|(_, d)| d.to_string()).collect();
        assert_eq!(kinds, ["up-to-date", "stale", "missing", "skipped directory"]);

        match &plan.decisions[1].1 {
            SyncDecision::Stale { previous, .. } => assert_eq!(*previous, Digest::of(b"old")),
            other => panic!("unexpected {other:?}"),
        }

        let urls: Vec<&str> = plan.tasks.iter().map(|t| t.url.as_str()).collect();
        assert_eq!(urls, ["https://example.com/old.txt", "https://example.com/gone.txt"]);
        assert_eq!(registry.get(&dir.path().join("same.txt")), Some(Digest::of(b"same")));
        assert!(!registry.contains(&dir.path().join("old.txt")));
    }

    #[test]
    fn test_root_document_is_not_gated() {
        let dir = tempdir().unwrap();
        let manifest = manifest(&[("index.html", "<html>"), ("a.css", "a")]);
        let plan = plan(&manifest, dir.path(), &origin(), &VerifiedRegistry::new());

        assert_eq!(plan.decisions.len(), 1);
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].destination, dir.path().join("a.css"));
    }

    #[test]
    fn test_origin_subdirectory() {
        let dir = tempdir().unwrap();
        let manifest = manifest(&[("dep/Kave.css", "css")]);
        let origin = Url::parse("https://example.com/site/").unwrap();
        let plan = plan(&manifest, dir.path(), &origin, &VerifiedRegistry::new());
        assert_eq!(plan.tasks[0].url.as_str(), "https://example.com/site/dep/Kave.css");
        assert_eq!(plan.tasks[0].destination, dir.path().join("dep").join("Kave.css"));
    }
}
