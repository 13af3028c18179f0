use std::collections::{BTreeSet, HashMap};

use kave_verify::Digest;

use crate::config::Layout;
use crate::error::{Error, Result};
use crate::path;

/// Prefix a path token may carry after the digest (binary-mode checksum listings).
const PATH_SENTINEL: char = '*';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub digest: Digest,
    /// Normalized, never empty, never escaping.
    pub path:   String,
}

/// Parsed checksum listing for one run.
#[derive(Debug, Clone)]
pub struct Manifest {
    entries:      Vec<ManifestEntry>,
    index:        HashMap<String, usize>,
    always_fresh: Vec<String>,
    skipped:      usize,
}

impl Manifest {
    /// Parse `raw`, skipping (and logging) lines that cannot be used.
    ///
    /// A path listed twice keeps its first position but takes the digest of
    /// the last listing.
    pub fn parse(raw: &str, layout: &Layout) -> Self {
        let mut manifest = Self {
            entries:      Vec::new(),
            index:        HashMap::new(),
            always_fresh: layout.always_fresh(),
            skipped:      0,
        };

        for (n, line) in raw.lines().enumerate() {
            match parse_line(n + 1, line) {
                Ok(Some(entry)) => manifest.insert(entry),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "skipping manifest line");
                    manifest.skipped += 1;
                }
            }
        }

        tracing::debug!(
            entries = manifest.entries.len(),
            skipped = manifest.skipped,
            "parsed manifest"
        );
        manifest
    }

    fn insert(&mut self, entry: ManifestEntry) {
        match self.index.get(&entry.path) {
            Some(&i) => {
                if self.entries[i].digest != entry.digest {
                    tracing::warn!(path = %entry.path, "path listed twice, last digest wins");
                }
                self.entries[i] = entry;
            }
            None => {
                self.index.insert(entry.path.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Entries in manifest order.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn lookup(&self, path: &str) -> Option<&ManifestEntry> {
        self.index
            .get(&path::normalize(path))
            .map(|&i| &self.entries[i])
    }

    /// Every path a clean mirror may contain: listed entries plus the root
    /// document and sidecars, which are refreshed every run whether listed or not.
    pub fn valid_paths(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .map(|e| e.path.clone())
            .chain(self.always_fresh.iter().cloned())
            .collect()
    }

    /// Whether `path` is refreshed unconditionally instead of checksum-gated.
    pub fn is_always_fresh(&self, path: &str) -> bool {
        self.always_fresh.iter().any(|p| p == path)
    }

    /// Number of lines rejected while parsing.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse one manifest line. Blank and `#` lines yield `Ok(None)`.
///
/// Accepted shapes: `<digest> <path>`, `<digest>  <path>`, `<digest> *<path>`
/// and `<digest>*<path>`.
pub(crate) fn parse_line(line_no: usize, line: &str) -> Result<Option<ManifestEntry>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() || line.trim_start().starts_with('#') {
        return Ok(None);
    }

    let malformed = |reason: String| Error::MalformedEntry {
        line: line_no,
        reason,
    };

    let line = line.trim_start();
    let (digest, rest) = line
        .split_once(|c: char| c.is_whitespace() || c == PATH_SENTINEL)
        .ok_or_else(|| malformed("expected a digest and a path".into()))?;
    let raw_path = rest
        .strip_prefix(|c: char| c == ' ' || c == PATH_SENTINEL)
        .unwrap_or(rest);
    if raw_path.trim().is_empty() {
        return Err(malformed("expected a digest and a path".into()));
    }

    let digest = Digest::parse(digest).map_err(|e| malformed(e.to_string()))?;

    let normalized = path::normalize(raw_path);
    if normalized.is_empty() {
        return Err(malformed(format!("'{raw_path}' names no file")));
    }
    if path::escapes_root(&normalized) {
        return Err(malformed(format!("'{raw_path}' escapes the destination root")));
    }

    Ok(Some(ManifestEntry {
        digest,
        path: normalized,
    }))
}
