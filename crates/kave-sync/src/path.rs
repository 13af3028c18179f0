//! URL-relative path normalization.
//!
//! Paths are handled as `/`-separated strings so the same rules apply to
//! manifest lines, URL paths and document references. A normalized path never
//! starts with `/`, contains no `.` segments, and keeps `..` only at its head
//! when there was nothing left to pop. Such paths are unresolvable and must be
//! rejected before touching the filesystem.

use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{Error, Result};

/// Canonicalize `path`. Pure and idempotent.
///
/// URL-absolute input (`https://host/a/b`) is reduced to its path first.
///
/// ```
/// use kave_sync::path::normalize;
///
/// assert_eq!(normalize("a/./b/../c"), "a/c");
/// assert_eq!(normalize("/a/../../b"), "../b");
/// ```
pub fn normalize(path: &str) -> String {
    let path = match Url::parse(path) {
        Ok(url) if url.has_host() => url.path().to_string(),
        _ => path.to_string(),
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(last) if *last != ".." => {
                    segments.pop();
                }
                _ => segments.push(".."),
            },
            part => segments.push(part),
        }
    }
    segments.join("/")
}

/// Whether a normalized path climbs above its root.
pub fn escapes_root(normalized: &str) -> bool {
    normalized == ".." || normalized.starts_with("../")
}

/// Directory part of a normalized path (`""` for top-level names).
pub fn parent(normalized: &str) -> &str {
    normalized.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Map `path` onto a local file below `root`.
///
/// Fails for paths that escape `root` or name `root` itself.
pub fn resolve(root: &Path, path: &str) -> Result<PathBuf> {
    let normalized = normalize(path);
    if normalized.is_empty() || escapes_root(&normalized) {
        return Err(Error::PathEscapes(path.to_string()));
    }
    Ok(normalized.split('/').fold(root.to_path_buf(), |acc, s| acc.join(s)))
}

/// `/`-joined path of `local` relative to `root`, if it lies below it.
pub fn to_relative(root: &Path, local: &Path) -> Option<String> {
    let rel = local.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Relative reference from directory `from_dir` to `target`, both normalized.
///
/// The result always starts with `./` or `../` so markup cannot mistake it for
/// anything but a relative reference.
pub fn relative_to(from_dir: &str, target: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = target.split('/').filter(|s| !s.is_empty()).collect();

    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();
    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend(&to[common..]);

    let joined = parts.join("/");
    if joined.starts_with("..") || joined.starts_with('/') {
        joined
    } else {
        format!("./{joined}")
    }
}
