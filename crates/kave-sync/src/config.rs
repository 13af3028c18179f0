use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::path;

/// Optional per-destination configuration file. Never pruned.
pub const CONFIG_FILE: &str = "kave.toml";

/// Well-known names inside the destination root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Layout {
    /// Checksum listing, fetched every run and cached verbatim.
    pub manifest:      String,
    /// Entry document; always refetched, link-rewritten, never backed up.
    pub root_document: String,
    /// Out-of-band files refreshed unconditionally every run.
    pub sidecars:      Vec<String>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            manifest:      "SHA3-512SUMS".to_string(),
            root_document: "index.html".to_string(),
            sidecars:      Vec::new(),
        }
    }
}

impl Layout {
    /// Root document and sidecars, normalized. These bypass the checksum gate.
    pub fn always_fresh(&self) -> Vec<String> {
        std::iter::once(&self.root_document)
            .chain(&self.sidecars)
            .map(|p| path::normalize(p))
            .filter(|p| !p.is_empty() && !path::escapes_root(p))
            .collect()
    }

    /// Names the pruner keeps regardless of the manifest.
    pub fn retained(&self) -> Vec<String> {
        let mut retained = self.always_fresh();
        retained.push(path::normalize(&self.manifest));
        retained.push(CONFIG_FILE.to_string());
        retained
    }
}

/// Options for one sync run.
///
/// # Examples
///
/// ```
/// use kave_sync::SyncConfig;
///
/// let config = SyncConfig::from_toml_str("bank = true\n[layout]\nsidecars = [\"meta.json\"]").unwrap();
/// assert!(config.bank);
/// assert!(!config.melt);
/// assert_eq!(config.layout.sidecars, vec!["meta.json".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Back up differing files before overwriting them.
    pub bank:                bool,
    /// Delete local files the manifest does not list.
    pub melt:                bool,
    /// Fetch workers; defaults to the available parallelism.
    pub workers:             Option<usize>,
    /// Per-request timeout in seconds.
    pub timeout_secs:        Option<u64>,
    /// Fetch same-origin resources referenced by the root document.
    pub follow_references:   bool,
    /// Also look for bare URLs inside inline scripts.
    pub scan_inline_scripts: bool,
    pub layout:              Layout,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            bank:                false,
            melt:                false,
            workers:             None,
            timeout_secs:        None,
            follow_references:   true,
            scan_inline_scripts: true,
            layout:              Layout::default(),
        }
    }
}

impl SyncConfig {
    pub fn from_toml_str(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Load `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(Error::Config {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        };
        let config = Self::from_toml_str(&raw).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn workers(&self) -> usize {
        self.workers
            .filter(|n| *n > 0)
            .unwrap_or_else(kave_fetch::default_workers)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
