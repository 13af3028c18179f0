use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use kave_fetch::{CoordinatorOptions, FetchCoordinator, FetchTask, Fetcher, VerifiedRegistry};
use kave_fs::AtomicWriteOptions;
use kave_verify::Digest;
use url::Url;

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::path;
use crate::planner;
use crate::prune;
use crate::report::SyncReport;
use crate::rewrite::{InlineScriptScanner, LinkRewriter};

/// One destination tree kept in step with one origin.
pub struct Mirror<F: Fetcher> {
    fetcher:     Arc<F>,
    origin:      Url,
    destination: PathBuf,
    config:      SyncConfig,
}

impl<F: Fetcher + 'static> Mirror<F> {
    /// `origin` is treated as a directory: `https://host/site` mirrors `/site/`.
    pub fn new(fetcher: Arc<F>, mut origin: Url, destination: impl Into<PathBuf>, config: SyncConfig) -> Self {
        if !origin.path().ends_with('/') {
            let dir = format!("{}/", origin.path());
            origin.set_path(&dir);
        }
        origin.set_query(None);
        origin.set_fragment(None);
        Self {
            fetcher,
            origin,
            destination: destination.into(),
            config,
        }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Run one sync.
    ///
    /// Only an unreachable manifest or root document (or an unwritable
    /// destination) fails the run; every other problem is logged and
    /// collected in the returned report.
    pub async fn run(&self) -> Result<SyncReport> {
        let layout = &self.config.layout;
        let mut report = SyncReport::default();
        tracing::info!(origin = %self.origin, destination = %self.destination.display(), "syncing");

        std::fs::create_dir_all(&self.destination).map_err(|e| Error::Write {
            path: self.destination.clone(),
            reason: e.to_string(),
        })?;

        let (_, raw) = self.fetch_required(&layout.manifest).await?;
        if let Err(e) = self.persist(&layout.manifest, &raw) {
            tracing::warn!(error = %e, "cannot cache manifest");
            report.errors.push(e);
        }
        let manifest = Manifest::parse(&String::from_utf8_lossy(&raw), layout);
        report.skipped = manifest.skipped();

        let registry = Arc::new(VerifiedRegistry::new());
        let plan = planner::plan(&manifest, &self.destination, &self.origin, &registry);
        report.decisions = plan.decisions;
        report.errors.extend(plan.errors);

        let fetching = self.coordinator(&registry, self.config.bank);
        report.tasks.extend(fetching.execute(plan.tasks).await);

        let sidecars = self.sidecar_tasks(&mut report);
        if !sidecars.is_empty() {
            let refreshing = self.coordinator(&registry, false);
            report.tasks.extend(refreshing.execute(sidecars).await);
        }

        if self.config.melt {
            report.melt = Some(prune::melt(
                &self.destination,
                &manifest.valid_paths(),
                &layout.retained(),
            ));
        }

        let (document_url, body) = self.fetch_required(&layout.root_document).await?;
        let (document, targets) = match std::str::from_utf8(&body) {
            Ok(text) => {
                let mut rewriter = LinkRewriter::new(document_url, self.origin.clone());
                if self.config.scan_inline_scripts {
                    rewriter = rewriter.with_scanner(InlineScriptScanner);
                }
                let rewritten = rewriter.rewrite(text);
                report.rewritten = rewritten.rewritten;
                (Bytes::from(rewritten.text), rewritten.targets)
            }
            Err(e) => {
                tracing::warn!(
                    path = %layout.root_document,
                    error = %e,
                    "root document is not UTF-8, keeping it as served"
                );
                (body.clone(), Vec::new())
            }
        };

        if self.config.follow_references {
            let discovered = self.reference_tasks(&targets, &manifest);
            report.tasks.extend(fetching.execute(discovered).await);
        }

        let written = self.persist(&layout.root_document, &document)?;
        registry.record(written, Digest::of(&document));
        tracing::info!(
            path = %layout.root_document,
            references = report.rewritten,
            "downloaded and rewrote root document"
        );

        tracing::debug!(%report, "sync finished");
        Ok(report)
    }

    fn coordinator(&self, registry: &Arc<VerifiedRegistry>, bank: bool) -> FetchCoordinator<F> {
        FetchCoordinator::new(Arc::clone(&self.fetcher), Arc::clone(registry)).with_options(
            CoordinatorOptions::default()
                .workers(self.config.workers())
                .bank(bank),
        )
    }

    async fn fetch_required(&self, name: &str) -> Result<(Url, Bytes)> {
        let url = self.origin.join(name).map_err(|e| Error::InvalidUrl {
            path: name.to_string(),
            reason: e.to_string(),
        })?;
        match self.fetcher.fetch(&url).await {
            Ok(bytes) => Ok((url, bytes)),
            Err(source) => Err(Error::Precondition {
                url: url.to_string(),
                source,
            }),
        }
    }

    /// Write `bytes` to `name` under the destination, without backup.
    fn persist(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let local = path::resolve(&self.destination, name)?;
        if local.is_dir() {
            return Err(Error::DirectoryConflict(local));
        }
        kave_fs::atomic_write(&local, bytes, AtomicWriteOptions::new().create_parents(true)).map_err(
            |e| Error::Write {
                path: local.clone(),
                reason: e.to_string(),
            },
        )?;
        Ok(local)
    }

    fn sidecar_tasks(&self, report: &mut SyncReport) -> Vec<FetchTask> {
        let mut tasks = Vec::new();
        for sidecar in &self.config.layout.sidecars {
            let task = path::resolve(&self.destination, sidecar).and_then(|local| {
                self.origin
                    .join(&path::normalize(sidecar))
                    .map(|url| FetchTask::new(url, local))
                    .map_err(|e| Error::InvalidUrl {
                        path: sidecar.clone(),
                        reason: e.to_string(),
                    })
            });
            match task {
                Ok(task) => tasks.push(task),
                Err(e) => {
                    tracing::warn!(path = %sidecar, error = %e, "skipping sidecar");
                    report.errors.push(e);
                }
            }
        }
        tasks
    }

    /// Fetch tasks for same-origin resources found in the root document.
    ///
    /// Listed targets are always handed on; the registry settles them. An
    /// unlisted target has no digest to check against, so it is fetched only
    /// when missing, and never while melting since melt would delete it.
    fn reference_tasks(&self, targets: &[Url], manifest: &Manifest) -> Vec<FetchTask> {
        let base = path::normalize(self.origin.path());
        targets
            .iter()
            .filter_map(|url| {
                let target = path::normalize(url.path());
                let rel = if base.is_empty() {
                    target
                } else {
                    target.strip_prefix(&format!("{base}/"))?.to_string()
                };
                if manifest.is_always_fresh(&rel) {
                    return None;
                }
                let local = path::resolve(&self.destination, &rel).ok()?;
                if manifest.lookup(&rel).is_none() {
                    if self.config.melt {
                        tracing::debug!(path = %rel, "unlisted reference, not following while melting");
                        return None;
                    }
                    if local.is_file() {
                        tracing::debug!(path = %rel, "unlisted reference already present");
                        return None;
                    }
                }
                Some(FetchTask::new(url.clone(), local))
            })
            .collect()
    }
}
