//! Bounded-parallel execution of fetch tasks.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures_util::{StreamExt, stream::FuturesUnordered};
use kave_fs::AtomicWriteOptions;
use kave_verify::{Digest, digest_file};
use tokio::sync::Semaphore;

use crate::error::TaskError;
use crate::fetcher::Fetcher;
use crate::registry::VerifiedRegistry;
use crate::task::{FetchTask, TaskOutcome, TaskReport, dedup_by_destination};

/// One worker per available processing unit.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    /// Maximum number of tasks in flight.
    pub workers: usize,
    /// Back up differing files before overwriting them.
    pub bank:    bool,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            bank:    false,
        }
    }
}

impl CoordinatorOptions {
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn bank(mut self, bank: bool) -> Self {
        self.bank = bank;
        self
    }
}

/// Runs fetch tasks on a bounded pool, recording results in a shared registry.
pub struct FetchCoordinator<F: Fetcher> {
    fetcher:  Arc<F>,
    registry: Arc<VerifiedRegistry>,
    options:  CoordinatorOptions,
}

impl<F: Fetcher + 'static> FetchCoordinator<F> {
    pub fn new(fetcher: Arc<F>, registry: Arc<VerifiedRegistry>) -> Self {
        Self {
            fetcher,
            registry,
            options: CoordinatorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CoordinatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &Arc<VerifiedRegistry> {
        &self.registry
    }

    /// Execute `tasks` and report every one of them.
    ///
    /// Tasks are deduplicated by destination first. A failing task is logged
    /// and reported; it never stops its siblings. Report order follows
    /// completion, not submission.
    pub async fn execute(&self, tasks: Vec<FetchTask>) -> Vec<TaskReport> {
        let tasks = dedup_by_destination(tasks);
        let semaphore = Arc::new(Semaphore::new(self.options.workers.max(1)));
        let mut running = FuturesUnordered::new();

        for task in tasks {
            let fetcher = Arc::clone(&self.fetcher);
            let registry = Arc::clone(&self.registry);
            let semaphore = Arc::clone(&semaphore);
            let bank = self.options.bank;
            let spawned = task.clone();

            let handle = tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return TaskOutcome::Failed(TaskError::Worker("worker pool closed".into()));
                };
                run_task(fetcher.as_ref(), &registry, &spawned, bank).await
            });

            running.push(async move {
                let outcome = handle
                    .await
                    .unwrap_or_else(|e| TaskOutcome::Failed(TaskError::Worker(e.to_string())));
                TaskReport { task, outcome }
            });
        }

        let mut reports = Vec::with_capacity(running.len());
        while let Some(report) = running.next().await {
            log_report(&report);
            reports.push(report);
        }
        reports
    }
}

async fn run_task<F: Fetcher>(
    fetcher: &F,
    registry: &VerifiedRegistry,
    task: &FetchTask,
    bank: bool,
) -> TaskOutcome {
    let _guard = registry.lock_path(&task.destination).await;

    if let Some(known) = registry.get(&task.destination) {
        let destination = task.destination.clone();
        let on_disk = tokio::task::spawn_blocking(move || digest_file(destination)).await;
        if let Ok(Ok(Some(actual))) = on_disk
            && actual == known
        {
            return TaskOutcome::AlreadyVerified { digest: known };
        }
    }

    let bytes = match fetcher.fetch(&task.url).await {
        Ok(bytes) => bytes,
        Err(e) => return TaskOutcome::Failed(e.into()),
    };

    let destination = task.destination.clone();
    let committed = tokio::task::spawn_blocking(move || commit(&destination, &bytes, bank)).await;

    match committed {
        Ok(Ok(commit)) => {
            registry.record(task.destination.clone(), commit.digest.clone());
            if commit.replaced {
                TaskOutcome::Redownloaded {
                    digest: commit.digest,
                    backup: commit.backup,
                }
            } else {
                TaskOutcome::Downloaded {
                    digest: commit.digest,
                }
            }
        }
        Ok(Err(e)) => TaskOutcome::Failed(e),
        Err(e) => TaskOutcome::Failed(TaskError::Worker(e.to_string())),
    }
}

struct Commit {
    digest:   Digest,
    replaced: bool,
    backup:   Option<PathBuf>,
}

/// Place `bytes` at `destination`, banking differing prior content first.
fn commit(destination: &Path, bytes: &Bytes, bank: bool) -> Result<Commit, TaskError> {
    if destination.is_dir() {
        return Err(TaskError::DirectoryConflict(destination.to_path_buf()));
    }

    let digest = Digest::of(bytes);
    let previous = digest_file(destination)?;

    let backup = match &previous {
        Some(old) if bank && *old != digest => kave_fs::backup(destination)?,
        _ => None,
    };

    kave_fs::atomic_write(
        destination,
        bytes,
        AtomicWriteOptions::new().create_parents(true),
    )?;

    Ok(Commit {
        digest,
        replaced: previous.is_some(),
        backup,
    })
}

fn log_report(report: &TaskReport) {
    let path = report.task.destination.display();
    match &report.outcome {
        TaskOutcome::Failed(e) => {
            tracing::error!(url = %report.task.url, path = %path, error = %e, "fetch failed");
        }
        TaskOutcome::Redownloaded {
            backup: Some(b), ..
        } => {
            tracing::info!(path = %path, backup = %b.display(), "backed up");
            tracing::info!(url = %report.task.url, path = %path, "re-downloaded");
        }
        outcome => {
            tracing::info!(url = %report.task.url, path = %path, "{outcome}");
        }
    }
}
