use std::fmt;

use kave_fetch::{TaskOutcome, TaskReport};

use crate::error::Error;
use crate::manifest::ManifestEntry;
use crate::planner::SyncDecision;
use crate::prune::MeltReport;

/// Everything one run did.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub decisions:  Vec<(ManifestEntry, SyncDecision)>,
    /// Manifest-driven fetches, sidecars and discovered references.
    pub tasks:      Vec<TaskReport>,
    pub melt:       Option<MeltReport>,
    /// Per-entry and per-file problems that did not stop the run.
    pub errors:     Vec<Error>,
    /// Manifest lines that were skipped as malformed.
    pub skipped:    usize,
    /// References in the root document pointed at local paths.
    pub rewritten:  usize,
}

impl SyncReport {
    /// Tasks that actually went to the network and wrote a file.
    pub fn fetch_count(&self) -> usize {
        self.tasks.iter().filter(|r| r.outcome.is_fetch()).count()
    }

    pub fn up_to_date_count(&self) -> usize {
        self.decisions
            .iter()
            .filter(|(_, d)| matches!(d, SyncDecision::UpToDate { .. }))
            .count()
    }

    pub fn backup_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|r| {
                matches!(
                    r.outcome,
                    TaskOutcome::Redownloaded {
                        backup: Some(_),
                        ..
                    }
                )
            })
            .count()
    }

    pub fn deleted_count(&self) -> usize {
        self.melt.as_ref().map_or(0, |m| m.deleted.len())
    }

    pub fn failure_count(&self) -> usize {
        self.tasks.iter().filter(|r| r.outcome.is_failure()).count()
            + self.errors.len()
            + self.melt.as_ref().map_or(0, |m| m.failures.len())
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} fetched, {} up-to-date, {} backed up, {} deleted, {} failed",
            self.fetch_count(),
            self.up_to_date_count(),
            self.backup_count(),
            self.deleted_count(),
            self.failure_count(),
        )
    }
}
