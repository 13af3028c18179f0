use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use kave_verify::Digest;
use url::Url;

use crate::error::TaskError;

/// One remote document bound for one local path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTask {
    pub url:         Url,
    pub destination: PathBuf,
}

impl FetchTask {
    pub fn new(url: Url, destination: impl Into<PathBuf>) -> Self {
        Self {
            url,
            destination: destination.into(),
        }
    }
}

/// Drop every task whose destination was already claimed by an earlier one.
pub fn dedup_by_destination(tasks: Vec<FetchTask>) -> Vec<FetchTask> {
    let mut seen = HashSet::new();
    tasks
        .into_iter()
        .filter(|task| {
            let fresh = seen.insert(task.destination.clone());
            if !fresh {
                tracing::debug!(
                    url = %task.url,
                    path = %task.destination.display(),
                    "duplicate destination, dropping task"
                );
            }
            fresh
        })
        .collect()
}

#[derive(Debug)]
pub enum TaskOutcome {
    /// Nothing was at the destination before.
    Downloaded { digest: Digest },
    /// An older file was replaced, optionally after being backed up.
    Redownloaded {
        digest: Digest,
        backup: Option<PathBuf>,
    },
    /// Another task already wrote this path during the run.
    AlreadyVerified { digest: Digest },
    Failed(TaskError),
}

impl TaskOutcome {
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Downloaded { .. } | Self::Redownloaded { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Downloaded { .. } => write!(f, "downloaded"),
            Self::Redownloaded { backup: None, .. } => write!(f, "re-downloaded"),
            Self::Redownloaded {
                backup: Some(b), ..
            } => write!(f, "backed up to {} and re-downloaded", b.display()),
            Self::AlreadyVerified { .. } => write!(f, "already verified"),
            Self::Failed(e) => write!(f, "error: {e}"),
        }
    }
}

#[derive(Debug)]
pub struct TaskReport {
    pub task:    FetchTask,
    pub outcome: TaskOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(url: &str, dest: &str) -> FetchTask {
        FetchTask::new(Url::parse(url).unwrap(), dest)
    }

    #[test]
    fn test_dedup_keeps_first_per_destination() {
        let tasks = vec![
            task("https://example.com/a.css", "/m/a.css"),
            task("https://example.com/./a.css", "/m/a.css"),
            task("https://example.com/b.css", "/m/b.css"),
        ];
        let kept = dedup_by_destination(tasks);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].url.as_str(), "https://example.com/a.css");
        assert_eq!(kept[1].destination, PathBuf::from("/m/b.css"));
    }

    #[test]
    fn test_outcome_display() {
        let outcome = TaskOutcome::Redownloaded {
            digest: Digest::of(b"x"),
            backup: None,
        };
        assert_eq!(outcome.to_string(), "re-downloaded");
        assert!(outcome.is_fetch());
    }
}
