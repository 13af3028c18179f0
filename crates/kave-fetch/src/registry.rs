use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use kave_verify::Digest;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Local paths confirmed or freshly written with a known-good digest.
///
/// Scoped to one sync run. Writers must hold [`lock_path`](Self::lock_path)
/// for a destination across check, write and [`record`](Self::record), which
/// makes the registry an at-most-once-write guard per path.
#[derive(Debug, Default)]
pub struct VerifiedRegistry {
    verified: Mutex<HashMap<PathBuf, Digest>>,
    locks:    Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl VerifiedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, path: impl Into<PathBuf>, digest: Digest) {
        self.verified
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), digest);
    }

    pub fn get(&self, path: &Path) -> Option<Digest> {
        self.verified
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.verified
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.verified.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Exclusive access to `path` for the check-then-write sequence.
    pub async fn lock_path(&self, path: &Path) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(path.to_path_buf()).or_default())
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_record_and_get() {
        let registry = VerifiedRegistry::new();
        let digest = Digest::of(b"a");
        registry.record("/mirror/a.txt", digest.clone());

        assert_eq!(registry.get(Path::new("/mirror/a.txt")), Some(digest));
        assert!(!registry.contains(Path::new("/mirror/b.txt")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_record_overwrites() {
        let registry = VerifiedRegistry::new();
        registry.record("/m/a", Digest::of(b"old"));
        registry.record("/m/a", Digest::of(b"new"));
        assert_eq!(registry.get(Path::new("/m/a")), Some(Digest::of(b"new")));
    }

    #[tokio::test]
    async fn test_lock_path_is_exclusive() {
        let registry = Arc::new(VerifiedRegistry::new());
        let guard = registry.lock_path(Path::new("/m/a")).await;

        let contender = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let _guard = registry.lock_path(Path::new("/m/a")).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_distinct_paths_do_not_block() {
        let registry = VerifiedRegistry::new();
        let _a = registry.lock_path(Path::new("/m/a")).await;
        let _b = registry.lock_path(Path::new("/m/b")).await;
    }
}
