//! Per-archive exclusion shared by the dispatcher and the retry loop.
//!
//! Keys are bare paths, so `x.cbz` and `x [untagged].cbz` contend for the
//! same lock.  Entries are held weakly and pruned once no guard is alive.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use comicwatch_metadata::ComicFile;

#[derive(Clone, Default)]
pub struct PathLocks {
    inner: Arc<Mutex<HashMap<PathBuf, Weak<AsyncMutex<()>>>>>,
}

/// Held for as long as the archive is being worked on.
pub struct PathGuard {
    _guard: OwnedMutexGuard<()>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &Path) -> PathGuard {
        let lock = self.entry(key);
        PathGuard {
            _guard: lock.lock_owned().await,
        }
    }

    pub async fn acquire_for(&self, file: &ComicFile) -> PathGuard {
        self.acquire(&file.bare_path()).await
    }

    /// Number of keys with a live lock.
    pub fn active(&self) -> usize {
        let mut map = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.retain(|_, weak| weak.strong_count() > 0);
        map.len()
    }

    fn entry(&self, key: &Path) -> Arc<AsyncMutex<()>> {
        let mut map = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.retain(|_, weak| weak.strong_count() > 0);
        if let Some(lock) = map.get(key).and_then(Weak::upgrade) {
            return lock;
        }
        let lock = Arc::new(AsyncMutex::new(()));
        map.insert(key.to_path_buf(), Arc::downgrade(&lock));
        lock
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn marked_and_bare_names_share_a_lock() {
        let locks = PathLocks::new();
        let bare = ComicFile::from_path("/in/x.cbz").unwrap();
        let marked = ComicFile::from_path("/in/x [untagged].cbz").unwrap();

        let _held = locks.acquire_for(&bare).await;
        let second =
            tokio::time::timeout(Duration::from_millis(50), locks.acquire_for(&marked)).await;
        assert!(second.is_err(), "marked name should wait on the bare lock");
    }

    #[tokio::test]
    async fn distinct_archives_do_not_contend() {
        let locks = PathLocks::new();
        let _a = locks.acquire(Path::new("/in/a.cbz")).await;
        let b = tokio::time::timeout(
            Duration::from_millis(50),
            locks.acquire(Path::new("/in/b.cbz")),
        )
        .await;
        assert!(b.is_ok());
        assert_eq!(locks.active(), 2);
    }

    #[tokio::test]
    async fn released_locks_are_pruned() {
        let locks = PathLocks::new();
        {
            let _guard = locks.acquire(Path::new("/in/a.cbz")).await;
            assert_eq!(locks.active(), 1);
        }
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn holders_run_one_at_a_time() {
        let locks = PathLocks::new();
        let inside = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            tasks.push(tokio::spawn(async move {
                let _guard = locks.acquire(Path::new("/in/same.cbz")).await;
                let before = inside.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                assert_eq!(before, 0);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
    }
}
