//! Periodic re-processing of archives that carry the untagged marker.
//!
//! Each marked archive is stripped back to its bare name, run through the
//! processor again and re-marked if that fails.  An archive whose marker
//! cannot be put back is remembered in [`StrandedFiles`] so the next cycle
//! picks it up even though its name no longer says so.

use std::collections::{BTreeSet, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use comicwatch_config::AppConfig;
use comicwatch_metadata::ComicFile;

use crate::context::WorkerContext;
use crate::outcome::Outcome;
use crate::processor::{mark_untagged, path_taken, strip_marker};
use crate::scan::scan_untagged;

// ── Stranded set ───────────────────────────────────────────────────────────

/// Archives whose last attempt ended in [`Outcome::Failed`] and that may not
/// carry the marker.
#[derive(Debug, Default)]
pub struct StrandedFiles {
    paths: Mutex<BTreeSet<PathBuf>>,
}

impl StrandedFiles {
    fn paths(&self) -> MutexGuard<'_, BTreeSet<PathBuf>> {
        self.paths
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(&self, path: impl Into<PathBuf>) {
        self.paths().insert(path.into());
    }

    /// Track or forget `file` depending on how its attempt ended.
    pub fn record(&self, file: &ComicFile, outcome: &Outcome) {
        if matches!(outcome, Outcome::Failed(_)) {
            self.insert(file.path());
        } else {
            self.paths().remove(file.path());
        }
    }

    pub fn drain(&self) -> Vec<PathBuf> {
        std::mem::take(&mut *self.paths()).into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.paths().len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths().is_empty()
    }
}

// ── Coordinator ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetrySummary {
    pub attempted: usize,
    pub recovered: usize,
    pub still_untagged: usize,
    pub stranded: usize,
}

pub struct RetryCoordinator {
    dir: PathBuf,
    extension: String,
    ctx: WorkerContext,
}

impl RetryCoordinator {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>, ctx: WorkerContext) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
            ctx,
        }
    }

    pub fn from_config(config: &AppConfig, ctx: WorkerContext) -> Self {
        Self::new(config.watch_dir(), config.watch.extension.clone(), ctx)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// One pass over the marked archives plus anything stranded earlier.
    /// Only an unreadable directory fails the cycle; per-archive problems are
    /// logged and counted.
    pub async fn run_cycle(&self) -> io::Result<RetrySummary> {
        let marked = scan_untagged(&self.dir, &self.extension).await?;
        let stranded = self.ctx.stranded.drain();
        debug!(marked = marked.len(), stranded = stranded.len(), "retry cycle starting");

        let mut summary = RetrySummary::default();
        let mut seen = HashSet::new();
        for file in marked {
            seen.insert(file.bare_path());
            self.attempt(&file, &mut summary).await;
        }
        for file in stranded.into_iter().filter_map(ComicFile::from_path) {
            if seen.contains(&file.bare_path()) {
                // A marked twin holds the name this cycle.
                self.ctx.stranded.insert(file.path());
                continue;
            }
            seen.insert(file.bare_path());
            self.attempt(&file, &mut summary).await;
        }

        summary.still_untagged = scan_untagged(&self.dir, &self.extension).await?.len();
        summary.stranded = self.ctx.stranded.len();
        info!(
            attempted = summary.attempted,
            recovered = summary.recovered,
            still_untagged = summary.still_untagged,
            stranded = summary.stranded,
            "retry cycle complete"
        );
        Ok(summary)
    }

    async fn attempt(&self, file: &ComicFile, summary: &mut RetrySummary) {
        if let Some(outcome) = self.retry_file(file).await {
            summary.attempted += 1;
            if outcome.is_success() {
                summary.recovered += 1;
            }
        }
    }

    /// `None` when the archive was not attempted this cycle.
    async fn retry_file(&self, file: &ComicFile) -> Option<Outcome> {
        let _guard = self.ctx.locks.acquire_for(file).await;

        if !path_taken(file.path()).await {
            debug!(file = %file.file_name(), "archive gone before retry");
            return None;
        }

        let bare = match strip_marker(file).await {
            Ok(bare) => bare,
            Err(err) => {
                warn!(
                    file = %file.file_name(),
                    error = %err,
                    "cannot strip untagged marker; leaving for next cycle"
                );
                return None;
            }
        };

        let outcome = self.ctx.processor.process_now(&bare).await;
        match &outcome {
            Outcome::Failed(reason) => {
                // Rename failures leave the archive bare; put the marker back.
                if let Err(err) = mark_untagged(&bare).await {
                    error!(
                        file = %bare.file_name(),
                        %reason,
                        error = %err,
                        "archive left without untagged marker"
                    );
                    self.ctx.stranded.insert(bare.path());
                }
            }
            Outcome::SkippedExists(target) => warn!(
                file = %bare.file_name(),
                %target,
                "target name taken; archive left under its bare name and no longer retried"
            ),
            _ => {}
        }
        Some(outcome)
    }
}

/// Run [`RetryCoordinator::run_cycle`] every `interval` until `shutdown_rx`
/// flips to `true`.
pub fn spawn_retry_loop(
    coordinator: Arc<RetryCoordinator>,
    interval: Duration,
    run_on_startup: bool,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if run_on_startup {
            run_logged(&coordinator).await;
        }
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => run_logged(&coordinator).await,
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("retry loop stopped");
    })
}

async fn run_logged(coordinator: &RetryCoordinator) {
    if let Err(err) = coordinator.run_cycle().await {
        warn!(?err, dir = %coordinator.dir().display(), "retry cycle failed");
    }
}
