//! Bounded work queue between the directory watcher and the processors.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use comicwatch_metadata::ComicFile;

use crate::context::WorkerContext;
use crate::outcome::Outcome;
use crate::processor::path_taken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub path: PathBuf,
}

impl Job {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

pub fn job_queue(capacity: usize) -> (mpsc::Sender<Job>, mpsc::Receiver<Job>) {
    mpsc::channel(capacity.max(1))
}

/// Pulls jobs off the queue and runs each on its own task, at most
/// `max_concurrent` at a time.
pub struct Dispatcher {
    ctx: WorkerContext,
    limit: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(ctx: WorkerContext, max_concurrent: usize) -> Self {
        Self {
            ctx,
            limit: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Runs until every sender is gone or shutdown is signalled.  On shutdown
    /// jobs already queued are still processed; nothing new is accepted.
    pub async fn run(self, mut rx: mpsc::Receiver<Job>, mut shutdown_rx: watch::Receiver<bool>) {
        let mut tasks = JoinSet::new();
        let mut closing = false;

        loop {
            let job = tokio::select! {
                job = rx.recv() => job,
                changed = shutdown_rx.changed(), if !closing => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        debug!("dispatcher draining queue");
                        closing = true;
                        rx.close();
                    }
                    continue;
                }
            };
            let Some(job) = job else { break };

            let Ok(permit) = self.limit.clone().acquire_owned().await else {
                break;
            };
            let ctx = self.ctx.clone();
            tasks.spawn(async move {
                let _permit = permit;
                handle_job(&ctx, job).await
            });

            while let Some(joined) = tasks.try_join_next() {
                if let Err(err) = joined {
                    error!(?err, "worker task panicked");
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                error!(?err, "worker task panicked");
            }
        }
        info!("dispatcher stopped");
    }
}

/// Process one queued archive under its path lock.  `None` when the archive
/// was gone or unusable by the time its turn came.
pub async fn handle_job(ctx: &WorkerContext, job: Job) -> Option<Outcome> {
    let Some(file) = ComicFile::from_path(&job.path) else {
        debug!(path = %job.path.display(), "ignoring path without a usable file name");
        return None;
    };

    let _guard = ctx.locks.acquire_for(&file).await;
    if !path_taken(file.path()).await {
        debug!(file = %file.file_name(), "archive moved before processing");
        return None;
    }

    let outcome = ctx.processor.process(&file).await;
    ctx.stranded.record(&file, &outcome);
    Some(outcome)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::outcome::FailureReason;
    use crate::testing::{FakeTagger, SAGA_DUMP, names, processor, touch};

    #[tokio::test]
    async fn queued_jobs_are_processed() {
        let dir = TempDir::new().unwrap();
        let a = touch(dir.path(), "a.cbz");
        let b = touch(dir.path(), "b.cbz");
        let ctx = WorkerContext::new(processor(Arc::new(FakeTagger::failing())));
        let (tx, rx) = job_queue(4);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        tx.send(Job::new(a)).await.unwrap();
        tx.send(Job::new(b)).await.unwrap();
        drop(tx);
        Dispatcher::new(ctx, 2).run(rx, shutdown_rx).await;

        assert_eq!(
            names(dir.path()),
            vec!["a [untagged].cbz", "b [untagged].cbz"]
        );
    }

    #[tokio::test]
    async fn shutdown_drains_queued_jobs() {
        let dir = TempDir::new().unwrap();
        let path = touch(dir.path(), "Saga 001.cbz");
        let ctx = WorkerContext::new(processor(Arc::new(FakeTagger::dumping(SAGA_DUMP))));
        let (tx, rx) = job_queue(4);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tx.send(Job::new(path)).await.unwrap();
        shutdown_tx.send(true).unwrap();
        // `tx` stays alive: shutdown alone must end the run.
        let run = Dispatcher::new(ctx, 1).run(rx, shutdown_rx);
        tokio::time::timeout(Duration::from_secs(2), run)
            .await
            .unwrap();

        assert_eq!(names(dir.path()), vec!["Saga Vol.2 #1 (2013).cbz"]);
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn missing_archive_is_not_processed() {
        let dir = TempDir::new().unwrap();
        let tagger = Arc::new(FakeTagger::dumping(SAGA_DUMP));
        let ctx = WorkerContext::new(processor(tagger.clone()));

        let outcome = handle_job(&ctx, Job::new(dir.path().join("gone.cbz"))).await;

        assert!(outcome.is_none());
        assert_eq!(tagger.calls(), (0, 0));
    }

    #[tokio::test]
    async fn failed_outcome_is_stranded() {
        let dir = TempDir::new().unwrap();
        let path = touch(dir.path(), "scan.cbz");
        touch(dir.path(), "scan [untagged].cbz");
        let ctx = WorkerContext::new(processor(Arc::new(FakeTagger::failing())));

        let outcome = handle_job(&ctx, Job::new(&path)).await;

        assert_eq!(outcome, Some(Outcome::Failed(FailureReason::RenameFailed)));
        assert_eq!(ctx.stranded.drain(), vec![path]);
    }
}
