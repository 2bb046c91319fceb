use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::sync::watch;
use tracing::{info, warn};

use comicwatch_config::AppConfig;
use comicwatch_exec::Tagger;

use crate::context::WorkerContext;
use crate::queue::{Dispatcher, job_queue};
use crate::retry::{RetryCoordinator, spawn_retry_loop};
use crate::watcher::watch_directory;

/// Watch the configured directory until Ctrl-C.
///
/// A missing or unreadable directory is fatal at startup.  On shutdown the
/// watcher stops first, then queued archives are finished and the retry loop
/// is allowed to complete any cycle in flight.
pub async fn run_watch_daemon(config: AppConfig, tagger: Arc<dyn Tagger>) -> Result<()> {
    let dir = config.watch_dir();
    let meta = tokio::fs::metadata(&dir)
        .await
        .with_context(|| format!("watched directory {} is not accessible", dir.display()))?;
    if !meta.is_dir() {
        bail!("watched path {} is not a directory", dir.display());
    }

    let ctx = WorkerContext::from_config(&config, tagger);
    let (shutdown_tx, _) = watch::channel(false);

    let (tx, rx) = job_queue(config.workers.queue_capacity);
    let dispatcher = Dispatcher::new(ctx.clone(), config.workers.max_concurrent);
    let dispatch_handle = tokio::spawn(dispatcher.run(rx, shutdown_tx.subscribe()));

    let watcher = watch_directory(&dir, &config.watch.extension, tx)?;

    let retry = Arc::new(RetryCoordinator::from_config(&config, ctx));
    let retry_handle = spawn_retry_loop(
        retry,
        config.retry_interval(),
        config.retry.run_on_startup,
        shutdown_tx.subscribe(),
    );

    info!(
        dir = %dir.display(),
        extension = %config.watch.extension,
        retry_interval_secs = config.retry.interval_secs,
        "watching for new archives"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown requested");

    drop(watcher);
    let _ = shutdown_tx.send(true);

    if let Err(err) = dispatch_handle.await {
        warn!(?err, "dispatcher task failed");
    }
    if let Err(err) = retry_handle.await {
        warn!(?err, "retry task failed");
    }
    info!("comicwatch stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::testing::FakeTagger;

    #[tokio::test]
    async fn missing_directory_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.watch.directory = dir.path().join("absent").display().to_string();

        let err = run_watch_daemon(config, Arc::new(FakeTagger::failing()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not accessible"), "{err}");
    }

    #[tokio::test]
    async fn file_instead_of_directory_is_fatal() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("inbox");
        std::fs::write(&file, b"").unwrap();
        let mut config = AppConfig::default();
        config.watch.directory = file.display().to_string();

        let err = run_watch_daemon(config, Arc::new(FakeTagger::failing()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a directory"), "{err}");
    }
}
