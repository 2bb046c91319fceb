//! Single-archive pipeline: settle, tag, dump, parse, rename.
//!
//! Tagging and parsing failures divert the archive to its untagged name so
//! the retry loop can find it later.  Rename failures are reported as
//! [`Outcome::Failed`] and leave the archive where it is.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use comicwatch_config::{AppConfig, CollisionPolicy};
use comicwatch_exec::Tagger;
use comicwatch_metadata::{Clock, ComicFile, SystemClock, build_target, parse_metadata};

use crate::outcome::{FailureReason, Outcome, ProcessError};

pub struct FileProcessor {
    tagger: Arc<dyn Tagger>,
    clock: Arc<dyn Clock>,
    settle_delay: Duration,
    collision_policy: CollisionPolicy,
}

impl FileProcessor {
    /// No settle delay, skip on collision.
    pub fn new(tagger: Arc<dyn Tagger>, clock: Arc<dyn Clock>) -> Self {
        Self {
            tagger,
            clock,
            settle_delay: Duration::ZERO,
            collision_policy: CollisionPolicy::Skip,
        }
    }

    pub fn from_config(config: &AppConfig, tagger: Arc<dyn Tagger>) -> Self {
        Self::new(tagger, Arc::new(SystemClock))
            .with_settle_delay(config.settle_delay())
            .with_collision_policy(config.rename.collision_policy)
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    /// Wait out the settle delay, then run [`Self::process_now`].
    pub async fn process(&self, file: &ComicFile) -> Outcome {
        if !self.settle_delay.is_zero() {
            debug!(file = %file.file_name(), delay = ?self.settle_delay, "waiting for archive to settle");
            tokio::time::sleep(self.settle_delay).await;
        }
        self.process_now(file).await
    }

    /// Run the pipeline on an archive that is known to be complete.  Never
    /// returns an error: every failure is folded into the [`Outcome`].
    pub async fn process_now(&self, file: &ComicFile) -> Outcome {
        let outcome = match self.tag_and_rename(file).await {
            Ok(outcome) => outcome,
            Err(err) => self.divert(file, err).await,
        };

        let name = file.file_name();
        match &outcome {
            Outcome::Renamed(target) => info!(file = %name, %target, "archive renamed"),
            Outcome::SkippedExists(target) => {
                info!(file = %name, %target, "target name taken; archive left in place")
            }
            Outcome::MarkedUntagged(reason) => {
                warn!(file = %name, %reason, "archive marked untagged")
            }
            Outcome::Failed(reason) => error!(file = %name, %reason, "archive processing failed"),
        }
        outcome
    }

    async fn tag_and_rename(&self, file: &ComicFile) -> Result<Outcome, ProcessError> {
        self.tagger.write_tags(file.path()).await?;
        let raw = self.tagger.dump_metadata(file.path()).await?;
        let record = parse_metadata(&raw, self.clock.as_ref())?;

        let target = build_target(&record, file.extension());
        let target_path = file.dir().join(target.as_str());

        if target_path == file.path() {
            debug!(file = %file.file_name(), "archive already carries its target name");
            return Ok(Outcome::Renamed(target.into_string()));
        }
        if self.collision_policy == CollisionPolicy::Skip && path_taken(&target_path).await {
            return Ok(Outcome::SkippedExists(target.into_string()));
        }

        match rename(file.path(), &target_path).await {
            Ok(()) => Ok(Outcome::Renamed(target.into_string())),
            Err(err) => {
                error!(%err, "final rename failed");
                Ok(Outcome::Failed(FailureReason::RenameFailed))
            }
        }
    }

    async fn divert(&self, file: &ComicFile, err: ProcessError) -> Outcome {
        let reason = err.reason();
        warn!(file = %file.file_name(), %reason, error = %err, "tagging failed");

        match mark_untagged(file).await {
            Ok(_) => Outcome::MarkedUntagged(reason),
            Err(mark_err) => {
                error!(
                    file = %file.file_name(),
                    %reason,
                    error = %mark_err,
                    "could not apply untagged marker"
                );
                Outcome::Failed(FailureReason::RenameFailed)
            }
        }
    }
}

// ── Marker transitions ─────────────────────────────────────────────────────

/// Move the archive to its marked name and return that path.  An archive
/// that already carries the marker is left alone.  An existing file at the
/// marked name is never replaced.
pub async fn mark_untagged(file: &ComicFile) -> Result<PathBuf, ProcessError> {
    if file.is_untagged() {
        return Ok(file.path().to_path_buf());
    }
    let marked = file.marked_path();
    if path_taken(&marked).await {
        return Err(ProcessError::Occupied(marked));
    }
    rename(file.path(), &marked).await?;
    Ok(marked)
}

/// Move the archive back to its bare name.  Fails without touching anything
/// when the bare name is already taken.
pub async fn strip_marker(file: &ComicFile) -> Result<ComicFile, ProcessError> {
    if !file.is_untagged() {
        return Ok(file.clone());
    }
    let bare = file.unmarked();
    if path_taken(bare.path()).await {
        return Err(ProcessError::Occupied(bare.path().to_path_buf()));
    }
    rename(file.path(), bare.path()).await?;
    Ok(bare)
}

async fn rename(from: &Path, to: &Path) -> Result<(), ProcessError> {
    tokio::fs::rename(from, to)
        .await
        .map_err(|source| ProcessError::Rename {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        })
}

/// Treats an unanswerable existence check as taken.
pub(crate) async fn path_taken(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(true)
}
