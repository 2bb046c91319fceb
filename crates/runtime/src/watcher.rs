//! Filesystem notifications for the watched directory.
//!
//! Creations and rename destinations are forwarded, so archives moved in
//! from elsewhere on the same filesystem are picked up.  A rename destination
//! that already follows the target template is the daemon's own output and
//! is never re-queued; marked names are skipped for both kinds.  Whether the
//! path still exists is decided later, under the path lock.

use std::path::Path;

use anyhow::{Context, Result};
use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use comicwatch_metadata::{ComicFile, FilenameParts};

use crate::queue::Job;

/// Keeps the OS watch alive.  Dropping it stops delivery and releases the
/// queue sender it owns.
pub struct DirWatcher {
    _watcher: RecommendedWatcher,
}

/// Watch `dir` (non-recursively) and push a [`Job`] for every archive that
/// appears in it with a matching extension and no untagged marker.
///
/// The notify callback runs on notify's own thread, so a full queue blocks
/// that thread rather than dropping events.
pub fn watch_directory(dir: &Path, extension: &str, tx: mpsc::Sender<Job>) -> Result<DirWatcher> {
    let extension = extension.to_string();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            let Some(arrival) = Arrival::of(&event.kind) else {
                return;
            };
            for path in event.paths {
                let Some(file) = accept_arrival(&path, &extension, arrival) else {
                    debug!(path = %path.display(), ?arrival, "ignoring path");
                    continue;
                };
                info!(file = %file.file_name(), ?arrival, "new archive detected");
                if tx.blocking_send(Job::new(path)).is_err() {
                    warn!(file = %file.file_name(), "work queue closed; event dropped");
                }
            }
        }
        Err(err) => warn!(?err, "directory watcher error"),
    })
    .context("failed to create directory watcher")?;

    watcher
        .watch(dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", dir.display()))?;

    Ok(DirWatcher { _watcher: watcher })
}

/// How a path showed up in the watched directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    Created,
    MovedIn,
}

impl Arrival {
    fn of(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(CreateKind::File | CreateKind::Any | CreateKind::Other) => {
                Some(Self::Created)
            }
            // FSEvents reports both ends of a rename as `Any`.
            EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Any)) => {
                Some(Self::MovedIn)
            }
            _ => None,
        }
    }
}

/// Whether a freshly created path should be queued.
pub fn accept_created(path: &Path, extension: &str) -> Option<ComicFile> {
    let file = ComicFile::from_path(path)?;
    (file.matches_extension(extension) && !file.is_untagged()).then_some(file)
}

/// [`accept_created`], plus: a rename destination already in the target
/// template is a finished archive, not new work.
pub fn accept_arrival(path: &Path, extension: &str, arrival: Arrival) -> Option<ComicFile> {
    let file = accept_created(path, extension)?;
    match arrival {
        Arrival::MovedIn if FilenameParts::parse(&file.file_name()).is_some() => None,
        _ => Some(file),
    }
}
