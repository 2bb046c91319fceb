mod context;
mod daemon;
pub mod locks;
pub mod outcome;
pub mod processor;
pub mod queue;
pub mod retry;
pub mod scan;
pub mod watcher;

#[cfg(test)]
mod testing;

pub use context::WorkerContext;
pub use daemon::run_watch_daemon;
pub use locks::{PathGuard, PathLocks};
pub use outcome::{FailureReason, Outcome, ProcessError};
pub use processor::{FileProcessor, mark_untagged, strip_marker};
pub use queue::{Dispatcher, Job, handle_job, job_queue};
pub use retry::{RetryCoordinator, RetrySummary, StrandedFiles, spawn_retry_loop};
pub use scan::{scan_archives, scan_untagged};
pub use watcher::{Arrival, DirWatcher, accept_arrival, accept_created, watch_directory};
