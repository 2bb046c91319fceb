use std::sync::Arc;

use comicwatch_config::AppConfig;
use comicwatch_exec::Tagger;

use crate::locks::PathLocks;
use crate::processor::FileProcessor;
use crate::retry::StrandedFiles;

/// State shared by every worker that touches archives: the watcher-fed
/// dispatcher and the retry loop.
#[derive(Clone)]
pub struct WorkerContext {
    pub processor: Arc<FileProcessor>,
    pub locks: PathLocks,
    pub stranded: Arc<StrandedFiles>,
}

impl WorkerContext {
    pub fn new(processor: FileProcessor) -> Self {
        Self {
            processor: Arc::new(processor),
            locks: PathLocks::new(),
            stranded: Arc::new(StrandedFiles::default()),
        }
    }

    pub fn from_config(config: &AppConfig, tagger: Arc<dyn Tagger>) -> Self {
        Self::new(FileProcessor::from_config(config, tagger))
    }
}
