//! Shared fixtures for the runtime tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use comicwatch_exec::{Tagger, TaggerError};
use comicwatch_metadata::FixedClock;

use crate::processor::FileProcessor;

/// In-process [`Tagger`] that returns a canned dump.
pub struct FakeTagger {
    fail_write: bool,
    dump: String,
    pub writes: AtomicUsize,
    pub dumps: AtomicUsize,
}

impl FakeTagger {
    pub fn dumping(dump: &str) -> Self {
        Self {
            fail_write: false,
            dump: dump.to_string(),
            writes: AtomicUsize::new(0),
            dumps: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_write: true,
            ..Self::dumping("")
        }
    }

    pub fn calls(&self) -> (usize, usize) {
        (
            self.writes.load(Ordering::SeqCst),
            self.dumps.load(Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl Tagger for FakeTagger {
    async fn write_tags(&self, _archive: &Path) -> Result<(), TaggerError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_write {
            return Err(TaggerError::Failed {
                program: "fake".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "no match".to_string(),
            });
        }
        Ok(())
    }

    async fn dump_metadata(&self, _archive: &Path) -> Result<String, TaggerError> {
        self.dumps.fetch_add(1, Ordering::SeqCst);
        Ok(self.dump.clone())
    }
}

pub const SAGA_DUMP: &str = "Loading settings...\n\
    {\"md\": {\"series\": \"Saga\", \"volume\": 2, \"issue\": \"001\", \"year\": 2013}}\n\
    done";

pub fn processor(tagger: Arc<FakeTagger>) -> FileProcessor {
    FileProcessor::new(tagger, Arc::new(FixedClock(2024)))
}

pub fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, name.as_bytes()).unwrap();
    path
}

pub fn names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
