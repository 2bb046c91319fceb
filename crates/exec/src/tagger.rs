//! External tagger invocation.
//!
//! The tagger is called twice per archive:
//!
//! 1. **write pass**: online lookup and in-place embedding of both tag
//!    dialects.  Only the exit status matters.
//! 2. **read pass**: dump the embedded metadata.  stdout and stderr are
//!    returned together because the tool interleaves banners, log lines and
//!    the JSON payload across both streams.
//!
//! There is no timeout: a running invocation finishes or the process dies.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use comicwatch_config::TaggerConfig;

/// Longest stderr excerpt kept in a [`TaggerError::Failed`].
const MAX_STDERR: usize = 2000;

#[derive(Debug, Error)]
pub enum TaggerError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

#[async_trait]
pub trait Tagger: Send + Sync {
    /// Look the archive up online and embed the result into it.
    async fn write_tags(&self, archive: &Path) -> Result<(), TaggerError>;

    /// Dump the embedded metadata.  Returns combined stdout and stderr.
    async fn dump_metadata(&self, archive: &Path) -> Result<String, TaggerError>;
}

/// [`Tagger`] backed by a command-line executable.  The archive path is
/// appended after the configured arguments of each pass.
#[derive(Debug, Clone)]
pub struct ComicTaggerCli {
    executable: PathBuf,
    write_args: Vec<String>,
    read_args: Vec<String>,
}

impl ComicTaggerCli {
    pub fn new(
        executable: impl Into<PathBuf>,
        write_args: Vec<String>,
        read_args: Vec<String>,
    ) -> Self {
        Self {
            executable: executable.into(),
            write_args,
            read_args,
        }
    }

    pub fn from_config(config: &TaggerConfig) -> Self {
        Self::new(
            &config.executable,
            config.write_args.clone(),
            config.read_args.clone(),
        )
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn program(&self) -> String {
        self.executable.display().to_string()
    }

    async fn run(&self, args: &[String], archive: &Path) -> Result<Output, TaggerError> {
        debug!(program = %self.program(), ?args, archive = %archive.display(), "invoking tagger");
        tokio::process::Command::new(&self.executable)
            .args(args)
            .arg(archive)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| TaggerError::Spawn {
                program: self.program(),
                source,
            })
    }
}

#[async_trait]
impl Tagger for ComicTaggerCli {
    async fn write_tags(&self, archive: &Path) -> Result<(), TaggerError> {
        let out = self.run(&self.write_args, archive).await?;
        if out.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&out.stderr);
        Err(TaggerError::Failed {
            program: self.program(),
            status: out.status.to_string(),
            stderr: truncate(stderr.trim(), MAX_STDERR).to_string(),
        })
    }

    async fn dump_metadata(&self, archive: &Path) -> Result<String, TaggerError> {
        let out = self.run(&self.read_args, archive).await?;
        if !out.status.success() {
            // The dump may still carry usable JSON; the parser decides.
            warn!(
                program = %self.program(),
                status = %out.status,
                archive = %archive.display(),
                "tagger read pass exited unsuccessfully"
            );
        }

        let stdout = String::from_utf8_lossy(&out.stdout);
        let stderr = String::from_utf8_lossy(&out.stderr);
        Ok(if stderr.is_empty() {
            stdout.to_string()
        } else {
            format!("{stdout}\n{stderr}")
        })
    }
}

/// Cut `text` to at most `limit` bytes on a char boundary.
fn truncate(text: &str, limit: usize) -> &str {
    if limit >= text.len() {
        return text;
    }
    let mut end = limit;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
