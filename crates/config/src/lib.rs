use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

// ── Collision policy ──────────────────────────────────────────────────────────

/// What to do when the computed target filename already exists on disk.
///
/// | Policy      | Behaviour                                                    |
/// |-------------|--------------------------------------------------------------|
/// | `skip`      | Leave the source file alone and log a "target exists" outcome.|
/// | `overwrite` | Replace the existing file with the freshly tagged one.        |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    #[default]
    Skip,
    Overwrite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Directory watched for new archives.  Not recursive.
    pub directory: String,
    /// Tracked extension including the leading dot.  Matched case-insensitively.
    pub extension: String,
    /// Seconds to wait before touching a freshly created file, so a writer
    /// that is still flushing it to disk can finish.
    pub settle_delay_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            directory: "./inbox".to_string(),
            extension: ".cbz".to_string(),
            settle_delay_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggerConfig {
    /// Path (or `$PATH` name) of the tagging executable.
    pub executable: String,
    /// Arguments for the write pass: online lookup plus embedding of both tag
    /// dialects.  The archive path is appended after these.
    pub write_args: Vec<String>,
    /// Arguments for the read pass that dumps the embedded metadata as JSON.
    pub read_args: Vec<String>,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            executable: "comictagger".to_string(),
            write_args: ["-s", "-o", "-f", "-t", "cr,cbl"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            read_args: ["-p", "--json"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub interval_secs: u64,
    /// Run one retry cycle as soon as the daemon starts instead of waiting a
    /// full interval for files marked during a previous run.
    pub run_on_startup: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60 * 60,
            run_on_startup: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RenameConfig {
    pub collision_policy: CollisionPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    /// Capacity of the bounded queue between the watcher and the workers.
    pub queue_capacity: usize,
    /// Maximum number of files processed at the same time.  Two jobs for the
    /// same path never run together regardless of this value.
    pub max_concurrent: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            max_concurrent: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
    /// Append-only log file.  Relative paths resolve against the working
    /// directory of the process.
    pub log_file: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: "comicwatch.log".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub watch: WatchConfig,
    pub tagger: TaggerConfig,
    pub retry: RetryConfig,
    pub rename: RenameConfig,
    pub workers: WorkersConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }

        // Env overrides take precedence over the config file.
        if let Ok(value) = env::var("COMICWATCH_DIR") {
            if !value.is_empty() {
                config.watch.directory = value;
            }
        }
        if let Ok(value) = env::var("COMICWATCH_TAGGER") {
            if !value.is_empty() {
                config.tagger.executable = value;
            }
        }
        if let Ok(value) = env::var("COMICWATCH_LOG_FILE") {
            if !value.is_empty() {
                config.telemetry.log_file = value;
            }
        }

        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }

    /// Reject settings that would make the daemon misbehave silently.
    pub fn validate(&self) -> Result<()> {
        if self.watch.directory.trim().is_empty() {
            bail!("watch.directory must not be empty");
        }
        if !self.watch.extension.starts_with('.') || self.watch.extension.len() < 2 {
            bail!(
                "watch.extension must start with '.' (got {:?})",
                self.watch.extension
            );
        }
        if self.tagger.executable.trim().is_empty() {
            bail!("tagger.executable must not be empty");
        }
        if self.retry.interval_secs == 0 {
            bail!("retry.interval_secs must be greater than zero");
        }
        if self.workers.queue_capacity == 0 || self.workers.max_concurrent == 0 {
            bail!("workers.queue_capacity and workers.max_concurrent must be greater than zero");
        }
        Ok(())
    }

    pub fn watch_dir(&self) -> PathBuf {
        PathBuf::from(&self.watch.directory)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.watch.settle_delay_secs)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry.interval_secs)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
