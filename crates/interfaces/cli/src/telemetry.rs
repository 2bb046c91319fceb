use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use comicwatch_config::TelemetryConfig;

/// Install the global subscriber.  `RUST_LOG` wins over the configured
/// level.  With `to_file` set and a non-empty `log_file`, events are also
/// appended to that file; keep the returned guard alive until exit or the
/// tail of the log is lost.
pub fn init(config: &TelemetryConfig, to_file: bool) -> Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .with_context(|| format!("invalid log level {:?}", config.log_level))?,
    };

    let (file_layer, guard) = if to_file && !config.log_file.trim().is_empty() {
        let (writer, guard) = tracing_appender::non_blocking(open_log_file(&config.log_file)?);
        let layer = fmt::layer().with_ansi(false).with_writer(writer);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}

fn open_log_file(path: &str) -> Result<RollingFileAppender> {
    let path = Path::new(path);
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .with_context(|| format!("log file {} has no file name", path.display()))?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(dir)
        .with_context(|| format!("failed to open log file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn log_file_is_created_in_nested_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("comicwatch.log");

        open_log_file(&path.display().to_string()).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn log_file_needs_a_name() {
        assert!(open_log_file("/").is_err());
    }
}
