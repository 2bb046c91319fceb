use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use comicwatch_config::AppConfig;
use comicwatch_exec::ComicTaggerCli;
use comicwatch_metadata::{
    ComicFile, FilenameParts, MetadataRecord, SystemClock, TargetFilename, build_target,
    parse_metadata,
};
use comicwatch_runtime::{
    FileProcessor, RetryCoordinator, WorkerContext, run_watch_daemon, scan_archives,
};

pub async fn watch(config: AppConfig) -> Result<()> {
    config.validate()?;
    let tagger = Arc::new(ComicTaggerCli::from_config(&config.tagger));
    run_watch_daemon(config, tagger).await
}

pub async fn process(config: &AppConfig, path: &Path) -> Result<()> {
    config.validate()?;
    let Some(file) = ComicFile::from_path(path) else {
        bail!("{} has no usable file name", path.display());
    };
    if !file.path().is_file() {
        bail!("{} is not a file", path.display());
    }

    let tagger = Arc::new(ComicTaggerCli::from_config(&config.tagger));
    let outcome = FileProcessor::from_config(config, tagger)
        .process_now(&file)
        .await;

    if !outcome.is_success() {
        bail!("{}: {outcome}", file.file_name());
    }
    println!("{}: {outcome}", file.file_name());
    Ok(())
}

pub async fn retry(config: &AppConfig) -> Result<()> {
    config.validate()?;
    let tagger = Arc::new(ComicTaggerCli::from_config(&config.tagger));
    let ctx = WorkerContext::from_config(config, tagger);
    let coordinator = RetryCoordinator::from_config(config, ctx);

    let summary = coordinator
        .run_cycle()
        .await
        .with_context(|| format!("cannot scan {}", coordinator.dir().display()))?;

    println!("── retry cycle ───────────────────────────────────────");
    println!("  attempted      : {}", summary.attempted);
    println!("  recovered      : {}", summary.recovered);
    println!("  still untagged : {}", summary.still_untagged);
    println!("  stranded       : {}", summary.stranded);
    Ok(())
}

/// Read saved tagger output from `source` (stdin when absent) and show what
/// the daemon would make of it.
pub fn parse(source: Option<&Path>, extension: &str) -> Result<()> {
    let raw = match source {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?,
        None => {
            let mut raw = String::new();
            io::stdin().read_to_string(&mut raw)?;
            raw
        }
    };

    let (record, target) = extract(&raw, extension)?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    println!("{target}");
    Ok(())
}

fn extract(raw: &str, extension: &str) -> Result<(MetadataRecord, TargetFilename)> {
    let record = parse_metadata(raw, &SystemClock)?;
    let target = build_target(&record, extension);
    Ok((record, target))
}

// ── status ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    Tagged,
    Untagged,
    Pending,
}

fn classify(file: &ComicFile) -> Group {
    if file.is_untagged() {
        Group::Untagged
    } else if FilenameParts::parse(&file.file_name()).is_some() {
        Group::Tagged
    } else {
        Group::Pending
    }
}

pub async fn status(config: &AppConfig) -> Result<()> {
    let dir = config.watch_dir();
    let files = scan_archives(&dir, &config.watch.extension)
        .await
        .with_context(|| format!("cannot scan {}", dir.display()))?;

    println!("watching {} for *{}", dir.display(), config.watch.extension);
    for (group, title) in [
        (Group::Tagged, "tagged"),
        (Group::Untagged, "untagged"),
        (Group::Pending, "pending"),
    ] {
        let names: Vec<String> = files
            .iter()
            .filter(|file| classify(file) == group)
            .map(ComicFile::file_name)
            .collect();
        println!();
        println!("── {title} ({}) ──────────────────────────────────────", names.len());
        for name in names {
            println!("  {name}");
        }
    }
    Ok(())
}

pub fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (pass --force to overwrite)",
            path.display()
        );
    }
    AppConfig::default().save_to(path)?;
    println!("wrote default configuration to {}", path.display());
    Ok(())
}
