mod commands;
mod telemetry;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use comicwatch_config::AppConfig;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Parser)]
#[command(
    name = "comicwatch",
    version,
    about = "Watch a folder, tag new comic archives and rename them from their metadata"
)]
struct Cli {
    /// Configuration file.  Missing files fall back to built-in defaults.
    #[arg(long, global = true, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Watched directory.  Overrides the config file and COMICWATCH_DIR.
    #[arg(long, global = true, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Log filter such as `info` or `comicwatch_runtime=debug`.  RUST_LOG
    /// still takes precedence.
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the watcher daemon until Ctrl-C (default).
    Watch,
    /// Tag and rename a single archive, then exit.
    Process {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Run one retry cycle over untagged archives, then exit.
    Retry,
    /// Extract metadata from saved tagger output (stdin when FILE is omitted).
    Parse {
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
        /// Extension used for the printed target name.
        #[arg(long, default_value = ".cbz")]
        ext: String,
    },
    /// List archives in the watched directory by tag state.
    Status,
    /// Write the default configuration file.
    InitConfig {
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = AppConfig::load_from(&cli.config)?;
    if let Some(dir) = &cli.dir {
        config.watch.directory = dir.display().to_string();
    }
    if let Some(level) = &cli.log_level {
        config.telemetry.log_level = level.clone();
    }

    let command = cli.command.unwrap_or(Commands::Watch);
    let to_file = matches!(
        command,
        Commands::Watch | Commands::Process { .. } | Commands::Retry
    );
    let _log_guard = telemetry::init(&config.telemetry, to_file)?;

    match command {
        Commands::Watch => commands::watch(config).await?,
        Commands::Process { file } => commands::process(&config, &file).await?,
        Commands::Retry => commands::retry(&config).await?,
        Commands::Parse { file, ext } => commands::parse(file.as_deref(), &ext)?,
        Commands::Status => commands::status(&config).await?,
        Commands::InitConfig { force } => commands::init_config(&cli.config, force)?,
    }

    Ok(())
}
