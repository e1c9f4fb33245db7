use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use eonix::ExtractionPipeline;
use eonix_core::config::{Config, CONFIG_FILE};
use eonix_core::detector::LanguageDetector;
use eonix_core::scanner::RepositoryScanner;
use eonix_report::{json, text};

/// Environment variable holding a tracing filter (e.g. `eonix_core=debug`).
const LOG_ENV: &str = "EONIX_LOG";

#[derive(Parser)]
#[command(name = "eonix")]
#[command(about = "Extract endpoints, data models and infrastructure dependencies from a repository")]
#[command(version)]
struct Cli {
    /// Log progress to stderr (overridden by EONIX_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan, detect and extract architecture facts from a repository
    Analyze {
        /// Path to the repository root
        path: PathBuf,
        /// Config file path (defaults to .eonix.toml in the repository or a parent)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Single-line JSON
        #[arg(long)]
        compact: bool,
        /// Reuse cached results for unchanged files
        #[arg(long)]
        incremental: bool,
        /// Extraction worker threads (0 = one per CPU)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Detect languages, frameworks and architecture shape
    Detect {
        /// Path to the repository root
        path: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },
    /// List the files that would be extracted
    Scan {
        /// Path to the repository root
        path: PathBuf,
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },
    /// Create a default .eonix.toml configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Analyze {
            path,
            config,
            format,
            compact,
            incremental,
            workers,
        } => cmd_analyze(
            &path,
            config.as_deref(),
            format,
            compact,
            incremental,
            workers,
        ),
        Commands::Detect {
            path,
            format,
            compact,
        } => cmd_detect(&path, format, compact),
        Commands::Scan {
            path,
            config,
            format,
            compact,
        } => cmd_scan(&path, config.as_deref(), format, compact),
        Commands::Init { force } => cmd_init(force),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(2);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
    {
        tracing::debug!(error = %e, "keeping the already installed tracing subscriber");
    }
}

fn cmd_analyze(
    path: &Path,
    config_path: Option<&Path>,
    format: OutputFormat,
    compact: bool,
    incremental: bool,
    workers: Option<usize>,
) -> Result<()> {
    let mut config = load_config(path, config_path)?;
    if incremental {
        config.pipeline.incremental = true;
    }
    if let Some(workers) = workers {
        config.pipeline.workers = workers;
    }

    let pipeline = ExtractionPipeline::new(config)?;
    let analysis = pipeline.analyze(path)?;
    match format {
        OutputFormat::Text => print!("{}", text::format_analysis(&analysis)),
        OutputFormat::Json => println!("{}", json::format_analysis(&analysis, compact)?),
    }
    Ok(())
}

fn cmd_detect(path: &Path, format: OutputFormat, compact: bool) -> Result<()> {
    ensure_dir(path)?;
    let config = Config::load_or_default(path);
    let mut scanner = RepositoryScanner::new(&config.scan);
    scanner.load_ignore_file(path);
    let detection =
        LanguageDetector::with_rules(path, &config.detector, scanner.rules().clone()).detect();
    match format {
        OutputFormat::Text => print!("{}", text::format_detection(&detection)),
        OutputFormat::Json => println!("{}", json::format_detection(&detection, compact)?),
    }
    Ok(())
}

fn cmd_scan(
    path: &Path,
    config_path: Option<&Path>,
    format: OutputFormat,
    compact: bool,
) -> Result<()> {
    ensure_dir(path)?;
    let config = load_config(path, config_path)?;
    let mut scanner = RepositoryScanner::new(&config.scan);
    scanner.load_ignore_file(path);
    let files = scanner.scan(path);
    let statistics = scanner.into_statistics();
    match format {
        OutputFormat::Text => print!("{}", text::format_scan(&files, &statistics)),
        OutputFormat::Json => println!("{}", json::format_scan(&files, &statistics, compact)?),
    }
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let target = PathBuf::from(CONFIG_FILE);
    if target.exists() && !force {
        anyhow::bail!("{CONFIG_FILE} already exists. Use --force to overwrite.");
    }
    std::fs::write(&target, Config::default_toml())
        .with_context(|| format!("failed to write {CONFIG_FILE}"))?;
    println!("Created {CONFIG_FILE} with default configuration.");
    Ok(())
}

fn ensure_dir(path: &Path) -> Result<()> {
    if !path.is_dir() {
        anyhow::bail!("{} is not a directory", path.display());
    }
    Ok(())
}

fn load_config(project_path: &Path, config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(p) => Config::load(p),
        None => Ok(Config::load_or_default(project_path)),
    }
}
