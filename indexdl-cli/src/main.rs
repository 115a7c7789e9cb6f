//! indexdl CLI: bulk download of Nifty 50, Sensex 30 and index price history.
//!
//! Commands:
//! - `download`: fetch indices and constituents, write one CSV per symbol
//! - `constituents`: print the resolved symbol list for each universe
//! - `init-config`: write the default configuration as TOML

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indexdl_core::data::{
    resolve, BulkDownloader, HttpConstituentSource, LogProgress, Resolution, RetryPolicy, Universe,
    YahooProvider,
};
use indexdl_core::domain::DateRange;
use indexdl_core::{DownloadConfig, RunStatistics};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "indexdl",
    about = "indexdl: historical price downloader for Indian indices and their constituents",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file. Flags override values from the file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download index and constituent price history into CSV files.
    Download {
        /// Output directory. Defaults to ./data.
        #[arg(long)]
        base_path: Option<PathBuf>,

        /// Years of history when --start is not given. Defaults to 10.
        #[arg(long)]
        years: Option<u32>,

        /// Start date (YYYY-MM-DD).
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Minimum delay between requests in milliseconds.
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Attempts per symbol before giving up.
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Universes to download (nifty50, sensex30). Repeatable.
        #[arg(long = "universe")]
        universes: Vec<String>,

        /// Skip the market index files.
        #[arg(long, default_value_t = false)]
        no_indices: bool,

        /// Log file path.
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Write the run summary as JSON to this path.
        #[arg(long)]
        summary_json: Option<PathBuf>,

        /// Exit with status 1 if any symbol failed.
        #[arg(long, default_value_t = false)]
        fail_on_error: bool,
    },
    /// Resolve and print constituent lists.
    Constituents {
        /// Universes to resolve. Defaults to all.
        #[arg(long = "universe")]
        universes: Vec<String>,
    },
    /// Write the default configuration file.
    InitConfig {
        /// Destination path.
        #[arg(default_value = "indexdl.toml")]
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DownloadConfig::from_file(path)?,
        None => DownloadConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    match cli.command {
        Commands::Download {
            base_path,
            years,
            start,
            end,
            delay_ms,
            max_attempts,
            universes,
            no_indices,
            log_file,
            summary_json,
            fail_on_error,
        } => {
            if let Some(base_path) = base_path {
                config.base_path = base_path;
            }
            if let Some(years) = years {
                config.years = years;
            }
            if let Some(delay_ms) = delay_ms {
                config.request_delay_ms = delay_ms;
            }
            if let Some(max_attempts) = max_attempts {
                config.retry = RetryPolicy::new(max_attempts, config.retry.backoff);
            }
            if !universes.is_empty() {
                config.universes = parse_universes(&universes)?;
            }
            if no_indices {
                config.include_indices = false;
            }
            if let Some(log_file) = log_file {
                config.logging.file = log_file;
            }
            config.validate()?;

            init_logging(&config.logging.level, Some(config.logging.file.as_path()))?;
            let range = DateRange::from_args(
                start.as_deref(),
                end.as_deref(),
                config.years,
                chrono::Local::now().date_naive(),
            )?;
            run_download(&config, &range, summary_json.as_deref(), fail_on_error)
        }
        Commands::Constituents { universes } => {
            init_logging(&config.logging.level, None)?;
            let universes = if universes.is_empty() {
                Universe::ALL.to_vec()
            } else {
                parse_universes(&universes)?
            };
            run_constituents(&config, &universes)
        }
        Commands::InitConfig { path, force } => run_init_config(&path, force),
    }
}

/// Console output always; file output when a path is given.
fn init_logging(level: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(level)?,
    };

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;
    Ok(())
}

fn level_filter(level: &str) -> Result<EnvFilter> {
    let level = level.trim();
    if level.parse::<tracing::Level>().is_err() {
        bail!("invalid log level '{level}' (expected trace, debug, info, warn or error)");
    }
    EnvFilter::try_new(format!("indexdl={level},indexdl_core={level}"))
        .with_context(|| format!("invalid log level '{level}'"))
}

fn parse_universes(names: &[String]) -> Result<Vec<Universe>> {
    let mut out = Vec::new();
    for name in names.iter().flat_map(|n| n.split(',')) {
        let universe: Universe = name.parse().map_err(anyhow::Error::msg)?;
        if !out.contains(&universe) {
            out.push(universe);
        }
    }
    if out.is_empty() {
        bail!("no universes selected");
    }
    Ok(out)
}

fn constituent_source(config: &DownloadConfig) -> Result<HttpConstituentSource> {
    Ok(HttpConstituentSource::new(
        config.constituents_timeout(),
        &config.http.user_agent,
        config.constituents.url_for(Universe::Nifty50),
        config.constituents.url_for(Universe::Sensex30),
    )?)
}

fn run_download(
    config: &DownloadConfig,
    range: &DateRange,
    summary_json: Option<&Path>,
    fail_on_error: bool,
) -> Result<()> {
    tracing::info!("{}", "=".repeat(70));
    tracing::info!("INDIAN STOCK MARKET DATA DOWNLOADER");
    tracing::info!("{}", "=".repeat(70));
    tracing::info!("Date range: {range}");
    tracing::info!("Data path: {}", absolute_display(&config.base_path));

    let provider = YahooProvider::new(config.http_timeout(), &config.http.user_agent)?;
    let source = constituent_source(config)?;
    let progress = LogProgress;

    let mut downloader =
        BulkDownloader::new(&provider, &source, config.layout(), config.plan(), &progress);
    let stats = downloader.run(range);
    stats.log_summary();
    log_locations(config);

    if let Some(path) = summary_json {
        write_summary(&stats, path)?;
        tracing::info!(path = %path.display(), "wrote run summary");
    }

    if fail_on_error && stats.has_failures() {
        let failed = stats.totals().failed;
        tracing::error!(failed, "download finished with failures");
        std::process::exit(1);
    }

    Ok(())
}

fn log_locations(config: &DownloadConfig) {
    let layout = config.layout();
    tracing::info!("Data location:");
    tracing::info!("  - Indices: {}/", layout.base().display());
    for universe in &config.universes {
        tracing::info!("  - {}: {}/", universe.label(), layout.universe_dir(*universe).display());
    }
}

fn write_summary(stats: &RunStatistics, path: &Path) -> Result<()> {
    let json = stats.to_json().context("failed to serialize run summary")?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn absolute_display(path: &Path) -> String {
    if path.is_absolute() {
        return path.display().to_string();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

fn run_constituents(config: &DownloadConfig, universes: &[Universe]) -> Result<()> {
    let source = constituent_source(config)?;

    for universe in universes {
        let resolution = resolve(*universe, &source);
        let origin = match &resolution {
            Resolution::Resolved(_) => "live",
            Resolution::Fallback(_) => "fallback",
        };
        let symbols = resolution.symbols();
        println!("{} ({} symbols, {origin})", universe.label(), symbols.len());
        println!("{}", "-".repeat(40));
        for chunk in symbols.chunks(5) {
            let row: Vec<String> = chunk.iter().map(|s| format!("{:<16}", s.provider_symbol())).collect();
            println!("{}", row.join("").trim_end());
        }
        println!();
    }

    Ok(())
}

fn run_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (pass --force to overwrite)", path.display());
    }
    let toml = DownloadConfig::default().to_toml()?;
    std::fs::write(path, toml).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
