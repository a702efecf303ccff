//! Tidemark main entry point
//!
//! This is the command-line interface for the Tidemark site crawler.

use anyhow::Context;
use clap::Parser;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tidemark::config::{load_config_with_hash, Config};
use tidemark::crawler::{crawl, spawn_signal_listener, CrawlOutcome, StopReason};
use tidemark::output::{load_statistics, print_inventory, print_statistics};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Tidemark: a bounded, resumable site crawler
///
/// Tidemark crawls one site breadth-first, saves the text of every HTML and
/// PDF page plus its images and documents, and checkpoints its progress so an
/// interrupted crawl picks up where it stopped.
#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(version = "1.0.0")]
#[command(about = "A bounded, resumable site crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Base output directory
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Resume from the checkpoint of a previous run
    #[arg(short, long)]
    resume: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show what an existing crawl saved and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    let log_file = match (&config.files.log_dir, cli.dry_run || cli.stats) {
        (Some(dir), false) => Some(open_log_file(Path::new(dir), config.files.max_log_files)?),
        _ => None,
    };
    setup_logging(cli.verbose, cli.quiet, log_file);

    tracing::info!(
        "Configuration loaded from {} (hash: {})",
        cli.config.display(),
        config_hash
    );

    if cli.dry_run {
        handle_dry_run(&config, &cli.output);
    } else if cli.stats {
        handle_stats(&config, &cli.output)?;
    } else {
        handle_crawl(config, &cli.output, cli.resume).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// When a log file is given, every event is also written to it without ANSI colors.
fn setup_logging(verbose: u8, quiet: bool, log_file: Option<File>) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tidemark=info,warn"),
            1 => EnvFilter::new("tidemark=debug,info"),
            2 => EnvFilter::new("tidemark=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let console = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    let file = log_file.map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(Mutex::new(file))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();
}

/// Creates `crawler_<timestamp>.log` in `dir`, pruning the oldest logs first
///
/// At most `max_files` log files remain once the new one exists.
fn open_log_file(dir: &Path, max_files: usize) -> anyhow::Result<File> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let mut existing: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("crawler_") && name.ends_with(".log"))
        })
        .collect();

    // Timestamped names sort chronologically
    existing.sort();
    let excess = (existing.len() + 1).saturating_sub(max_files);
    for old in existing.iter().take(excess) {
        if let Err(e) = std::fs::remove_file(old) {
            eprintln!("Failed to remove old log {}: {}", old.display(), e);
        }
    }

    let name = format!("crawler_{}.log", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let path = dir.join(name);
    File::create(&path).with_context(|| format!("Failed to create log file {}", path.display()))
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, output: &Path) {
    println!("=== Tidemark Dry Run ===\n");

    println!("Scope:");
    println!("  Domain: {}", config.domain.name);
    println!("  Start URL: {}", config.domain.start_url);
    println!("  Excluded patterns: {:?}", config.excluded.patterns);
    println!("  Excluded extensions: {:?}", config.excluded.extensions);

    println!("\nCrawler Configuration:");
    println!("  Workers: {}", config.crawler.max_workers);
    println!("  Max saved URLs: {}", config.crawler.max_queue_size);
    println!(
        "  Delay between batches: {}s - {}s",
        config.crawler.delay_min, config.crawler.delay_max
    );
    println!(
        "  Checkpoint every: {} batches",
        config.crawler.checkpoint_interval
    );

    println!("\nNetwork:");
    println!("  Connect timeout: {}s", config.timeouts.connect);
    println!("  Read timeout: {}s", config.timeouts.read);
    println!("  Attempts per URL: {}", config.timeouts.max_retries);
    println!("  Backoff base: {}ms", config.timeouts.backoff_base);

    println!("\nPDF:");
    if config.pdf.ocr_enabled {
        println!(
            "  OCR: {} at {} dpi, up to {} pages",
            config.pdf.ocr_languages.join("+"),
            config.pdf.ocr_dpi,
            config.pdf.ocr_max_pages
        );
    } else {
        println!("  OCR: disabled");
    }

    println!("\nOutput:");
    println!("  Crawl root: {}", config.crawl_root(output).display());
    match &config.files.log_dir {
        Some(dir) => println!("  Logs: {} (keeping {})", dir, config.files.max_log_files),
        None => println!("  Logs: console only"),
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows what an existing crawl root holds
fn handle_stats(config: &Config, output: &Path) -> anyhow::Result<()> {
    let crawl_root = config.crawl_root(output);
    println!("Crawl root: {}\n", crawl_root.display());

    let inventory = load_statistics(&crawl_root)
        .with_context(|| format!("Failed to read crawl output at {}", crawl_root.display()))?;
    print_inventory(&inventory);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, output: &Path, resume: bool) -> anyhow::Result<()> {
    if resume {
        tracing::info!("Resuming crawl from checkpoint");
    } else {
        tracing::info!("Starting fresh crawl");
    }

    let shutdown = CancellationToken::new();
    let listener = spawn_signal_listener(shutdown.clone());

    let result = crawl(config, output, resume, shutdown.clone()).await;

    // Stops the listener if the crawl ended on its own
    shutdown.cancel();
    let _ = listener.await;

    let report = result.context("Crawl failed")?;
    match report.outcome {
        CrawlOutcome::Completed(StopReason::FrontierExhausted) => {
            tracing::info!("Crawl completed: no URLs left")
        }
        CrawlOutcome::Completed(StopReason::SeenLimitReached) => {
            tracing::info!("Crawl completed: URL limit reached")
        }
        CrawlOutcome::Interrupted => {
            tracing::info!("Crawl interrupted; rerun with --resume to continue")
        }
    }

    print_statistics(&report.statistics);
    println!("\nOutput: {}", report.crawl_root.display());

    Ok(())
}
