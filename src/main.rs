//! Catalog-Harvest main entry point
//!
//! This is the command-line interface for the Catalog-Harvest storefront harvester.

use anyhow::Context;
use catalog_harvest::config::{load_config_with_hash, Config};
use catalog_harvest::crawler::{discover_items, run_harvest, HarvestOptions};
use catalog_harvest::output::render_summary;
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Catalog-Harvest: a polite storefront catalog harvester
///
/// Walks the paginated listing of one storefront, extracts every artwork
/// detail page it finds, and appends the results to a JSON Lines log and a
/// CSV report. Runs can be resumed without duplicating output.
#[derive(Parser, Debug)]
#[command(name = "catalog-harvest")]
#[command(version)]
#[command(about = "A polite storefront catalog harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Skip items already present in the structured log
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Process every item, even if an earlier run already did
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Stop after this many items were persisted
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Do not download artwork images
    #[arg(long)]
    no_images: bool,

    /// Walk the listing and print the item URLs without processing them
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    /// Layers the command-line switches over the configuration
    fn harvest_options(&self, config: &Config) -> HarvestOptions {
        let mut options = HarvestOptions::from_config(config);
        if self.resume {
            options.resume = true;
        }
        if self.fresh {
            options.resume = false;
        }
        if self.limit.is_some() {
            options.max_items = self.limit;
        }
        if self.no_images {
            options.download_images = false;
        }
        options
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let options = cli.harvest_options(&config);

    if cli.dry_run {
        handle_dry_run(&config, options.max_items).await
    } else {
        handle_harvest(&config, options).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_harvest=info,warn"),
            1 => EnvFilter::new("catalog_harvest=debug,info"),
            2 => EnvFilter::new("catalog_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: lists the items a harvest would visit
async fn handle_dry_run(config: &Config, limit: Option<usize>) -> anyhow::Result<()> {
    println!("=== Catalog-Harvest Dry Run ===\n");
    println!("Listing: {}", config.crawler.listing_url);
    println!("Item prefix: {}", config.crawler.item_path_prefix);
    println!("Rate limit: {}s\n", config.crawler.rate_limit_seconds);

    let urls = discover_items(config, limit)
        .await
        .context("Listing traversal failed")?;

    for url in &urls {
        println!("  {}", url);
    }
    println!("\n✓ Would process {} item(s)", urls.len());

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config, options: HarvestOptions) -> anyhow::Result<()> {
    if options.resume {
        tracing::info!("Resuming from {}", config.output.log_path);
    } else {
        tracing::info!("Starting fresh harvest");
    }

    let cancel = options.cancel.clone();
    spawn_interrupt_handler(cancel);

    let result = run_harvest(config, options)
        .await
        .context("Harvest aborted")?;

    for line in render_summary(&result) {
        println!("{}", line);
    }

    Ok(())
}

/// Cancels the harvest between items on Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing the current item");
            cancel.cancel();
        }
    });
}
