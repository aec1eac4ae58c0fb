//! Sumi-Crawl main entry point
//!
//! This is the command-line interface for the Sumi-Crawl link-following crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use sumi_crawl::config::{load_config_with_hash, Config};
use sumi_crawl::crawler::{print_statistics, stages_from_config, Engine, LinkSource};
use tracing_subscriber::EnvFilter;

/// Sumi-Crawl: a bounded-concurrency crawler
///
/// Sumi-Crawl follows links from a set of seed URLs, retries failed fetches,
/// and writes every valid page it extracts as JSON and/or text.
#[derive(Parser, Debug)]
#[command(name = "sumi-crawl")]
#[command(version)]
#[command(about = "A bounded-concurrency crawler", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_crawl=info,warn"),
            1 => EnvFilter::new("sumi_crawl=debug,info"),
            2 => EnvFilter::new("sumi_crawl=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective settings and seeds
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Crawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Concurrency limit: {}", config.crawler.concurrency_limit);
    println!("  Delay: {}s", config.crawler.delay_seconds);
    println!("  Delay jitter: {}", config.crawler.delay_jitter_fraction);
    println!("  Retry limit: {}", config.crawler.retry_limit);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nSource:");
    println!("  Name: {}", config.source.name);
    println!("  Max depth: {}", config.source.max_depth);
    if config.source.allowed_domains.is_empty() {
        println!("  Allowed domains: seed hosts");
    } else {
        println!("  Allowed domains: {}", config.source.allowed_domains.join(", "));
    }

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    println!("  Format: {:?}", config.output.format);

    println!("\nSeeds ({}):", config.source.seeds.len());
    for seed in &config.source.seeds {
        println!("  * {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
///
/// Ctrl-C stops dispatching; in-flight requests finish and output is still written.
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let source = LinkSource::from_config(&config).context("Failed to build link source")?;
    tracing::info!(
        "Crawling '{}' from {} seeds (max depth {})",
        config.source.name,
        source.seeds().len(),
        source.max_depth()
    );

    let mut engine = Engine::new(config.crawler.clone(), stages_from_config(&config))
        .context("Invalid crawler settings")?;

    let handle = engine.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; finishing in-flight requests");
            handle.stop();
        }
    });

    let stats = engine
        .crawl(Arc::new(source))
        .await
        .context("Crawl failed")?;

    println!();
    print_statistics(&stats);
    Ok(())
}
