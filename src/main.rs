//! Pageweight main entry point
//!
//! This is the command-line interface for measuring page weight.

use anyhow::Context;
use clap::{CommandFactory, Parser};
use pageweight::config::{load_config, validate, ConcurrencyMode, Config};
use pageweight::engine::read_addresses;
use pageweight::output::{write_conn_trace, write_report};
use pageweight::Coordinator;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Pageweight: measures how many bytes a web page pulls in
///
/// Fetches every page, discovers the stylesheets, scripts and images it
/// references, fetches those as well, and prints sizes and timings.
#[derive(Parser, Debug)]
#[command(name = "pageweight")]
#[command(version)]
#[command(about = "Measures the total byte weight of web pages", long_about = None)]
struct Cli {
    /// Page addresses to weigh
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// File with one page address per line
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Resolve pages concurrently
    #[arg(short, long)]
    concurrent: bool,

    /// Fetch resources through a worker pool (with -c)
    #[arg(short, long)]
    resources: bool,

    /// Give every host its own worker pool (with -c -r)
    #[arg(short = 'H', long)]
    per_host: bool,

    /// Number of workers per pool
    #[arg(short, long)]
    pool_size: Option<usize>,

    /// Only print the slowest resource of each page
    #[arg(short, long)]
    slowest: bool,

    /// Count new connections per host
    #[arg(short, long)]
    trace: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;

    let mut addresses = cli.urls.clone();
    if let Some(path) = &cli.file {
        match read_addresses(path) {
            Ok(mut from_file) => addresses.append(&mut from_file),
            Err(e) => tracing::warn!("Failed to read addresses from {}: {}", path.display(), e),
        }
    }

    if addresses.is_empty() {
        Cli::command().print_help()?;
        std::process::exit(1);
    }

    let coordinator = Coordinator::new(&config).context("Failed to build HTTP client")?;
    let concurrent = coordinator.mode().is_concurrent();

    let shutdown = coordinator.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling outstanding fetches");
            shutdown.cancel();
        }
    });

    let report = coordinator.run(&addresses).await;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_report(
        &mut out,
        &report.pages,
        concurrent,
        config.output.slowest_only,
    )?;
    if let Some(trace) = &report.trace {
        writeln!(out)?;
        write_conn_trace(&mut out, trace)?;
    }
    out.flush()?;

    if !report.hosts.is_empty() {
        tracing::info!("Host pools: {}", report.hosts.join(", "));
    }
    tracing::info!("Total time taken: {:?}", report.elapsed);

    Ok(())
}

/// Loads the config file if given and applies the command line switches on top
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    if cli.concurrent {
        config.fetcher.mode = ConcurrencyMode::from_flags(true, cli.resources, cli.per_host);
    } else if cli.resources || cli.per_host {
        tracing::warn!("-r and -H only apply together with -c");
    }
    if let Some(pool_size) = cli.pool_size {
        config.fetcher.pool_size = pool_size;
    }
    config.output.slowest_only |= cli.slowest;
    config.output.trace |= cli.trace;

    validate(&config)?;
    Ok(config)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pageweight=info,warn"),
            1 => EnvFilter::new("pageweight=debug,info"),
            2 => EnvFilter::new("pageweight=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}
