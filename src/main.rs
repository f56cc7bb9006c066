//! Venue-Trawler main entry point
//!
//! This is the command-line interface for the Venue-Trawler crawler.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use venue_trawler::api::ApiClient;
use venue_trawler::collect::{CheckinMonitor, CollectReport, FriendCrawl, StatisticsSweep};
use venue_trawler::config::{load_config_with_hash, Config};
use venue_trawler::crawler::{run_search, Termination};
use venue_trawler::output::{export_kml, load_statistics, print_statistics};
use venue_trawler::storage::SqliteStorage;

/// Venue-Trawler: a quota-aware venue crawler
///
/// Venue-Trawler discovers venues through adaptive nearby searches, then
/// tracks their statistics, current check-ins and the friendships of the
/// people it sees checking in.
#[derive(Parser, Debug)]
#[command(name = "venue-trawler")]
#[command(version)]
#[command(about = "A quota-aware venue crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", default_value = "trawler.toml", global = true)]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover venues around the configured seeds
    Search,

    /// Record who is checked in at active venues of the monitored region
    Monitor {
        /// Run a single pass instead of polling until interrupted
        #[arg(long)]
        once: bool,
    },

    /// Append a statistics snapshot for every stored venue
    StatsSweep,

    /// Crawl the friend lists of users seen checking in
    Friends,

    /// Show statistics from the database and exit
    Report,

    /// Export stored venues as KML
    ExportKml {
        /// Output path (defaults to the configured kml-path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate the configuration and show what would be crawled
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    match cli.command {
        Command::Search => handle_search(&config, &config_hash, cancel).await,
        Command::Monitor { once } => handle_monitor(&config, &config_hash, once, cancel).await,
        Command::StatsSweep => {
            let (mut client, mut storage) = open_session(&config, cancel)?;
            let report = StatisticsSweep
                .run(&mut client, &mut storage, Some(&config_hash))
                .await?;
            print_collect_report(&report);
            Ok(())
        }
        Command::Friends => {
            let (mut client, mut storage) = open_session(&config, cancel)?;
            let report = FriendCrawl
                .run(&mut client, &mut storage, Some(&config_hash))
                .await?;
            print_collect_report(&report);
            Ok(())
        }
        Command::Report => handle_report(&config),
        Command::ExportKml { output } => handle_export_kml(&config, output),
        Command::CheckConfig => {
            handle_check_config(&config, &config_hash);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("venue_trawler=info,warn"),
            1 => EnvFilter::new("venue_trawler=debug,info"),
            2 => EnvFilter::new("venue_trawler=trace,debug"),
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

/// Cancels `cancel` on the first Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing current query...");
            cancel.cancel();
        }
    });
}

fn open_storage(config: &Config) -> anyhow::Result<SqliteStorage> {
    let path = Path::new(&config.output.database_path);
    SqliteStorage::new(path).with_context(|| format!("failed to open {}", path.display()))
}

fn open_session(
    config: &Config,
    cancel: CancellationToken,
) -> anyhow::Result<(ApiClient<venue_trawler::HttpGateway>, SqliteStorage)> {
    let client = ApiClient::from_config(config, cancel)?;
    Ok((client, open_storage(config)?))
}

/// Handles the search subcommand
async fn handle_search(
    config: &Config,
    config_hash: &str,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    tracing::info!(
        "Searching from {} seeds (delta {} down to {}, target {} venues)",
        config.search.seeds.len(),
        config.search.initial_delta,
        config.search.min_delta,
        config.search.target_count
    );

    let report = run_search(config, config_hash, cancel).await?;

    println!("=== Search Finished ===\n");
    let reason = match report.termination {
        Termination::FrontierExhausted => "frontier exhausted",
        Termination::TargetReached => "target reached",
        Termination::Cancelled => "interrupted",
    };
    println!("  Stopped: {}", reason);
    println!("  Iterations: {}", report.iterations.len());
    println!(
        "  Queries: {} ({} failed)",
        report.queries, report.failed_queries
    );
    println!(
        "  Venues: {} -> {} (+{})",
        report.venues_before,
        report.venues_after,
        report.new_venues()
    );

    Ok(())
}

/// Handles the monitor subcommand
async fn handle_monitor(
    config: &Config,
    config_hash: &str,
    once: bool,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let monitor_config = config
        .monitor
        .as_ref()
        .context("no [monitor] section in the configuration")?;
    let monitor = CheckinMonitor::from_config(monitor_config);
    let pause = Duration::from_secs(monitor_config.pass_interval_secs);
    let (mut client, mut storage) = open_session(config, cancel.clone())?;

    loop {
        let report = monitor
            .run_pass(&mut client, &mut storage, Some(config_hash))
            .await?;
        print_collect_report(&report);

        if once || report.interrupted {
            break;
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(pause) => {}
        }
    }

    Ok(())
}

/// Handles the report subcommand
fn handle_report(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(config)?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the export-kml subcommand
fn handle_export_kml(config: &Config, output: Option<PathBuf>) -> anyhow::Result<()> {
    let output = output.unwrap_or_else(|| PathBuf::from(&config.output.kml_path));
    let storage = open_storage(config)?;

    let written = export_kml(&storage, &output)?;
    println!("✓ {} venues exported to: {}", written, output.display());

    Ok(())
}

/// Handles the check-config subcommand
fn handle_check_config(config: &Config, config_hash: &str) {
    println!("=== Venue-Trawler Configuration ===\n");

    println!("API:");
    println!("  Base URL: {}", config.api.base_url);
    println!("  Timeout: {}s", config.api.timeout_secs);

    println!("\nCredentials:");
    match &config.authenticated {
        Some(auth) => println!(
            "  Authenticated: {} tokens, {} queries/hour each",
            auth.tokens.len(),
            auth.hourly_quota
        ),
        None => println!("  Authenticated: not configured"),
    }
    match &config.userless {
        Some(userless) => println!(
            "  Userless: {} clients, {} queries/hour each",
            userless.clients.len(),
            userless.hourly_quota
        ),
        None => println!("  Userless: not configured"),
    }

    println!("\nRetry:");
    println!(
        "  Backoff: {}s doubling up to {}s",
        config.retry.base_backoff_secs, config.retry.max_backoff_secs
    );
    println!("  Transient statuses: {:?}", config.retry.transient_statuses);

    println!("\nSearch:");
    println!("  Region: {}", config.search.region.as_deref().unwrap_or("-"));
    println!("  Access: {}", config.search.access);
    println!(
        "  Delta: {} down to {}",
        config.search.initial_delta, config.search.min_delta
    );
    println!("  Target: {} venues", config.search.target_count);
    println!("  Seeds ({}):", config.search.seeds.len());
    for seed in &config.search.seeds {
        println!("    * {:.7},{:.7}", seed.lat, seed.lng);
    }

    if let Some(monitor) = &config.monitor {
        println!("\nMonitor:");
        println!(
            "  {} within {} of {:.4},{:.4}",
            monitor.region, monitor.radius, monitor.centre.lat, monitor.centre.lng
        );
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  KML: {}", config.output.kml_path);

    println!("\n✓ Configuration is valid (hash: {})", config_hash);
}

fn print_collect_report(report: &CollectReport) {
    println!(
        "{}: {} seen, {} processed, {} failed, {} records added{}",
        report.crawl_type,
        report.items_seen,
        report.items_processed,
        report.items_failed,
        report.records_added,
        if report.interrupted { " (interrupted)" } else { "" }
    );
}
