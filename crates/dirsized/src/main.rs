//! dirsized - directory size collector daemon.
//!
//! Periodically measures the size of configured directory trees and writes
//! them as `directory_size_in_bytes` points to InfluxDB.

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use dirsize_core::collector::{PathResolver, RealFs, TreeScanner, build_targets};
use dirsize_core::config::Config;
use dirsize_core::cycle::ScanCycle;
use dirsize_core::fmt::format_interval;
use dirsize_core::scheduler::Scheduler;
use dirsize_core::sink::InfluxSink;

/// Directory size collector daemon.
#[derive(Parser)]
#[command(name = "dirsized", about = "Directory size collector daemon", version)]
struct Args {
    /// Path to the TOML configuration file.
    config: PathBuf,

    /// Compute points but never send them (overrides `dry_run` in the config).
    #[arg(long)]
    dry_run: bool,

    /// Reporting interval in seconds (overrides `reporting.interval_secs`).
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,

    /// Expansion depth for top-level directories (overrides `reporting.depth`).
    #[arg(short, long)]
    depth: Option<usize>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Overrides `logging.level`.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Picks the log level: CLI flags win over the config file.
fn log_level(verbose: u8, quiet: bool, configured: Level) -> Level {
    if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => configured,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

/// Whether the crate directives for `level` go on top of `RUST_LOG`.
///
/// A set `RUST_LOG` is used as-is unless `-v` or `-q` asks for a level.
fn wants_crate_directives(rust_log_set: bool, verbose: u8, quiet: bool) -> bool {
    !rust_log_set || verbose > 0 || quiet
}

/// Initializes the tracing subscriber.
fn init_logging(level: Level, crate_directives: bool) {
    let mut filter = EnvFilter::from_default_env();
    if crate_directives {
        for krate in ["dirsized", "dirsize_core"] {
            if let Ok(directive) = format!("{}={}", krate, level).parse() {
                filter = filter.add_directive(directive);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Applies command-line overrides on top of the file configuration.
fn apply_overrides(config: &mut Config, args: &Args) {
    if args.dry_run {
        config.dry_run = true;
    }
    if let Some(secs) = args.interval {
        config.interval = Duration::from_secs(secs);
    }
    if let Some(depth) = args.depth {
        config.depth = depth;
    }
}

fn main() {
    let args = Args::parse();

    // Config errors are reported before logging is up, so they go to stderr.
    let mut config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("dirsized: {}", e);
            process::exit(1);
        }
    };
    apply_overrides(&mut config, &args);

    let rust_log_set = std::env::var_os(EnvFilter::DEFAULT_ENV).is_some();
    init_logging(
        log_level(args.verbose, args.quiet, config.log_level),
        wants_crate_directives(rust_log_set, args.verbose, args.quiet),
    );

    info!("dirsized {} starting", dirsize_core::VERSION);
    debug!("Effective configuration: {:#?}", config);

    let fs = RealFs::new();
    let targets = match build_targets(&config, &PathResolver::from_env(), &fs) {
        Ok(targets) => targets,
        Err(e) => {
            error!("Failed to resolve directories: {}", e);
            process::exit(1);
        }
    };
    if targets.is_empty() {
        warn!("No directories to scan after expansion; cycles will report nothing");
    }

    info!("Initializing InfluxDB client for {}", config.influx.address);
    let sink = match InfluxSink::new(&config.influx) {
        Ok(sink) => sink,
        Err(e) => {
            error!("Failed to initialize InfluxDB client: {}", e);
            process::exit(1);
        }
    };

    if config.dry_run {
        info!("Dry run: points will be computed but not sent");
    }

    let mut cycle = ScanCycle::new(TreeScanner::new(fs), sink, config.influx.database.clone())
        .with_retention_policy(config.influx.retention_policy.clone())
        .with_tags(config.tags.clone())
        .dry_run(config.dry_run);

    // Setup graceful shutdown
    let interval = config.interval;
    let scheduler = Scheduler::new(interval);
    let handle = scheduler.handle();
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
    let signals = AtomicUsize::new(0);

    if let Err(e) = ctrlc::set_handler(move || {
        if signals.fetch_add(1, Ordering::SeqCst) > 0 {
            eprintln!("dirsized: second interrupt, exiting immediately");
            process::exit(130);
        }
        let _ = shutdown_tx.send(());
    }) {
        error!("Failed to set Ctrl-C handler: {}", e);
        process::exit(1);
    }

    let worker = std::thread::Builder::new()
        .name("scan-loop".to_string())
        .spawn(move || {
            scheduler.run(|_| {
                cycle.run_once(&targets);
            })
        });
    let worker = match worker {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start scan loop: {}", e);
            process::exit(1);
        }
    };

    info!(
        "Reporting every {}, waiting for shutdown signal...",
        format_interval(interval)
    );
    let _ = shutdown_rx.recv();

    info!("Received shutdown signal, waiting for the current cycle to finish");
    handle.shutdown();
    debug!("Scheduler state: {:?}", handle.state());

    match worker.join() {
        Ok(cycles) => info!("Shutdown complete after {} cycles", cycles),
        Err(_) => {
            error!("Scan loop panicked");
            process::exit(1);
        }
    }
}
