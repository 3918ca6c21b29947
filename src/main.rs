//! syncbench - compare synchronization strategies under concurrent writers
//!
//! Runs each selected strategy repeatedly against a shared counter or map,
//! verifies the final count, and reports timings and a ranking.

use std::process::ExitCode;

use anyhow::Result;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

use syncbench::benchmark::Orchestrator;
use syncbench::config::{BenchmarkConfig, CliArgs, OutputFormat};
use syncbench::metrics::MetricsReporter;

/// Exit status when at least one run crashed with a concurrent-mutation fault
const EXIT_CRASHED: u8 = 3;

fn setup_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Worker panics are expected for unsynchronized maps; they are collected at
/// join and reported in the summary instead of on stderr.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let thread = std::thread::current();
        debug!(
            "thread '{}' panicked: {}",
            thread.name().unwrap_or("<unnamed>"),
            info
        );
    }));
}

fn print_banner(config: &BenchmarkConfig) {
    if config.quiet || config.output_format != OutputFormat::Text {
        return;
    }

    println!("syncbench v{}", env!("CARGO_PKG_VERSION"));
    println!("====================================");
    println!(
        "Workers: {}, Ops/worker: {}, Repetitions: {}",
        config.workers, config.ops_per_worker, config.repetitions
    );
    println!("Expected count: {}", config.expected());
    println!(
        "Strategies: {}",
        config
            .experiments
            .iter()
            .map(|e| format!("{} ({})", e.strategy, e.workload))
            .collect::<Vec<_>>()
            .join(", ")
    );
    if config.readers > 0 {
        println!(
            "Readers: {} x {} reads, pause {:?}",
            config.readers, config.reads_per_reader, config.reader_pause
        );
    }
    println!("====================================\n");
}

fn run() -> Result<bool> {
    // Parse CLI arguments
    let args = CliArgs::parse_args();

    // Setup logging
    setup_logging(args.verbose, args.quiet);
    install_panic_hook();

    // Build configuration
    let config = BenchmarkConfig::from_cli(&args)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    print_banner(&config);

    let orchestrator = Orchestrator::new(config);
    let report = orchestrator.run_all()?;

    let config = orchestrator.config();
    MetricsReporter::new(config.output_format, config.quiet).report(&report)?;
    orchestrator.export(&report)?;

    if !config.quiet && config.output_format == OutputFormat::Text {
        println!("\n====================================");
        println!("BENCHMARK COMPLETE");
        println!("====================================");
        println!(
            "Runs: {} | Lost: {} | Crashed: {}",
            report.total_runs(),
            report.total_lost(),
            report.total_crashes()
        );
    }

    if report.has_crashes() {
        info!(
            "{} run(s) crashed with a concurrent-mutation fault",
            report.total_crashes()
        );
    }
    Ok(report.has_crashes())
}

fn main() -> ExitCode {
    match run() {
        Ok(false) => ExitCode::SUCCESS,
        Ok(true) => ExitCode::from(EXIT_CRASHED),
        Err(e) => {
            error!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
