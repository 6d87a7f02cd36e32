//! CLI entry point for the VSAT Rater tool.
//!
//! Provides subcommands for building the speed-test report, extracting
//! filtered evaluated tests, and summarizing the registry and ticket exports.

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use vsat_rater::{
    cache::GzipCsvCache,
    config::Settings,
    filter::{Criterion, filter_tests},
    normalize::{load_locations, load_tickets},
    output::{print_json, write_tests_csv_file},
    pipeline::{ReportRequest, TestSources, evaluate_sources, run_report},
    stats::DatasetInfo,
};

#[derive(Parser)]
#[command(name = "vsat_rater")]
#[command(about = "Evaluates VSAT speed tests against contracted service levels", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct SourceArgs {
    /// Test export for operational sites
    #[arg(long, value_name = "CSV")]
    operational: PathBuf,

    /// Test export for non-operational sites
    #[arg(long, value_name = "CSV")]
    non_operational: PathBuf,

    /// Site registry export
    #[arg(long, value_name = "CSV")]
    locations: PathBuf,

    /// Half-width in seconds of the concurrency window
    #[arg(long)]
    window_secs: Option<i64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the multi-sheet report
    Report {
        #[command(flatten)]
        sources: SourceArgs,

        /// Trouble-ticket export used for downtime and validity
        #[arg(long, value_name = "CSV")]
        tickets: Option<PathBuf>,

        /// Report file to write (defaults to REPORT_DIR/report.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Comma separated site codes to leave out of the report
        #[arg(long)]
        exclude: Option<String>,

        /// Keep tests that overlapped other tests
        #[arg(long, default_value_t = false)]
        accept_concurrency: bool,

        /// First test date to keep (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Last test date to keep (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Store the evaluated tests in CACHE_DIR under this name
        #[arg(long)]
        cache_name: Option<String>,

        /// Gzip compress the report
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Write evaluated tests matching every --where key=value to a CSV
    Filter {
        #[command(flatten)]
        sources: SourceArgs,

        /// Criterion such as date=2023-03-01, passing=false or res=succeeded
        #[arg(long = "where", value_name = "KEY=VALUE")]
        criteria: Vec<String>,

        /// CSV file to write
        #[arg(short, long, default_value = "tests.csv")]
        output: PathBuf,
    },
    /// Summarize the registry and ticket exports
    Inspect {
        /// Site registry export
        #[arg(long, value_name = "CSV")]
        locations: PathBuf,

        /// Trouble-ticket export
        #[arg(long, value_name = "CSV")]
        tickets: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let settings = Settings::from_env().context("Invalid settings")?;

    // Logging setup: colored stderr + JSON rolling log file
    let log_dir = settings
        .log_file_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = settings
        .log_file_path
        .file_name()
        .unwrap_or(OsStr::new("vsat_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Report {
            sources,
            tickets,
            output,
            exclude,
            accept_concurrency,
            from,
            to,
            cache_name,
            gzip,
        } => {
            let request = ReportRequest {
                window: settings.window(sources.window_secs)?,
                sources: test_sources(&settings, sources),
                tickets,
                output: output.unwrap_or_else(|| settings.default_report_path()),
                accept_concurrency,
                exclude,
                from,
                to,
                cache_name,
                gzip,
            };
            let cache = GzipCsvCache::new(&settings.cache_dir);

            let outcome = run_report(&request, Some(&cache)).context("Report failed")?;
            for warning in &outcome.warnings {
                warn!("{warning}");
            }
            info!(
                path = %outcome.path.display(),
                tests = outcome.tests,
                "Report ready"
            );
        }
        Commands::Filter {
            sources,
            criteria,
            output,
        } => {
            let criteria = criteria
                .iter()
                .map(|pair| Criterion::parse_pair(pair))
                .collect::<vsat_rater::Result<Vec<_>>>()
                .context("Invalid filter")?;

            let window = settings.window(sources.window_secs)?;
            let (tests, _) = evaluate_sources(&test_sources(&settings, sources), window, None)?;
            let selected = filter_tests(&tests, &criteria)?;

            write_tests_csv_file(&output, &selected)?;
            info!(
                path = %output.display(),
                selected = selected.len(),
                total = tests.len(),
                "Filtered tests written"
            );
        }
        Commands::Inspect { locations, tickets } => {
            let locations = load_locations(&locations)
                .with_context(|| format!("Failed to read {}", locations.display()))?;
            let tickets = match tickets {
                Some(path) => load_tickets(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => Vec::new(),
            };

            let info = DatasetInfo::from_data(&locations, &tickets, Local::now().naive_local());
            print_json(&info)?;
        }
    }

    Ok(())
}

fn test_sources(settings: &Settings, args: SourceArgs) -> TestSources {
    TestSources {
        operational: args.operational,
        non_operational: args.non_operational,
        locations: args.locations,
        header_row: settings.tests_header_row,
    }
}
