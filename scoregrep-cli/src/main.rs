use anyhow::Context;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use scoregrep::{
    CliOverrides, EncodingMode, FilterConfig, FilterError, FilterStats, LineFilter, RunSummary,
};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Print lines whose summed pattern weights reach a minimum score.
///
/// Each PATTERN must match a whole line to add its WEIGHT. Every pattern is
/// evaluated by its own worker thread.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Minimum score followed by PATTERN WEIGHT pairs
    #[arg(value_name = "MIN_SCORE [PATTERN WEIGHT]...", allow_negative_numbers = true)]
    args: Vec<String>,

    /// YAML configuration file with min_score and patterns
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read lines from this file instead of standard input
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Print a run summary to standard error
    #[arg(short, long)]
    stats: bool,

    /// Format of the run summary
    #[arg(long, value_enum, default_value_t = StatsFormat::Text)]
    stats_format: StatsFormat,

    /// How to handle invalid UTF-8 in input lines
    #[arg(long, value_enum)]
    encoding: Option<EncodingArg>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum StatsFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum EncodingArg {
    /// Stop with an error on the first invalid line
    #[value(name = "failfast")]
    FailFast,
    /// Replace invalid bytes with U+FFFD and keep going
    Lossy,
}

impl From<EncodingArg> for EncodingMode {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::FailFast => EncodingMode::FailFast,
            EncodingArg::Lossy => EncodingMode::Lossy,
        }
    }
}

/// JSON form of `--stats`
#[derive(Serialize)]
struct StatsReport<'a> {
    summary: &'a RunSummary,
    counters: FilterStats,
}

// Exit statuses
const EXIT_CONFIG_ERROR: u8 = 1;
const EXIT_RUNTIME_ERROR: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_error(&err),
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;
    init_logging(&config.log_level);
    debug!("Resolved configuration: {:?}", config);

    let filter = LineFilter::new(&config)?;
    debug!(
        "Filtering with {} pattern workers at minimum score {}",
        filter.worker_count(),
        filter.min_score()
    );
    let stdout = io::stdout();
    let output = BufWriter::new(stdout.lock());

    let summary = match &cli.input {
        Some(path) => {
            let file = File::open(path)
                .map_err(FilterError::IoError)
                .with_context(|| format!("Failed to open input {}", path.display()))?;
            filter.run(BufReader::new(file), output)?
        }
        None => filter.run(io::stdin().lock(), output)?,
    };

    if cli.stats {
        print_summary(&summary, filter.metrics().get_stats(), cli.stats_format)?;
    }
    Ok(())
}

/// Layers positional arguments and flags over the config files
fn resolve_config(cli: &Cli) -> Result<FilterConfig, FilterError> {
    let overrides = CliOverrides {
        encoding_mode: cli.encoding.map(EncodingMode::from),
        log_level: cli.log_level.clone(),
        ..CliOverrides::from_args(&cli.args)?
    };

    let file_config = FilterConfig::load_from(cli.config.as_deref())?;
    Ok(file_config.merge_with_cli(overrides))
}

fn init_logging(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .try_init();
}

fn print_summary(
    summary: &RunSummary,
    counters: FilterStats,
    format: StatsFormat,
) -> anyhow::Result<()> {
    match format {
        StatsFormat::Text => eprintln!("{}", summary.to_string().green()),
        StatsFormat::Json => {
            let report = StatsReport { summary, counters };
            eprintln!("{}", serde_json::to_string(&report)?);
        }
    }
    Ok(())
}

fn report_error(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<FilterError>() {
        // Downstream closed the pipe (e.g. `| head`); nothing left to print to
        Some(FilterError::IoError(io_err)) if io_err.kind() == io::ErrorKind::BrokenPipe => {
            ExitCode::SUCCESS
        }
        Some(filter_err) if filter_err.is_config_error() => {
            eprintln!("{} {}", "error:".red().bold(), filter_err);
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
        _ => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}
