//! URL Status CLI Application
//!
//! A command-line interface for checking the HTTP status of long URL lists.
//! This CLI application wires config files, environment variables and
//! flags into the url-status-lib engine.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use std::process;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tracing_subscriber::EnvFilter;
use url_status_lib::{
    load_env_config, parse_timeout_string, CheckConfig, ConfigManager, FileConfig, OutputFormat,
    Progress, RateLimitRegistry, ResultSink, RunSummary, StatusChecker, WorkSource, WorkerPool,
};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for url-status
#[derive(Parser, Debug)]
#[command(name = "url-status")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Sai Dutt G.V <gvs46@protonmail.com>")]
#[command(about = "Check the statuses of a list of URLs")]
#[command(
    long_about = "Check the statuses of a list of URLs.\n\nReads newline-delimited URLs, issues a HEAD request for each (following redirects) \
                  with a bounded pool of workers, and writes one `url,status` record per URL."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Path to a file that is a newline-delimited list of URLs ("-" for stdin)
    #[arg(value_name = "PATH", help_heading = "Input")]
    pub path: String,

    /// Write results to FILE instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE", help_heading = "Output Format")]
    pub output: Option<String>,

    /// Output results as JSON lines
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Output results as CSV (default)
    #[arg(long = "csv", help_heading = "Output Format")]
    pub csv: bool,

    /// Write a `url,status` header row before CSV output
    #[arg(long = "headers", help_heading = "Output Format")]
    pub headers: bool,

    /// Number of URLs checked in parallel (default: 200)
    #[arg(short = 'c', long = "concurrency", value_name = "N", help_heading = "Performance")]
    pub concurrency: Option<usize>,

    /// Timeout per request, e.g. "10s", "500ms", "1m" (default: 10s)
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Performance")]
    pub timeout: Option<String>,

    /// Maximum number of requests per second to make. Repeat with `--rate "example.com:2"` to set specific rate limits per domain
    #[arg(
        long = "rate",
        value_name = "[DOMAIN:]RATE",
        action = clap::ArgAction::Append,
        help_heading = "Performance"
    )]
    pub rate: Vec<String>,

    /// Ignore errors in SSL/TLS handshakes
    #[arg(
        long = "ignore-ssl-errors",
        visible_alias = "ignore-tls-errors",
        help_heading = "Protocol"
    )]
    pub ignore_ssl_errors: bool,

    /// Show a live counter and a summary on stderr
    #[arg(short = 'p', long = "progress", help_heading = "Display")]
    pub progress: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show debug logging on stderr
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging on stderr
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(&args);

    // Validate arguments
    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if let Err(e) = run_url_check(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Install a stderr logger. `RUST_LOG` wins over the verbosity flags.
fn init_logging(args: &Args) {
    let default_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if args.path.trim().is_empty() {
        return Err("PATH must not be empty".to_string());
    }

    if args.json && args.csv {
        return Err("Cannot specify multiple output formats (--json, --csv)".to_string());
    }

    if args.concurrency == Some(0) {
        return Err("Concurrency must be at least 1".to_string());
    }

    if let Some(timeout) = &args.timeout {
        if parse_timeout_string(timeout).is_none() {
            return Err(format!(
                "Invalid timeout '{}'. Use format like '5s', '500ms', '2m'",
                timeout
            ));
        }
    }

    if let Err(e) = RateLimitRegistry::from_specs(&args.rate) {
        return Err(e.to_string());
    }

    Ok(())
}

/// Main checking logic
async fn run_url_check(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    // Everything that can be wrong with the configuration fails here,
    // before the output is opened.
    let config = build_config(&args)?;
    let checker = StatusChecker::from_config(&config)?;

    tracing::info!(
        concurrency = config.concurrency,
        timeout_ms = config.timeout.as_millis() as u64,
        format = %config.format,
        "configuration resolved"
    );
    for limit in checker.limits().iter() {
        tracing::info!(limit = %limit, "rate limit");
    }

    let summary = if args.path == "-" {
        let source = WorkSource::new(BufReader::new(tokio::io::stdin()));
        execute(&args, &config, source, checker).await?
    } else {
        let source = WorkSource::open(&args.path).await?;
        execute(&args, &config, source, checker).await?
    };

    if args.progress {
        ui::print_summary(&summary);
    }

    Ok(())
}

/// Open the output and drive the worker pool over `source`.
async fn execute<R>(
    args: &Args,
    config: &CheckConfig,
    source: WorkSource<R>,
    checker: StatusChecker,
) -> Result<RunSummary, Box<dyn std::error::Error>>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let output: Box<dyn AsyncWrite + Unpin + Send> = match &args.output {
        Some(path) => Box::new(
            tokio::fs::File::create(path)
                .await
                .map_err(|e| format!("Cannot create output file '{}': {}", path, e))?,
        ),
        None => Box::new(tokio::io::stdout()),
    };
    let sink = ResultSink::new(output, config.format)
        .with_csv_headers(config.csv_headers)
        .with_flush_interval(config.flush_interval);

    let progress = Arc::new(Progress::default());
    let pool = WorkerPool::from_config(config).with_progress(Arc::clone(&progress));

    let spinner = if args.progress {
        ui::Spinner::start(progress)
    } else {
        None
    };

    let result = pool.run(source, checker, sink).await;

    if let Some(spinner) = spinner {
        spinner.stop().await;
    }

    Ok(result?)
}

/// Build CheckConfig from CLI arguments with config file integration.
///
/// Precedence order (highest to lowest):
/// 1. CLI arguments (explicit user input)
/// 2. Environment variables (URL_STATUS_*)
/// 3. Config files (explicit --config, or local > global > XDG)
/// 4. Built-in defaults
fn build_config(args: &Args) -> Result<CheckConfig, Box<dyn std::error::Error>> {
    let env_config = load_env_config();
    let config_manager = ConfigManager::new(args.verbose || args.debug);

    let explicit_path = args.config.clone().or_else(|| env_config.config.clone());
    let file_config: FileConfig = match explicit_path {
        Some(path) => config_manager.load_file(&path)?,
        None => config_manager.discover_and_load()?,
    };

    let config = file_config.apply_to(CheckConfig::default())?;
    let config = env_config.apply_to(config);
    apply_cli_args_to_config(config, args)
}

/// Apply explicit CLI flags on top of everything else.
fn apply_cli_args_to_config(
    mut config: CheckConfig,
    args: &Args,
) -> Result<CheckConfig, Box<dyn std::error::Error>> {
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }

    if let Some(timeout) = &args.timeout {
        config.timeout = parse_timeout_string(timeout)
            .ok_or_else(|| format!("Invalid timeout '{}'", timeout))?;
    }

    // Flags can only switch this on
    if args.ignore_ssl_errors {
        config.ignore_tls_errors = true;
    }

    if !args.rate.is_empty() {
        config.rate_limits = args.rate.clone();
    }

    if args.json {
        config.format = OutputFormat::Json;
    } else if args.csv {
        config.format = OutputFormat::Csv;
    }

    if args.headers {
        config.csv_headers = true;
    }

    if config.concurrency == 0 {
        return Err("Concurrency must be at least 1".into());
    }

    Ok(config)
}
