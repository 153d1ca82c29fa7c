use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod handlers;
mod reporter;

/// Conductor test orchestrator.
///
/// Runs the test suites declared in conductor.toml in dependency order,
/// with per-test timeouts, retries and bounded suite concurrency.
///
/// EXAMPLES:
///     conductor run                      Run every suite
///     conductor run --json               Print the run report as JSON
///     conductor run --max-concurrent 1   Run one suite at a time
///     conductor order                    Show the resolved suite order
///     conductor list                     List suites and tests
///
/// ENVIRONMENT VARIABLES:
///     CONDUCTOR_LOG                          Log filter (default: warn)
///     CONDUCTOR_JSON                         Set to 'true' for JSON output by default
///     CONDUCTOR_MAX_CONCURRENT_SUITES        Override max_concurrent_suites
///     CONDUCTOR_TEST_TIMEOUT_MS              Override test_timeout_ms
///     CONDUCTOR_RETRY_FAILED_TESTS           Override retry_failed_tests
///     CONDUCTOR_HALT_ON_CRITICAL_FAILURE     Override halt_on_critical_failure
///     NO_COLOR                               Set to disable colored output
#[derive(Parser)]
#[command(name = "conductor")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all configured suites
    ///
    /// Exits with status 1 when the run fails (any critical test failure).
    ///
    /// EXAMPLES:
    ///     conductor run                     Run with conductor.toml settings
    ///     conductor run --no-halt           Keep going after critical failures
    ///     conductor run -c ci.toml --json   Use another config, JSON output
    #[command(visible_alias = "r")]
    Run {
        /// Path to the config file (defaults to conductor.toml, searched upwards)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
        /// Output the report in JSON format
        #[arg(long, env = "CONDUCTOR_JSON")]
        json: bool,
        /// Show every test and coverage detail
        #[arg(long, short = 'v')]
        verbose: bool,
        /// Disable colored output
        #[arg(long, env = "NO_COLOR")]
        no_color: bool,
        /// Maximum number of suites running at once
        #[arg(long, value_name = "N")]
        max_concurrent: Option<usize>,
        /// Keep admitting suites after a critical failure
        #[arg(long)]
        no_halt: bool,
        /// Never retry failed tests
        #[arg(long)]
        no_retry: bool,
    },

    /// Print the order suites run in
    Order {
        /// Path to the config file
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
        /// Output in JSON format
        #[arg(long, env = "CONDUCTOR_JSON")]
        json: bool,
    },

    /// List configured suites and tests
    #[command(visible_alias = "ls")]
    List {
        /// Path to the config file
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
        /// Output in JSON format
        #[arg(long, env = "CONDUCTOR_JSON")]
        json: bool,
    },
}

/// Install the stderr log subscriber
///
/// `CONDUCTOR_LOG` takes precedence; otherwise `--verbose` selects `info`
/// and the default is `warn`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("CONDUCTOR_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            json,
            verbose,
            no_color,
            max_concurrent,
            no_halt,
            no_retry,
        } => {
            init_tracing(verbose);
            let args = commands::run::RunArgs {
                config,
                json,
                verbose,
                no_color,
                max_concurrent,
                no_halt,
                no_retry,
            };
            let report = commands::run::run(args)?;

            // Exit with code 1 if the run failed
            if !report.passed() {
                std::process::exit(1);
            }
        }
        Commands::Order { config, json } => {
            init_tracing(false);
            commands::order::run(config.as_deref(), json)?;
        }
        Commands::List { config, json } => {
            init_tracing(false);
            commands::list::run(config.as_deref(), json)?;
        }
    }

    Ok(())
}
