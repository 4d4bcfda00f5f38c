//! carbonsense - household carbon footprint CLI
//!
//! Usage:
//!   carbonsense cluster profiles.json             # Segment profiles
//!   carbonsense recommend profiles.json --user u1 # Advice for one user
//!   carbonsense predict profile.json              # Next month's emission
//!   carbonsense retrain                           # Retrain the emission model
//!   carbonsense daily activity.json               # One activity's emission
//!
//! Input defaults to stdin; output is JSON on stdout. Logs go to stderr.

use carbonsense::config::{LogFormat, ServiceConfig};
use carbonsense::service::CarbonService;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;

use error::Result;

/// carbonsense - Carbon footprint segmentation and prediction
#[derive(Parser)]
#[command(name = "carbonsense")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment a batch of profiles into lifestyle clusters
    Cluster {
        /// JSON array of profiles, or a request object (stdin if omitted)
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,

        /// Seed for the waste fallback draw
        #[arg(long)]
        seed: Option<u64>,

        /// Number of clusters for this run
        #[arg(long)]
        clusters: Option<usize>,
    },

    /// Recommend actions for one user based on their cluster
    Recommend {
        /// JSON array of profiles, or a request object (stdin if omitted)
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,

        /// User identifier matched against `_id` and `userId`
        #[arg(long = "user")]
        user_id: Option<String>,

        /// Seed for the waste fallback draw
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Predict next month's emission for one profile
    Predict {
        /// JSON object with the six model inputs (stdin if omitted)
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,
    },

    /// Retrain the emission model and overwrite its artifacts
    Retrain,

    /// Compute the emission of one logged activity
    Daily {
        /// JSON object with `category` and `details` (stdin if omitted)
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,
    },
}

fn init_logging(config: &ServiceConfig, verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.logging.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn run(cli: Cli, service: &CarbonService) -> Result<serde_json::Value> {
    match cli.command {
        Commands::Cluster {
            input,
            seed,
            clusters,
        } => commands::cluster(
            service,
            commands::read_input(input.as_deref())?,
            seed,
            clusters,
        ),
        Commands::Recommend {
            input,
            user_id,
            seed,
        } => commands::recommend(
            service,
            commands::read_input(input.as_deref())?,
            user_id,
            seed,
        ),
        Commands::Predict { input } => {
            commands::predict(service, &commands::read_input(input.as_deref())?)
        }
        Commands::Retrain => commands::retrain(service),
        Commands::Daily { input } => {
            commands::daily(service, commands::read_input(input.as_deref())?)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ServiceConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };
    init_logging(&config, cli.verbose, cli.quiet);

    let service = match CarbonService::new(config) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    let pretty = cli.pretty;
    let result = run(cli, &service).and_then(|value| {
        let rendered = if pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        println!("{rendered}");
        Ok(())
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "request failed");
            println!("{}", serde_json::json!({ "error": e.to_string() }));
            e.exit_code()
        }
    }
}
