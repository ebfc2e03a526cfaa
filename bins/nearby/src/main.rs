//! nearby: find users near a location and keep stored locations canonical.

use clap::{Parser, Subcommand, ValueEnum};
use nearby_cli::output::Status;
use nearby_core::config::Config;
use nearby_telemetry::{TelemetryConfig, TelemetryGuard};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

use commands::search::{FilterArgs, PointArgs};
use commands::{migrate, search, user, watch, Context};

/// Proximity search over a user store
#[derive(Parser)]
#[command(name = "nearby")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (default: nearby.toml or the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// User store file, overriding the configuration
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize every stored location, then build the location index
    Migrate {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,

        /// Skip building the location index afterwards
        #[arg(long)]
        no_index: bool,
    },

    /// Strip invalid locations and build the location index
    Index,

    /// Find users near another user
    Search {
        /// Id of the searching user
        user: String,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Find users near a point, an IP lookup or a place search result
    SearchPoint {
        #[command(flatten)]
        origin: PointArgs,

        /// User id to leave out of the results
        #[arg(long)]
        exclude: Option<String>,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Repeat a user's search on a timer until interrupted
    Watch {
        /// Id of the searching user
        user: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// Seconds between refreshes (default from configuration)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Stop after this many refreshes
        #[arg(long)]
        rounds: Option<u64>,
    },

    /// Manage user profiles
    User {
        #[command(subcommand)]
        action: user::UserCommand,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            Status::failure(&err);
            return exit_code(&err);
        }
    };
    if let Some(store) = &cli.store {
        config.schema.store.path = store.clone();
    }

    let _telemetry = match init_telemetry(&config, cli.verbose) {
        Ok(guard) => Some(guard),
        Err(err) => {
            Status::warning(&format!("Logging disabled: {err}"));
            None
        }
    };

    let ctx = Context {
        config,
        format: cli.format,
        verbose: cli.verbose,
    };

    let result = match cli.command {
        Commands::Migrate { dry_run, no_index } => migrate::run(&ctx, dry_run, no_index),
        Commands::Index => migrate::run_index(&ctx),
        Commands::Search { user, filters } => search::run_user(&ctx, &user, &filters),
        Commands::SearchPoint {
            origin,
            exclude,
            filters,
        } => search::run_point(&ctx, &origin, exclude.as_deref(), &filters),
        Commands::Watch {
            user,
            filters,
            interval,
            rounds,
        } => watch::run(&ctx, &user, &filters, interval, rounds),
        Commands::User { action } => user::run(&ctx, action),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(code = %err.code, error = %err.message, "Command failed");
            if ctx.format == OutputFormat::Json {
                match serde_json::to_string(&err.to_report()) {
                    Ok(report) => eprintln!("{report}"),
                    Err(_) => Status::failure(&err),
                }
            } else {
                Status::failure(&err);
            }
            exit_code(&err)
        }
    }
}

fn init_telemetry(config: &Config, verbose: bool) -> anyhow::Result<TelemetryGuard> {
    let mut telemetry = TelemetryConfig::from(&config.schema.logging);
    if verbose {
        telemetry = telemetry.verbose();
    }
    nearby_telemetry::init_with_config(telemetry)
}

fn exit_code(err: &nearby_core::Error) -> ExitCode {
    let code = err.code.exit_code();
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
