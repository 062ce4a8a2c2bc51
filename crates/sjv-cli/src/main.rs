//! # signaljourney-validate entry point
//!
//! Parses command-line arguments, installs logging, resolves the schema
//! root, and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sjv_cli::check_examples::{run_check_examples, CheckExamplesArgs};
use sjv_cli::validate::{run_validate, ValidateArgs};
use sjv_cli::versions::{run_versions, VersionsArgs};
use sjv_cli::CliContext;

/// signalJourney Validator CLI
///
/// Validates signalJourney JSON files against the versioned signalJourney
/// schemas. Supports single files, directories, and recursive scans.
#[derive(Parser, Debug)]
#[command(name = "signaljourney-validate", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a JSON configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Schema root directory (holds versions/).
    #[arg(long, global = true)]
    schema_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate one or more signalJourney JSON files.
    Validate(ValidateArgs),

    /// Validate example files passed by a pre-commit hook.
    CheckExamples(CheckExamplesArgs),

    /// List the available schema versions.
    Versions(VersionsArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("signaljourney-validate v{} starting", env!("CARGO_PKG_VERSION"));

    let ctx = match CliContext::resolve(cli.config.as_deref(), cli.schema_dir.as_deref(), cli.verbose) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(1);
        }
    };

    tracing::debug!(schema_dir = %ctx.schema_dir.display(), "resolved schema directory");

    let result = match cli.command {
        Commands::Validate(args) => run_validate(&args, &ctx),
        Commands::CheckExamples(args) => run_check_examples(&args, &ctx),
        Commands::Versions(args) => run_versions(&args, &ctx),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
